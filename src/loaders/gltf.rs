use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use glam::{Quat, Vec3};

use crate::error::LoadError;
use crate::math::{Transform, AABB};
use crate::scene::{
    CameraNode, Geometry, GeometryGroup, Material, MaterialSlot, Mesh, Node, NodeId, NodeKind,
    SceneGraph,
};

const READ_CHUNK_SIZE: usize = 64 * 1024;
const DEFAULT_MATERIAL_COLOR: [f32; 3] = [0.5, 0.5, 0.5];
pub const MODEL_ROOT_NAME: &str = "model";

/// Bytes read so far out of the asset's total size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    /// Completed fraction in `[0, 1]`; an empty asset counts as complete
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.loaded as f64 / self.total as f64).min(1.0) as f32
        }
    }
}

/// A decoded model, detached from any live scene
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub graph: SceneGraph,
    pub bounds: Option<AABB>,
}

/// Reads and decodes a glTF / GLB asset, reporting read progress per chunk
pub fn load_asset(
    path: impl AsRef<Path>,
    on_progress: impl FnMut(LoadProgress),
) -> Result<LoadedModel, LoadError> {
    let path = path.as_ref();
    log::info!("Loading model: {:?}", path);

    let bytes = read_with_progress(path, on_progress)?;
    decode(&bytes, path.parent())
}

/// Decodes an in-memory asset; external buffer URIs cannot be resolved
pub fn parse_asset(bytes: &[u8]) -> Result<LoadedModel, LoadError> {
    decode(bytes, None)
}

fn read_with_progress(
    path: &Path,
    mut on_progress: impl FnMut(LoadProgress),
) -> Result<Vec<u8>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let total = file.metadata().map_err(io_error)?.len();

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        };
        bytes.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total: total.max(bytes.len() as u64),
        });
    }

    if bytes.is_empty() {
        on_progress(LoadProgress { loaded: 0, total: 0 });
    }
    Ok(bytes)
}

fn decode(bytes: &[u8], base: Option<&Path>) -> Result<LoadedModel, LoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base, blob)?;

    log::info!(
        "glTF loaded: {} scenes, {} nodes, {} meshes, {} materials",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count()
    );

    let mut converter = Converter {
        buffers: &buffers,
        graph: SceneGraph::new(MODEL_ROOT_NAME),
        meshes: HashMap::new(),
        materials: HashMap::new(),
    };

    let scenes: Vec<gltf::Scene> = match document.default_scene() {
        Some(scene) => vec![scene],
        None => document.scenes().collect(),
    };
    let root = converter.graph.root();
    for scene in &scenes {
        for node in scene.nodes() {
            converter.add_node(root, &node)?;
        }
    }

    let graph = converter.graph;
    let bounds = model_bounds(&graph);
    if let Some(bounds) = bounds {
        log::debug!("Model bounds: {:?} to {:?}", bounds.min, bounds.max);
    } else {
        log::warn!("No geometry found in glTF asset");
    }

    Ok(LoadedModel { graph, bounds })
}

/// Union of every mesh's bounds in model space
fn model_bounds(graph: &SceneGraph) -> Option<AABB> {
    let world = graph.world_matrices();
    graph
        .meshes()
        .filter_map(|(id, mesh)| Some(mesh.geometry.bounds()?.transformed(&world[id.index()])))
        .reduce(|a, b| a.union(&b))
}

struct Converter<'a> {
    buffers: &'a [gltf::buffer::Data],
    graph: SceneGraph,
    // glTF mesh / material index -> converted value, so shared data keeps one id
    meshes: HashMap<usize, Option<Mesh>>,
    materials: HashMap<Option<usize>, Material>,
}

impl Converter<'_> {
    fn add_node(&mut self, parent: NodeId, node: &gltf::Node) -> Result<(), LoadError> {
        let (translation, rotation, scale) = node.transform().decomposed();
        let transform = Transform::from_trs(
            Vec3::from_array(translation),
            Quat::from_array(rotation),
            Vec3::from_array(scale),
        );

        let kind = if let Some(mesh) = node.mesh() {
            match self.mesh(&mesh)? {
                Some(mesh) => NodeKind::Mesh(mesh),
                None => NodeKind::Group,
            }
        } else if let Some(camera) = node.camera() {
            NodeKind::Camera(camera_node(&camera))
        } else {
            NodeKind::Group
        };

        let name = node.name().unwrap_or_default();
        let id = self
            .graph
            .add(parent, Node::new(name, kind).with_transform(transform))
            .ok_or_else(|| LoadError::Geometry(format!("node {:?} has no parent", name)))?;

        for child in node.children() {
            self.add_node(id, &child)?;
        }
        Ok(())
    }

    fn mesh(&mut self, mesh: &gltf::Mesh) -> Result<Option<Mesh>, LoadError> {
        if let Some(cached) = self.meshes.get(&mesh.index()) {
            return Ok(cached.clone());
        }
        let converted = self.convert_mesh(mesh)?;
        self.meshes.insert(mesh.index(), converted.clone());
        Ok(converted)
    }

    /// Merges all triangle primitives into one geometry with a group per primitive
    fn convert_mesh(&mut self, mesh: &gltf::Mesh) -> Result<Option<Mesh>, LoadError> {
        let label = mesh.name().unwrap_or("unnamed");
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut groups = Vec::new();
        let mut materials = Vec::new();
        let mut missing_normals = false;
        let buffers = self.buffers;

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("Skipping {:?} primitive in mesh {}", primitive.mode(), label);
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(primitive_positions) = reader.read_positions() else {
                return Err(LoadError::Geometry(format!(
                    "mesh {} has a primitive without positions",
                    label
                )));
            };

            let base = positions.len() as u32;
            let primitive_positions: Vec<[f32; 3]> = primitive_positions.collect();
            let vertex_count = primitive_positions.len() as u32;

            match reader.read_normals() {
                Some(n) => normals.extend(n),
                None => {
                    missing_normals = true;
                    normals.extend(std::iter::repeat([0.0, 1.0, 0.0]).take(vertex_count as usize));
                }
            }
            positions.extend(primitive_positions);

            let primitive_indices: Vec<u32> = match reader.read_indices() {
                Some(read) => read.into_u32().collect(),
                None => (0..vertex_count).collect(),
            };
            if let Some(bad) = primitive_indices.iter().find(|&&i| i >= vertex_count) {
                return Err(LoadError::Geometry(format!(
                    "mesh {} references vertex {} of {}",
                    label, bad, vertex_count
                )));
            }

            groups.push(GeometryGroup {
                start: indices.len() as u32,
                count: primitive_indices.len() as u32,
                material_index: materials.len(),
            });
            indices.extend(primitive_indices.into_iter().map(|i| i + base));
            materials.push(self.material(&primitive.material()));
        }

        if groups.is_empty() {
            log::warn!("Mesh {} has no triangle primitives", label);
            return Ok(None);
        }

        let mut geometry = Geometry::new(positions, normals, indices).with_groups(groups);
        if missing_normals {
            geometry.compute_normals();
        }

        let slot = if materials.len() == 1 {
            MaterialSlot::Single(materials.remove(0))
        } else {
            MaterialSlot::Multi(materials)
        };
        log::debug!(
            "  Mesh {}: {} vertices, {} triangles, {} material(s)",
            label,
            geometry.vertex_count(),
            geometry.triangle_count(),
            slot.as_slice().len()
        );
        Ok(Some(Mesh::with_materials(geometry, slot)))
    }

    fn material(&mut self, material: &gltf::Material) -> Material {
        self.materials
            .entry(material.index())
            .or_insert_with(|| {
                let factor = material.pbr_metallic_roughness().base_color_factor();
                let converted = match material.index() {
                    Some(_) => Material::new([factor[0], factor[1], factor[2]]),
                    None => Material::new(DEFAULT_MATERIAL_COLOR),
                };
                match material.name() {
                    Some(name) => converted.named(name),
                    None => converted,
                }
            })
            .clone()
    }
}

fn camera_node(camera: &gltf::Camera) -> CameraNode {
    match camera.projection() {
        gltf::camera::Projection::Perspective(p) => CameraNode {
            yfov: p.yfov(),
            near: p.znear(),
            far: p.zfar(),
        },
        gltf::camera::Projection::Orthographic(o) => CameraNode {
            yfov: 0.0,
            near: o.znear(),
            far: Some(o.zfar()),
        },
    }
}
