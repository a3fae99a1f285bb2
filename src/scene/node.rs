use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::math::{Transform, AABB};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a geometry's GPU buffers. Clones of a geometry share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

/// Identity of a material's GPU resources. Clones of a material share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

/// Index range drawn with one material of a multi-material mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// Indexed triangle list with per-vertex normals
#[derive(Debug, Clone)]
pub struct Geometry {
    id: GeometryId,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub groups: Vec<GeometryGroup>,
}

impl Geometry {
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let count = indices.len() as u32;
        Self {
            id: GeometryId(next_resource_id()),
            positions,
            normals,
            indices,
            groups: vec![GeometryGroup {
                start: 0,
                count,
                material_index: 0,
            }],
        }
    }

    /// Flat plane in the XY plane facing +Z, centered on the origin
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let positions = vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]];
        let normals = vec![[0.0, 0.0, 1.0]; 4];
        Self::new(positions, normals, vec![0, 1, 2, 2, 3, 0])
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn with_groups(mut self, groups: Vec<GeometryGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(self.positions.iter().copied().map(Vec3::from_array))
    }

    /// Replaces normals with per-face normals averaged at shared vertices
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let [p0, p1, p2] = [a, b, c].map(|i| Vec3::from_array(self.positions[i]));
            let face = (p1 - p0).cross(p2 - p0);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
            .collect();
    }
}

/// Lit surface colour, stored as linear RGB
#[derive(Debug, Clone)]
pub struct Material {
    id: MaterialId,
    pub name: Option<String>,
    pub color: [f32; 3],
}

impl Material {
    pub fn new(color: [f32; 3]) -> Self {
        Self {
            id: MaterialId(next_resource_id()),
            name: None,
            color,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }
}

/// A mesh draws with one material, or one per geometry group
#[derive(Debug, Clone)]
pub enum MaterialSlot {
    Single(Material),
    Multi(Vec<Material>),
}

impl MaterialSlot {
    pub fn as_slice(&self) -> &[Material] {
        match self {
            MaterialSlot::Single(material) => std::slice::from_ref(material),
            MaterialSlot::Multi(materials) => materials,
        }
    }

    /// Material used by a geometry group, falling back to the first one
    pub fn for_group(&self, group: &GeometryGroup) -> Option<&Material> {
        let materials = self.as_slice();
        materials.get(group.material_index).or_else(|| materials.first())
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Geometry,
    pub materials: MaterialSlot,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            materials: MaterialSlot::Single(material),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_materials(geometry: Geometry, materials: MaterialSlot) -> Self {
        Self {
            geometry,
            materials,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

/// Depth-map parameters for a shadow-casting directional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half-width of the orthographic shadow frustum
    pub extent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Shines from the node position towards the origin
    Directional { shadow: Option<ShadowSettings> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: [f32; 3],
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Ambient,
        }
    }

    pub fn directional(color: [f32; 3], intensity: f32, shadow: Option<ShadowSettings>) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Directional { shadow },
        }
    }
}

/// Camera carried by an imported asset; never used for presentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraNode {
    pub yfov: f32,
    pub near: f32,
    pub far: Option<f32>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
    Camera(CameraNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub(crate) parent: Option<super::NodeId>,
    pub(crate) children: Vec<super::NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<super::NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[super::NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_ids_are_unique() {
        let a = Geometry::plane(1.0, 1.0);
        let b = Geometry::plane(1.0, 1.0);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_plane_has_two_triangles() {
        let plane = Geometry::plane(20.0, 20.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.triangle_count(), 2);
        let bounds = plane.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-10.0, -10.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_compute_normals_faces_plus_z() {
        let mut plane = Geometry::plane(2.0, 2.0);
        plane.normals.clear();
        plane.compute_normals();
        assert_eq!(plane.normals.len(), 4);
        for n in &plane.normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_compute_normals_skips_out_of_range_indices() {
        let mut geometry = Geometry::new(vec![[0.0; 3]; 2], Vec::new(), vec![0, 1, 7]);
        geometry.compute_normals();
        assert_eq!(geometry.normals, vec![[0.0, 1.0, 0.0]; 2]);
    }

    #[test]
    fn test_multi_material_group_lookup() {
        let red = Material::new([1.0, 0.0, 0.0]);
        let blue = Material::new([0.0, 0.0, 1.0]);
        let slot = MaterialSlot::Multi(vec![red.clone(), blue.clone()]);
        let group = |material_index| GeometryGroup {
            start: 0,
            count: 3,
            material_index,
        };

        assert_eq!(slot.for_group(&group(1)).map(Material::id), Some(blue.id()));
        assert_eq!(slot.for_group(&group(9)).map(Material::id), Some(red.id()));
        assert_eq!(slot.as_slice().len(), 2);
    }
}
