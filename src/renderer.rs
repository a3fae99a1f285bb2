use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::PerspectiveCamera;
use crate::error::{RenderError, ViewerError};
use crate::math::srgb_to_linear;
use crate::scene::{GeometryId, LightKind, MaterialId, Mesh, NodeId, SceneGraph};
use crate::traits::{RenderBackend, RendererSettings, ShadowFiltering, Viewport};
use crate::types::{LightUniform, MaterialUniform, ModelUniform, Vertex};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SHADOW_BIAS: f32 = 0.002;

type Result<T> = std::result::Result<T, ViewerError>;

/// GPU-side object that can free its memory ahead of drop
trait GpuResource {
    fn destroy(&self);
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl GpuResource for GpuGeometry {
    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

struct GpuMaterial {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuResource for GpuMaterial {
    fn destroy(&self) {
        self.buffer.destroy();
    }
}

/// Uploaded resources keyed by scene id. Entries stay alive until released,
/// independent of the surface and pipelines.
struct ResourceCache<K, R> {
    entries: HashMap<K, R>,
}

impl<K: Eq + Hash, R: GpuResource> ResourceCache<K, R> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<&R> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: K, resource: R) {
        if let Some(previous) = self.entries.insert(key, resource) {
            previous.destroy();
        }
    }

    /// Destroys and forgets the entry. Returns false for unknown keys.
    fn release(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(resource) => {
                resource.destroy();
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct GpuNode {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    shadow_texture: wgpu::Texture,
    shadow_view: wgpu::TextureView,
    scene_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    nodes: HashMap<NodeId, GpuNode>,
}

/// Forward renderer with a single shadow-mapped directional light.
///
/// Geometry and material uploads happen lazily on first draw and are cached
/// by resource id until released. `dispose` only tears down the surface and
/// frame state, so cached uploads must still be released one by one.
pub struct WgpuRenderer {
    settings: RendererSettings,
    gpu: Option<GpuState>,
    geometries: ResourceCache<GeometryId, GpuGeometry>,
    materials: ResourceCache<MaterialId, GpuMaterial>,
}

impl WgpuRenderer {
    pub async fn new(window: Arc<Window>, settings: &RendererSettings) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::Renderer(e.to_string()))?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let size = settings.viewport.physical_size();
        let surface_config = Self::create_surface_config(&surface, &adapter, size)?;
        surface.configure(&device, &surface_config);

        let (depth_texture, depth_view) = Self::create_depth_texture(&device, size);
        let shadow_size = settings.shadow_map_size.max(1);
        let (shadow_texture, shadow_view) = Self::create_shadow_map(&device, shadow_size);
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[crate::types::CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                position: [0.0; 3],
                _pad: 0.0,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::VERTEX_FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("frame_bind_group_layout"),
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            label: Some("shadow_bind_group_layout"),
        });
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
            label: Some("model_bind_group_layout"),
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
            label: Some("material_bind_group_layout"),
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
            label: Some("frame_bind_group"),
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });

        let scene_pipeline = Self::create_scene_pipeline(
            &device,
            &[&frame_layout, &model_layout, &material_layout],
            surface_config.format,
        );
        let shadow_pipeline = Self::create_shadow_pipeline(&device, &[&shadow_layout, &model_layout]);

        log::info!(
            "Renderer initialized: {}x{} {:?}, shadow map {}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            shadow_size
        );

        Ok(Self {
            settings: *settings,
            gpu: Some(GpuState {
                device,
                queue,
                surface,
                surface_config,
                depth_texture,
                depth_view,
                shadow_texture,
                shadow_view,
                scene_pipeline,
                shadow_pipeline,
                camera_buffer,
                light_buffer,
                frame_bind_group,
                shadow_bind_group,
                model_layout,
                material_layout,
                nodes: HashMap::new(),
            }),
            geometries: ResourceCache::new(),
            materials: ResourceCache::new(),
        })
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn is_disposed(&self) -> bool {
        self.gpu.is_none()
    }

    /// Number of cached geometries and materials not yet released
    pub fn cached_resources(&self) -> (usize, usize) {
        (self.geometries.len(), self.materials.len())
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| ViewerError::Renderer("failed to find an appropriate adapter".into()))
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| ViewerError::Renderer(e.to_string()))
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        (width, height): (u32, u32),
    ) -> Result<wgpu::SurfaceConfiguration> {
        let surface_caps = surface.get_capabilities(adapter);
        let Some(&fallback) = surface_caps.formats.first() else {
            return Err(ViewerError::Renderer("surface is not supported by the adapter".into()));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(fallback);

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        (width, height): (u32, u32),
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_shadow_map(device: &wgpu::Device, size: u32) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_scene_pipeline(
        device: &wgpu::Device,
        layouts: &[&wgpu::BindGroupLayout],
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn create_shadow_pipeline(
        device: &wgpu::Device,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shadow.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_shadow"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Packs the scene's ambient and first directional light into a uniform.
///
/// `world` holds one world matrix per node, as from
/// [`SceneGraph::world_matrices`].
pub fn lighting_uniform(
    scene: &SceneGraph,
    world: &[Mat4],
    shadows: Option<ShadowFiltering>,
) -> LightUniform {
    let mut uniform = LightUniform::default();
    let mut ambient = Vec3::ZERO;
    let mut have_sun = false;

    for (id, light) in scene.lights() {
        match light.kind {
            LightKind::Ambient => {
                ambient += Vec3::from_array(light.color) * light.intensity;
            }
            LightKind::Directional { shadow } if !have_sun => {
                have_sun = true;
                let position = world
                    .get(id.index())
                    .map(|m| m.w_axis.truncate())
                    .unwrap_or(Vec3::Y);
                let direction = position.try_normalize().unwrap_or(Vec3::Y);
                uniform.direction = direction.to_array();
                uniform.color = light.color;
                uniform.intensity = light.intensity;

                if let (Some(filtering), Some(shadow)) = (shadows, shadow) {
                    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
                        Vec3::Z
                    } else {
                        Vec3::Y
                    };
                    let view = Mat4::look_at_rh(position, Vec3::ZERO, up);
                    let e = shadow.extent;
                    let proj = Mat4::orthographic_rh(-e, e, -e, e, shadow.near, shadow.far);
                    uniform.light_view_proj = (proj * view).to_cols_array_2d();
                    uniform.shadow_enabled = 1.0;
                    uniform.shadow_bias = SHADOW_BIAS;
                    uniform.shadow_texel = match filtering {
                        ShadowFiltering::Hard => 0.0,
                        ShadowFiltering::SoftPcf => 1.0 / shadow.map_size.max(1) as f32,
                    };
                }
            }
            LightKind::Directional { .. } => {}
        }
    }

    // Ambient colour carries the summed intensity; the scalar stays at one
    if ambient != Vec3::ZERO {
        uniform.ambient_color = ambient.to_array();
        uniform.ambient_intensity = 1.0;
    }
    uniform
}

impl GpuState {
    fn resize(&mut self, (width, height): (u32, u32)) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);

        self.depth_texture.destroy();
        let (texture, view) = WgpuRenderer::create_depth_texture(&self.device, (width, height));
        self.depth_texture = texture;
        self.depth_view = view;
    }

    fn upload_geometry(&self, mesh: &Mesh, geometries: &mut ResourceCache<GeometryId, GpuGeometry>) {
        let geometry = &mesh.geometry;
        if geometries.contains(&geometry.id()) || geometry.indices.is_empty() {
            return;
        }

        let vertices: Vec<Vertex> = geometry
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: geometry.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect();

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        geometries.insert(
            geometry.id(),
            GpuGeometry {
                vertex_buffer,
                index_buffer,
            },
        );
    }

    fn upload_materials(&self, mesh: &Mesh, materials: &mut ResourceCache<MaterialId, GpuMaterial>) {
        for material in mesh.materials.as_slice() {
            if materials.contains(&material.id()) {
                continue;
            }
            let [r, g, b] = material.color;
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[MaterialUniform { color: [r, g, b, 1.0] }]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.material_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
                label: Some("material_bind_group"),
            });
            materials.insert(material.id(), GpuMaterial { buffer, bind_group });
        }
    }

    fn update_node(&mut self, id: NodeId, uniform: ModelUniform) {
        if let Some(node) = self.nodes.get(&id) {
            self.queue.write_buffer(&node.buffer, 0, bytemuck::cast_slice(&[uniform]));
            return;
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("model_bind_group"),
        });
        self.nodes.insert(id, GpuNode { buffer, bind_group });
    }

    fn acquire_frame(&mut self) -> std::result::Result<wgpu::SurfaceTexture, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                Err(RenderError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(e) => Err(RenderError::Other(e.to_string())),
        }
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
        shadows: Option<ShadowFiltering>,
        geometries: &mut ResourceCache<GeometryId, GpuGeometry>,
        materials: &mut ResourceCache<MaterialId, GpuMaterial>,
    ) -> std::result::Result<(), RenderError> {
        let world = scene.world_matrices();
        let lighting = lighting_uniform(scene, &world, shadows);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera.to_uniform()]));
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[lighting]));

        let meshes: Vec<(NodeId, &Mesh)> = scene.meshes().collect();
        for &(id, mesh) in &meshes {
            self.upload_geometry(mesh, geometries);
            self.upload_materials(mesh, materials);
            let model = world.get(id.index()).copied().unwrap_or(Mat4::IDENTITY);
            self.update_node(id, ModelUniform::new(model, mesh.receive_shadow));
        }

        let output = self.acquire_frame()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        if lighting.shadow_enabled > 0.0 {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);

            for &(id, mesh) in meshes.iter().filter(|(_, mesh)| mesh.cast_shadow) {
                let (Some(gpu_geometry), Some(node)) =
                    (geometries.get(&mesh.geometry.id()), self.nodes.get(&id))
                else {
                    continue;
                };
                shadow_pass.set_bind_group(1, &node.bind_group, &[]);
                shadow_pass.set_vertex_buffer(0, gpu_geometry.vertex_buffer.slice(..));
                shadow_pass.set_index_buffer(gpu_geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                shadow_pass.draw_indexed(0..mesh.geometry.indices.len() as u32, 0, 0..1);
            }
        }

        {
            let [r, g, b] = srgb_to_linear(scene.background);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.scene_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for &(id, mesh) in &meshes {
                let (Some(gpu_geometry), Some(node)) =
                    (geometries.get(&mesh.geometry.id()), self.nodes.get(&id))
                else {
                    continue;
                };
                render_pass.set_bind_group(1, &node.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu_geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(gpu_geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for group in &mesh.geometry.groups {
                    let Some(material) = mesh
                        .materials
                        .for_group(group)
                        .and_then(|m| materials.get(&m.id()))
                    else {
                        continue;
                    };
                    render_pass.set_bind_group(2, &material.bind_group, &[]);
                    render_pass.draw_indexed(group.start..group.start + group.count, 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn destroy(self) {
        for (_, node) in self.nodes {
            node.buffer.destroy();
        }
        self.camera_buffer.destroy();
        self.light_buffer.destroy();
        self.depth_texture.destroy();
        self.shadow_texture.destroy();
    }
}

impl RenderBackend for WgpuRenderer {
    fn resize(&mut self, viewport: Viewport) {
        self.settings.viewport = viewport;
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(viewport.physical_size());
        }
    }

    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) -> std::result::Result<(), RenderError> {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.render(
                scene,
                camera,
                self.settings.shadows,
                &mut self.geometries,
                &mut self.materials,
            ),
            None => Err(RenderError::Other("renderer has been disposed".into())),
        }
    }

    fn release_geometry(&mut self, id: GeometryId) {
        if !self.geometries.release(&id) {
            log::trace!("Geometry {:?} was never uploaded", id);
        }
    }

    fn release_material(&mut self, id: MaterialId) {
        if !self.materials.release(&id) {
            log::trace!("Material {:?} was never uploaded", id);
        }
    }

    fn dispose(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
            let (geometries, materials) = self.cached_resources();
            log::debug!(
                "Renderer disposed, {} geometries and {} materials awaiting release",
                geometries,
                materials
            );
        }
    }
}
