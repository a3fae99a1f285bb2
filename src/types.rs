/// Camera uniform buffer data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

/// Scene lighting: one ambient term and one shadowed directional light
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub light_view_proj: [[f32; 4]; 4],
    /// Unit vector pointing from the surface towards the light
    pub direction: [f32; 3],
    pub ambient_intensity: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient_color: [f32; 3],
    pub shadow_enabled: f32,
    pub shadow_texel: f32,
    pub shadow_bias: f32,
    pub _pad: [f32; 2],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            light_view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            direction: [0.0, 1.0, 0.0],
            ambient_intensity: 0.0,
            color: [0.0; 3],
            intensity: 0.0,
            ambient_color: [0.0; 3],
            shadow_enabled: 0.0,
            shadow_texel: 0.0,
            shadow_bias: 0.0,
            _pad: [0.0; 2],
        }
    }
}

/// Per-node transform data
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub receive_shadow: f32,
    pub _pad: [f32; 3],
}

impl ModelUniform {
    pub fn new(model: glam::Mat4, receive_shadow: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
            receive_shadow: if receive_shadow { 1.0 } else { 0.0 },
            _pad: [0.0; 3],
        }
    }
}

/// Per-material surface colour (linear RGB, alpha unused)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
