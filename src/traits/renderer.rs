use super::window::Viewport;
use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::{GeometryId, MaterialId, SceneGraph};

/// How shadow maps are filtered when sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowFiltering {
    /// Single depth comparison
    Hard,
    /// 3x3 percentage-closer filtering
    SoftPcf,
}

/// Renderer parameters chosen when the scene is built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub viewport: Viewport,
    pub shadows: Option<ShadowFiltering>,
    /// Width and height of the square shadow depth map
    pub shadow_map_size: u32,
}

/// GPU presentation seam - owns every GPU-side resource of a session
pub trait RenderBackend {
    /// Resize the backing surface; takes effect before the next draw
    fn resize(&mut self, viewport: Viewport);

    /// Draw one frame of `scene` as seen by `camera`
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) -> Result<(), RenderError>;

    /// Free the buffers uploaded for a geometry, if any
    fn release_geometry(&mut self, id: GeometryId);

    /// Free the uniforms and bind groups created for a material, if any
    fn release_material(&mut self, id: MaterialId);

    /// Free the renderer's own resources (pipelines, targets, surface state)
    fn dispose(&mut self);
}
