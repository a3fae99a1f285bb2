use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::animation::HingeLinkage;
use crate::camera::PerspectiveCamera;
use crate::config::ViewerConfig;
use crate::error::{LoadError, RenderError, ViewerError};
use crate::loaders::{attach_model, LoadProgress, LoadedModel};
use crate::scene::{build_scene, NodeId, SceneGraph};
use crate::traits::{FrameHandle, FrameScheduler, RenderBackend, RendererSettings, Viewport};

/// Shared "session is still mounted" flag, cleared exactly once at unmount
#[derive(Debug, Clone)]
pub struct SessionToken(Arc<AtomicBool>);

impl SessionToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns true if this call performed the deactivation
    pub fn deactivate(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum LoadState {
    Pending,
    Loaded { root: NodeId, meshes: usize },
    Failed(LoadError),
}

/// Result of one frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session already unmounted; nothing touched, nothing rescheduled
    Inactive,
    /// No frame was pending for this session (cancelled or stale)
    NotScheduled,
    Drawn,
    /// Scene or camera missing; animation advanced but nothing drawn
    Skipped,
    /// The draw failed and was logged
    Failed,
}

/// One mounted viewer: scene, camera, renderer, animation state and the
/// frame loop that ties them together.
pub struct Session<B: RenderBackend, S: FrameScheduler> {
    token: SessionToken,
    config: ViewerConfig,
    viewport: Option<Viewport>,
    scene: Option<SceneGraph>,
    camera: Option<PerspectiveCamera>,
    renderer: Option<B>,
    scheduler: S,
    linkage: HingeLinkage,
    pending_frame: Option<FrameHandle>,
    listening_for_resize: bool,
    load_state: LoadState,
}

impl<B: RenderBackend, S: FrameScheduler> Session<B, S> {
    /// Builds the scene for `surface` and creates its renderer.
    ///
    /// The render loop does not start here; it starts once the model has
    /// been delivered to [`Session::on_asset_loaded`].
    pub fn mount<F>(
        surface: Option<Viewport>,
        config: ViewerConfig,
        scheduler: S,
        make_renderer: F,
    ) -> Result<Self, ViewerError>
    where
        F: FnOnce(&RendererSettings) -> Result<B, ViewerError>,
    {
        let Some(viewport) = surface else {
            log::error!("No drawing surface available; viewer not initialized");
            return Err(ViewerError::MissingSurface);
        };

        config.validate().inspect_err(|e| {
            log::error!("Viewer not initialized: {}", e);
        })?;

        let setup = build_scene(viewport, &config);
        let renderer = make_renderer(&setup.renderer).inspect_err(|e| {
            log::error!("Viewer not initialized: {}", e);
        })?;

        log::info!(
            "Viewer mounted at {}x{} (pixel ratio {:.2})",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio
        );

        Ok(Self {
            token: SessionToken::new(),
            linkage: HingeLinkage::new(&config.hinge),
            config,
            viewport: Some(viewport),
            scene: Some(setup.scene),
            camera: Some(setup.camera),
            renderer: Some(renderer),
            scheduler,
            pending_frame: None,
            listening_for_resize: true,
            load_state: LoadState::Pending,
        })
    }

    pub fn token(&self) -> SessionToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        self.token.is_active()
    }

    pub fn asset_path(&self) -> &Path {
        &self.config.asset_path
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.camera.as_ref()
    }

    pub fn renderer(&self) -> Option<&B> {
        self.renderer.as_ref()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn linkage(&self) -> &HingeLinkage {
        &self.linkage
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    pub fn is_listening_for_resize(&self) -> bool {
        self.listening_for_resize
    }

    /// Keeps camera aspect and renderer size in step with the surface
    pub fn on_resize(&mut self, viewport: Viewport) {
        if !self.listening_for_resize || !self.is_active() {
            return;
        }
        log::debug!("Resize to {}x{} @{:.2}", viewport.width, viewport.height, viewport.pixel_ratio);

        self.viewport = Some(viewport);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_viewport(viewport.width, viewport.height);
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(viewport);
        }
    }

    pub fn on_asset_progress(&self, progress: LoadProgress) {
        if self.is_active() {
            log::debug!("Model {:.0}% loaded", progress.fraction() * 100.0);
        }
    }

    /// Attaches a loaded model and starts the frame loop, or records the failure
    pub fn on_asset_loaded(&mut self, result: Result<LoadedModel, LoadError>) {
        if !self.is_active() {
            log::debug!("Ignoring model delivered after unmount");
            return;
        }
        if !matches!(self.load_state, LoadState::Pending) {
            log::warn!("Ignoring second model delivery");
            return;
        }

        let model = match result {
            Ok(model) => model,
            Err(e) => {
                log::error!("Failed to load model {:?}: {}", self.config.asset_path, e);
                self.load_state = LoadState::Failed(e);
                return;
            }
        };

        let report = match self.scene.as_mut() {
            Some(scene) => attach_model(scene, model, &mut self.linkage),
            None => {
                self.fail_load("scene is gone");
                return;
            }
        };
        let Some(report) = report else {
            self.fail_load("scene root is not a valid parent");
            return;
        };

        if self.linkage.inner_display.is_none() {
            log::warn!("Model has no inner display node; hinge animation disabled");
        }
        log::info!(
            "Model attached: {} meshes, {} hinge parts",
            report.meshes,
            report.hinge_parts
        );

        self.load_state = LoadState::Loaded {
            root: report.root,
            meshes: report.meshes,
        };
        self.schedule_frame();
    }

    fn fail_load(&mut self, reason: &str) {
        log::warn!("Dropping model {:?}: {}", self.config.asset_path, reason);
        self.load_state = LoadState::Failed(LoadError::Attach(reason.to_string()));
    }

    /// Frame callback: advance the hinge, draw once, schedule the next frame
    pub fn on_frame(&mut self) -> FrameOutcome {
        if !self.is_active() {
            return FrameOutcome::Inactive;
        }
        let Some(handle) = self.scheduler.take_due() else {
            return FrameOutcome::NotScheduled;
        };
        if self.pending_frame != Some(handle) {
            return FrameOutcome::NotScheduled;
        }
        self.pending_frame = None;

        if let Some(scene) = self.scene.as_mut() {
            self.linkage.step(scene);
        }

        let outcome = match (&self.scene, &self.camera, self.renderer.as_mut()) {
            (Some(scene), Some(camera), Some(renderer)) => match renderer.render(scene, camera) {
                Ok(()) => FrameOutcome::Drawn,
                Err(RenderError::SurfaceLost) => {
                    log::debug!("Surface lost; reconfigured for next frame");
                    FrameOutcome::Failed
                }
                Err(e) => {
                    log::error!("Render error: {}", e);
                    FrameOutcome::Failed
                }
            },
            _ => FrameOutcome::Skipped,
        };

        self.schedule_frame();
        outcome
    }

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    /// Tears the session down. Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.is_active() {
            return;
        }

        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }

        self.listening_for_resize = false;

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.dispose();
        }

        if let (Some(scene), Some(renderer)) = (self.scene.as_ref(), self.renderer.as_mut()) {
            let (geometries, materials) = release_scene_resources(scene, renderer);
            log::debug!("Released {} geometries and {} materials", geometries, materials);
        }

        self.scene = None;
        self.camera = None;
        self.renderer = None;
        self.viewport = None;
        self.linkage.clear();
        self.token.deactivate();
        log::info!("Viewer unmounted");
    }
}

impl<B: RenderBackend, S: FrameScheduler> Drop for Session<B, S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Releases each distinct geometry and material in `scene` exactly once
fn release_scene_resources<B: RenderBackend>(scene: &SceneGraph, renderer: &mut B) -> (usize, usize) {
    let mut geometries = BTreeSet::new();
    let mut materials = BTreeSet::new();

    for (_, mesh) in scene.meshes() {
        geometries.insert(mesh.geometry.id());
        materials.extend(mesh.materials.as_slice().iter().map(|m| m.id()));
    }

    for &id in &geometries {
        renderer.release_geometry(id);
    }
    for &id in &materials {
        renderer.release_material(id);
    }
    (geometries.len(), materials.len())
}
