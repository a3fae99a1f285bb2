use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window as WinitWindow, WindowId},
};

use laptop_viewer::cli::Cli;
use laptop_viewer::loaders::{spawn_load, LoadEvent, LoadSink};
use laptop_viewer::renderer::WgpuRenderer;
use laptop_viewer::window::{Window, WindowFrameScheduler};
use laptop_viewer::{LoadError, Session, ViewerConfig};

const FPS_UPDATE_INTERVAL: f32 = 1.0;

type ViewerSession = Session<WgpuRenderer, WindowFrameScheduler>;

/// Events injected into the winit loop from outside the event thread
#[derive(Debug)]
enum ViewerEvent {
    Load(LoadEvent),
}

/// Forwards loader messages into the event loop
struct ProxySink(EventLoopProxy<ViewerEvent>);

impl LoadSink for ProxySink {
    fn deliver(&self, event: LoadEvent) -> bool {
        self.0.send_event(ViewerEvent::Load(event)).is_ok()
    }
}

struct ViewerApp {
    config: ViewerConfig,
    proxy: EventLoopProxy<ViewerEvent>,
    window: Option<Window>,
    session: Option<ViewerSession>,
    last_frame_time: Instant,
    frame_count: u32,
    fps_update_timer: f32,
}

impl ViewerApp {
    fn new(config: ViewerConfig, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        Self {
            config,
            proxy,
            window: None,
            session: None,
            last_frame_time: Instant::now(),
            frame_count: 0,
            fps_update_timer: 0.0,
        }
    }

    fn update_fps(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.frame_count += 1;
        self.fps_update_timer += delta;
        if self.fps_update_timer >= FPS_UPDATE_INTERVAL {
            log::debug!("FPS: {:.1}", self.frame_count as f32 / self.fps_update_timer);
            self.frame_count = 0;
            self.fps_update_timer = 0.0;
        }
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = WinitWindow::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_maximized(self.config.window.maximized);

        let window = match event_loop.create_window(attributes) {
            Ok(w) => Window::new(Arc::new(w)),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let surface = window.inner();
        let mut session = match Session::mount(
            Some(window.viewport()),
            self.config.clone(),
            window.scheduler(),
            |settings| pollster::block_on(WgpuRenderer::new(surface.clone(), settings)),
        ) {
            Ok(session) => session,
            Err(e) => {
                log::error!("Failed to mount viewer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let path = session.asset_path().to_path_buf();
        if let Err(source) = spawn_load(path.clone(), session.token(), ProxySink(self.proxy.clone())) {
            session.on_asset_loaded(Err(LoadError::Io { path, source }));
        }

        self.window = Some(window);
        self.session = Some(session);
    }

    fn unmount(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.unmount();
        }
        self.window = None;
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_none() {
            self.mount(event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                self.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(session), Some(window)) = (&mut self.session, &self.window) {
                    session.on_resize(window.viewport());
                }
            }
            WindowEvent::RedrawRequested => {
                self.update_fps();
                if let Some(session) = &mut self.session {
                    session.on_frame();
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        let Some(session) = &mut self.session else {
            return;
        };
        match event {
            ViewerEvent::Load(LoadEvent::Progress(progress)) => session.on_asset_progress(progress),
            ViewerEvent::Load(LoadEvent::Finished(result)) => session.on_asset_loaded(result),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.unmount();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ViewerConfig::resolve(&cli)?;

    let event_loop = EventLoop::<ViewerEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = ViewerApp::new(config, event_loop.create_proxy());

    log::info!("Laptop viewer - Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
