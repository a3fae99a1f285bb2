pub mod animation;
pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod loaders;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod traits;
pub mod types;
pub mod window;

pub use config::ViewerConfig;
pub use error::{LoadError, RenderError, ViewerError};
pub use session::{FrameOutcome, LoadState, Session, SessionToken};
