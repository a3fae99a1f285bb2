pub mod frame;
pub mod renderer;
pub mod window;

pub use frame::*;
pub use renderer::*;
pub use window::*;
