pub mod attach;
pub mod gltf;
pub mod worker;

pub use attach::{attach_model, AttachReport};
pub use gltf::{load_asset, parse_asset, LoadProgress, LoadedModel, MODEL_ROOT_NAME};
pub use worker::{spawn_load, LoadEvent, LoadSink};
