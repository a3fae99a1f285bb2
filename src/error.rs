use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or decoding the model asset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read asset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse glTF asset: {0}")]
    Parse(#[from] gltf::Error),

    #[error("invalid mesh data: {0}")]
    Geometry(String),

    #[error("model could not be attached: {0}")]
    Attach(String),
}

/// Failures of a single frame presentation
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface lost or outdated")]
    SurfaceLost,

    #[error("GPU out of memory")]
    OutOfMemory,

    #[error("render failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no drawing surface available")]
    MissingSurface,

    #[error("failed to initialize renderer: {0}")]
    Renderer(String),

    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}
