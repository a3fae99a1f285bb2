use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::ViewerError;

pub const DEFAULT_ASSET_PATH: &str = "assets/laptop.glb";
const DEFAULT_BACKGROUND: u32 = 0xf0f0f0;
const INITIAL_WINDOW_WIDTH: u32 = 800;
const INITIAL_WINDOW_HEIGHT: u32 = 600;
/// Largest shadow map edge every wgpu backend accepts by default
pub const MAX_SHADOW_MAP_SIZE: u32 = 8192;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Laptop Viewer".to_string(),
            width: INITIAL_WINDOW_WIDTH,
            height: INITIAL_WINDOW_HEIGHT,
            maximized: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HingeConfig {
    /// Radians removed from the lid angle each frame
    pub step: f32,
    /// Distance kept above -π/2 when the lid stops
    pub floor_margin: f32,
}

impl HingeConfig {
    pub fn validate(&self) -> Result<(), ViewerError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(invalid("hinge.step", format!("{} is not a positive angle", self.step)));
        }
        if !self.floor_margin.is_finite() || self.floor_margin < 0.0 {
            return Err(invalid(
                "hinge.floor_margin",
                format!("{} is not a non-negative angle", self.floor_margin),
            ));
        }
        Ok(())
    }
}

impl Default for HingeConfig {
    fn default() -> Self {
        Self {
            step: 0.005,
            floor_margin: 0.05,
        }
    }
}

/// Viewer settings, read from an optional JSON file and overridden by CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub asset_path: PathBuf,
    /// Background colour as `0xRRGGBB`
    pub background: u32,
    pub shadow_map_size: u32,
    pub window: WindowConfig,
    pub hinge: HingeConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from(DEFAULT_ASSET_PATH),
            background: DEFAULT_BACKGROUND,
            shadow_map_size: 1024,
            window: WindowConfig::default(),
            hinge: HingeConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ViewerError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().inspect_err(|e| log::error!("Rejecting {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Rejects values the hinge or the shadow pass cannot work with
    pub fn validate(&self) -> Result<(), ViewerError> {
        self.hinge.validate()?;
        if !(1..=MAX_SHADOW_MAP_SIZE).contains(&self.shadow_map_size) {
            return Err(invalid(
                "shadow_map_size",
                format!("{} is outside 1..={}", self.shadow_map_size, MAX_SHADOW_MAP_SIZE),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let text = fs::read_to_string(path).map_err(|source| ViewerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }

    /// Reads the config named by `--config` (or defaults) and applies CLI overrides
    pub fn resolve(cli: &Cli) -> Result<Self, ViewerError> {
        let base = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(asset) = &cli.asset {
            self.asset_path = asset.clone();
        }
        if let Some(width) = cli.width {
            self.window.width = width;
        }
        if let Some(height) = cli.height {
            self.window.height = height;
        }
        self.window.maximized |= cli.maximized;
        self
    }
}

fn invalid(field: &'static str, reason: String) -> ViewerError {
    ViewerError::InvalidConfig { field, reason }
}
