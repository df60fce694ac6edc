//! Engine configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::AssetManifest;
use crate::entity::DEFAULT_ENTITY_CAPACITY;
use crate::renderer::{DEFAULT_FRAMES_IN_FLIGHT, DEFAULT_MAX_INSTANCES};

/// Errors reading or writing a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

/// Engine configuration. Missing fields in a config file take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Entity slots in the store
    pub entity_capacity: usize,
    /// Frames the CPU may record ahead of the GPU
    pub frames_in_flight: usize,
    /// Instance table size of every mesh
    pub max_instances_per_mesh: usize,
    /// Initial size of the per-frame staging arena
    pub frame_arena_bytes: usize,
    /// Directory relative level paths are resolved against
    pub level_dir: PathBuf,
    /// Mesh and texture files registered before the startup level
    pub assets: AssetManifest,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Brickyard"),
            width: 1280,
            height: 720,
            vsync: true,
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            max_instances_per_mesh: DEFAULT_MAX_INSTANCES,
            frame_arena_bytes: 1 << 20,
            level_dir: PathBuf::from("levels"),
            assets: AssetManifest::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Clamped to at least one
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }

    pub fn with_max_instances_per_mesh(mut self, max: usize) -> Self {
        self.max_instances_per_mesh = max;
        self
    }

    pub fn with_level_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.level_dir = dir.into();
        self
    }

    pub fn with_assets(mut self, assets: AssetManifest) -> Self {
        self.assets = assets;
        self
    }

    /// Load a RON config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut config: Self = ron::from_str(&text)?;
        config.frames_in_flight = config.frames_in_flight.max(1);
        Ok(config)
    }

    /// Save as a RON config file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }
}
