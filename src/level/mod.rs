//! Levels
//!
//! JSON level files and the manager that loads them into the world.

mod format;
mod manager;

pub use format::{DEFAULT_LEVEL_NAME, DEFAULT_LEVEL_VERSION, EntityRecord, LevelDocument};
pub use manager::{LevelError, LevelInfo, LevelManager, LoadReport, MAX_LEVEL_ENTITIES};
