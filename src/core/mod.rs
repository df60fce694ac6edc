//! Core engine module
//!
//! Configuration, timing, the staged frame pipeline and the winit shell
//! around it.

mod config;
mod debug;
mod engine;
mod runtime;
mod stages;
mod time;

pub use config::{ConfigError, EngineConfig};
pub use debug::{DebugInfo, FRAME_TIME_WINDOW, FrameStats};
pub use engine::Engine;
pub use runtime::{DEBUG_TOGGLE_KEY, Game, GameContext, Runtime};
pub use stages::{FRAME_STAGES, FrameStage};
pub use time::{MAX_DELTA, Time};
