//! A small 3D engine with a level editor, built in Rust
//!
//! This engine provides:
//! - Type-segmented entity storage behind generation-checked handles
//! - Per-mesh instance tables drawn as one instanced call per material
//! - A frame driver with explicit frames-in-flight over wgpu
//! - JSON levels and an in-game editor

pub mod assets;
pub mod core;
pub mod editor;
pub mod entity;
pub mod game;
pub mod input;
pub mod level;
pub mod memory;
pub mod renderer;
pub mod world;

// Re-exports for convenience
pub use glam;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::AssetManifest;
    pub use crate::core::{DebugInfo, Engine, EngineConfig, FrameStats, Game, GameContext, Runtime};
    pub use crate::editor::{EditorMode, LevelEditor};
    pub use crate::entity::{EntityHandle, EntityStore, EntityType, Transform};
    pub use crate::game::WallGame;
    pub use crate::input::{Input, InputDevice};
    pub use crate::level::{LevelError, LevelManager};
    pub use crate::renderer::{
        Camera, FrameBackend, FrameDriver, LightingSystem, Material, MaterialId, MeshId,
        MeshLibrary, Renderer,
    };
    pub use crate::world::GameWorld;
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
