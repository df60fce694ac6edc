//! Level editor
//!
//! Selection and transform editing on top of the [`GameWorld`](crate::world::GameWorld).

mod bindings;
mod level_editor;

pub use bindings::{EditorAction, KeyBindings};
pub use level_editor::{
    CreationSettings, DEFAULT_MOVE_SPEED, DEFAULT_ROTATE_SPEED, EditorMode, LevelEditor,
};
