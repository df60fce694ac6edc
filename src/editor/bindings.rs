//! Editor key bindings
//!
//! Physical keys map to [`EditorAction`]s so the editor logic never names a
//! key directly. Several keys may trigger one action; each key triggers at
//! most one.

use glam::Vec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use winit::keyboard::KeyCode;

// ============================================================================
// Editor Actions
// ============================================================================

/// What the user asked the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorAction {
    /// Turn the editor on or off
    Toggle,
    /// Select the next wall
    CycleSelection,
    /// Delete the selected entity
    DeleteSelection,
    /// Spawn an entity from the creation settings
    CreateEntity,

    /// Reload the selected level file
    LoadLevel,
    /// Write the world to the selected level file
    SaveLevel,
    /// Start an empty level under the new-level name
    NewLevel,

    SelectMode,
    MoveMode,
    RotateMode,

    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,

    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
}

impl EditorAction {
    /// Direction applied each frame while a move action is held
    #[must_use]
    pub const fn move_direction(self) -> Option<Vec3> {
        match self {
            Self::MoveForward => Some(Vec3::Z),
            Self::MoveBackward => Some(Vec3::NEG_Z),
            Self::MoveLeft => Some(Vec3::X),
            Self::MoveRight => Some(Vec3::NEG_X),
            Self::MoveUp => Some(Vec3::Y),
            Self::MoveDown => Some(Vec3::NEG_Y),
            _ => None,
        }
    }

    /// Euler axis and sign applied each frame while a rotate action is held
    #[must_use]
    pub const fn rotate_direction(self) -> Option<Vec3> {
        match self {
            Self::YawLeft => Some(Vec3::NEG_Y),
            Self::YawRight => Some(Vec3::Y),
            Self::PitchUp => Some(Vec3::NEG_X),
            Self::PitchDown => Some(Vec3::X),
            _ => None,
        }
    }
}

// ============================================================================
// Key Bindings
// ============================================================================

/// Two-way key/action table.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    by_key: FxHashMap<KeyCode, EditorAction>,
    by_action: FxHashMap<EditorAction, SmallVec<[KeyCode; 2]>>,
}

impl KeyBindings {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_key: FxHashMap::default(),
            by_action: FxHashMap::default(),
        }
    }

    /// The default editor layout
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut bindings = Self::new();

        bindings.bind(KeyCode::Tab, EditorAction::Toggle);
        bindings.bind(KeyCode::Space, EditorAction::CycleSelection);
        bindings.bind(KeyCode::Backspace, EditorAction::DeleteSelection);
        bindings.bind(KeyCode::KeyC, EditorAction::CreateEntity);

        bindings.bind(KeyCode::KeyL, EditorAction::LoadLevel);
        bindings.bind(KeyCode::KeyP, EditorAction::SaveLevel);
        bindings.bind(KeyCode::KeyN, EditorAction::NewLevel);

        bindings.bind(KeyCode::Digit1, EditorAction::SelectMode);
        bindings.bind(KeyCode::Digit2, EditorAction::MoveMode);
        bindings.bind(KeyCode::Digit3, EditorAction::RotateMode);

        bindings.bind(KeyCode::KeyW, EditorAction::MoveForward);
        bindings.bind(KeyCode::KeyS, EditorAction::MoveBackward);
        bindings.bind(KeyCode::KeyA, EditorAction::MoveLeft);
        bindings.bind(KeyCode::KeyD, EditorAction::MoveRight);
        bindings.bind(KeyCode::KeyE, EditorAction::MoveUp);
        bindings.bind(KeyCode::KeyQ, EditorAction::MoveDown);

        bindings.bind(KeyCode::ArrowLeft, EditorAction::YawLeft);
        bindings.bind(KeyCode::ArrowRight, EditorAction::YawRight);
        bindings.bind(KeyCode::ArrowUp, EditorAction::PitchUp);
        bindings.bind(KeyCode::ArrowDown, EditorAction::PitchDown);

        bindings
    }

    /// Bind `key` to `action`, replacing whatever the key did before
    pub fn bind(&mut self, key: KeyCode, action: EditorAction) {
        self.unbind(key);
        self.by_key.insert(key, action);
        self.by_action.entry(action).or_default().push(key);
    }

    pub fn unbind(&mut self, key: KeyCode) {
        if let Some(old) = self.by_key.remove(&key)
            && let Some(keys) = self.by_action.get_mut(&old)
        {
            keys.retain(|k| *k != key);
        }
    }

    #[must_use]
    pub fn action(&self, key: KeyCode) -> Option<EditorAction> {
        self.by_key.get(&key).copied()
    }

    /// Keys bound to `action`, in binding order
    #[must_use]
    pub fn keys(&self, action: EditorAction) -> &[KeyCode] {
        self.by_action.get(&action).map_or(&[], |keys| keys.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyCode, EditorAction)> + '_ {
        self.by_key.iter().map(|(&key, &action)| (key, action))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bindings = KeyBindings::with_defaults();
        assert_eq!(bindings.action(KeyCode::Tab), Some(EditorAction::Toggle));
        assert_eq!(bindings.action(KeyCode::KeyP), Some(EditorAction::SaveLevel));
        assert_eq!(bindings.keys(EditorAction::LoadLevel), &[KeyCode::KeyL]);
        assert_eq!(bindings.keys(EditorAction::MoveForward), &[KeyCode::KeyW]);
        assert_eq!(bindings.action(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_rebind_moves_key() {
        let mut bindings = KeyBindings::with_defaults();
        bindings.bind(KeyCode::KeyW, EditorAction::MoveUp);

        assert_eq!(bindings.action(KeyCode::KeyW), Some(EditorAction::MoveUp));
        assert!(bindings.keys(EditorAction::MoveForward).is_empty());
        assert_eq!(
            bindings.keys(EditorAction::MoveUp),
            &[KeyCode::KeyE, KeyCode::KeyW]
        );
    }

    #[test]
    fn test_unbind() {
        let mut bindings = KeyBindings::with_defaults();
        bindings.unbind(KeyCode::Space);
        assert_eq!(bindings.action(KeyCode::Space), None);
        assert!(bindings.keys(EditorAction::CycleSelection).is_empty());
    }

    #[test]
    fn test_directions() {
        assert_eq!(EditorAction::MoveLeft.move_direction(), Some(Vec3::X));
        assert_eq!(EditorAction::MoveDown.move_direction(), Some(Vec3::NEG_Y));
        assert_eq!(EditorAction::PitchUp.rotate_direction(), Some(Vec3::NEG_X));
        assert_eq!(EditorAction::Toggle.move_direction(), None);
    }
}
