//! In-game level editor
//!
//! Selection and transform editing driven by the key bindings, plus queued
//! requests (load/save/create) that are carried out at the end of the
//! editor's update.

use glam::Vec3;

use super::bindings::{EditorAction, KeyBindings};
use crate::entity::{EntityError, EntityHandle, EntityType, LightSourceEntity, Transform};
use crate::input::{Input, InputDevice};
use crate::level::LevelManager;
use crate::world::GameWorld;

/// Default distance moved per frame while a move key is held
pub const DEFAULT_MOVE_SPEED: f32 = 0.1;
/// Default degrees rotated per frame while a rotate key is held
pub const DEFAULT_ROTATE_SPEED: f32 = 5.0;

const MOVE_ACTIONS: [EditorAction; 6] = [
    EditorAction::MoveForward,
    EditorAction::MoveBackward,
    EditorAction::MoveLeft,
    EditorAction::MoveRight,
    EditorAction::MoveUp,
    EditorAction::MoveDown,
];

const ROTATE_ACTIONS: [EditorAction; 4] = [
    EditorAction::YawLeft,
    EditorAction::YawRight,
    EditorAction::PitchUp,
    EditorAction::PitchDown,
];

/// Which transform edits the held keys apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Move and rotate
    #[default]
    Select,
    Move,
    Rotate,
}

impl EditorMode {
    #[must_use]
    pub const fn allows_move(self) -> bool {
        matches!(self, Self::Select | Self::Move)
    }

    #[must_use]
    pub const fn allows_rotate(self) -> bool {
        matches!(self, Self::Select | Self::Rotate)
    }
}

/// What a create-entity request spawns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreationSettings {
    pub kind: EntityType,
    /// Position in the mesh library's list
    pub mesh_index: usize,
    /// Position in the material library's list
    pub material_index: usize,
    pub spawn_position: Vec3,
    /// Only used for light sources
    pub light_color: Vec3,
}

impl Default for CreationSettings {
    fn default() -> Self {
        Self {
            kind: EntityType::Wall,
            mesh_index: 0,
            material_index: 0,
            spawn_position: Vec3::ZERO,
            light_color: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Requests {
    load_level: bool,
    save_level: bool,
    create_level: bool,
    create_entity: bool,
}

/// Editor state
#[derive(Debug)]
pub struct LevelEditor {
    active: bool,
    mode: EditorMode,
    selected: Option<EntityHandle>,
    pub move_speed: f32,
    pub rotate_speed: f32,
    pub bindings: KeyBindings,
    pub creation: CreationSettings,
    /// Level file used by load and save requests
    pub selected_level_file: String,
    /// Name used by create-level requests
    pub new_level_name: String,
    requests: Requests,
}

impl LevelEditor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: false,
            mode: EditorMode::default(),
            selected: None,
            move_speed: DEFAULT_MOVE_SPEED,
            rotate_speed: DEFAULT_ROTATE_SPEED,
            bindings: KeyBindings::with_defaults(),
            creation: CreationSettings::default(),
            selected_level_file: "level.json".to_owned(),
            new_level_name: "new_level".to_owned(),
            requests: Requests::default(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            log::debug!("editor {}", if active { "on" } else { "off" });
        }
        self.active = active;
    }

    pub fn toggle(&mut self) {
        self.set_active(!self.active);
    }

    #[must_use]
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn selected(&self) -> Option<EntityHandle> {
        self.selected
    }

    pub fn select(&mut self, handle: EntityHandle) {
        self.selected = Some(handle);
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Whether the editor is on and holding a selection. The fly camera is
    /// disabled while this is true.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.active && self.selected.is_some()
    }

    pub fn request_load_level(&mut self, file: impl Into<String>) {
        self.selected_level_file = file.into();
        self.requests.load_level = true;
    }

    pub fn request_save_level(&mut self) {
        self.requests.save_level = true;
    }

    pub fn request_create_level(&mut self, name: impl Into<String>) {
        self.new_level_name = name.into();
        self.requests.create_level = true;
    }

    pub fn request_create_entity(&mut self, settings: CreationSettings) {
        self.creation = settings;
        self.requests.create_entity = true;
    }

    /// Editor stage: toggle, selection, transform edits, then requests.
    pub fn update(&mut self, input: &Input, world: &mut GameWorld, levels: &mut LevelManager) {
        if self.triggered(input, EditorAction::Toggle) {
            self.toggle();
            return;
        }

        if let Some(handle) = self.selected
            && !world.store.contains(handle)
        {
            self.selected = None;
        }

        if self.active {
            self.handle_input(input, world);
        }
        self.process_requests(world, levels);
    }

    fn handle_input(&mut self, input: &Input, world: &mut GameWorld) {
        if self.triggered(input, EditorAction::SelectMode) {
            self.mode = EditorMode::Select;
        } else if self.triggered(input, EditorAction::MoveMode) {
            self.mode = EditorMode::Move;
        } else if self.triggered(input, EditorAction::RotateMode) {
            self.mode = EditorMode::Rotate;
        }

        if self.triggered(input, EditorAction::LoadLevel) {
            self.requests.load_level = true;
        }
        if self.triggered(input, EditorAction::SaveLevel) {
            self.requests.save_level = true;
        }
        if self.triggered(input, EditorAction::NewLevel) {
            self.requests.create_level = true;
        }
        if self.triggered(input, EditorAction::CreateEntity) {
            self.requests.create_entity = true;
        }

        if self.triggered(input, EditorAction::CycleSelection) {
            self.cycle_selection(world);
        }

        let Some(handle) = self.selected else {
            return;
        };

        if self.triggered(input, EditorAction::DeleteSelection) {
            world.despawn(handle);
            self.selected = None;
            return;
        }

        let Some(mut transform) = world.transform(handle) else {
            return;
        };
        let mut changed = false;

        if self.mode.allows_move() {
            let direction = self.held_sum(input, &MOVE_ACTIONS, EditorAction::move_direction);
            if direction != Vec3::ZERO {
                transform.translate(direction * self.move_speed);
                changed = true;
            }
        }
        if self.mode.allows_rotate() {
            let axis = self.held_sum(input, &ROTATE_ACTIONS, EditorAction::rotate_direction);
            if axis != Vec3::ZERO {
                transform.rotate_degrees(axis * self.rotate_speed);
                changed = true;
            }
        }

        if changed {
            world.set_transform(handle, transform);
        }
    }

    /// Select the wall after the current selection, wrapping around
    pub fn cycle_selection(&mut self, world: &GameWorld) {
        let walls = world.walls();
        if walls.is_empty() {
            self.selected = None;
            return;
        }
        let next = self
            .selected
            .and_then(|current| walls.position(|&h| h == current))
            .map_or(0, |index| (index + 1) % walls.len());
        self.selected = Some(walls[next]);
    }

    /// Spawn an entity from the creation settings and select it
    ///
    /// # Errors
    ///
    /// Returns an error if the store has no room for the entity
    pub fn create_entity(&mut self, world: &mut GameWorld) -> Result<EntityHandle, EntityError> {
        let settings = self.creation;
        let mesh = world.meshes.id_at(settings.mesh_index);
        let material = world.materials.id_at(settings.material_index);
        let transform = Transform::from_position(settings.spawn_position);

        let handle = world.spawn(settings.kind, transform, mesh, material)?;
        if let Some(light) = world.store.get_entity_mut::<LightSourceEntity>(handle) {
            light.color = settings.light_color;
        }
        self.selected = Some(handle);
        Ok(handle)
    }

    fn process_requests(&mut self, world: &mut GameWorld, levels: &mut LevelManager) {
        let requests = std::mem::take(&mut self.requests);

        if requests.load_level {
            self.selected = None;
            if let Err(err) = levels.load(world, &self.selected_level_file) {
                log::error!("failed to load level: {err}");
            }
        }
        if requests.save_level
            && let Err(err) = levels.save(world, &self.selected_level_file)
        {
            log::error!("failed to save level: {err}");
        }
        if requests.create_level {
            self.selected = None;
            if let Err(err) = levels.new_level(world, &self.new_level_name) {
                log::error!("failed to create level: {err}");
            }
        }
        if requests.create_entity
            && let Err(err) = self.create_entity(world)
        {
            log::warn!("failed to create entity: {err}");
        }
    }

    fn triggered(&self, input: &Input, action: EditorAction) -> bool {
        self.bindings
            .keys(action)
            .iter()
            .any(|&key| input.pressed(InputDevice::Keyboard, key))
    }

    fn held_sum(
        &self,
        input: &Input,
        actions: &[EditorAction],
        direction: fn(EditorAction) -> Option<Vec3>,
    ) -> Vec3 {
        actions
            .iter()
            .filter(|&&action| {
                self.bindings
                    .keys(action)
                    .iter()
                    .any(|&key| input.held(InputDevice::Keyboard, key))
            })
            .filter_map(|&action| direction(action))
            .sum()
    }
}

impl Default for LevelEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityStore;
    use crate::renderer::{MaterialLibrary, MeshLibrary};
    use winit::event::ElementState;
    use winit::keyboard::KeyCode;

    fn world() -> GameWorld {
        let mut meshes = MeshLibrary::new(64, 2);
        meshes.add_primitives();
        let mut materials = MaterialLibrary::new();
        materials.add_basic_lighting_materials();
        GameWorld::new(EntityStore::new(256), meshes, materials)
    }

    fn press(input: &mut Input, key: KeyCode) {
        input.end_frame();
        input.process_keyboard(key, ElementState::Pressed);
    }

    fn release(input: &mut Input, key: KeyCode) {
        input.process_keyboard(key, ElementState::Released);
        input.end_frame();
    }

    fn active_editor(input: &mut Input, world: &mut GameWorld, levels: &mut LevelManager) -> LevelEditor {
        let mut editor = LevelEditor::new();
        press(input, KeyCode::Tab);
        editor.update(input, world, levels);
        release(input, KeyCode::Tab);
        assert!(editor.is_active());
        editor
    }

    #[test]
    fn test_inactive_editor_ignores_input() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();

        let mut editor = LevelEditor::new();
        press(&mut input, KeyCode::Space);
        editor.update(&input, &mut world, &mut levels);
        assert_eq!(editor.selected(), None);
        assert!(!editor.has_selection());
    }

    #[test]
    fn test_toggle_is_edge_triggered() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let mut editor = LevelEditor::new();

        press(&mut input, KeyCode::Tab);
        editor.update(&input, &mut world, &mut levels);
        assert!(editor.is_active());

        // Still held on the next frame
        input.end_frame();
        editor.update(&input, &mut world, &mut levels);
        assert!(editor.is_active());
    }

    #[test]
    fn test_cycle_selection_wraps() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let a = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let b = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);

        let mut picks = Vec::new();
        for _ in 0..3 {
            press(&mut input, KeyCode::Space);
            editor.update(&input, &mut world, &mut levels);
            release(&mut input, KeyCode::Space);
            picks.push(editor.selected().unwrap());
        }
        assert_eq!(picks, vec![a, b, a]);
        assert!(editor.has_selection());
    }

    #[test]
    fn test_held_keys_move_selection() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.select(wall);

        press(&mut input, KeyCode::KeyW);
        editor.update(&input, &mut world, &mut levels);
        input.end_frame();
        editor.update(&input, &mut world, &mut levels);

        let position = world.transform(wall).unwrap().position;
        assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.2), 1e-6));
    }

    #[test]
    fn test_rotate_mode_blocks_movement() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.select(wall);
        editor.set_mode(EditorMode::Rotate);

        press(&mut input, KeyCode::KeyD);
        input.process_keyboard(KeyCode::ArrowRight, ElementState::Pressed);
        editor.update(&input, &mut world, &mut levels);

        let transform = world.transform(wall).unwrap();
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(transform.rotation, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_delete_selection() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.select(wall);

        press(&mut input, KeyCode::Backspace);
        editor.update(&input, &mut world, &mut levels);

        assert_eq!(editor.selected(), None);
        assert!(!world.store.contains(wall));
        assert!(world.walls().is_empty());
    }

    #[test]
    fn test_stale_selection_dropped() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.select(wall);

        world.despawn(wall);
        editor.update(&input, &mut world, &mut levels);
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_create_light_request() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let input = Input::new();
        let mut editor = LevelEditor::new();
        let color = Vec3::new(1.0, 0.2, 0.2);

        editor.request_create_entity(CreationSettings {
            kind: EntityType::LightSource,
            spawn_position: Vec3::new(0.0, 3.0, 0.0),
            light_color: color,
            ..CreationSettings::default()
        });
        editor.update(&input, &mut world, &mut levels);

        let handle = editor.selected().unwrap();
        let light = world.store.get_entity::<LightSourceEntity>(handle).unwrap();
        assert_eq!(light.color, color);
        assert_eq!(light.core.transform.position, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(world.light_sources().len(), 1);

        // Requests are one-shot
        editor.update(&input, &mut world, &mut levels);
        assert_eq!(world.store.len(), 1);
    }

    #[test]
    fn test_save_then_load_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world();
        let mut levels = LevelManager::new(dir.path());
        let mut input = Input::new();
        let at = Vec3::new(1.0, 0.0, 2.0);
        let wall = world
            .spawn(EntityType::Wall, Transform::from_position(at), None, None)
            .unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.selected_level_file = "yard.json".to_owned();

        press(&mut input, KeyCode::KeyP);
        editor.update(&input, &mut world, &mut levels);
        release(&mut input, KeyCode::KeyP);
        assert!(dir.path().join("yard.json").exists());

        world.despawn(wall);
        let prop = world
            .spawn(EntityType::Prop, Transform::IDENTITY, None, None)
            .unwrap();
        editor.select(prop);

        press(&mut input, KeyCode::KeyL);
        editor.update(&input, &mut world, &mut levels);

        assert_eq!(editor.selected(), None);
        assert_eq!(world.store.len(), 1);
        assert_eq!(world.walls().len(), 1);
        assert_eq!(world.transform(world.walls()[0]).unwrap().position, at);
        assert!(levels.is_loaded());
    }

    #[test]
    fn test_new_level_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world();
        let mut levels = LevelManager::new(dir.path());
        let mut input = Input::new();
        world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);
        editor.new_level_name = "arena".to_owned();

        press(&mut input, KeyCode::KeyN);
        editor.update(&input, &mut world, &mut levels);

        assert!(world.store.is_empty());
        assert_eq!(levels.current().name, "arena");
        assert!(dir.path().join("arena.json").exists());
    }

    #[test]
    fn test_failed_load_request_keeps_world() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world();
        let mut levels = LevelManager::new(dir.path());
        let input = Input::new();
        world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();

        let mut editor = LevelEditor::new();
        editor.request_load_level("absent.json");
        editor.update(&input, &mut world, &mut levels);

        assert_eq!(editor.selected_level_file, "absent.json");
        assert_eq!(world.store.len(), 1);
        assert!(!levels.is_loaded());
    }

    #[test]
    fn test_create_key_spawns_and_selects() {
        let mut world = world();
        let mut levels = LevelManager::new("levels");
        let mut input = Input::new();
        let mut editor = active_editor(&mut input, &mut world, &mut levels);

        press(&mut input, KeyCode::KeyC);
        editor.update(&input, &mut world, &mut levels);

        let handle = editor.selected().unwrap();
        assert_eq!(handle.kind(), EntityType::Wall);
        let mesh = world.store.get_dyn(handle).unwrap().mesh().unwrap();
        assert_eq!(world.meshes.name_of(mesh), Some("Cube"));
    }

    #[test]
    fn test_mode_permissions() {
        assert!(EditorMode::Select.allows_move() && EditorMode::Select.allows_rotate());
        assert!(EditorMode::Move.allows_move() && !EditorMode::Move.allows_rotate());
        assert!(!EditorMode::Rotate.allows_move() && EditorMode::Rotate.allows_rotate());
    }
}
