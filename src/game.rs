//! Wall and light placement game
//!
//! `F` drops a wall in front of the camera, `L` drops a light whose color
//! cycles through the lighting palette. Both are disabled while the editor
//! is open. `Escape` quits.

use glam::Vec3;
use winit::keyboard::KeyCode;

use crate::core::{Game, GameContext};
use crate::entity::{EntityHandle, EntityType, LightSourceEntity, Transform};
use crate::input::InputDevice;
use crate::renderer::{BASIC_LIGHTING_PALETTE, Material, MaterialId, MaterialType, MeshId};
use crate::world::GameWorld;

/// Distance in front of the camera where things are placed
pub const PLACE_DISTANCE: f32 = 5.0;

const PLACE_WALL_KEY: KeyCode = KeyCode::KeyF;
const PLACE_LIGHT_KEY: KeyCode = KeyCode::KeyL;
const QUIT_KEY: KeyCode = KeyCode::Escape;

#[derive(Debug, Clone, Copy)]
struct Assets {
    cube: MeshId,
    plane: MeshId,
    sphere: MeshId,
    stone: MaterialId,
    glow: MaterialId,
}

/// The placement game
#[derive(Debug, Default)]
pub struct WallGame {
    assets: Option<Assets>,
    next_light_color: usize,
}

impl WallGame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `distance` units in front of the camera
    fn placement_point(ctx: &GameContext<'_>) -> Vec3 {
        ctx.camera.position + ctx.camera.forward() * PLACE_DISTANCE
    }

    fn place_wall(&self, ctx: &mut GameContext<'_>, assets: Assets) -> Option<EntityHandle> {
        let at = Transform::new(
            Self::placement_point(ctx),
            Vec3::new(0.0, -ctx.camera.yaw() - 90.0, 0.0),
            Vec3::new(2.0, 2.0, 0.25),
        );
        ctx.world
            .spawn(EntityType::Wall, at, Some(assets.cube), Some(assets.stone))
            .inspect_err(|err| log::warn!("wall not placed: {err}"))
            .ok()
    }

    fn place_light(
        &mut self,
        ctx: &mut GameContext<'_>,
        assets: Assets,
        position: Vec3,
    ) -> Option<EntityHandle> {
        let color = BASIC_LIGHTING_PALETTE[self.next_light_color % BASIC_LIGHTING_PALETTE.len()].1;
        self.next_light_color += 1;

        let handle = ctx
            .world
            .spawn(
                EntityType::LightSource,
                Transform::from_position(position),
                Some(assets.sphere),
                Some(assets.glow),
            )
            .inspect_err(|err| log::warn!("light not placed: {err}"))
            .ok()?;
        if let Some(light) = ctx.world.store.get_entity_mut::<LightSourceEntity>(handle) {
            light.color = color;
            light.intensity = 2.0;
        }
        Some(handle)
    }

    fn build_default_scene(&mut self, ctx: &mut GameContext<'_>, assets: Assets) {
        let floor = Transform::new(Vec3::ZERO, Vec3::ZERO, Vec3::new(40.0, 1.0, 40.0));
        let wall = Transform::new(Vec3::new(0.0, 1.0, -6.0), Vec3::ZERO, Vec3::new(6.0, 2.0, 0.25));

        let spawned = [
            ctx.world
                .spawn(EntityType::Floor, floor, Some(assets.plane), Some(assets.stone)),
            ctx.world
                .spawn(EntityType::Wall, wall, Some(assets.cube), Some(assets.stone)),
        ];
        for result in spawned {
            if let Err(err) = result {
                log::warn!("default scene incomplete: {err}");
            }
        }
        self.place_light(ctx, assets, Vec3::new(0.0, 3.0, -3.0));
    }
}

impl Game for WallGame {
    fn register_assets(&mut self, world: &mut GameWorld) {
        if world.meshes.is_empty() {
            world.meshes.add_primitives();
        }
        let (Some(cube), Some(plane), Some(sphere)) = (
            world.meshes.find("Cube"),
            world.meshes.find("Plane"),
            world.meshes.find("Sphere"),
        ) else {
            log::error!("primitive meshes missing, placement disabled");
            return;
        };

        let stone = world
            .materials
            .add(Material::new("Stone", MaterialType::Pbr, Vec3::splat(0.6)));
        let glow = world.materials.add(Material::unlit("Glow", Vec3::ONE));
        world.materials.add_basic_lighting_materials();

        self.assets = Some(Assets {
            cube,
            plane,
            sphere,
            stone,
            glow,
        });
    }

    fn init(&mut self, ctx: &mut GameContext<'_>) {
        if let Some(assets) = self.assets
            && !ctx.levels.is_loaded()
        {
            self.build_default_scene(ctx, assets);
        }
        log::info!("wall game ready: {} entities", ctx.world.store.len());
    }

    fn update(&mut self, ctx: &mut GameContext<'_>) {
        if ctx.input.pressed(InputDevice::Keyboard, QUIT_KEY) {
            ctx.quit();
            return;
        }
        if ctx.editor.is_active() {
            return;
        }
        let Some(assets) = self.assets else {
            return;
        };

        if ctx.input.pressed(InputDevice::Keyboard, PLACE_WALL_KEY) {
            self.place_wall(ctx, assets);
        }
        if ctx.input.pressed(InputDevice::Keyboard, PLACE_LIGHT_KEY) {
            let at = Self::placement_point(ctx);
            self.place_light(ctx, assets, at);
        }
    }

    fn shutdown(&mut self, ctx: &mut GameContext<'_>) {
        log::info!(
            "wall game shutting down with {} walls, {} lights",
            ctx.world.walls().len(),
            ctx.world.light_sources().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineConfig, Runtime};
    use winit::event::ElementState;

    fn runtime() -> Runtime {
        Runtime::new(EngineConfig::default().with_entity_capacity(1_000))
    }

    fn tap(runtime: &mut Runtime, key: KeyCode) {
        runtime.input.end_frame();
        runtime.input.process_keyboard(key, ElementState::Pressed);
    }

    #[test]
    fn test_init_builds_default_scene() {
        let mut runtime = runtime();
        let mut game = WallGame::new();
        runtime.init(&mut game, None);

        assert_eq!(runtime.world.walls().len(), 1);
        assert_eq!(runtime.world.light_sources().len(), 1);
        assert_eq!(runtime.world.store.len(), 3);
        assert!(runtime.world.materials.find("Lighting - Coral").is_some());
    }

    #[test]
    fn test_place_wall_in_front_of_camera() {
        let mut runtime = runtime();
        let mut game = WallGame::new();
        runtime.init(&mut game, None);

        tap(&mut runtime, PLACE_WALL_KEY);
        runtime.stage_game(&mut game);

        assert_eq!(runtime.world.walls().len(), 2);
        let wall = *runtime.world.walls().last().unwrap();
        let expected = runtime.camera.position + runtime.camera.forward() * PLACE_DISTANCE;
        let position = runtime.world.transform(wall).unwrap().position;
        assert!(position.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_light_colors_cycle() {
        let mut runtime = runtime();
        let mut game = WallGame::new();
        runtime.init(&mut game, None);

        tap(&mut runtime, PLACE_LIGHT_KEY);
        runtime.stage_game(&mut game);

        let light = *runtime.world.light_sources().last().unwrap();
        let entity = runtime
            .world
            .store
            .get_entity::<LightSourceEntity>(light)
            .unwrap();
        // The default scene's light took the first palette color.
        assert_eq!(entity.color, BASIC_LIGHTING_PALETTE[1].1);
        assert_eq!(entity.core.material, runtime.world.materials.find("Glow"));
    }

    #[test]
    fn test_placement_disabled_in_editor() {
        let mut runtime = runtime();
        let mut game = WallGame::new();
        runtime.init(&mut game, None);
        runtime.editor.set_active(true);

        tap(&mut runtime, PLACE_WALL_KEY);
        runtime.stage_game(&mut game);
        assert_eq!(runtime.world.walls().len(), 1);
    }

    #[test]
    fn test_escape_quits() {
        let mut runtime = runtime();
        let mut game = WallGame::new();
        runtime.init(&mut game, None);

        tap(&mut runtime, QUIT_KEY);
        runtime.stage_game(&mut game);
        assert!(runtime.should_quit());
    }
}
