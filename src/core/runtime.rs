//! Frame pipeline
//!
//! [`Runtime`] owns every subsystem and runs the [`FRAME_STAGES`] in order.
//! Each stage is a method so tests can drive them one at a time without a
//! window or a GPU.

use std::path::Path;

use winit::keyboard::KeyCode;

use super::config::EngineConfig;
use super::debug::DebugInfo;
use super::stages::{FRAME_STAGES, FrameStage};
use super::time::Time;
use crate::editor::LevelEditor;
use crate::entity::EntityStore;
use crate::input::{Input, InputDevice};
use crate::level::LevelManager;
use crate::memory::FrameArena;
use crate::renderer::{
    Camera, FlyCamera, FrameBackend, FrameDriver, FrameError, FrameGlobals, FrameReport,
    LightingSystem, MaterialLibrary, MeshLibrary,
};
use crate::world::GameWorld;

/// Key that toggles the debug readout
pub const DEBUG_TOGGLE_KEY: KeyCode = KeyCode::F3;

/// Game logic hooked into the frame pipeline
pub trait Game: 'static {
    /// Register the meshes and materials the game needs. Runs before the
    /// startup level loads, so level files can refer to them by name.
    fn register_assets(&mut self, _world: &mut GameWorld) {}

    /// Called once, after the startup level (if any) is loaded
    fn init(&mut self, ctx: &mut GameContext<'_>);

    /// Game stage
    fn update(&mut self, ctx: &mut GameContext<'_>);

    fn on_resize(&mut self, _ctx: &mut GameContext<'_>, _width: u32, _height: u32) {}

    fn shutdown(&mut self, _ctx: &mut GameContext<'_>) {}
}

/// What game code may touch during a callback
pub struct GameContext<'a> {
    pub time: &'a Time,
    pub input: &'a Input,
    pub camera: &'a mut Camera,
    pub world: &'a mut GameWorld,
    pub levels: &'a mut LevelManager,
    pub lighting: &'a mut LightingSystem,
    pub editor: &'a mut LevelEditor,
    quit: &'a mut bool,
}

impl GameContext<'_> {
    /// Ask the engine to exit after this frame
    pub fn quit(&mut self) {
        *self.quit = true;
    }
}

/// Every subsystem, plus the frame driver that ties them to the GPU
#[derive(Debug)]
pub struct Runtime {
    pub config: EngineConfig,
    pub time: Time,
    pub input: Input,
    pub camera: Camera,
    pub fly: FlyCamera,
    pub world: GameWorld,
    pub levels: LevelManager,
    pub editor: LevelEditor,
    pub lighting: LightingSystem,
    pub debug: DebugInfo,
    arena: FrameArena,
    driver: FrameDriver,
    quit: bool,
}

impl Runtime {
    pub fn new(config: EngineConfig) -> Self {
        let world = GameWorld::new(
            EntityStore::new(config.entity_capacity),
            MeshLibrary::new(config.max_instances_per_mesh, config.frames_in_flight),
            MaterialLibrary::new(),
        );
        let mut camera = Camera::new();
        camera.set_aspect(config.width, config.height);

        Self {
            time: Time::new(),
            input: Input::new(),
            camera,
            fly: FlyCamera::default(),
            world,
            levels: LevelManager::new(config.level_dir.clone()),
            editor: LevelEditor::new(),
            lighting: LightingSystem::new(),
            debug: DebugInfo::new(),
            arena: FrameArena::new(config.frame_arena_bytes),
            driver: FrameDriver::new(config.frames_in_flight),
            quit: false,
            config,
        }
    }

    pub fn context(&mut self) -> GameContext<'_> {
        GameContext {
            time: &self.time,
            input: &self.input,
            camera: &mut self.camera,
            world: &mut self.world,
            levels: &mut self.levels,
            lighting: &mut self.lighting,
            editor: &mut self.editor,
            quit: &mut self.quit,
        }
    }

    /// Register assets (the game's, then the configured files), load the
    /// startup level, then let the game set itself up
    pub fn init<G: Game + ?Sized>(&mut self, game: &mut G, startup_level: Option<&Path>) {
        game.register_assets(&mut self.world);
        self.config.assets.register(&mut self.world);

        if let Some(level) = startup_level {
            match self.levels.load(&mut self.world, level) {
                Ok(_) => self.editor.selected_level_file = level.display().to_string(),
                Err(err) => log::error!("startup level not loaded: {err}"),
            }
        }
        game.init(&mut self.context());
    }

    pub fn resize<G: Game + ?Sized>(&mut self, game: &mut G, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
        game.on_resize(&mut self.context(), width, height);
    }

    pub fn shutdown<G: Game + ?Sized>(&mut self, game: &mut G) {
        game.shutdown(&mut self.context());
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    #[must_use]
    pub fn driver(&self) -> &FrameDriver {
        &self.driver
    }

    /// Run every stage in order. Returns the render stage's report.
    ///
    /// # Errors
    ///
    /// Returns the render stage's error; the stages after it do not run.
    pub fn frame<G, B>(&mut self, game: &mut G, backend: &mut B) -> Result<FrameReport, FrameError>
    where
        G: Game + ?Sized,
        B: FrameBackend + ?Sized,
    {
        let mut report = FrameReport::default();
        for stage in FRAME_STAGES {
            if let Some(rendered) = self.run_stage(stage, game, backend)? {
                report = rendered;
            }
        }
        Ok(report)
    }

    /// Run a single stage
    pub fn run_stage<G, B>(
        &mut self,
        stage: FrameStage,
        game: &mut G,
        backend: &mut B,
    ) -> Result<Option<FrameReport>, FrameError>
    where
        G: Game + ?Sized,
        B: FrameBackend + ?Sized,
    {
        log::trace!("stage {stage}");
        match stage {
            FrameStage::Time => self.stage_time(),
            FrameStage::Input => self.stage_input(),
            FrameStage::Camera => self.stage_camera(),
            FrameStage::Editor => self.stage_editor(),
            FrameStage::Game => self.stage_game(game),
            FrameStage::Render => return self.stage_render(backend).map(Some),
            FrameStage::ClearInput => self.stage_clear_input(),
        }
        Ok(None)
    }

    pub fn stage_time(&mut self) {
        self.time.update();
        self.debug.record_frame(self.time.delta());
    }

    /// Fold queued window events into the input state
    pub fn stage_input(&mut self) {
        self.input.begin_frame();
        if self.input.pressed(InputDevice::Keyboard, DEBUG_TOGGLE_KEY) {
            self.debug.toggle();
        }
    }

    /// Fly the camera unless the editor is holding a selection
    pub fn stage_camera(&mut self) {
        if !self.editor.has_selection() {
            self.fly
                .update(&mut self.camera, &self.input, self.time.delta_seconds());
        }
    }

    pub fn stage_editor(&mut self) {
        self.editor
            .update(&self.input, &mut self.world, &mut self.levels);
    }

    pub fn stage_game<G: Game + ?Sized>(&mut self, game: &mut G) {
        game.update(&mut self.context());
    }

    /// Gather lights, then hand the world to the frame driver
    ///
    /// # Errors
    ///
    /// Returns any fatal error from the backend
    pub fn stage_render<B: FrameBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<FrameReport, FrameError> {
        self.lighting
            .gather_light_sources(&self.world.store, self.world.light_sources().iter());
        let globals = FrameGlobals {
            camera: self.camera.to_uniform(),
            lights: self.lighting.build_storage(),
        };

        let report = self.driver.run_frame(
            backend,
            &mut self.world.meshes,
            &self.world.materials,
            &mut self.arena,
            &globals,
        )?;
        self.debug.record_report(report);
        Ok(report)
    }

    pub fn stage_clear_input(&mut self) {
        self.input.end_frame();
    }
}
