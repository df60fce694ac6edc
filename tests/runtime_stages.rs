//! The frame pipeline driven stage by stage against a recording backend

use brickyard::core::{EngineConfig, FRAME_STAGES, FrameStage, Game, GameContext, Runtime};
use brickyard::entity::{EntityType, Transform};
use brickyard::glam::Vec3;
use brickyard::input::InputEvent;
use brickyard::renderer::{
    AcquireStatus, DrawBatch, FrameBackend, FrameError, FrameGlobals, InstancedData, Material,
    Mesh, PresentStatus,
};
use brickyard::winit::event::ElementState;
use brickyard::winit::keyboard::KeyCode;

#[derive(Debug, Default)]
struct RecordingBackend {
    frames: usize,
    uploads: usize,
    draws: Vec<(String, String, u32)>,
    lights_seen: u32,
    acquire_out_of_date: bool,
}

impl FrameBackend for RecordingBackend {
    fn wait_for_slot(&mut self, _slot: usize) -> Result<(), FrameError> {
        Ok(())
    }

    fn acquire_image(&mut self) -> Result<AcquireStatus, FrameError> {
        if std::mem::take(&mut self.acquire_out_of_date) {
            Ok(AcquireStatus::OutOfDate)
        } else {
            Ok(AcquireStatus::Ready)
        }
    }

    fn recreate_swapchain(&mut self) {}

    fn begin_recording(&mut self, _slot: usize, globals: &FrameGlobals) -> Result<(), FrameError> {
        self.lights_seen = globals.lights.num_lights;
        Ok(())
    }

    fn upload_instances(&mut self, _slot: usize, _mesh: &Mesh, _instances: &[InstancedData]) {
        self.uploads += 1;
    }

    fn draw(&mut self, _slot: usize, mesh: &Mesh, material: &Material, batch: DrawBatch) {
        self.draws
            .push((mesh.name.clone(), material.name.clone(), batch.instance_count));
    }

    fn submit_and_present(&mut self, _slot: usize) -> Result<PresentStatus, FrameError> {
        self.frames += 1;
        Ok(PresentStatus::Presented)
    }
}

#[derive(Debug, Default)]
struct CountingGame {
    updates: u32,
    saw_space: bool,
}

impl Game for CountingGame {
    fn init(&mut self, ctx: &mut GameContext<'_>) {
        ctx.world.meshes.add_primitives();
        ctx.world.materials.add_basic_lighting_materials();
    }

    fn update(&mut self, ctx: &mut GameContext<'_>) {
        self.updates += 1;
        self.saw_space |= ctx.input.is_key_just_pressed(KeyCode::Space);
    }
}

fn setup() -> (Runtime, CountingGame) {
    let mut runtime = Runtime::new(EngineConfig::default().with_entity_capacity(256));
    let mut game = CountingGame::default();
    runtime.init(&mut game, None);
    (runtime, game)
}

#[test]
fn full_frame_draws_each_pair_once() {
    let (mut runtime, mut game) = setup();
    let coral = runtime.world.materials.find("Lighting - Coral");
    let red = runtime.world.materials.find("Lighting - Red");
    let cube = runtime.world.meshes.find("Cube");
    for (i, material) in [coral, red, coral].into_iter().enumerate() {
        let at = Transform::from_position(Vec3::X * i as f32);
        runtime
            .world
            .spawn(EntityType::Wall, at, cube, material)
            .unwrap();
    }

    let mut backend = RecordingBackend::default();
    let report = runtime.frame(&mut game, &mut backend).unwrap();

    assert_eq!(game.updates, 1);
    assert_eq!(report.draw_calls, 2);
    assert_eq!(report.instances, 3);
    assert_eq!(backend.uploads, 1);
    let mut draws = backend.draws.clone();
    draws.sort();
    assert_eq!(
        draws,
        vec![
            ("Cube".to_owned(), "Lighting - Coral".to_owned(), 2),
            ("Cube".to_owned(), "Lighting - Red".to_owned(), 1),
        ]
    );
    assert_eq!(runtime.debug.last_report(), &report);
}

#[test]
fn queued_events_reach_the_game_stage_once() {
    let (mut runtime, mut game) = setup();
    let mut backend = RecordingBackend::default();
    runtime
        .input
        .push_event(InputEvent::Key(KeyCode::Space, ElementState::Pressed));

    for stage in FRAME_STAGES {
        runtime.run_stage(stage, &mut game, &mut backend).unwrap();
        if stage == FrameStage::Input {
            assert_eq!(runtime.input.pending_events(), 0);
        }
    }
    assert!(game.saw_space);
    assert!(!runtime.input.is_key_just_pressed(KeyCode::Space));
    assert!(runtime.input.is_key_pressed(KeyCode::Space));
}

#[test]
fn light_sources_reach_the_frame_globals() {
    let (mut runtime, _game) = setup();
    for x in [0.0, 4.0] {
        runtime
            .world
            .spawn(
                EntityType::LightSource,
                Transform::from_position(Vec3::new(x, 3.0, 0.0)),
                None,
                None,
            )
            .unwrap();
    }

    let mut backend = RecordingBackend::default();
    runtime.stage_render(&mut backend).unwrap();
    assert_eq!(backend.lights_seen, 2);
}

#[test]
fn skipped_frame_does_not_advance() {
    let (mut runtime, mut game) = setup();
    let mut backend = RecordingBackend {
        acquire_out_of_date: true,
        ..RecordingBackend::default()
    };

    let report = runtime.frame(&mut game, &mut backend).unwrap();
    assert!(report.skipped);
    assert_eq!(runtime.driver().frame_counter(), 0);
    assert_eq!(runtime.debug.skipped_frames(), 1);

    let report = runtime.frame(&mut game, &mut backend).unwrap();
    assert!(!report.skipped);
    assert_eq!(runtime.driver().frame_counter(), 1);
}

#[test]
fn camera_stays_put_while_editor_holds_selection() {
    let (mut runtime, _game) = setup();
    let wall = runtime
        .world
        .spawn(EntityType::Wall, Transform::IDENTITY, None, None)
        .unwrap();
    runtime.editor.set_active(true);
    runtime.editor.select(wall);
    let before = runtime.camera.position;

    runtime
        .input
        .push_event(InputEvent::Key(KeyCode::KeyW, ElementState::Pressed));
    runtime.stage_time();
    runtime.stage_input();
    runtime.stage_camera();
    runtime.stage_editor();

    assert_eq!(runtime.camera.position, before);
    let moved = runtime.world.transform(wall).unwrap().position;
    assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, 0.1), 1e-6));
}
