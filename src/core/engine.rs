//! Window and event loop

use std::path::PathBuf;
use std::sync::Arc;

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use super::config::EngineConfig;
use super::runtime::{Game, Runtime};
use crate::input::InputEvent;
use crate::renderer::{FrameError, Renderer};

/// Main engine struct
pub struct Engine<G: Game> {
    game: G,
    runtime: Runtime,
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    startup_level: Option<PathBuf>,
    initialized: bool,
    fatal: Option<FrameError>,
}

impl<G: Game> Engine<G> {
    pub fn new(config: EngineConfig, game: G) -> Self {
        Self {
            game,
            runtime: Runtime::new(config),
            renderer: None,
            window: None,
            startup_level: None,
            initialized: false,
            fatal: None,
        }
    }

    /// Level loaded before the game's `init`
    pub fn with_startup_level(mut self, level: impl Into<PathBuf>) -> Self {
        self.startup_level = Some(level.into());
        self
    }

    /// Run the engine until the window closes, the game quits, or the
    /// renderer fails.
    ///
    /// # Errors
    ///
    /// Returns event loop errors and fatal render errors
    pub fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::init();
        log::info!("Starting engine: {}", self.runtime.config.title);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.fatal.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: FrameError) {
        log::error!("fatal render error: {err}");
        self.fatal = Some(err);
        if self.initialized {
            self.runtime.shutdown(&mut self.game);
        }
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.sync_resources(
            &mut self.runtime.world.meshes,
            &mut self.runtime.world.materials,
        );

        if let Err(err) = self.runtime.frame(&mut self.game, renderer) {
            self.fail(event_loop, err);
            return;
        }

        if self.runtime.should_quit() {
            log::info!("Game requested quit");
            self.runtime.shutdown(&mut self.game);
            event_loop.exit();
            return;
        }

        if let Some(window) = &self.window {
            if self.runtime.debug.enabled {
                let summary = self.runtime.debug.summary(self.runtime.world.store.len());
                window.set_title(&format!("{} | {summary}", self.runtime.config.title));
            }
            window.request_redraw();
        }
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let config = &self.runtime.config;
        let window_attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        let renderer = pollster::block_on(Renderer::new(
            Arc::clone(&window),
            config.vsync,
            config.frames_in_flight,
        ));
        match renderer {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => {
                self.fail(event_loop, err);
                return;
            }
        }
        self.window = Some(window);

        if !self.initialized {
            let startup_level = self.startup_level.clone();
            self.runtime.init(&mut self.game, startup_level.as_deref());
            self.initialized = true;
            log::info!("Engine initialized successfully");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.runtime.shutdown(&mut self.game);
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(new_size.width, new_size.height);
                    }
                    self.runtime
                        .resize(&mut self.game, new_size.width, new_size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.runtime.input.push_event(InputEvent::Key(key, event.state));
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.runtime.input.push_event(InputEvent::MouseButton(button, state));
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.runtime.input.push_event(InputEvent::CursorMoved(Vec2::new(
                    position.x as f32,
                    position.y as f32,
                )));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y),
                    MouseScrollDelta::PixelDelta(pos) => Vec2::new(pos.x as f32, pos.y as f32),
                };
                self.runtime.input.push_event(InputEvent::Scroll(scroll));
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.runtime
                .input
                .push_event(InputEvent::MouseMotion(Vec2::new(delta.0 as f32, delta.1 as f32)));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
