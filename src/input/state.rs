//! Input state
//!
//! Window events are queued as they arrive and folded into the state once per
//! frame by [`Input::begin_frame`], so every stage of a frame sees the same
//! snapshot.

use std::hash::Hash;

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

use crate::memory::ChunkedArray;

/// Physical device a button belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputDevice {
    Keyboard,
    Mouse,
}

/// A key or mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Key(KeyCode),
    Mouse(MouseButton),
}

impl Button {
    pub fn device(self) -> InputDevice {
        match self {
            Button::Key(_) => InputDevice::Keyboard,
            Button::Mouse(_) => InputDevice::Mouse,
        }
    }
}

impl From<KeyCode> for Button {
    fn from(key: KeyCode) -> Self {
        Button::Key(key)
    }
}

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        Button::Mouse(button)
    }
}

/// Raw event waiting to be folded into the state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyCode, ElementState),
    MouseButton(MouseButton, ElementState),
    CursorMoved(Vec2),
    MouseMotion(Vec2),
    Scroll(Vec2),
}

/// Held plus edge sets for one kind of button
#[derive(Debug)]
struct ButtonSet<T> {
    held: FxHashSet<T>,
    pressed: FxHashSet<T>,
    released: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> ButtonSet<T> {
    fn new() -> Self {
        Self {
            held: FxHashSet::default(),
            pressed: FxHashSet::default(),
            released: FxHashSet::default(),
        }
    }

    fn apply(&mut self, button: T, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Key repeat arrives as extra presses; only the first is an edge.
                if self.held.insert(button) {
                    self.pressed.insert(button);
                }
            }
            ElementState::Released => {
                if self.held.remove(&button) {
                    self.released.insert(button);
                }
            }
        }
    }

    fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

/// Keyboard and mouse state for the current frame
#[derive(Debug)]
pub struct Input {
    keys: ButtonSet<KeyCode>,
    mouse_buttons: ButtonSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    queue: ChunkedArray<InputEvent>,
}

impl Input {
    pub fn new() -> Self {
        Self {
            keys: ButtonSet::new(),
            mouse_buttons: ButtonSet::new(),
            mouse_position: Vec2::ZERO,
            mouse_delta: Vec2::ZERO,
            scroll_delta: Vec2::ZERO,
            queue: ChunkedArray::new(64),
        }
    }

    /// Queue an event for the next [`Input::begin_frame`]
    pub fn push_event(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    /// Number of queued events
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Fold queued events into the state. Edges from the previous frame are
    /// dropped first.
    pub fn begin_frame(&mut self) {
        self.end_frame();
        for i in 0..self.queue.len() {
            let event = self.queue[i];
            self.apply(event);
        }
        self.queue.clear();
    }

    /// Drop per-frame edges and deltas
    pub fn end_frame(&mut self) {
        self.keys.clear_edges();
        self.mouse_buttons.clear_edges();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(key, state) => self.process_keyboard(key, state),
            InputEvent::MouseButton(button, state) => self.process_mouse_button(button, state),
            InputEvent::CursorMoved(position) => self.process_cursor(position),
            InputEvent::MouseMotion(delta) => self.process_mouse_delta(delta),
            InputEvent::Scroll(delta) => self.process_scroll(delta),
        }
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        self.keys.apply(key, state);
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        self.mouse_buttons.apply(button, state);
    }

    /// Absolute cursor position in window pixels
    pub fn process_cursor(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    /// Raw device motion
    pub fn process_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn process_scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    /// Whether `button` on `device` is down
    pub fn held(&self, device: InputDevice, button: impl Into<Button>) -> bool {
        match button.into() {
            Button::Key(key) if device == InputDevice::Keyboard => self.keys.held.contains(&key),
            Button::Mouse(button) if device == InputDevice::Mouse => {
                self.mouse_buttons.held.contains(&button)
            }
            _ => false,
        }
    }

    /// Whether `button` on `device` went down this frame
    pub fn pressed(&self, device: InputDevice, button: impl Into<Button>) -> bool {
        match button.into() {
            Button::Key(key) if device == InputDevice::Keyboard => {
                self.keys.pressed.contains(&key)
            }
            Button::Mouse(button) if device == InputDevice::Mouse => {
                self.mouse_buttons.pressed.contains(&button)
            }
            _ => false,
        }
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.held(InputDevice::Keyboard, key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.pressed(InputDevice::Keyboard, key)
    }

    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keys.released.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.held(InputDevice::Mouse, button)
    }

    pub fn is_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.pressed(InputDevice::Mouse, button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressed_only_on_first_frame() {
        let mut input = Input::new();
        input.push_event(InputEvent::Key(KeyCode::Space, ElementState::Pressed));
        input.begin_frame();
        assert!(input.pressed(InputDevice::Keyboard, KeyCode::Space));
        assert!(input.held(InputDevice::Keyboard, KeyCode::Space));

        input.begin_frame();
        assert!(!input.pressed(InputDevice::Keyboard, KeyCode::Space));
        assert!(input.held(InputDevice::Keyboard, KeyCode::Space));
    }

    #[test]
    fn test_repeat_is_not_an_edge() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.end_frame();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_device_mismatch() {
        let mut input = Input::new();
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.held(InputDevice::Mouse, MouseButton::Left));
        assert!(!input.held(InputDevice::Keyboard, MouseButton::Left));
    }

    #[test]
    fn test_queue_folded_once() {
        let mut input = Input::new();
        input.push_event(InputEvent::MouseMotion(Vec2::new(3.0, 1.0)));
        input.push_event(InputEvent::MouseMotion(Vec2::new(2.0, 1.0)));
        assert_eq!(input.pending_events(), 2);

        input.begin_frame();
        assert_eq!(input.pending_events(), 0);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 2.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_release() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::Tab, ElementState::Pressed);
        input.end_frame();
        input.process_keyboard(KeyCode::Tab, ElementState::Released);
        assert!(input.is_key_just_released(KeyCode::Tab));
        assert!(!input.is_key_pressed(KeyCode::Tab));
    }
}
