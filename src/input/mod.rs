//! Keyboard and mouse input
//!
//! Exposes held and edge-triggered pressed queries per device.

mod state;

pub use state::{Button, Input, InputDevice, InputEvent};
