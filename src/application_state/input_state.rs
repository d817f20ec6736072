//! # Input State
//!
//! State types shared between the input manager and the engine.

use std::collections::HashMap;
use winit::{
    event::{MouseButton, MouseScrollDelta},
    keyboard::KeyCode,
};

/// State transition of a key or button over one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawInputState {
    /// Not pressed.
    #[default]
    NotPressed,
    /// Went down this frame.
    Pressed,
    /// Held from an earlier frame.
    Held,
    /// Went up this frame.
    Released,
}

impl RawInputState {
    /// Down in any form (pressed or held).
    pub fn is_active(&self) -> bool {
        matches!(self, RawInputState::Pressed | RawInputState::Held)
    }

    /// Went down exactly this frame.
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, RawInputState::Pressed)
    }

    /// Derives the transition from last frame's and this frame's raw down
    /// state.
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => RawInputState::Pressed,
            (true, true) => RawInputState::Held,
            (true, false) => RawInputState::Released,
            (false, false) => RawInputState::NotPressed,
        }
    }
}

/// One frame's processed input snapshot handed to the engine.
pub struct ProcessedInputState {
    /// Transition state per tracked key.
    pub keyboard_states: HashMap<KeyCode, RawInputState>,
    /// Transition state per mouse button.
    pub mouse_button_states: HashMap<MouseButton, RawInputState>,
    /// Mouse movement since last frame.
    pub mouse_delta: Option<(f64, f64)>,
    /// Scroll wheel movement since last frame.
    pub scroll_delta: Option<MouseScrollDelta>,
}

impl ProcessedInputState {
    pub fn get_key_state(&self, key: KeyCode) -> RawInputState {
        self.keyboard_states.get(&key).copied().unwrap_or_default()
    }

    pub fn get_mouse_button_state(&self, button: MouseButton) -> RawInputState {
        self.mouse_button_states
            .get(&button)
            .copied()
            .unwrap_or_default()
    }

    pub fn get_mouse_delta(&self) -> Option<(f64, f64)> {
        self.mouse_delta
    }
}

/// Raw mouse input between frames.
pub struct MouseInput {
    pub mouse_button_inputs_old: HashMap<MouseButton, bool>,
    pub mouse_button_inputs_new: HashMap<MouseButton, bool>,
    pub mouse_scroll_delta: Option<MouseScrollDelta>,
    pub mouse_delta: Option<(f64, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert_eq!(
            RawInputState::from_raw_states(false, true),
            RawInputState::Pressed
        );
        assert_eq!(
            RawInputState::from_raw_states(true, true),
            RawInputState::Held
        );
        assert_eq!(
            RawInputState::from_raw_states(true, false),
            RawInputState::Released
        );
        assert_eq!(
            RawInputState::from_raw_states(false, false),
            RawInputState::NotPressed
        );
    }

    #[test]
    fn test_active_and_just_pressed() {
        assert!(RawInputState::Pressed.is_active());
        assert!(RawInputState::Held.is_active());
        assert!(!RawInputState::Released.is_active());
        assert!(RawInputState::Pressed.is_just_pressed());
        assert!(!RawInputState::Held.is_just_pressed());
    }
}
