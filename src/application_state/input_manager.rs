//! # Input Manager
//!
//! Tracks raw keyboard and mouse state across frames and turns it into
//! per-frame [`ProcessedInputState`] snapshots with press/hold/release
//! transitions.

use std::collections::HashMap;

use winit::{
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::input_state::{MouseInput, ProcessedInputState, RawInputState};

/// The keys the engine cares about; everything else is ignored at intake.
const KEY_CODES: [KeyCode; 6] = [
    KeyCode::KeyW,
    KeyCode::KeyS,
    KeyCode::KeyA,
    KeyCode::KeyD,
    KeyCode::Space,
    KeyCode::ShiftLeft,
];

const MOUSE_BUTTONS: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

/// Accumulates raw input events between frames.
pub struct InputManager {
    keyboard_inputs_old: HashMap<KeyCode, bool>,
    keyboard_inputs_new: HashMap<KeyCode, bool>,
    mouse_inputs: MouseInput,
}

impl InputManager {
    pub fn new() -> Self {
        let mut keyboard_inputs_old = HashMap::new();
        let mut keyboard_inputs_new = HashMap::new();
        for key_code in KEY_CODES {
            keyboard_inputs_old.insert(key_code, false);
            keyboard_inputs_new.insert(key_code, false);
        }

        let mut mouse_button_inputs_old = HashMap::new();
        let mut mouse_button_inputs_new = HashMap::new();
        for button in MOUSE_BUTTONS {
            mouse_button_inputs_old.insert(button, false);
            mouse_button_inputs_new.insert(button, false);
        }

        Self {
            keyboard_inputs_old,
            keyboard_inputs_new,
            mouse_inputs: MouseInput {
                mouse_button_inputs_old,
                mouse_button_inputs_new,
                mouse_scroll_delta: None,
                mouse_delta: None,
            },
        }
    }

    /// Processes one window event into raw state.
    pub fn intake_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => {
                if let Some(key_state) = self.keyboard_inputs_new.get_mut(key) {
                    *key_state = *state == ElementState::Pressed;
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.mouse_inputs.mouse_scroll_delta = Some(*delta);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button_state) =
                    self.mouse_inputs.mouse_button_inputs_new.get_mut(button)
                {
                    *button_state = *state == ElementState::Pressed;
                }
            }
            _ => {}
        }
    }

    /// Records raw mouse motion from a device event.
    pub fn intake_mouse_motion(&mut self, delta: (f64, f64)) {
        self.mouse_inputs.mouse_delta = Some(delta);
    }

    /// Builds this frame's snapshot and rolls current state into previous
    /// state for the next frame's transitions.
    pub fn get_and_reset_processed_input(&mut self) -> Option<ProcessedInputState> {
        let mut keyboard_states = HashMap::new();
        for (key, &new_state) in &self.keyboard_inputs_new {
            let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
            keyboard_states.insert(*key, RawInputState::from_raw_states(old_state, new_state));
        }

        let mut mouse_button_states = HashMap::new();
        for (button, &new_state) in &self.mouse_inputs.mouse_button_inputs_new {
            let old_state = self
                .mouse_inputs
                .mouse_button_inputs_old
                .get(button)
                .copied()
                .unwrap_or(false);
            mouse_button_states.insert(*button, RawInputState::from_raw_states(old_state, new_state));
        }

        let processed = ProcessedInputState {
            keyboard_states,
            mouse_button_states,
            mouse_delta: self.mouse_inputs.mouse_delta,
            scroll_delta: self.mouse_inputs.mouse_scroll_delta,
        };

        self.reset_inputs();
        Some(processed)
    }

    /// Directly sets a key's raw down state; winit events cannot be
    /// constructed outside the event loop.
    #[cfg(test)]
    fn set_key_down(&mut self, key: KeyCode, down: bool) {
        if let Some(state) = self.keyboard_inputs_new.get_mut(&key) {
            *state = down;
        }
    }

    /// Rolls state forward and clears per-frame deltas. Also called when the
    /// window loses focus so keys do not stick.
    pub fn reset_inputs(&mut self) {
        for (key, new_state) in &self.keyboard_inputs_new {
            if let Some(old_state) = self.keyboard_inputs_old.get_mut(key) {
                *old_state = *new_state;
            }
        }
        for (button, new_state) in &self.mouse_inputs.mouse_button_inputs_new {
            if let Some(old_state) = self.mouse_inputs.mouse_button_inputs_old.get_mut(button) {
                *old_state = *new_state;
            }
        }
        self.mouse_inputs.mouse_scroll_delta = None;
        self.mouse_inputs.mouse_delta = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_then_hold_then_release() {
        let mut manager = InputManager::new();
        manager.set_key_down(KeyCode::KeyW, true);

        let first = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(first.get_key_state(KeyCode::KeyW), RawInputState::Pressed);

        // No new events; the key is still down from the previous frame.
        let second = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(second.get_key_state(KeyCode::KeyW), RawInputState::Held);

        manager.set_key_down(KeyCode::KeyW, false);
        let third = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(third.get_key_state(KeyCode::KeyW), RawInputState::Released);
    }

    #[test]
    fn test_mouse_delta_clears_each_frame() {
        let mut manager = InputManager::new();
        manager.intake_mouse_motion((3.0, -2.0));
        let first = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(first.get_mouse_delta(), Some((3.0, -2.0)));

        let second = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(second.get_mouse_delta(), None);
    }
}
