//! # Camera State Module
//!
//! Owns the camera and its controller and reports chunk-grid crossings so
//! the engine knows when to restream the world.

pub mod camera;

use std::time::Duration;

use cgmath::{Deg, Point3};

use crate::engine_state::voxels::World;
use crate::engine_state::PlayerAction;

pub use camera::{Camera, CameraController, Projection};

/// Movement speed in blocks per second.
const CAMERA_SPEED: f32 = 20.0;
/// Mouse look sensitivity.
const CAMERA_SENSITIVITY: f32 = 0.4;

/// Result of a camera update that crossed into a new chunk.
pub struct CameraUpdates {
    pub new_chunk_position: Point3<i32>,
}

/// The camera plus its input accumulator.
pub struct CameraState {
    pub camera: Camera,
    controller: CameraController,
    current_chunk: Point3<i32>,
}

impl CameraState {
    /// Starts the camera above the terrain at the world origin.
    pub fn new() -> Self {
        let camera = Camera::new(Point3::new(8.0, 100.0, 8.0), Deg(-45.0), Deg(-25.0));
        let current_chunk = World::world_to_chunk_f(camera.position);
        Self {
            camera,
            controller: CameraController::new(CAMERA_SPEED, CAMERA_SENSITIVITY),
            current_chunk,
        }
    }

    /// Feeds one frame of player actions into the controller.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        self.controller.intake_actions(actions);
    }

    /// Applies buffered input to the camera. Returns `Some` when the camera
    /// moved into a different chunk.
    pub fn update(&mut self, dt: Duration) -> Option<CameraUpdates> {
        self.camera.apply_controller(&mut self.controller, dt);

        let chunk = World::world_to_chunk_f(self.camera.position);
        if chunk != self.current_chunk {
            self.current_chunk = chunk;
            return Some(CameraUpdates {
                new_chunk_position: chunk,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_reports_chunk_crossings() {
        let mut state = CameraState::new();
        assert!(state.update(Duration::from_millis(16)).is_none());

        state.camera.position.x += 64.0;
        let updates = state.update(Duration::from_millis(16)).unwrap();
        assert_eq!(
            updates.new_chunk_position,
            World::world_to_chunk_f(state.camera.position)
        );
    }
}
