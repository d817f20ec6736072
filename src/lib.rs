//! # cubeworld
//!
//! An interactive voxel terrain engine. A deterministic, seed-driven
//! terrain function fills an effectively unbounded blocky world streamed in
//! `16x64x16` chunks around the camera; background workers turn dirty
//! chunks into triangle meshes (nearest first), and the main thread uploads
//! and draws them in two passes (opaque front-to-back, water back-to-front)
//! at interactive rates. Left click removes blocks, right click places
//! stone.
//!
//! ## Modules
//!
//! * `application_state` - windowing, graphics bootstrap, input
//! * `core` - shared primitives, errors, configuration
//! * `engine_state` - the engine: voxels, meshing, rendering, camera

use application_state::{
    graphics_resources_builder::{GraphicsBuilder, MaybeGraphics},
    ApplicationState,
};
use winit::event_loop::EventLoop;

pub mod application_state;
pub mod core;
pub mod engine_state;

use crate::core::{EngineConfig, EngineError};

/// Runs the engine until the window closes.
///
/// Initialization failures (no adapter, missing textures, shader errors)
/// are returned; steady-state problems are logged and retried internally.
pub fn run() -> Result<(), EngineError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let config = EngineConfig::from_env();
    log::info!("starting cubeworld with {config:?}");

    let event_loop = EventLoop::with_user_event()
        .build()
        .map_err(|e| EngineError::Window(e.to_string()))?;

    let mut state = ApplicationState {
        graphics: MaybeGraphics::Builder(GraphicsBuilder::new(event_loop.create_proxy())),
        state: None,
        config,
    };

    event_loop
        .run_app(&mut state)
        .map_err(|e| EngineError::Window(e.to_string()))
}
