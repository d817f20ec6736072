//! # Application State Management
//!
//! The winit application handler: graphics bootstrap, window events, input
//! intake, and the frame cadence (input -> tasks -> redraw).

pub mod graphics_resources_builder;
pub mod input_manager;
pub mod input_state;

use std::sync::Arc;
use std::time::Instant;

use graphics_resources_builder::{GraphicsResult, MaybeGraphics};
use input_manager::InputManager;

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::core::EngineConfig;
use crate::engine_state::EngineState;

/// Top-level application state driven by the event loop.
pub struct ApplicationState {
    /// Graphics bootstrap state machine.
    pub graphics: MaybeGraphics,
    /// The running application, once graphics are ready.
    pub state: Option<InitializedApplicationState>,
    /// Engine configuration resolved at startup.
    pub config: EngineConfig,
}

/// The fully initialized, running application.
pub struct InitializedApplicationState {
    pub engine_state: EngineState,
    pub window: Arc<Window>,
    pub input_manager: InputManager,
    pub last_wait_time: Instant,
}

impl ApplicationState {
    fn initialize_application_state(&mut self, event_loop: &ActiveEventLoop) {
        let MaybeGraphics::Graphics(_) = &self.graphics else {
            return;
        };
        let MaybeGraphics::Graphics(gfx) =
            std::mem::replace(&mut self.graphics, MaybeGraphics::Moved)
        else {
            unreachable!();
        };

        let engine_state = match EngineState::new(
            gfx.surface,
            gfx.surface_config,
            gfx.device,
            gfx.queue,
            gfx.atlas,
            self.config.clone(),
        ) {
            Ok(engine_state) => engine_state,
            Err(error) => {
                log::error!("engine initialization failed: {error}");
                event_loop.exit();
                return;
            }
        };

        self.state = Some(InitializedApplicationState {
            engine_state,
            window: gfx.window,
            input_manager: InputManager::new(),
            last_wait_time: Instant::now(),
        });
    }
}

impl ApplicationHandler<GraphicsResult> for ApplicationState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, result: GraphicsResult) {
        match result {
            Ok(graphics) => {
                self.graphics = MaybeGraphics::Graphics(graphics);
                self.initialize_application_state(event_loop);
            }
            Err(error) => {
                log::error!("graphics initialization failed: {error}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.input_manager.intake_input(&event);

            match event {
                WindowEvent::Resized(size) => {
                    state.engine_state.resize_surface(size);
                }
                WindowEvent::Focused(is_focused) => {
                    if !is_focused {
                        state.input_manager.reset_inputs();
                    }
                }
                WindowEvent::RedrawRequested => {
                    state.engine_state.render();
                }
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => event_loop.exit(),
                _ => (),
            }
        } else if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            if let DeviceEvent::MouseMotion { delta } = event {
                state.input_manager.intake_mouse_motion(delta);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let now = Instant::now();
            let wait_dt = now - state.last_wait_time;
            state.last_wait_time = now;

            if let Some(processed_input) = state.input_manager.get_and_reset_processed_input() {
                state.engine_state.set_input_commands(processed_input);
            }

            state.engine_state.process_input(wait_dt);
            state.engine_state.process_tasks();
            state.window.request_redraw();
        }
    }
}
