//! # Engine State Module
//!
//! The per-frame orchestrator tying the subsystems together. Every frame:
//!
//! 1. Input becomes [`PlayerAction`]s; the camera moves and edit raycasts
//!    apply.
//! 2. The world streams chunks around the camera.
//! 3. Dirty chunks are queued for the mesh workers, nearest first, under the
//!    queue caps.
//! 4. Finished meshes upload to the GPU inside the per-frame time budget.
//! 5. The renderer draws the opaque pass then the water pass.
//!
//! The main thread owns the world map and all GPU resources; workers only
//! ever see chunk handles.

pub mod camera_state;
pub mod meshing;
pub mod rendering;
pub mod voxels;

use std::sync::Arc;
use std::time::{Duration, Instant};

use cgmath::{Deg, MetricSpace, Point3};
use winit::event::MouseScrollDelta;
use winit::keyboard::KeyCode;

use crate::application_state::input_state::ProcessedInputState;
use crate::core::{EngineConfig, EngineError};

use camera_state::{CameraState, Projection};
use meshing::{GpuMesh, MeshJob, MeshWorkerPool, MESH_ENQUEUES_PER_FRAME, MESH_QUEUE_LIMIT};
use rendering::atlas::TextureAtlas;
use rendering::VoxelRenderer;
use voxels::{Voxel, World, CHUNK_HEIGHT, CHUNK_SIZE};

/// How far edit raycasts reach, in blocks.
const EDIT_REACH: f32 = 10.0;
/// Sample spacing along the edit ray.
const RAYCAST_STEP: f32 = 0.05;

/// GPU uploads per frame.
const MAX_UPLOADS_PER_FRAME: usize = 1;
/// Wall-clock budget for the upload stage each frame.
const UPLOAD_TIME_BUDGET: Duration = Duration::from_millis(1);

/// One frame's worth of player intent, derived from raw input.
#[derive(Default)]
pub struct PlayerAction {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,

    /// Mouse-look delta, if the mouse moved.
    pub rotate_view: Option<(f64, f64)>,
    /// Scroll wheel zoom amount.
    pub scroll: Option<f32>,

    /// Remove the first block hit along the view ray.
    pub remove_block: bool,
    /// Place stone in the last open cell before the first hit.
    pub place_block: bool,
}

/// The main state container for the engine.
pub struct EngineState {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    renderer: VoxelRenderer,
    projection: Projection,
    camera_state: CameraState,
    player_actions: PlayerAction,

    world: World,
    mesh_pool: MeshWorkerPool,
}

impl EngineState {
    /// Wires up all subsystems. Fails if renderer resources cannot be
    /// created.
    pub fn new(
        surface: wgpu::Surface<'static>,
        surface_config: wgpu::SurfaceConfiguration,
        device: wgpu::Device,
        queue: wgpu::Queue,
        atlas: TextureAtlas,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let renderer = VoxelRenderer::new(
            &device,
            &queue,
            &surface_config,
            &atlas,
            config.water_frames_per_second,
        )?;

        let projection = Projection::new(
            surface_config.width,
            surface_config.height,
            Deg(45.0),
            0.1,
            1000.0,
        );

        log::info!(
            "world seed {} render distance {} workers {}",
            config.world_seed,
            config.render_distance,
            config.worker_threads
        );

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            renderer,
            projection,
            camera_state: CameraState::new(),
            player_actions: PlayerAction::default(),
            world: World::new(config.world_seed, config.render_distance),
            mesh_pool: MeshWorkerPool::new(config.worker_threads),
        })
    }

    /// Reconfigures the surface and projection after a window resize.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.projection.resize(size.width, size.height);
        self.renderer.resize(&self.device, &self.surface_config);
    }

    /// Translates processed window input into this frame's player actions.
    pub fn set_input_commands(&mut self, input: ProcessedInputState) {
        let mut actions = PlayerAction {
            move_forward: input.get_key_state(KeyCode::KeyW).is_active(),
            move_backward: input.get_key_state(KeyCode::KeyS).is_active(),
            move_left: input.get_key_state(KeyCode::KeyA).is_active(),
            move_right: input.get_key_state(KeyCode::KeyD).is_active(),
            move_up: input.get_key_state(KeyCode::Space).is_active(),
            move_down: input.get_key_state(KeyCode::ShiftLeft).is_active(),
            rotate_view: input.get_mouse_delta(),
            ..Default::default()
        };

        actions.scroll = input.scroll_delta.map(|delta| match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / 20.0,
        });

        // Edits trigger on press, not hold, so one click edits one block.
        actions.remove_block = input
            .get_mouse_button_state(winit::event::MouseButton::Left)
            .is_just_pressed();
        actions.place_block = input
            .get_mouse_button_state(winit::event::MouseButton::Right)
            .is_just_pressed();

        self.player_actions = actions;
    }

    /// Applies input to the camera and performs any requested edits.
    pub fn process_input(&mut self, dt: Duration) {
        self.camera_state.intake_actions(&self.player_actions);
        if let Some(updates) = self.camera_state.update(dt) {
            log::debug!(
                "camera entered chunk ({}, {}, {})",
                updates.new_chunk_position.x,
                updates.new_chunk_position.y,
                updates.new_chunk_position.z
            );
        }

        if self.player_actions.remove_block {
            self.raycast_remove();
        }
        if self.player_actions.place_block {
            self.raycast_place();
        }
    }

    /// Runs the streaming and meshing pipeline for one frame.
    pub fn process_tasks(&mut self) {
        self.renderer.advance_time();
        self.world.update(self.camera_state.camera.position);
        self.schedule_mesh_jobs();
        self.process_uploads();
    }

    /// Renders the current frame.
    pub fn render(&mut self) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(error) => {
                log::error!("failed to acquire frame: {error}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(
            &self.device,
            &self.queue,
            &view,
            self.camera_state.camera.position,
            self.camera_state.camera.calc_matrix(),
            self.projection.calc_matrix(),
            &self.world,
        );

        frame.present();
    }

    /// Queues dirty chunks for the workers, nearest first, respecting the
    /// per-frame and queue-length caps.
    fn schedule_mesh_jobs(&mut self) {
        if self.mesh_pool.queue_len() >= MESH_QUEUE_LIMIT {
            return;
        }

        let camera_position = self.camera_state.camera.position;
        let mut candidates: Vec<(f32, _)> = self
            .world
            .chunks()
            .iter()
            .filter_map(|(position, chunk)| {
                let guard = chunk.get();
                if !guard.needs_mesh_rebuild() || guard.is_meshing {
                    return None;
                }
                let world_position = Point3::new(
                    (position.x * CHUNK_SIZE) as f32,
                    (position.y * CHUNK_HEIGHT) as f32,
                    (position.z * CHUNK_SIZE) as f32,
                );
                Some((camera_position.distance(world_position), chunk.clone()))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.truncate(MESH_ENQUEUES_PER_FRAME);

        for (distance, chunk) in candidates {
            chunk.get_mut().is_meshing = true;
            self.mesh_pool.enqueue(MeshJob { distance, chunk });
        }
    }

    /// Uploads finished meshes under the per-frame budget and releases the
    /// meshing token.
    fn process_uploads(&mut self) {
        let started = Instant::now();
        let mut uploaded = 0;

        while uploaded < MAX_UPLOADS_PER_FRAME && started.elapsed() < UPLOAD_TIME_BUDGET {
            let Some(built) = self.mesh_pool.pop_finished() else {
                break;
            };

            let upload_started = Instant::now();
            let mesh = if built.data.is_empty() {
                None
            } else {
                Some(Arc::new(GpuMesh::upload(&self.device, &built.data)))
            };

            {
                let mut chunk = built.chunk.get_mut();
                chunk.mesh = mesh;
                chunk.is_meshing = false;
            }
            uploaded += 1;

            let upload_time = upload_started.elapsed();
            if upload_time.as_millis() > 2 {
                let position = built.chunk.get().position;
                log::debug!(
                    "slow GPU upload ({:.2}ms) for chunk ({}, {}, {})",
                    upload_time.as_secs_f32() * 1000.0,
                    position.x,
                    position.y,
                    position.z
                );
            }
        }
    }

    /// Removes the first non-air block along the view ray.
    fn raycast_remove(&mut self) {
        let origin = self.camera_state.camera.position;
        let direction = self.camera_state.camera.forward();

        let mut t = 0.0;
        while t < EDIT_REACH {
            let sample = origin + direction * t;
            let block = Point3::new(
                sample.x.floor() as i32,
                sample.y.floor() as i32,
                sample.z.floor() as i32,
            );
            if self.world.voxel(block) != Voxel::Air.id() {
                self.world.set_voxel(block, Voxel::Air.id());
                log::info!("removed block at ({}, {}, {})", block.x, block.y, block.z);
                return;
            }
            t += RAYCAST_STEP;
        }
    }

    /// Places stone in the last air cell before the first non-air hit along
    /// the view ray.
    fn raycast_place(&mut self) {
        let origin = self.camera_state.camera.position;
        let direction = self.camera_state.camera.forward();

        let mut last_air: Option<Point3<i32>> = None;
        let mut t = 0.0;
        while t < EDIT_REACH {
            let sample = origin + direction * t;
            let block = Point3::new(
                sample.x.floor() as i32,
                sample.y.floor() as i32,
                sample.z.floor() as i32,
            );
            if self.world.voxel(block) != Voxel::Air.id() {
                if let Some(target) = last_air {
                    self.world.set_voxel(target, Voxel::Stone.id());
                    log::info!(
                        "placed stone at ({}, {}, {})",
                        target.x,
                        target.y,
                        target.z
                    );
                }
                return;
            }
            last_air = Some(block);
            t += RAYCAST_STEP;
        }
    }
}
