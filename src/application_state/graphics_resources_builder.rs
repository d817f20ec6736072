//! # Graphics Resources Builder
//!
//! Creates the window, WebGPU surface/device/queue, and the block texture
//! atlas. Creation happens off the event-loop callback via a future that is
//! blocked on and delivered back through the event-loop proxy, keeping the
//! `ApplicationHandler` free of async plumbing.

use std::path::Path;
use std::sync::Arc;

use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::{
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

use crate::core::EngineError;
use crate::engine_state::rendering::atlas::{load_block_atlas, TextureAtlas};

/// Where the block tile PNGs live, relative to the working directory.
const TEXTURE_DIR: &str = "assets/textures";

/// Everything the engine needs from the platform layer.
pub struct Graphics {
    pub window: Arc<Window>,
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
    pub atlas: TextureAtlas,
}

/// Outcome of graphics initialization, delivered as a user event.
pub type GraphicsResult = Result<Graphics, EngineError>;

/// The graphics initialization lifecycle.
pub enum MaybeGraphics {
    /// Waiting for the event loop to resume.
    Builder(GraphicsBuilder),
    /// Resources ready, engine not constructed yet.
    Graphics(Graphics),
    /// Resources handed off to the engine.
    Moved,
}

/// Builds graphics resources once and sends them to the event loop.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<GraphicsResult>>,
}

impl GraphicsBuilder {
    pub fn new(event_loop_proxy: EventLoopProxy<GraphicsResult>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
        }
    }

    /// Kicks off resource creation; subsequent calls are no-ops.
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            return;
        };

        let result = pollster::block_on(create_graphics(event_loop));
        assert!(event_loop_proxy.send_event(result).is_ok());
    }
}

async fn create_graphics(event_loop: &ActiveEventLoop) -> GraphicsResult {
    let window_attrs = Window::default_attributes().with_title("cubeworld");
    let window = Arc::new(
        event_loop
            .create_window(window_attrs)
            .map_err(|e| EngineError::Window(e.to_string()))?,
    );

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let surface = instance
        .create_surface(window.clone())
        .map_err(|e| EngineError::Gpu(format!("surface creation failed: {e}")))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| EngineError::Gpu(format!("no suitable GPU adapter: {e}")))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| EngineError::Gpu(format!("device request failed: {e}")))?;

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|format| format.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);
    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: surface_caps.present_modes[0],
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    let atlas = load_block_atlas(Path::new(TEXTURE_DIR))?;

    Ok(Graphics {
        window,
        surface,
        surface_config,
        device,
        queue,
        atlas,
    })
}
