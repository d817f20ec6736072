//! # Rendering Module
//!
//! The two-pass voxel renderer: opaque chunk geometry front-to-back with
//! depth writes, then water back-to-front with alpha blending and depth
//! writes off. A single chunk mesh carries both face classes; the shader's
//! `render_pass` uniform discards the class that does not belong to the
//! current pass.

pub mod atlas;
pub mod texture;

use std::sync::Arc;

use cgmath::{Matrix4, MetricSpace, Point3, Vector3};

use crate::core::EngineError;
use crate::engine_state::meshing::{GpuMesh, VoxelVertex};
use crate::engine_state::voxels::{World, CHUNK_HEIGHT, CHUNK_SIZE};

use atlas::TextureAtlas;
use texture::Texture;

/// Chunks whose center sits farther than `render_distance * 1.2` chunk
/// units from the camera are skipped entirely.
const FRUSTUM_DISTANCE_MARGIN: f32 = 1.2;

/// Dynamic-offset stride for per-chunk uniforms; covers the required
/// 256-byte uniform offset alignment on all backends.
const CHUNK_UNIFORM_STRIDE: u64 = 256;

/// Per-pass shader globals.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    time: f32,
    render_pass: u32,
    _padding: [f32; 2],
}

/// Per-chunk uniform: the model matrix translating chunk-local mesh
/// coordinates into world space.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ChunkUniform {
    model: [[f32; 4]; 4],
}

struct DrawEntry {
    distance: f32,
    mesh: Arc<GpuMesh>,
    position: Point3<i32>,
    uniform_index: u32,
}

/// The voxel renderer: pipelines, bind groups, and per-frame draw logic.
pub struct VoxelRenderer {
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,

    // One globals buffer per pass; the only difference is `render_pass`.
    globals_buffers: [wgpu::Buffer; 2],
    globals_bind_groups: [wgpu::BindGroup; 2],

    atlas_bind_group: wgpu::BindGroup,

    chunk_layout: wgpu::BindGroupLayout,
    chunk_buffer: wgpu::Buffer,
    chunk_bind_group: wgpu::BindGroup,
    chunk_capacity: usize,

    depth_texture: Texture,

    water_time: f32,
    water_time_step: f32,

    frame_counter: u64,
    chunks_drawn_last_frame: usize,
    triangles_drawn_last_frame: usize,
}

impl VoxelRenderer {
    /// Builds pipelines and GPU resources. Shader or pipeline validation
    /// failures are fatal and reported to the caller.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &wgpu::SurfaceConfiguration,
        atlas: &TextureAtlas,
        water_frames_per_second: f32,
    ) -> Result<Self, EngineError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Voxel Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Atlas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let chunk_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Chunk Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ChunkUniform>() as u64
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Voxel Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &atlas_layout, &chunk_layout],
            push_constant_ranges: &[],
        });

        let depth_stencil = |depth_write_enabled| {
            Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            })
        };

        let pipeline = |label, blend, depth_write| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[VoxelVertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: depth_stencil(depth_write),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };

        let opaque_pipeline = pipeline("Opaque Pass Pipeline", wgpu::BlendState::REPLACE, true);
        let transparent_pipeline = pipeline(
            "Transparent Pass Pipeline",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );

        let globals_buffers = std::array::from_fn(|pass| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(if pass == 0 {
                    "Globals Buffer (opaque)"
                } else {
                    "Globals Buffer (transparent)"
                }),
                size: std::mem::size_of::<Globals>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        let globals_bind_groups = std::array::from_fn(|pass| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Globals Bind Group"),
                layout: &globals_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffers[pass].as_entire_binding(),
                }],
            })
        });

        let atlas_texture = Texture::from_atlas(device, queue, atlas, "Block Atlas");
        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_texture.sampler),
                },
            ],
        });

        let chunk_capacity = 256;
        let (chunk_buffer, chunk_bind_group) =
            Self::create_chunk_uniforms(device, &chunk_layout, chunk_capacity);

        let depth_texture = Texture::create_depth_texture(device, config, "Depth Texture");

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(EngineError::Gpu(format!(
                "renderer initialization failed: {error}"
            )));
        }

        Ok(Self {
            opaque_pipeline,
            transparent_pipeline,
            globals_buffers,
            globals_bind_groups,
            atlas_bind_group,
            chunk_layout,
            chunk_buffer,
            chunk_bind_group,
            chunk_capacity,
            depth_texture,
            water_time: 0.0,
            // The shader advances one frame per 0.5 time units; scale the
            // per-tick step so the configured rate comes out.
            water_time_step: water_frames_per_second / 2.0 / 60.0,
            frame_counter: 0,
            chunks_drawn_last_frame: 0,
            triangles_drawn_last_frame: 0,
        })
    }

    fn create_chunk_uniforms(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Chunk Uniform Buffer"),
            size: capacity as u64 * CHUNK_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Chunk Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ChunkUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn ensure_chunk_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.chunk_capacity {
            return;
        }
        self.chunk_capacity = needed.next_power_of_two();
        let (buffer, bind_group) =
            Self::create_chunk_uniforms(device, &self.chunk_layout, self.chunk_capacity);
        self.chunk_buffer = buffer;
        self.chunk_bind_group = bind_group;
    }

    /// Advances the water animation clock by one frame tick.
    pub fn advance_time(&mut self) {
        self.water_time += self.water_time_step;
    }

    /// Recreates size-dependent resources after a window resize.
    pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.depth_texture = Texture::create_depth_texture(device, config, "Depth Texture");
    }

    /// Draws every uploaded, in-range chunk into `target`: opaque pass
    /// front-to-back, then the water pass back-to-front.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        camera_position: Point3<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        world: &World,
    ) {
        let mut entries = self.collect_draw_entries(camera_position, world);
        self.ensure_chunk_capacity(device, entries.len().max(1));

        // Front-to-back for the opaque pass; the transparent pass walks the
        // same list in reverse.
        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        for (index, entry) in entries.iter_mut().enumerate() {
            entry.uniform_index = index as u32;
            let origin = Vector3::new(
                (entry.position.x * CHUNK_SIZE) as f32,
                (entry.position.y * CHUNK_HEIGHT) as f32,
                (entry.position.z * CHUNK_SIZE) as f32,
            );
            let uniform = ChunkUniform {
                model: Matrix4::from_translation(origin).into(),
            };
            queue.write_buffer(
                &self.chunk_buffer,
                index as u64 * CHUNK_UNIFORM_STRIDE,
                bytemuck::bytes_of(&uniform),
            );
        }

        for pass in 0..2u32 {
            let globals = Globals {
                view: view.into(),
                projection: projection.into(),
                time: self.water_time,
                render_pass: pass,
                _padding: [0.0; 2],
            };
            queue.write_buffer(
                &self.globals_buffers[pass as usize],
                0,
                bytemuck::bytes_of(&globals),
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Voxel Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Voxel Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.45,
                            g: 0.65,
                            b: 0.95,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(1, &self.atlas_bind_group, &[]);

            render_pass.set_pipeline(&self.opaque_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_groups[0], &[]);
            for entry in entries.iter() {
                self.draw_entry(&mut render_pass, entry);
            }

            render_pass.set_pipeline(&self.transparent_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_groups[1], &[]);
            for entry in entries.iter().rev() {
                self.draw_entry(&mut render_pass, entry);
            }
        }
        queue.submit([encoder.finish()]);

        self.chunks_drawn_last_frame = entries.len();
        self.triangles_drawn_last_frame = entries
            .iter()
            .map(|entry| entry.mesh.index_count as usize / 3)
            .sum();

        self.frame_counter += 1;
        if self.frame_counter % 300 == 0 {
            log::debug!(
                "render stats: {} chunks, {} triangles",
                self.chunks_drawn_last_frame,
                self.triangles_drawn_last_frame
            );
        }
    }

    fn draw_entry(&self, render_pass: &mut wgpu::RenderPass<'_>, entry: &DrawEntry) {
        let offset = (entry.uniform_index as u64 * CHUNK_UNIFORM_STRIDE) as u32;
        render_pass.set_bind_group(2, &self.chunk_bind_group, &[offset]);
        render_pass.set_vertex_buffer(0, entry.mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(entry.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..entry.mesh.index_count, 0, 0..1);
    }

    /// Gathers uploaded, non-empty chunks inside the culling distance and
    /// assigns each a slot in the per-chunk uniform buffer.
    fn collect_draw_entries(&self, camera_position: Point3<f32>, world: &World) -> Vec<DrawEntry> {
        let cull_distance =
            world.render_distance() as f32 * FRUSTUM_DISTANCE_MARGIN * CHUNK_SIZE as f32;

        let mut entries = Vec::new();
        for (position, chunk) in world.chunks() {
            let mesh = {
                let guard = chunk.get();
                match &guard.mesh {
                    Some(mesh) if mesh.index_count > 0 => mesh.clone(),
                    _ => continue,
                }
            };

            let center = Point3::new(
                (position.x * CHUNK_SIZE) as f32 + CHUNK_SIZE as f32 * 0.5,
                (position.y * CHUNK_HEIGHT) as f32 + CHUNK_HEIGHT as f32 * 0.5,
                (position.z * CHUNK_SIZE) as f32 + CHUNK_SIZE as f32 * 0.5,
            );
            let distance = camera_position.distance(center);
            if distance > cull_distance {
                continue;
            }

            entries.push(DrawEntry {
                distance,
                mesh,
                position: *position,
                uniform_index: 0,
            });
        }

        entries
    }
}
