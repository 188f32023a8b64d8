//! Frame targets: where recorded frames end up.
//!
//! [`NullTarget`] drops frames (headless simulation and tests),
//! [`SurfaceTarget`] draws into a wgpu surface and [`OffscreenTarget`] into
//! a texture that can be read back.

use std::sync::Arc;

use image::RgbaImage;
use reelkit_core::alloc::HashMap;
use reelkit_core::profiling::profile_scope;

use crate::context::{GraphicsContext, GraphicsError, GraphicsResult};
use crate::frame::{ProgramId, RecordedFrame, TextureId};
use crate::particles::ParticleInstance;
use crate::renderer::{BufferKind, FrameResources, Program};
use crate::shader::ProgramLayout;

/// Receives recorded frames from the renderer.
pub trait FrameTarget {
    /// Short name for logs.
    fn label(&self) -> &'static str;

    fn resize(&mut self, width: u32, height: u32) -> GraphicsResult<()>;

    fn present(&mut self, frame: &RecordedFrame, resources: &FrameResources<'_>) -> GraphicsResult<()>;

    /// Pixels of the last presented frame, for targets that keep them.
    fn read_pixels(&self) -> GraphicsResult<Option<RgbaImage>> {
        Ok(None)
    }
}

/// Target that accepts frames and discards them.
#[derive(Debug, Default)]
pub struct NullTarget {
    size: (u32, u32),
    frames: u64,
}

impl NullTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }
}

impl FrameTarget for NullTarget {
    fn label(&self) -> &'static str {
        "null"
    }

    fn resize(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        self.size = (width, height);
        Ok(())
    }

    fn present(&mut self, frame: &RecordedFrame, _resources: &FrameResources<'_>) -> GraphicsResult<()> {
        self.frames += 1;
        tracing::trace!(
            "Null target dropped frame {} with {} commands at {:?}",
            self.frames,
            frame.commands.len(),
            self.size
        );
        Ok(())
    }
}

/// Builds pipelines for the renderer's programs and encodes recorded frames.
struct FrameEncoder {
    context: Arc<GraphicsContext>,
    format: wgpu::TextureFormat,
    uniform_buffer: wgpu::Buffer,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<ProgramId, wgpu::RenderPipeline>,
    texture_bind_groups: HashMap<TextureId, wgpu::BindGroup>,
}

const TEXTURED_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
const COLORED_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
const CORNER_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const PARTICLE_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    1 => Float32x2,
    2 => Float32,
    3 => Float32,
    4 => Float32x4,
    5 => Float32,
    6 => Float32,
];

impl FrameEncoder {
    fn new(context: Arc<GraphicsContext>, format: wgpu::TextureFormat) -> Self {
        let device = context.device();

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<crate::frame::FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniforms Layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Uniforms Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Layout"),
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

        Self {
            context,
            format,
            uniform_buffer,
            uniform_layout,
            uniform_bind_group,
            texture_layout,
            pipelines: HashMap::default(),
            texture_bind_groups: HashMap::default(),
        }
    }

    fn create_pipeline(&self, program: &Program) -> wgpu::RenderPipeline {
        let device = self.context.device();

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = match program.layout {
            ProgramLayout::Textured => vec![&self.uniform_layout, &self.texture_layout],
            ProgramLayout::Colored | ProgramLayout::Particles => vec![&self.uniform_layout],
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(program.name.as_str()),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let buffers: Vec<wgpu::VertexBufferLayout<'static>> = match program.layout {
            ProgramLayout::Textured => vec![wgpu::VertexBufferLayout {
                array_stride: 16,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &TEXTURED_ATTRIBUTES,
            }],
            ProgramLayout::Colored => vec![wgpu::VertexBufferLayout {
                array_stride: 24,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &COLORED_ATTRIBUTES,
            }],
            ProgramLayout::Particles => vec![
                wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &CORNER_ATTRIBUTES,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ParticleInstance>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &PARTICLE_ATTRIBUTES,
                },
            ],
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(program.name.as_str()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: program.vertex.as_wgpu(),
                entry_point: Some(program.vertex_entry.as_str()),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: program.fragment.as_wgpu(),
                entry_point: Some(program.fragment_entry.as_str()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Create pipelines and bind groups the frame needs that do not exist yet.
    fn prepare(&mut self, frame: &RecordedFrame, resources: &FrameResources<'_>) {
        profile_scope!("prepare_pipelines");
        for command in &frame.commands {
            if !self.pipelines.contains_key(&command.program)
                && let Some(program) = resources.program(command.program)
            {
                tracing::debug!("Building pipeline for program '{}'", program.name);
                let pipeline = self.create_pipeline(program);
                self.pipelines.insert(command.program, pipeline);
            }

            if let Some(id) = command.texture
                && !self.texture_bind_groups.contains_key(&id)
                && let Some(texture) = resources.texture(id)
            {
                let view = texture.texture.as_wgpu().create_view(&wgpu::TextureViewDescriptor::default());
                let bind_group = self.context.device().create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(texture.name.as_str()),
                    layout: &self.texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(texture.sampler.as_wgpu()),
                        },
                    ],
                });
                self.texture_bind_groups.insert(id, bind_group);
            }
        }
    }

    fn encode(
        &mut self,
        view: &wgpu::TextureView,
        size: (u32, u32),
        frame: &RecordedFrame,
        resources: &FrameResources<'_>,
    ) -> wgpu::CommandBuffer {
        profile_scope!("encode_frame");
        self.prepare(frame, resources);

        self.context
            .queue()
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&frame.uniforms));

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for command in &frame.commands {
                let Some(pipeline) = self.pipelines.get(&command.program) else {
                    tracing::warn!("Skipping draw with unknown program {:?}", command.program);
                    continue;
                };
                let Some(vertex) = resources.buffer(command.vertex_buffer) else {
                    continue;
                };

                match command.scissor {
                    Some(rect) => {
                        let x = rect.x.min(size.0);
                        let y = rect.y.min(size.1);
                        let w = rect.width.min(size.0 - x);
                        let h = rect.height.min(size.1 - y);
                        if w == 0 || h == 0 {
                            continue;
                        }
                        pass.set_scissor_rect(x, y, w, h);
                    }
                    None => pass.set_scissor_rect(0, 0, size.0, size.1),
                }

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                if let Some(texture) = command.texture
                    && let Some(bind_group) = self.texture_bind_groups.get(&texture)
                {
                    pass.set_bind_group(1, bind_group, &[]);
                }
                pass.set_vertex_buffer(0, vertex.buffer.as_wgpu().slice(..));
                if let Some(instances) = command.instance_buffer.and_then(|id| resources.buffer(id)) {
                    pass.set_vertex_buffer(1, instances.buffer.as_wgpu().slice(..));
                }

                match command.index_buffer.and_then(|id| resources.buffer(id)) {
                    Some(index) if index.kind == BufferKind::Index => {
                        pass.set_index_buffer(index.buffer.as_wgpu().slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(command.elements.clone(), 0, 0..command.instances);
                    }
                    _ => pass.draw(command.elements.clone(), 0..command.instances),
                }
            }
        }

        encoder.finish()
    }
}

/// Draws into a configured wgpu surface.
///
/// Resources must come from a `GraphicsContext`; mock handles panic here.
pub struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    encoder: FrameEncoder,
}

impl SurfaceTarget {
    pub fn new(
        context: Arc<GraphicsContext>,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> GraphicsResult<Self> {
        let config = surface
            .get_default_config(&context.adapter, width.max(1), height.max(1))
            .ok_or_else(|| GraphicsError::Surface("surface is not supported by the adapter".to_string()))?;
        surface.configure(context.device(), &config);
        tracing::info!("Configured surface {}x{} as {:?}", config.width, config.height, config.format);

        Ok(Self {
            surface,
            encoder: FrameEncoder::new(context, config.format),
            config,
        })
    }

    fn reconfigure(&self) {
        self.surface.configure(self.encoder.context.device(), &self.config);
    }
}

impl FrameTarget for SurfaceTarget {
    fn label(&self) -> &'static str {
        "surface"
    }

    fn resize(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.reconfigure();
        Ok(())
    }

    fn present(&mut self, frame: &RecordedFrame, resources: &FrameResources<'_>) -> GraphicsResult<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring and skipping frame");
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(GraphicsError::Surface(e.to_string())),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let size = (self.config.width, self.config.height);
        let commands = self.encoder.encode(&view, size, frame, resources);
        self.encoder.context.queue().submit(std::iter::once(commands));
        output.present();
        Ok(())
    }
}

/// Draws into an owned texture whose pixels can be read back.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    size: (u32, u32),
    encoder: FrameEncoder,
}

impl OffscreenTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(context: Arc<GraphicsContext>, width: u32, height: u32) -> Self {
        let texture = Self::create_texture(&context, width, height);
        Self {
            texture,
            size: (width.max(1), height.max(1)),
            encoder: FrameEncoder::new(context, Self::FORMAT),
        }
    }

    fn create_texture(context: &GraphicsContext, width: u32, height: u32) -> wgpu::Texture {
        context.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }
}

impl FrameTarget for OffscreenTarget {
    fn label(&self) -> &'static str {
        "offscreen"
    }

    fn resize(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        let size = (width.max(1), height.max(1));
        if size != self.size {
            self.texture = Self::create_texture(&self.encoder.context, size.0, size.1);
            self.size = size;
        }
        Ok(())
    }

    fn present(&mut self, frame: &RecordedFrame, resources: &FrameResources<'_>) -> GraphicsResult<()> {
        let view = self.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encoder.encode(&view, self.size, frame, resources);
        self.encoder.context.queue().submit(std::iter::once(commands));
        Ok(())
    }

    fn read_pixels(&self) -> GraphicsResult<Option<RgbaImage>> {
        let (width, height) = self.size;
        let device = self.encoder.context.device();

        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Readback"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Offscreen Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.encoder.context.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });
        rx.recv()
            .map_err(|e| GraphicsError::Readback(e.to_string()))?
            .map_err(|e| GraphicsError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        staging.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .map(Some)
            .ok_or_else(|| GraphicsError::Readback("pixel buffer size mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DrawCommand;
    use crate::renderer::{BufferKind, Renderer};
    use crate::shader::ProgramSource;
    use crate::{Color, shaders};

    #[test]
    fn test_null_target_counts_frames() {
        let mut target = NullTarget::new();
        target.resize(10, 10).unwrap();
        let frame = RecordedFrame::new(Color::BLACK, (10, 10), 0.0);
        let resources = FrameResources {
            programs: &[],
            textures: &[],
            buffers: &[],
        };
        target.present(&frame, &resources).unwrap();
        target.present(&frame, &resources).unwrap();
        assert_eq!(target.frames_presented(), 2);
        assert!(target.read_pixels().unwrap().is_none());
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_offscreen_target_clears_and_draws() {
        let context = GraphicsContext::new_owned_sync().expect("GPU context");
        let target = OffscreenTarget::new(context.clone(), 64, 64);
        let mut renderer = Renderer::new(context, Box::new(target), 64, 64).unwrap();

        let program = renderer
            .create_program(
                "overlay",
                &ProgramSource::new(shaders::OVERLAY_VERTEX, shaders::OVERLAY_FRAGMENT),
                ProgramLayout::Colored,
            )
            .unwrap();
        // Left half red quad.
        let red = [1.0f32, 0.0, 0.0, 1.0];
        let quad: Vec<f32> = [[0.0, 0.0], [32.0, 0.0], [0.0, 64.0], [0.0, 64.0], [32.0, 0.0], [32.0, 64.0]]
            .iter()
            .flat_map(|p: &[f32; 2]| [p[0], p[1], red[0], red[1], red[2], red[3]])
            .collect();
        let vb = renderer
            .create_buffer("quad", bytemuck::cast_slice(&quad), BufferKind::Vertex)
            .unwrap();

        renderer.clear(Color::rgb(0.0, 0.0, 1.0));
        renderer.draw_arrays(DrawCommand::arrays(program, vb, 0..6)).unwrap();
        renderer.present().unwrap();

        let pixels = renderer.read_pixels().unwrap().unwrap();
        assert_eq!(pixels.get_pixel(8, 32).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(56, 32).0, [0, 0, 255, 255]);
    }
}
