//! Renderer core: owns every program, texture and buffer and records frames.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use reelkit_core::profiling::profile_function;
use reelkit_test_utils::{GpuBuffer, GpuSampler, GpuShaderModule, GpuTexture, RenderContext, TextureRegion};

use crate::context::{GraphicsError, GraphicsResult};
use crate::frame::{BufferId, DrawCommand, ProgramId, RecordedFrame, RenderStats, TextureId};
use crate::shader::{ProgramLayout, ProgramSource, ShaderError, link_program};
use crate::target::FrameTarget;
use crate::Color;

/// Format of every texture the renderer creates.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    fn usage(self) -> wgpu::BufferUsages {
        match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// A linked program.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub layout: ProgramLayout,
    pub vertex: GpuShaderModule,
    pub fragment: GpuShaderModule,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

/// An uploaded texture with its sampler.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub texture: GpuTexture,
    pub sampler: GpuSampler,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    /// Bytes held on the GPU, mip chain included.
    pub memory: u64,
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub name: String,
    pub buffer: GpuBuffer,
    pub kind: BufferKind,
    pub capacity: u64,
    pub dynamic: bool,
}

/// Read-only view of the renderer's resources handed to a [`FrameTarget`].
pub struct FrameResources<'a> {
    pub(crate) programs: &'a [Option<Program>],
    pub(crate) textures: &'a [Option<Texture>],
    pub(crate) buffers: &'a [Option<Buffer>],
}

impl<'a> FrameResources<'a> {
    pub fn program(&self, id: ProgramId) -> Option<&'a Program> {
        self.programs.get(id.0 as usize)?.as_ref()
    }

    pub fn texture(&self, id: TextureId) -> Option<&'a Texture> {
        self.textures.get(id.0 as usize)?.as_ref()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&'a Buffer> {
        self.buffers.get(id.0 as usize)?.as_ref()
    }
}

/// Low-level renderer.
///
/// Resources are created through the shared [`RenderContext`] and addressed
/// by copyable handles. Draw calls between [`clear`](Self::clear) and
/// [`present`](Self::present) are recorded and handed to the frame target in
/// one go.
pub struct Renderer {
    context: Arc<dyn RenderContext>,
    target: Box<dyn FrameTarget>,
    programs: Vec<Option<Program>>,
    textures: Vec<Option<Texture>>,
    buffers: Vec<Option<Buffer>>,
    viewport: (u32, u32),
    time: f32,
    clear_color: Color,
    frame: Option<RecordedFrame>,
    last_frame: Option<RecordedFrame>,
    stats: RenderStats,
    destroyed: bool,
}

impl Renderer {
    pub fn new(
        context: Arc<dyn RenderContext>,
        mut target: Box<dyn FrameTarget>,
        width: u32,
        height: u32,
    ) -> GraphicsResult<Self> {
        target.resize(width, height)?;
        tracing::debug!("Renderer created for {} target ({}x{})", target.label(), width, height);
        Ok(Self {
            context,
            target,
            programs: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
            viewport: (width, height),
            time: 0.0,
            clear_color: Color::BLACK,
            frame: None,
            last_frame: None,
            stats: RenderStats::default(),
            destroyed: false,
        })
    }

    pub fn context(&self) -> &Arc<dyn RenderContext> {
        &self.context
    }

    fn ensure_alive(&self) -> GraphicsResult<()> {
        if self.destroyed {
            return Err(GraphicsError::Destroyed);
        }
        Ok(())
    }

    /// Compile and link a program.
    ///
    /// Both stages are validated before any shader module is created, so a
    /// failed program leaves nothing behind.
    pub fn create_program(
        &mut self,
        name: &str,
        source: &ProgramSource,
        layout: ProgramLayout,
    ) -> Result<ProgramId, ShaderError> {
        if self.destroyed {
            return Err(ShaderError::Link {
                program: name.to_string(),
                reason: GraphicsError::Destroyed.to_string(),
            });
        }

        let linked = link_program(name, source)?;

        let vertex = self.context.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some(format!("{name} (vertex)").as_str()),
            source: wgpu::ShaderSource::Wgsl(source.vertex.clone()),
        });
        let fragment = self.context.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some(format!("{name} (fragment)").as_str()),
            source: wgpu::ShaderSource::Wgsl(source.fragment.clone()),
        });

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(Some(Program {
            name: name.to_string(),
            layout,
            vertex,
            fragment,
            vertex_entry: linked.vertex.entry_point,
            fragment_entry: linked.fragment.entry_point,
        }));
        tracing::debug!("Created program '{}' ({:?})", name, layout);
        Ok(id)
    }

    /// Upload an RGBA image as a clamped, linearly filtered texture.
    ///
    /// A full mip chain is generated when both dimensions are powers of two.
    pub fn create_texture(&mut self, name: &str, image: &RgbaImage) -> GraphicsResult<TextureId> {
        profile_function!();
        self.ensure_alive()?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidTextureSize { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if image.as_raw().len() != expected {
            return Err(GraphicsError::InvalidTextureData {
                expected,
                actual: image.as_raw().len(),
            });
        }

        let mip_levels = mip_level_count(width, height);
        let texture = self.context.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut memory = 0u64;
        let mut level_image = image.clone();
        for level in 0..mip_levels {
            if level > 0 {
                let w = (level_image.width() / 2).max(1);
                let h = (level_image.height() / 2).max(1);
                level_image = image::imageops::resize(&level_image, w, h, image::imageops::FilterType::Triangle);
            }
            let (w, h) = level_image.dimensions();
            self.context
                .write_texture(&texture, TextureRegion::full(level, w, h), level_image.as_raw());
            memory += w as u64 * h as u64 * 4;
        }

        let sampler = self.context.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(name),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: if mip_levels > 1 {
                wgpu::FilterMode::Linear
            } else {
                wgpu::FilterMode::Nearest
            },
            ..Default::default()
        });

        self.stats.texture_memory += memory;
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(Some(Texture {
            name: name.to_string(),
            texture,
            sampler,
            width,
            height,
            mip_levels,
            memory,
        }));
        tracing::debug!(
            "Created texture '{}' {}x{} with {} mip levels ({} bytes)",
            name,
            width,
            height,
            mip_levels,
            memory
        );
        Ok(id)
    }

    /// Create a static buffer initialised with `data`.
    pub fn create_buffer(&mut self, name: &str, data: &[u8], kind: BufferKind) -> GraphicsResult<BufferId> {
        self.ensure_alive()?;
        let buffer = self.context.create_buffer_init(Some(name), data, kind.usage());
        Ok(self.push_buffer(name, buffer, kind, data.len() as u64, false))
    }

    /// Create a buffer of `capacity` bytes meant to be rewritten every frame.
    pub fn create_dynamic_buffer(&mut self, name: &str, capacity: u64, kind: BufferKind) -> GraphicsResult<BufferId> {
        self.ensure_alive()?;
        let capacity = capacity.max(wgpu::COPY_BUFFER_ALIGNMENT).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.context.create_buffer(&wgpu::BufferDescriptor {
            label: Some(name),
            size: capacity,
            usage: kind.usage(),
            mapped_at_creation: false,
        });
        Ok(self.push_buffer(name, buffer, kind, capacity, true))
    }

    fn push_buffer(&mut self, name: &str, buffer: GpuBuffer, kind: BufferKind, capacity: u64, dynamic: bool) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Some(Buffer {
            name: name.to_string(),
            buffer,
            kind,
            capacity,
            dynamic,
        }));
        tracing::debug!("Created {:?} buffer '{}' ({} bytes)", kind, name, capacity);
        id
    }

    /// Release a single buffer. Unknown or already released ids are ignored.
    pub fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.get_mut(id.0 as usize).and_then(Option::take) {
            self.context.destroy_buffer(&buffer.buffer);
            tracing::debug!("Destroyed buffer '{}'", buffer.name);
        }
    }

    /// Write `data` into a buffer at `offset`.
    pub fn update_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        self.ensure_alive()?;
        let buffer = self.buffer(id).ok_or(GraphicsError::UnknownResource {
            kind: "buffer",
            id: id.0,
        })?;
        let end = offset + data.len() as u64;
        if end > buffer.capacity {
            return Err(GraphicsError::BufferOverflow {
                buffer: buffer.name.clone(),
                capacity: buffer.capacity,
                requested: end,
            });
        }
        if !data.is_empty() {
            self.context.write_buffer(&buffer.buffer, offset, data);
        }
        Ok(())
    }

    /// Resize the frame target and the viewport together.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        self.ensure_alive()?;
        if (width, height) == self.viewport {
            return Ok(());
        }
        self.target.resize(width, height)?;
        self.viewport = (width, height);
        tracing::debug!("Viewport set to {}x{}", width, height);
        Ok(())
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Engine time passed to shaders with the next frame.
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// Reset the per-frame counters and begin a new frame cleared to `color`.
    pub fn clear(&mut self, color: Color) {
        self.stats.draw_calls = 0;
        self.stats.triangles = 0;
        self.stats.vertices = 0;
        self.clear_color = color;
        self.frame = Some(RecordedFrame::new(color, self.viewport, self.time));
    }

    /// Record a non-indexed draw.
    pub fn draw_arrays(&mut self, command: DrawCommand) -> GraphicsResult<()> {
        if command.index_buffer.is_some() {
            return Err(GraphicsError::MissingBinding {
                program: self.program_name(command.program),
                binding: "vertex range (index buffer given to draw_arrays)",
            });
        }
        self.record(command)
    }

    /// Record an indexed draw.
    pub fn draw_elements(&mut self, command: DrawCommand) -> GraphicsResult<()> {
        let Some(index) = command.index_buffer else {
            return Err(GraphicsError::MissingBinding {
                program: self.program_name(command.program),
                binding: "index buffer",
            });
        };
        match self.buffer(index) {
            Some(buffer) if buffer.kind == BufferKind::Index => {}
            _ => {
                return Err(GraphicsError::UnknownResource {
                    kind: "index buffer",
                    id: index.0,
                });
            }
        }
        self.record(command)
    }

    fn program_name(&self, id: ProgramId) -> String {
        self.program(id).map(|p| p.name.clone()).unwrap_or_default()
    }

    fn record(&mut self, command: DrawCommand) -> GraphicsResult<()> {
        self.ensure_alive()?;

        let program = self.program(command.program).ok_or(GraphicsError::UnknownResource {
            kind: "program",
            id: command.program.0,
        })?;
        match self.buffer(command.vertex_buffer) {
            Some(buffer) if buffer.kind == BufferKind::Vertex => {}
            _ => {
                return Err(GraphicsError::UnknownResource {
                    kind: "vertex buffer",
                    id: command.vertex_buffer.0,
                });
            }
        }
        if let Some(texture) = command.texture
            && self.texture(texture).is_none()
        {
            return Err(GraphicsError::UnknownResource {
                kind: "texture",
                id: texture.0,
            });
        }
        if program.layout == ProgramLayout::Textured && command.texture.is_none() {
            return Err(GraphicsError::MissingBinding {
                program: program.name.clone(),
                binding: "texture",
            });
        }
        if program.layout == ProgramLayout::Particles && command.instance_buffer.is_none() {
            return Err(GraphicsError::MissingBinding {
                program: program.name.clone(),
                binding: "instance buffer",
            });
        }

        self.stats.draw_calls += 1;
        self.stats.triangles += command.triangle_count();
        self.stats.vertices += command.vertex_count();

        let (viewport, time, color) = (self.viewport, self.time, self.clear_color);
        self.frame
            .get_or_insert_with(|| RecordedFrame::new(color, viewport, time))
            .commands
            .push(command);
        Ok(())
    }

    /// Hand the recorded frame to the target.
    ///
    /// Does nothing if no frame was started since the last present.
    pub fn present(&mut self) -> GraphicsResult<()> {
        profile_function!();
        self.ensure_alive()?;
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };

        let resources = FrameResources {
            programs: &self.programs,
            textures: &self.textures,
            buffers: &self.buffers,
        };
        self.target.present(&frame, &resources)?;
        self.stats.frame_count += 1;
        tracing::trace!(
            "Presented frame {} ({} draw calls)",
            self.stats.frame_count,
            frame.commands.len()
        );
        self.last_frame = Some(frame);
        Ok(())
    }

    /// Record timing of the frame that just completed.
    pub fn record_frame_time(&mut self, frame_time: Duration, fps: f32) {
        self.stats.frame_time = frame_time;
        self.stats.fps = fps;
    }

    /// Read back the target's pixels, if the target supports it.
    pub fn read_pixels(&self) -> GraphicsResult<Option<RgbaImage>> {
        self.ensure_alive()?;
        self.target.read_pixels()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The most recently presented frame.
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.last_frame.as_ref()
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(id.0 as usize)?.as_ref()
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)?.as_ref()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id.0 as usize)?.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Release every resource this renderer created.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let (programs, textures, buffers) = (
            self.programs.iter().flatten().count(),
            self.textures.iter().flatten().count(),
            self.buffers.iter().flatten().count(),
        );
        for texture in self.textures.iter_mut().filter_map(Option::take) {
            self.context.destroy_texture(&texture.texture);
        }
        for buffer in self.buffers.iter_mut().filter_map(Option::take) {
            self.context.destroy_buffer(&buffer.buffer);
        }
        self.programs.iter_mut().for_each(|p| *p = None);
        self.frame = None;
        self.stats = RenderStats::default();
        self.destroyed = true;
        tracing::info!(
            "Renderer destroyed ({} programs, {} textures, {} buffers released)",
            programs,
            textures,
            buffers
        );
    }
}

/// Number of mip levels for a texture: a full chain for power-of-two sizes,
/// otherwise just the base level.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    if width.is_power_of_two() && height.is_power_of_two() {
        32 - width.max(height).leading_zeros()
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders;
    use crate::target::NullTarget;
    use reelkit_test_utils::MockRenderContext;

    fn renderer() -> (Arc<MockRenderContext>, Renderer) {
        let mock = Arc::new(MockRenderContext::new());
        let renderer = Renderer::new(mock.clone(), Box::new(NullTarget::new()), 800, 600).unwrap();
        (mock, renderer)
    }

    fn overlay_program(renderer: &mut Renderer) -> ProgramId {
        renderer
            .create_program(
                "overlay",
                &ProgramSource::new(shaders::OVERLAY_VERTEX, shaders::OVERLAY_FRAGMENT),
                ProgramLayout::Colored,
            )
            .unwrap()
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1024, 1024), 11);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(100, 128), 1);
        assert_eq!(mip_level_count(1, 1), 1);
    }

    #[test]
    fn test_program_failure_creates_no_modules() {
        let (mock, mut renderer) = renderer();
        let result = renderer.create_program(
            "broken",
            &ProgramSource::new("not wgsl", shaders::OVERLAY_FRAGMENT),
            ProgramLayout::Colored,
        );
        assert!(matches!(result, Err(ShaderError::Compile { .. })));
        assert_eq!(mock.count_shader_creates(), 0);

        overlay_program(&mut renderer);
        assert_eq!(mock.count_shader_creates(), 2);
    }

    #[test]
    fn test_texture_memory_includes_mips() {
        let (mock, mut renderer) = renderer();
        let image = RgbaImage::new(4, 4);
        let id = renderer.create_texture("pow2", &image).unwrap();

        // 4x4 + 2x2 + 1x1
        assert_eq!(renderer.stats().texture_memory, (16 + 4 + 1) * 4);
        assert_eq!(renderer.texture(id).unwrap().mip_levels, 3);
        assert_eq!(mock.count_texture_writes(), 3);

        renderer.create_texture("npot", &RgbaImage::new(3, 5)).unwrap();
        assert_eq!(renderer.stats().texture_memory, (16 + 4 + 1) * 4 + 15 * 4);
    }

    #[test]
    fn test_texture_rejects_empty_image() {
        let (_, mut renderer) = renderer();
        let err = renderer.create_texture("empty", &RgbaImage::new(0, 4)).unwrap_err();
        assert_eq!(err, GraphicsError::InvalidTextureSize { width: 0, height: 4 });
    }

    #[test]
    fn test_dynamic_buffer_overflow() {
        let (mock, mut renderer) = renderer();
        let id = renderer.create_dynamic_buffer("quads", 64, BufferKind::Vertex).unwrap();
        renderer.update_buffer(id, 32, &[1u8; 32]).unwrap();
        assert_eq!(mock.count_buffer_writes(), 1);

        let err = renderer.update_buffer(id, 48, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, GraphicsError::BufferOverflow { capacity: 64, requested: 80, .. }));
    }

    #[test]
    fn test_clear_resets_counters() {
        let (_, mut renderer) = renderer();
        let program = overlay_program(&mut renderer);
        let vb = renderer.create_buffer("quad", &[0u8; 144], BufferKind::Vertex).unwrap();

        renderer.clear(Color::BLACK);
        renderer.draw_arrays(DrawCommand::arrays(program, vb, 0..6)).unwrap();
        renderer.draw_arrays(DrawCommand::arrays(program, vb, 0..6)).unwrap();
        let stats = renderer.stats();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.triangles, 4);
        assert_eq!(stats.vertices, 12);

        renderer.present().unwrap();
        assert_eq!(renderer.stats().frame_count, 1);
        assert_eq!(renderer.last_frame().unwrap().commands.len(), 2);

        renderer.clear(Color::BLACK);
        assert_eq!(renderer.stats().draw_calls, 0);
        assert_eq!(renderer.stats().triangles, 0);
    }

    #[test]
    fn test_draw_elements_requires_index_buffer() {
        let (_, mut renderer) = renderer();
        let program = overlay_program(&mut renderer);
        let vb = renderer.create_buffer("quad", &[0u8; 96], BufferKind::Vertex).unwrap();
        let ib = renderer
            .create_buffer("indices", bytemuck::cast_slice(&[0u32, 1, 2, 2, 1, 3]), BufferKind::Index)
            .unwrap();

        renderer.clear(Color::BLACK);
        assert!(renderer.draw_elements(DrawCommand::arrays(program, vb, 0..6)).is_err());
        renderer.draw_elements(DrawCommand::elements(program, vb, ib, 0..6)).unwrap();
        assert_eq!(renderer.stats().triangles, 2);
    }

    #[test]
    fn test_textured_draw_requires_texture() {
        let (_, mut renderer) = renderer();
        let program = renderer
            .create_program(
                "reels",
                &ProgramSource::new(shaders::REEL_VERTEX, shaders::REEL_FRAGMENT),
                ProgramLayout::Textured,
            )
            .unwrap();
        let vb = renderer.create_buffer("quad", &[0u8; 96], BufferKind::Vertex).unwrap();
        renderer.clear(Color::BLACK);
        let err = renderer.draw_arrays(DrawCommand::arrays(program, vb, 0..6)).unwrap_err();
        assert!(matches!(err, GraphicsError::MissingBinding { binding: "texture", .. }));
    }

    #[test]
    fn test_destroy_releases_everything_once() {
        let (mock, mut renderer) = renderer();
        overlay_program(&mut renderer);
        renderer.create_texture("atlas", &RgbaImage::new(8, 8)).unwrap();
        renderer.create_buffer("a", &[0u8; 16], BufferKind::Vertex).unwrap();
        renderer.create_dynamic_buffer("b", 16, BufferKind::Vertex).unwrap();

        renderer.destroy();
        assert_eq!(mock.live_buffer_count(), 0);
        assert_eq!(mock.live_texture_count(), 0);
        assert!(renderer.is_destroyed());

        renderer.destroy();
        assert_eq!(mock.count_buffer_destroys(), 2);
        assert_eq!(mock.count_texture_destroys(), 1);
        assert_eq!(
            renderer.create_buffer("late", &[0u8; 4], BufferKind::Vertex).unwrap_err(),
            GraphicsError::Destroyed
        );
    }

    #[test]
    fn test_destroy_buffer_releases_one_buffer() {
        let (mock, mut renderer) = renderer();
        let a = renderer.create_buffer("a", &[0u8; 16], BufferKind::Vertex).unwrap();
        let b = renderer.create_dynamic_buffer("b", 16, BufferKind::Vertex).unwrap();

        renderer.destroy_buffer(a);
        renderer.destroy_buffer(a);
        assert_eq!(mock.count_buffer_destroys(), 1);
        assert_eq!(mock.live_buffer_count(), 1);
        assert!(renderer.buffer(a).is_none());
        assert!(renderer.buffer(b).is_some());
        assert!(matches!(
            renderer.update_buffer(a, 0, &[0u8; 4]),
            Err(GraphicsError::UnknownResource { kind: "buffer", .. })
        ));

        renderer.destroy();
        assert_eq!(mock.count_buffer_destroys(), 2);
    }
}
