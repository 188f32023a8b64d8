//! Mock implementation of RenderContext for testing.
//!
//! Records every resource operation and keeps buffer contents in memory, so
//! tests can inspect what the renderer uploaded (UV batches, particle
//! instances) without a GPU.

use crate::{gpu_types::*, render_context::*};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        label: Option<String>,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    DestroyBuffer {
        buffer_id: usize,
    },
    CreateTexture {
        label: Option<String>,
        width: u32,
        height: u32,
        mip_level_count: u32,
        format: TextureFormat,
    },
    WriteTexture {
        texture_id: usize,
        region: TextureRegion,
    },
    DestroyTexture {
        texture_id: usize,
    },
    CreateShaderModule {
        label: Option<String>,
    },
    CreateSampler {
        label: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct MockBuffer {
    contents: Vec<u8>,
    usage: BufferUsages,
    destroyed: bool,
}

#[derive(Debug, Clone)]
struct MockTexture {
    width: u32,
    height: u32,
    destroyed: bool,
}

/// Mock implementation of RenderContext for testing.
///
/// Methods take `&self` but record into `parking_lot::Mutex`es, which keeps
/// the mock `Send + Sync` like the real context.
///
/// # Example
///
/// ```rust
/// use reelkit_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 16,
///     usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///     mapped_at_creation: false,
/// });
///
/// mock.write_buffer(&buffer, 4, &[1, 2, 3, 4]);
/// assert_eq!(mock.buffer_contents(&buffer).unwrap()[4..8], [1, 2, 3, 4]);
/// ```
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    /// Indexed by mock id
    buffers: Mutex<Vec<MockBuffer>>,
    textures: Mutex<Vec<MockTexture>>,
    next_shader_id: Mutex<usize>,
    next_sampler_id: Mutex<usize>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            textures: Mutex::new(Vec::new()),
            next_shader_id: Mutex::new(0),
            next_sampler_id: Mutex::new(0),
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    fn count_where(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::WriteBuffer { .. }))
    }

    pub fn count_buffer_destroys(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::DestroyBuffer { .. }))
    }

    pub fn count_texture_creates(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::CreateTexture { .. }))
    }

    pub fn count_texture_writes(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::WriteTexture { .. }))
    }

    pub fn count_texture_destroys(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::DestroyTexture { .. }))
    }

    pub fn count_shader_creates(&self) -> usize {
        self.count_where(|c| matches!(c, RenderCall::CreateShaderModule { .. }))
    }

    /// Current contents of a mock buffer, or `None` for real or unknown buffers.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<Vec<u8>> {
        let id = buffer.mock_id()?;
        self.buffers.lock().get(id).map(|b| b.contents.clone())
    }

    /// Usage flags a mock buffer was created with.
    pub fn buffer_usage(&self, buffer: &GpuBuffer) -> Option<BufferUsages> {
        let id = buffer.mock_id()?;
        self.buffers.lock().get(id).map(|b| b.usage)
    }

    /// Number of buffers created and not yet destroyed.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().iter().filter(|b| !b.destroyed).count()
    }

    /// Number of textures created and not yet destroyed.
    pub fn live_texture_count(&self) -> usize {
        self.textures.lock().iter().filter(|t| !t.destroyed).count()
    }

    /// Clear all recorded calls. Resource state is kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of calls recorded.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_id(counter: &Mutex<usize>) -> usize {
        let mut id = counter.lock();
        let value = *id;
        *id += 1;
        value
    }

    fn push_buffer(&self, label: Option<&str>, contents: Vec<u8>, usage: BufferUsages) -> GpuBuffer {
        let size = contents.len() as u64;
        let mut buffers = self.buffers.lock();
        let id = buffers.len();
        buffers.push(MockBuffer {
            contents,
            usage,
            destroyed: false,
        });

        self.calls.lock().push(RenderCall::CreateBuffer {
            label: label.map(str::to_string),
            size,
            usage,
        });

        GpuBuffer::mock(id, size)
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        self.push_buffer(desc.label, vec![0; desc.size as usize], desc.usage)
    }

    fn create_buffer_init(&self, label: Option<&str>, contents: &[u8], usage: BufferUsages) -> GpuBuffer {
        self.push_buffer(label, contents.to_vec(), usage)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        if let Some(mock) = self.buffers.lock().get_mut(buffer_id) {
            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= mock.contents.len(),
                "write of {} bytes at offset {} overflows mock buffer of {} bytes",
                data.len(),
                offset,
                mock.contents.len()
            );
            mock.contents[start..end].copy_from_slice(data);
        }

        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };
        if let Some(mock) = self.buffers.lock().get_mut(buffer_id) {
            mock.destroyed = true;
        }
        self.calls.lock().push(RenderCall::DestroyBuffer { buffer_id });
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let mut textures = self.textures.lock();
        let id = textures.len();
        textures.push(MockTexture {
            width: desc.size.width,
            height: desc.size.height,
            destroyed: false,
        });

        self.calls.lock().push(RenderCall::CreateTexture {
            label: desc.label.map(str::to_string),
            width: desc.size.width,
            height: desc.size.height,
            mip_level_count: desc.mip_level_count,
            format: desc.format,
        });

        GpuTexture::mock(id, desc.size.width, desc.size.height, desc.mip_level_count, desc.format)
    }

    fn write_texture(&self, texture: &GpuTexture, region: TextureRegion, data: &[u8]) {
        let Some(texture_id) = texture.mock_id() else {
            return;
        };
        assert_eq!(data.len(), region.byte_len(), "texture upload size does not match region");
        if let Some(mock) = self.textures.lock().get(texture_id) {
            let level_width = (mock.width >> region.mip_level).max(1);
            let level_height = (mock.height >> region.mip_level).max(1);
            assert!(
                region.x + region.width <= level_width && region.y + region.height <= level_height,
                "texture upload {region:?} outside mip level bounds {level_width}x{level_height}"
            );
        }
        self.calls.lock().push(RenderCall::WriteTexture { texture_id, region });
    }

    fn destroy_texture(&self, texture: &GpuTexture) {
        let Some(texture_id) = texture.mock_id() else {
            return;
        };
        if let Some(mock) = self.textures.lock().get_mut(texture_id) {
            mock.destroyed = true;
        }
        self.calls.lock().push(RenderCall::DestroyTexture { texture_id });
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let sampler_id = Self::next_id(&self.next_sampler_id);
        self.calls.lock().push(RenderCall::CreateSampler {
            label: desc.label.map(str::to_string),
        });
        GpuSampler::mock(sampler_id)
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule {
        let shader_id = Self::next_id(&self.next_shader_id);
        self.calls.lock().push(RenderCall::CreateShaderModule {
            label: desc.label.map(str::to_string),
        });
        GpuShaderModule::mock(shader_id)
    }
}
