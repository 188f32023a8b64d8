//! GPU resource wrappers that can be real or mock.
//!
//! Each wrapper hides whether it holds a real `wgpu` resource or a mock
//! handle. Wrappers are owned and cheap to clone (wgpu resources are
//! reference counted internally), so callers never deal with lifetimes.

use wgpu;

/// Wrapper around a GPU buffer that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock { id: usize, size: u64 },
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        Self {
            inner: GpuBufferInner::Real(buffer),
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize, size: u64) -> Self {
        Self {
            inner: GpuBufferInner::Mock { id, size },
        }
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer.size(),
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { size, .. } => *size,
        }
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBufferInner::Mock { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around a GPU texture that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    inner: GpuTextureInner,
}

#[derive(Clone, Debug)]
enum GpuTextureInner {
    Real(wgpu::Texture),
    #[cfg(feature = "mock")]
    Mock {
        id: usize,
        width: u32,
        height: u32,
        mip_level_count: u32,
        format: wgpu::TextureFormat,
    },
}

impl GpuTexture {
    /// Create from real WGPU texture
    pub fn from_wgpu(texture: wgpu::Texture) -> Self {
        Self {
            inner: GpuTextureInner::Real(texture),
        }
    }

    /// Create mock texture (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize, width: u32, height: u32, mip_level_count: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            inner: GpuTextureInner::Mock {
                id,
                width,
                height,
                mip_level_count,
                format,
            },
        }
    }

    pub fn width(&self) -> u32 {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture.width(),
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture.height(),
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { height, .. } => *height,
        }
    }

    pub fn mip_level_count(&self) -> u32 {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture.mip_level_count(),
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { mip_level_count, .. } => *mip_level_count,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture.format(),
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { format, .. } => *format,
        }
    }

    /// Get the underlying wgpu::Texture (if real)
    ///
    /// # Panics
    /// Panics if this is a mock texture
    pub fn as_wgpu(&self) -> &wgpu::Texture {
        match &self.inner {
            GpuTextureInner::Real(texture) => texture,
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Texture from mock texture - this is a test-only texture")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuTextureInner::Mock { .. })
    }

    /// Get mock ID
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuTextureInner::Mock { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around a shader module that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuShaderModule {
    inner: GpuShaderModuleInner,
}

#[derive(Clone, Debug)]
enum GpuShaderModuleInner {
    Real(wgpu::ShaderModule),
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuShaderModule {
    pub fn from_wgpu(module: wgpu::ShaderModule) -> Self {
        Self {
            inner: GpuShaderModuleInner::Real(module),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuShaderModuleInner::Mock { id },
        }
    }

    /// # Panics
    /// Panics if this is a mock shader module
    pub fn as_wgpu(&self) -> &wgpu::ShaderModule {
        match &self.inner {
            GpuShaderModuleInner::Real(module) => module,
            #[cfg(feature = "mock")]
            GpuShaderModuleInner::Mock { .. } => {
                panic!("Attempted to get wgpu::ShaderModule from mock shader module")
            }
        }
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuShaderModuleInner::Mock { .. })
    }

    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuShaderModuleInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around a sampler that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuSampler {
    inner: GpuSamplerInner,
}

#[derive(Clone, Debug)]
enum GpuSamplerInner {
    Real(wgpu::Sampler),
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuSampler {
    pub fn from_wgpu(sampler: wgpu::Sampler) -> Self {
        Self {
            inner: GpuSamplerInner::Real(sampler),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuSamplerInner::Mock { id },
        }
    }

    /// # Panics
    /// Panics if this is a mock sampler
    pub fn as_wgpu(&self) -> &wgpu::Sampler {
        match &self.inner {
            GpuSamplerInner::Real(sampler) => sampler,
            #[cfg(feature = "mock")]
            GpuSamplerInner::Mock { .. } => panic!("Attempted to get wgpu::Sampler from mock sampler"),
        }
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuSamplerInner::Mock { .. })
    }
}
