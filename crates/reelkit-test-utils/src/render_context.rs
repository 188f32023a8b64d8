//! Trait abstracting GPU resource operations.

use crate::gpu_types::*;
use wgpu::{BufferDescriptor, BufferUsages, SamplerDescriptor, ShaderModuleDescriptor, TextureDescriptor};

/// A region of a texture written by [`RenderContext::write_texture`].
///
/// Data is always tightly packed RGBA8 (`width * 4` bytes per row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub mip_level: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    /// The whole of a mip level whose dimensions are `width` x `height`.
    pub fn full(mip_level: u32, width: u32, height: u32) -> Self {
        Self {
            mip_level,
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Number of bytes a tightly packed RGBA8 upload of this region needs.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Trait abstracting GPU resource creation and updates.
///
/// Methods take `&self` and return owned wrappers, so one context can be
/// shared between the renderer, the atlas and the animators through an
/// `Arc<dyn RenderContext>`. Mock implementations use interior mutability to
/// record calls.
pub trait RenderContext: Send + Sync {
    // Buffer operations

    /// Create an uninitialised GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Create a GPU buffer initialised with `contents`.
    fn create_buffer_init(&self, label: Option<&str>, contents: &[u8], usage: BufferUsages) -> GpuBuffer;

    /// Write data to a buffer at `offset`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Release the buffer's GPU memory immediately.
    fn destroy_buffer(&self, buffer: &GpuBuffer);

    // Texture operations

    /// Create a GPU texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture;

    /// Upload tightly packed RGBA8 pixels into a region of a texture.
    fn write_texture(&self, texture: &GpuTexture, region: TextureRegion, data: &[u8]);

    /// Release the texture's GPU memory immediately.
    fn destroy_texture(&self, texture: &GpuTexture);

    /// Create a texture sampler.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler;

    // Shader operations

    /// Create a shader module from already validated source.
    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule;
}
