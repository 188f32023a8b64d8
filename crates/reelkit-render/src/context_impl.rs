//! Implementation of RenderContext for GraphicsContext.

use crate::context::GraphicsContext;
use reelkit_test_utils::{GpuBuffer, GpuSampler, GpuShaderModule, GpuTexture, RenderContext, TextureRegion};
use wgpu::util::DeviceExt;
use wgpu::{BufferDescriptor, BufferUsages, SamplerDescriptor, ShaderModuleDescriptor, TextureDescriptor};

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        GpuBuffer::from_wgpu(self.device.create_buffer(desc))
    }

    fn create_buffer_init(&self, label: Option<&str>, contents: &[u8], usage: BufferUsages) -> GpuBuffer {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label,
            contents,
            usage,
        });
        GpuBuffer::from_wgpu(buffer)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        buffer.as_wgpu().destroy();
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        GpuTexture::from_wgpu(self.device.create_texture(desc))
    }

    fn write_texture(&self, texture: &GpuTexture, region: TextureRegion, data: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: texture.as_wgpu(),
                mip_level: region.mip_level,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * 4),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn destroy_texture(&self, texture: &GpuTexture) {
        texture.as_wgpu().destroy();
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        GpuSampler::from_wgpu(self.device.create_sampler(desc))
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GpuShaderModule {
        GpuShaderModule::from_wgpu(self.device.create_shader_module(desc.clone()))
    }
}
