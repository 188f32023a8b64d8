//! reelkit Render
//!
//! The GPU side of the reel display: a [`Renderer`] that owns programs,
//! textures and buffers and records frames, the [`SymbolAtlas`] packer,
//! the [`ReelAnimator`] and the [`ParticleSimulator`].
//!
//! Resource creation goes through [`reelkit_test_utils::RenderContext`], so
//! everything here runs against a real [`GraphicsContext`] or, in tests, a
//! `MockRenderContext` with a [`NullTarget`].

pub mod atlas;
mod color;
mod context;
mod context_impl;
pub mod frame;
pub mod overlay;
pub mod particles;
pub mod reels;
mod renderer;
pub mod shader;
pub mod shaders;
pub mod target;

pub use atlas::{AtlasConfig, AtlasError, SymbolAtlas, SymbolDescriptor, SymbolImage, UvRect};
pub use color::Color;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError, GraphicsResult};
pub use frame::{BufferId, DrawCommand, FrameTime, ProgramId, RenderLoop, RenderStats, TextureId};
pub use overlay::{ColorVertex, OverlayBatch, OverlayRenderer};
pub use particles::{EffectConfig, EffectId, EffectKind, ParticleSimulator};
pub use reels::{Payline, ReelAnimator, ReelConfig, ReelLayout, ReelPhase, SpeedStagger, SpinPhase};
pub use renderer::{Buffer, BufferKind, FrameResources, Program, Renderer, Texture, TEXTURE_FORMAT, mip_level_count};
pub use shader::{ProgramLayout, ProgramSource, ShaderError, ShaderStage};
pub use target::{FrameTarget, NullTarget, OffscreenTarget, SurfaceTarget};

pub use reelkit_test_utils::RenderContext;
