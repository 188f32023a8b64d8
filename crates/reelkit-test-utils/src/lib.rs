//! GPU abstraction and test utilities for reelkit.
//!
//! The renderer never talks to `wgpu::Device` directly when it creates or
//! updates resources. It goes through the [`RenderContext`] trait, which the
//! wgpu-backed `GraphicsContext` implements for real rendering and
//! `MockRenderContext` (behind the `mock` feature) implements for tests that
//! must run without a GPU.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use reelkit_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//! let buffer = mock.create_buffer_init(Some("quads"), &[0u8; 64], BufferUsages::VERTEX);
//!
//! assert!(buffer.is_mock());
//! assert_eq!(buffer.size(), 64);
//! assert_eq!(mock.count_buffer_creates(), 1);
//! # }
//! ```
//!
//! All wrapper types are owned and cheap to clone, so no lifetimes leak out of
//! the trait and it stays object-safe (`Arc<dyn RenderContext>`).

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
