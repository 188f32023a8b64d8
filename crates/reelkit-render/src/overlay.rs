//! Flat-colored overlay geometry: payline markers, connectors, screen flash.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use reelkit_core::geometry::Rect;
use reelkit_core::profiling::profile_scope;

use crate::context::GraphicsResult;
use crate::frame::{BufferId, DrawCommand, ProgramId};
use crate::renderer::{BufferKind, Renderer};
use crate::Color;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<ColorVertex>(), 24);

/// CPU-side list of colored triangles for one frame.
#[derive(Debug, Clone)]
pub struct OverlayBatch {
    vertices: Vec<ColorVertex>,
    max_quads: usize,
    dropped: usize,
}

impl OverlayBatch {
    pub fn new(max_quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_quads.min(1024) * 6),
            max_quads,
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.dropped = 0;
    }

    fn push_corners(&mut self, corners: [Vec2; 4], color: Color) {
        if self.quad_count() >= self.max_quads {
            self.dropped += 1;
            return;
        }
        let color = color.to_array();
        let [tl, tr, bl, br] = corners;
        for p in [tl, tr, bl, bl, tr, br] {
            self.vertices.push(ColorVertex {
                position: p.to_array(),
                color,
            });
        }
    }

    /// Axis-aligned filled rectangle.
    pub fn push_rect(&mut self, rect: Rect<f32>, color: Color) {
        let (x, y, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
        self.push_corners(
            [Vec2::new(x, y), Vec2::new(r, y), Vec2::new(x, b), Vec2::new(r, b)],
            color,
        );
    }

    /// Rectangle outline drawn inside `rect`.
    pub fn push_frame(&mut self, rect: Rect<f32>, thickness: f32, color: Color) {
        let t = thickness.min(rect.width / 2.0).min(rect.height / 2.0);
        self.push_rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.push_rect(Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
        self.push_rect(Rect::new(rect.x, rect.y + t, t, rect.height - 2.0 * t), color);
        self.push_rect(Rect::new(rect.right() - t, rect.y + t, t, rect.height - 2.0 * t), color);
    }

    /// Thick line segment from `a` to `b`.
    pub fn push_line(&mut self, a: Vec2, b: Vec2, thickness: f32, color: Color) {
        let dir = b - a;
        if dir.length_squared() <= f32::EPSILON {
            return;
        }
        let normal = dir.perp().normalize() * (thickness / 2.0);
        self.push_corners([a + normal, b + normal, a - normal, b - normal], color);
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Quads rejected since the last clear because the batch was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn vertices(&self) -> &[ColorVertex] {
        &self.vertices
    }
}

/// Uploads an [`OverlayBatch`] into a dynamic buffer and draws it.
#[derive(Debug)]
pub struct OverlayRenderer {
    program: ProgramId,
    buffer: BufferId,
    max_quads: usize,
}

impl OverlayRenderer {
    pub fn new(renderer: &mut Renderer, program: ProgramId, max_quads: usize) -> GraphicsResult<Self> {
        let capacity = (max_quads * 6 * std::mem::size_of::<ColorVertex>()) as u64;
        let buffer = renderer.create_dynamic_buffer("overlay vertices", capacity, BufferKind::Vertex)?;
        Ok(Self {
            program,
            buffer,
            max_quads,
        })
    }

    /// A batch sized to this renderer's buffer.
    pub fn batch(&self) -> OverlayBatch {
        OverlayBatch::new(self.max_quads)
    }

    pub fn render(&self, renderer: &mut Renderer, batch: &OverlayBatch) -> GraphicsResult<()> {
        profile_scope!("overlay_render");
        if batch.is_empty() {
            return Ok(());
        }
        if batch.dropped() > 0 {
            tracing::warn!("Overlay batch full, {} quads dropped", batch.dropped());
        }
        renderer.update_buffer(self.buffer, 0, bytemuck::cast_slice(batch.vertices()))?;
        renderer.draw_arrays(DrawCommand::arrays(
            self.program,
            self.buffer,
            0..batch.vertices().len() as u32,
        ))
    }
}
