//! Per-frame bookkeeping: draw recording, statistics and the render loop clock.

use std::collections::VecDeque;
use std::ops::Range;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use reelkit_core::geometry::Rect;
use reelkit_core::profiling::profile_function;

use crate::Color;

/// Longest simulation step a single frame may advance.
///
/// Frames that arrive later than this (tab switch, debugger pause) are
/// treated as this long so reels and particles never jump.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Handle to a linked program owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

/// Handle to a texture owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

/// Handle to a vertex or index buffer owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Snapshot of renderer counters.
///
/// Draw call, triangle and vertex counts cover the frame currently being
/// recorded and are reset by `Renderer::clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub triangles: u64,
    pub vertices: u64,
    /// Bytes of texture memory held, mip chains included.
    pub texture_memory: u64,
    /// Duration of the last completed frame.
    pub frame_time: Duration,
    pub frame_count: u64,
    /// Rolling frames per second.
    pub fps: f32,
}

/// Uniform block shared by every bundled shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub viewport: [f32; 2],
    /// Seconds of engine time, drives sparkle flicker.
    pub time: f32,
    pub _pad: f32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<FrameUniforms>(), 16);

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    pub instance_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub texture: Option<TextureId>,
    /// Vertex range for array draws, index range for element draws.
    pub elements: Range<u32>,
    pub instances: u32,
    /// Pixel rectangle outside of which nothing is drawn.
    pub scissor: Option<Rect<u32>>,
}

impl DrawCommand {
    /// A non-indexed draw of `vertices` from `vertex_buffer`.
    pub fn arrays(program: ProgramId, vertex_buffer: BufferId, vertices: Range<u32>) -> Self {
        Self {
            program,
            vertex_buffer,
            instance_buffer: None,
            index_buffer: None,
            texture: None,
            elements: vertices,
            instances: 1,
            scissor: None,
        }
    }

    /// An indexed draw of `indices` from `index_buffer`.
    pub fn elements(program: ProgramId, vertex_buffer: BufferId, index_buffer: BufferId, indices: Range<u32>) -> Self {
        Self {
            index_buffer: Some(index_buffer),
            ..Self::arrays(program, vertex_buffer, indices)
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_instances(mut self, instance_buffer: BufferId, count: u32) -> Self {
        self.instance_buffer = Some(instance_buffer);
        self.instances = count;
        self
    }

    pub fn with_scissor(mut self, scissor: Rect<u32>) -> Self {
        self.scissor = Some(scissor);
        self
    }

    /// Triangles this command produces (triangle lists only).
    pub fn triangle_count(&self) -> u64 {
        (self.elements.len() as u64 / 3) * self.instances as u64
    }

    pub fn vertex_count(&self) -> u64 {
        self.elements.len() as u64 * self.instances as u64
    }
}

/// Everything drawn between `clear` and `present`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub clear_color: Color,
    pub viewport: (u32, u32),
    pub uniforms: FrameUniforms,
    pub commands: Vec<DrawCommand>,
}

impl RecordedFrame {
    pub fn new(clear_color: Color, viewport: (u32, u32), time: f32) -> Self {
        Self {
            clear_color,
            viewport,
            uniforms: FrameUniforms {
                viewport: [viewport.0 as f32, viewport.1 as f32],
                time,
                _pad: 0.0,
            },
            commands: Vec::new(),
        }
    }
}

/// Frame timing produced by [`RenderLoop::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTime {
    /// Simulation time advanced by this frame (clamped to [`MAX_FRAME_DELTA`]).
    pub delta: Duration,
    /// Total simulation time since the loop was created.
    pub elapsed: Duration,
    pub frame_count: u64,
}

impl FrameTime {
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[inline]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Conditional frame clock.
///
/// The host calls [`tick`](Self::tick) from its frame callback while
/// [`is_running`](Self::is_running) is true. Simulation time only advances
/// while the loop runs; stopping and restarting does not count the idle gap.
#[derive(Debug)]
pub struct RenderLoop {
    running: bool,
    last_tick: Option<Instant>,
    elapsed: Duration,
    frame_count: u64,
    fps: FpsCounter,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            running: false,
            last_tick: None,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fps: FpsCounter::new(60),
        }
    }

    /// Start the loop. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        tracing::debug!("Render loop started");
        self.running = true;
        self.last_tick = None;
        true
    }

    /// Stop the loop. Returns `false` if it was already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        tracing::debug!("Render loop stopped after {} frames", self.frame_count);
        self.running = false;
        self.last_tick = None;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance using wall-clock time.
    ///
    /// The first tick after `start` has a zero delta. Returns `None` while
    /// the loop is stopped.
    pub fn tick(&mut self, now: Instant) -> Option<FrameTime> {
        profile_function!();
        if !self.running {
            return None;
        }
        let delta = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        Some(self.advance(delta))
    }

    /// Advance by an explicit delta, for deterministic stepping.
    pub fn tick_with_delta(&mut self, delta: Duration) -> Option<FrameTime> {
        if !self.running {
            return None;
        }
        Some(self.advance(delta))
    }

    fn advance(&mut self, delta: Duration) -> FrameTime {
        let delta = delta.min(MAX_FRAME_DELTA);
        self.elapsed += delta;
        self.frame_count += 1;
        self.fps.push(delta);
        FrameTime {
            delta,
            elapsed: self.elapsed,
            frame_count: self.frame_count,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling average of frame durations.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: usize,
    samples: VecDeque<Duration>,
    total: Duration,
}

impl FpsCounter {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window),
            total: Duration::ZERO,
        }
    }

    pub fn push(&mut self, frame: Duration) {
        if self.samples.len() == self.window
            && let Some(old) = self.samples.pop_front()
        {
            self.total -= old;
        }
        self.samples.push_back(frame);
        self.total += frame;
    }

    /// Frames per second over the window, `0.0` before any non-zero sample.
    pub fn fps(&self) -> f32 {
        if self.total.is_zero() {
            return 0.0;
        }
        self.samples.len() as f32 / self.total.as_secs_f32()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_idempotent() {
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.start());
        assert!(!render_loop.start());
        assert!(render_loop.is_running());
        assert!(render_loop.stop());
        assert!(!render_loop.stop());
    }

    #[test]
    fn test_tick_requires_running() {
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.tick(Instant::now()).is_none());
        assert!(render_loop.tick_with_delta(Duration::from_millis(16)).is_none());
    }

    #[test]
    fn test_first_tick_has_zero_delta() {
        let mut render_loop = RenderLoop::new();
        render_loop.start();
        let t0 = Instant::now();
        let first = render_loop.tick(t0).unwrap();
        assert_eq!(first.delta, Duration::ZERO);
        let second = render_loop.tick(t0 + Duration::from_millis(16)).unwrap();
        assert_eq!(second.delta, Duration::from_millis(16));
        assert_eq!(second.frame_count, 2);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut render_loop = RenderLoop::new();
        render_loop.start();
        let time = render_loop.tick_with_delta(Duration::from_secs(3)).unwrap();
        assert_eq!(time.delta, MAX_FRAME_DELTA);
        assert_eq!(render_loop.elapsed(), MAX_FRAME_DELTA);
    }

    #[test]
    fn test_idle_gap_not_counted() {
        let mut render_loop = RenderLoop::new();
        render_loop.start();
        let t0 = Instant::now();
        render_loop.tick(t0);
        render_loop.tick(t0 + Duration::from_millis(10));
        render_loop.stop();
        render_loop.start();
        let resumed = render_loop.tick(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(resumed.delta, Duration::ZERO);
        assert_eq!(render_loop.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn test_fps_counter_rolls() {
        let mut counter = FpsCounter::new(4);
        for _ in 0..4 {
            counter.push(Duration::from_millis(20));
        }
        assert!((counter.fps() - 50.0).abs() < 0.01);
        for _ in 0..4 {
            counter.push(Duration::from_millis(10));
        }
        assert!(counter.is_full());
        assert!((counter.fps() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_draw_command_counts() {
        let cmd = DrawCommand::arrays(ProgramId(0), BufferId(0), 0..6).with_instances(BufferId(1), 10);
        assert_eq!(cmd.triangle_count(), 20);
        assert_eq!(cmd.vertex_count(), 60);
    }
}
