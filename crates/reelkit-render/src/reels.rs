//! Reel animation: spin physics, symbol window resolution and payline
//! highlighting.
//!
//! Each reel is drawn as a fixed set of quads covering the visible rows plus
//! a margin above and below. The symbol shown in each quad is resolved from
//! the scroll position every frame, so a strip of any length scrolls forever
//! through the same small vertex buffer.

use std::time::Duration;

use glam::Vec2;
use reelkit_core::alloc::HashSet;
use reelkit_core::geometry::Rect;
use reelkit_core::profiling::profile_function;

use crate::atlas::SymbolAtlas;
use crate::context::GraphicsResult;
use crate::frame::{BufferId, DrawCommand, ProgramId, TextureId};
use crate::overlay::OverlayBatch;
use crate::renderer::{BufferKind, Renderer};
use crate::Color;

/// Colors cycled through by payline index.
pub const PAYLINE_PALETTE: [Color; 8] = [
    Color::rgb(1.0, 0.84, 0.0),
    Color::rgb(0.0, 0.9, 1.0),
    Color::rgb(1.0, 0.2, 0.6),
    Color::rgb(0.3, 1.0, 0.3),
    Color::rgb(1.0, 0.5, 0.0),
    Color::rgb(0.6, 0.4, 1.0),
    Color::rgb(1.0, 1.0, 1.0),
    Color::rgb(1.0, 0.3, 0.3),
];

const FLOATS_PER_QUAD: usize = 24;

/// How much faster each reel spins than the one to its left.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedStagger {
    /// Reel `i` spins at `1 + step * i` times the base speed.
    Linear { step: f32 },
    /// One multiplier per reel. Reels past the end reuse the last value.
    Explicit(Vec<f32>),
}

impl SpeedStagger {
    pub fn multiplier(&self, reel: usize) -> f32 {
        match self {
            SpeedStagger::Linear { step } => 1.0 + step * reel as f32,
            SpeedStagger::Explicit(multipliers) => multipliers
                .get(reel)
                .or_else(|| multipliers.last())
                .copied()
                .unwrap_or(1.0),
        }
    }
}

impl Default for SpeedStagger {
    fn default() -> Self {
        SpeedStagger::Linear { step: 0.08 }
    }
}

/// Geometry and physics shared by every reel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReelConfig {
    pub tile_width: f32,
    pub tile_height: f32,
    /// Horizontal gap between reels.
    pub spacing: f32,
    /// Free-spin speed of the first reel, px/s.
    pub base_speed: f32,
    pub stagger: SpeedStagger,
    /// Maximum deceleration while stopping, px/s².
    pub deceleration: f32,
    /// Distance from the target at which a slow reel snaps into place, px.
    pub snap_epsilon: f32,
    /// Speed below which a reel near its target may snap, px/s.
    pub stop_velocity_threshold: f32,
    /// Length of the payline fade before the highlight deadline.
    pub highlight_fade: Duration,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            tile_width: 128.0,
            tile_height: 128.0,
            spacing: 8.0,
            base_speed: 2000.0,
            stagger: SpeedStagger::default(),
            deceleration: 4000.0,
            snap_epsilon: 0.5,
            stop_velocity_threshold: 5.0,
            highlight_fade: Duration::from_secs(1),
        }
    }
}

/// Where the reels sit on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReelLayout {
    /// Top-left corner of the first reel's visible window.
    pub origin: Vec2,
    pub reel_count: usize,
    pub visible_rows: usize,
    /// Extra rows drawn above and below the window while scrolling.
    pub buffer_rows: usize,
}

impl ReelLayout {
    /// A layout with the reel block centred on a `width`x`height` surface.
    pub fn centered(
        width: f32,
        height: f32,
        reel_count: usize,
        visible_rows: usize,
        buffer_rows: usize,
        config: &ReelConfig,
    ) -> Self {
        let block_width = reel_count as f32 * config.tile_width + reel_count.saturating_sub(1) as f32 * config.spacing;
        let block_height = visible_rows as f32 * config.tile_height;
        Self {
            origin: Vec2::new((width - block_width) / 2.0, (height - block_height) / 2.0),
            reel_count,
            visible_rows,
            buffer_rows,
        }
    }

    /// Quads drawn per reel.
    pub fn slots_per_reel(&self) -> usize {
        self.visible_rows + 2 * self.buffer_rows
    }

    /// The visible window of `reel`.
    pub fn window(&self, reel: usize, config: &ReelConfig) -> Rect<f32> {
        Rect::new(
            self.origin.x + reel as f32 * (config.tile_width + config.spacing),
            self.origin.y,
            config.tile_width,
            self.visible_rows as f32 * config.tile_height,
        )
    }

    /// The cell at (`reel`, `row`) of the visible grid.
    pub fn cell(&self, reel: usize, row: usize, config: &ReelConfig) -> Rect<f32> {
        let window = self.window(reel, config);
        Rect::new(
            window.x,
            window.y + row as f32 * config.tile_height,
            config.tile_width,
            config.tile_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    /// Scrolling at constant speed with no outcome.
    Free,
    /// Slowing down toward the stop target.
    Decelerating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReelPhase {
    #[default]
    Idle,
    Spinning(SpinPhase),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReelState {
    /// Scroll offset in pixels.
    pub position: f32,
    /// px/s, never negative.
    pub velocity: f32,
    pub target: f32,
    pub spinning: bool,
    /// Symbols shown in the visible window once set, top row first.
    pub outcome: Vec<String>,
    pub phase: ReelPhase,
    deceleration: f32,
}

impl ReelState {
    fn reset(&mut self) {
        *self = ReelState::default();
    }

    fn settle(&mut self) {
        self.position = self.target;
        self.velocity = 0.0;
        self.deceleration = 0.0;
        self.spinning = false;
        self.phase = ReelPhase::Idle;
    }
}

/// An ordered row index per reel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Payline {
    pub rows: Vec<usize>,
}

impl Payline {
    pub fn new(rows: impl Into<Vec<usize>>) -> Self {
        Self { rows: rows.into() }
    }
}

/// Paylines currently highlighted and the engine time at which they vanish.
#[derive(Debug, Clone, PartialEq)]
pub struct PaylineHighlight {
    /// Indices into the full payline list.
    pub paylines: Vec<usize>,
    pub until: Duration,
}

#[derive(Debug, Clone, Copy)]
struct ReelBuffers {
    program: ProgramId,
    vertices: BufferId,
}

/// Owns every reel's state and draws them.
#[derive(Debug)]
pub struct ReelAnimator {
    layout: ReelLayout,
    config: ReelConfig,
    reels: Vec<ReelState>,
    strips: Vec<Vec<String>>,
    paylines: Vec<Payline>,
    selected_paylines: usize,
    highlight: Option<PaylineHighlight>,
    time: Duration,
    shake: Vec2,
    vertices: Vec<f32>,
    missing: HashSet<String>,
    buffers: Option<ReelBuffers>,
}

impl ReelAnimator {
    pub fn new(layout: ReelLayout, config: ReelConfig) -> Self {
        Self {
            reels: vec![ReelState::default(); layout.reel_count],
            layout,
            config,
            strips: Vec::new(),
            paylines: Vec::new(),
            selected_paylines: 0,
            highlight: None,
            time: Duration::ZERO,
            shake: Vec2::ZERO,
            vertices: Vec::new(),
            missing: HashSet::default(),
            buffers: None,
        }
    }

    /// Create the vertex buffer for every reel's quads.
    pub fn prepare(&mut self, renderer: &mut Renderer, program: ProgramId) -> GraphicsResult<()> {
        let quads = self.layout.reel_count * self.layout.slots_per_reel();
        let bytes = (quads.max(1) * FLOATS_PER_QUAD * std::mem::size_of::<f32>()) as u64;
        let vertices = renderer.create_dynamic_buffer("reel quads", bytes, BufferKind::Vertex)?;
        self.buffers = Some(ReelBuffers { program, vertices });
        Ok(())
    }

    pub fn layout(&self) -> &ReelLayout {
        &self.layout
    }

    pub fn set_layout_origin(&mut self, origin: Vec2) {
        self.layout.origin = origin;
    }

    pub fn config(&self) -> &ReelConfig {
        &self.config
    }

    /// Replace reel physics. Running spins keep their current velocity.
    pub fn set_config(&mut self, config: ReelConfig) {
        self.config = config;
    }

    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    pub fn reel(&self, index: usize) -> Option<&ReelState> {
        self.reels.get(index)
    }

    pub fn phase(&self, index: usize) -> Option<ReelPhase> {
        self.reels.get(index).map(|r| r.phase)
    }

    pub fn is_spinning(&self) -> bool {
        self.reels.iter().any(|r| r.spinning)
    }

    /// Engine time seen by the animator.
    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn set_reel_data(&mut self, strips: Vec<Vec<String>>) {
        for (i, strip) in strips.iter().enumerate() {
            if strip.is_empty() {
                tracing::warn!("Reel {} has an empty strip", i);
            }
        }
        self.strips = strips;
    }

    pub fn strip(&self, index: usize) -> Option<&[String]> {
        self.strips.get(index).map(Vec::as_slice)
    }

    /// Start every reel spinning freely, discarding previous outcomes.
    pub fn start_spin(&mut self) {
        for (i, reel) in self.reels.iter_mut().enumerate() {
            reel.velocity = self.config.base_speed * self.config.stagger.multiplier(i);
            reel.outcome.clear();
            reel.deceleration = 0.0;
            reel.spinning = true;
            reel.phase = ReelPhase::Spinning(SpinPhase::Free);
        }
        tracing::debug!("Started spin on {} reels", self.reels.len());
    }

    /// Give `index` its outcome and begin slowing it to a stop.
    ///
    /// A reel that is not spinning shows the outcome at once. Returns false
    /// when the index is out of range.
    pub fn stop_reel(&mut self, index: usize, outcome: Vec<String>) -> bool {
        let h = self.config.tile_height;
        let max_decel = self.config.deceleration.max(f32::EPSILON);
        let Some(reel) = self.reels.get_mut(index) else {
            return false;
        };

        reel.outcome = outcome;
        if !reel.spinning || reel.velocity <= 0.0 {
            reel.target = 0.0;
            reel.settle();
            return true;
        }

        let natural = reel.velocity * reel.velocity / (2.0 * max_decel);
        let distance = natural.max(reel.outcome.len() as f32 * h);
        reel.target = ((reel.position + distance) / h).ceil() * h;
        let remaining = reel.target - reel.position;
        reel.deceleration = reel.velocity * reel.velocity / (2.0 * remaining);
        reel.phase = ReelPhase::Spinning(SpinPhase::Decelerating);
        tracing::debug!(
            "Stopping reel {} over {:.1}px at {:.1}px/s²",
            index,
            remaining,
            reel.deceleration
        );
        true
    }

    /// Force every reel to rest showing `grid[reel]`.
    ///
    /// Reels beyond the grid keep an empty outcome and show their strip.
    pub fn show_final_outcome(&mut self, grid: &[Vec<String>]) {
        for (i, reel) in self.reels.iter_mut().enumerate() {
            reel.outcome = grid.get(i).cloned().unwrap_or_default();
            reel.target = 0.0;
            reel.settle();
        }
    }

    /// Stop and zero every reel and drop any highlight.
    pub fn reset(&mut self) {
        self.reels.iter_mut().for_each(ReelState::reset);
        self.highlight = None;
        self.shake = Vec2::ZERO;
    }

    pub fn update(&mut self, dt: Duration) {
        profile_function!();
        self.time += dt;
        let dt = dt.as_secs_f32();
        let h = self.config.tile_height;

        for (i, reel) in self.reels.iter_mut().enumerate() {
            match reel.phase {
                ReelPhase::Idle => continue,
                ReelPhase::Spinning(SpinPhase::Free) => {
                    reel.position += reel.velocity * dt;
                }
                ReelPhase::Spinning(SpinPhase::Decelerating) => {
                    let remaining = (reel.target - reel.position).max(0.0);
                    let time_to_stop = if reel.deceleration > 0.0 {
                        reel.velocity / reel.deceleration
                    } else {
                        0.0
                    };
                    if dt >= time_to_stop {
                        reel.position = reel.target;
                        reel.velocity = 0.0;
                    } else {
                        let moved = reel.velocity * dt - 0.5 * reel.deceleration * dt * dt;
                        reel.position += moved.clamp(0.0, remaining);
                        reel.velocity = (reel.velocity - reel.deceleration * dt).max(0.0);
                    }
                    if reel.target - reel.position <= self.config.snap_epsilon
                        && reel.velocity <= self.config.stop_velocity_threshold
                    {
                        reel.settle();
                        tracing::trace!("Reel {} stopped", i);
                    }
                }
            }

            // Keep positions small; the symbol lookup is periodic in the strip length.
            let period = self.strips.get(i).map_or(0, Vec::len) as f32 * h;
            if period > 0.0 && reel.position >= period {
                let wraps = (reel.position / period).floor() * period;
                reel.position -= wraps;
                reel.target -= wraps;
            }
        }

        if let Some(highlight) = &self.highlight
            && self.time >= highlight.until
        {
            self.highlight = None;
        }
    }

    /// Symbol shown at `row` of `reel`; row 0 is the top visible row and
    /// negative rows lie above the window.
    pub fn symbol_at(&self, reel: usize, row: i64) -> Option<&str> {
        let state = self.reels.get(reel)?;
        if row >= 0
            && (row as usize) < self.layout.visible_rows
            && let Some(symbol) = state.outcome.get(row as usize)
        {
            return Some(symbol);
        }
        let strip = self.strips.get(reel).filter(|s| !s.is_empty())?;
        let base = (state.position / self.config.tile_height).floor() as i64;
        let index = (base + row).rem_euclid(strip.len() as i64) as usize;
        Some(&strip[index])
    }

    /// The symbols in the visible window of `reel`, top first.
    pub fn visible_symbols(&self, reel: usize) -> Vec<String> {
        (0..self.layout.visible_rows as i64)
            .filter_map(|row| self.symbol_at(reel, row).map(str::to_string))
            .collect()
    }

    pub fn set_paylines(&mut self, paylines: Vec<Payline>) {
        self.paylines = paylines;
        self.selected_paylines = self.selected_paylines.min(self.paylines.len());
        self.highlight = None;
    }

    pub fn paylines(&self) -> &[Payline] {
        &self.paylines
    }

    /// Only the first `count` paylines may be highlighted.
    pub fn set_selected_paylines(&mut self, count: usize) {
        self.selected_paylines = count.min(self.paylines.len());
        if let Some(highlight) = &mut self.highlight {
            let selected = self.selected_paylines;
            highlight.paylines.retain(|&i| i < selected);
            if highlight.paylines.is_empty() {
                self.highlight = None;
            }
        }
    }

    pub fn selected_paylines(&self) -> usize {
        self.selected_paylines
    }

    /// Highlight the given payline indices for `duration`.
    ///
    /// Indices outside the selected count are ignored. Returns how many
    /// paylines ended up highlighted.
    pub fn highlight_paylines(&mut self, indices: &[usize], duration: Duration) -> usize {
        let selected = self.selected_paylines;
        let outside = indices.iter().filter(|&&i| i >= selected).count();
        if outside > 0 {
            tracing::debug!("Ignoring {} payline indices outside the {} selected", outside, selected);
        }
        let mut seen = HashSet::new();
        let paylines: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < selected && seen.insert(i))
            .collect();
        if paylines.is_empty() || duration.is_zero() {
            self.highlight = None;
            return 0;
        }
        let count = paylines.len();
        self.highlight = Some(PaylineHighlight {
            paylines,
            until: self.time + duration,
        });
        count
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    pub fn highlight(&self) -> Option<&PaylineHighlight> {
        self.highlight.as_ref()
    }

    /// Opacity of the payline highlight: 1 until the fade window, then
    /// linear down to 0 at the deadline.
    pub fn highlight_alpha(&self) -> f32 {
        let Some(highlight) = &self.highlight else {
            return 0.0;
        };
        let remaining = highlight.until.saturating_sub(self.time);
        if remaining.is_zero() {
            return 0.0;
        }
        let fade = self.config.highlight_fade.as_secs_f32();
        if fade <= 0.0 {
            return 1.0;
        }
        (remaining.as_secs_f32() / fade).clamp(0.0, 1.0)
    }

    /// Offset added to all reel and payline geometry.
    pub fn set_shake(&mut self, offset: Vec2) {
        self.shake = offset;
    }

    pub fn shake(&self) -> Vec2 {
        self.shake
    }

    /// Whether anything here still needs frames.
    pub fn is_animating(&self) -> bool {
        self.is_spinning() || self.highlight.is_some()
    }

    /// Upload every reel's quads and draw each reel clipped to its window.
    pub fn render(&mut self, renderer: &mut Renderer, atlas: &SymbolAtlas) -> GraphicsResult<()> {
        profile_function!();
        let Some(ReelBuffers { program, vertices: buffer }) = self.buffers else {
            return Ok(());
        };
        let Some(texture) = atlas.texture() else {
            tracing::warn!("Reels rendered before the symbol atlas was ready");
            return Ok(());
        };

        let slots = self.layout.slots_per_reel();
        let buffer_rows = self.layout.buffer_rows as i64;
        let (w, h) = (self.config.tile_width, self.config.tile_height);

        let mut vertices = std::mem::take(&mut self.vertices);
        let mut unknown: Vec<(usize, String)> = Vec::new();
        vertices.clear();
        for reel in 0..self.reels.len() {
            let window = self.layout.window(reel, &self.config);
            let frac = self.reels[reel].position.rem_euclid(h);
            for row in -buffer_rows..(self.layout.visible_rows as i64 + buffer_rows) {
                let x = window.x + self.shake.x;
                let y = window.y + row as f32 * h - frac + self.shake.y;
                let quad = match self.symbol_at(reel, row) {
                    Some(id) => {
                        let quad = atlas.create_symbol_quad(id, x, y, w, h);
                        if quad.is_none() {
                            unknown.push((reel, id.to_string()));
                        }
                        quad
                    }
                    None => None,
                };
                // Unresolved slots become degenerate quads so reel offsets stay fixed.
                vertices.extend_from_slice(&quad.unwrap_or([0.0; FLOATS_PER_QUAD]));
            }
        }
        for (reel, id) in unknown {
            if !self.missing.contains(&id) {
                tracing::warn!("Symbol '{}' on reel {} has no atlas entry", id, reel);
                self.missing.insert(id);
            }
        }

        let result = self.draw(renderer, program, buffer, texture, &vertices, slots);
        self.vertices = vertices;
        result
    }

    fn draw(
        &self,
        renderer: &mut Renderer,
        program: ProgramId,
        buffer: BufferId,
        texture: TextureId,
        vertices: &[f32],
        slots: usize,
    ) -> GraphicsResult<()> {
        renderer.update_buffer(buffer, 0, bytemuck::cast_slice(vertices))?;
        let (viewport_w, viewport_h) = renderer.viewport();
        let per_reel = (slots * 6) as u32;
        for reel in 0..self.reels.len() {
            let start = reel as u32 * per_reel;
            let window = self.layout.window(reel, &self.config);
            let mut command = DrawCommand::arrays(program, buffer, start..start + per_reel).with_texture(texture);
            if let Some(scissor) = clip_to_viewport(window, self.shake, viewport_w, viewport_h) {
                command = command.with_scissor(scissor);
            }
            renderer.draw_arrays(command)?;
        }
        Ok(())
    }

    /// Add payline markers and connectors for the current highlight.
    pub fn build_payline_overlay(&self, batch: &mut OverlayBatch) {
        let alpha = self.highlight_alpha();
        let Some(highlight) = &self.highlight else {
            return;
        };
        if alpha <= 0.0 {
            return;
        }

        let thickness = (self.config.tile_width.min(self.config.tile_height) * 0.04).max(2.0);
        for &index in &highlight.paylines {
            let Some(payline) = self.paylines.get(index) else {
                continue;
            };
            let color = PAYLINE_PALETTE[index % PAYLINE_PALETTE.len()].with_alpha(alpha);
            let mut previous: Option<Vec2> = None;
            for (reel, &row) in payline.rows.iter().enumerate().take(self.reels.len()) {
                if row >= self.layout.visible_rows {
                    previous = None;
                    continue;
                }
                let mut cell = self.layout.cell(reel, row, &self.config);
                cell.x += self.shake.x;
                cell.y += self.shake.y;
                batch.push_frame(cell, thickness, color);

                let center = Vec2::new(cell.x + cell.width / 2.0, cell.y + cell.height / 2.0);
                if let Some(prev) = previous {
                    batch.push_line(prev, center, thickness * 0.75, color);
                }
                previous = Some(center);
            }
        }
    }
}

fn clip_to_viewport(window: Rect<f32>, shake: Vec2, width: u32, height: u32) -> Option<Rect<u32>> {
    let left = (window.x + shake.x).floor().clamp(0.0, width as f32) as u32;
    let top = (window.y + shake.y).floor().clamp(0.0, height as f32) as u32;
    let right = (window.right() + shake.x).ceil().clamp(0.0, width as f32) as u32;
    let bottom = (window.bottom() + shake.y).ceil().clamp(0.0, height as f32) as u32;
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(left, top, right - left, bottom - top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasConfig, FileImageLoader, SymbolDescriptor};
    use crate::shader::{ProgramLayout, ProgramSource};
    use crate::shaders;
    use crate::target::NullTarget;
    use reelkit_test_utils::MockRenderContext;
    use std::sync::Arc;

    const FRAME: Duration = Duration::from_millis(16);

    fn strip(symbols: &str) -> Vec<String> {
        symbols.chars().map(|c| c.to_string()).collect()
    }

    fn outcome(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn animator() -> ReelAnimator {
        let config = ReelConfig::default();
        let layout = ReelLayout::centered(800.0, 600.0, 5, 3, 1, &config);
        let mut reels = ReelAnimator::new(layout, config);
        reels.set_reel_data(vec![strip("ABCD_ABCD_"); 5]);
        reels
    }

    fn run_until_idle(reels: &mut ReelAnimator, reel: usize) -> usize {
        let mut frames = 0;
        while reels.phase(reel) != Some(ReelPhase::Idle) {
            reels.update(FRAME);
            frames += 1;
            assert!(frames < 10_000, "reel never stopped");
        }
        frames
    }

    #[test]
    fn test_stagger_multipliers() {
        assert_eq!(SpeedStagger::Linear { step: 0.1 }.multiplier(0), 1.0);
        assert!((SpeedStagger::Linear { step: 0.1 }.multiplier(3) - 1.3).abs() < 1e-6);
        let explicit = SpeedStagger::Explicit(vec![1.0, 1.2]);
        assert_eq!(explicit.multiplier(1), 1.2);
        assert_eq!(explicit.multiplier(4), 1.2);
        assert_eq!(SpeedStagger::Explicit(Vec::new()).multiplier(0), 1.0);
    }

    #[test]
    fn test_spin_staggers_reel_speeds() {
        let mut reels = animator();
        reels.start_spin();
        let speeds: Vec<f32> = (0..5).map(|i| reels.reel(i).unwrap().velocity).collect();
        assert!(speeds.windows(2).all(|w| w[1] > w[0]));
        assert!((0..5).all(|i| reels.phase(i) == Some(ReelPhase::Spinning(SpinPhase::Free))));
    }

    #[test]
    fn test_free_spin_advances_position() {
        let mut reels = animator();
        reels.start_spin();
        reels.update(Duration::from_millis(10));
        let reel = reels.reel(0).unwrap();
        assert!((reel.position - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_stop_reel_decelerates_monotonically() {
        let mut reels = animator();
        reels.start_spin();
        for _ in 0..30 {
            reels.update(FRAME);
        }
        assert!(reels.stop_reel(2, outcome(&["A", "B", "C"])));
        assert_eq!(reels.phase(2), Some(ReelPhase::Spinning(SpinPhase::Decelerating)));

        let mut last_velocity = reels.reel(2).unwrap().velocity;
        let mut last_distance = reels.reel(2).unwrap().target - reels.reel(2).unwrap().position;
        while reels.phase(2) != Some(ReelPhase::Idle) {
            reels.update(FRAME);
            let reel = reels.reel(2).unwrap();
            let distance = (reel.target - reel.position).abs();
            assert!(reel.velocity <= last_velocity);
            assert!(distance <= last_distance + 1e-3);
            last_velocity = reel.velocity;
            last_distance = distance;
        }
        let reel = reels.reel(2).unwrap();
        assert_eq!(reel.velocity, 0.0);
        assert_eq!(reel.position, reel.target);
        assert_eq!(reels.visible_symbols(2), outcome(&["A", "B", "C"]));
        // Other reels keep spinning.
        assert_eq!(reels.phase(0), Some(ReelPhase::Spinning(SpinPhase::Free)));
    }

    #[test]
    fn test_stop_target_is_tile_aligned_and_past_outcome() {
        let mut reels = animator();
        reels.start_spin();
        reels.update(Duration::from_millis(123));
        let start = reels.reel(1).unwrap().position;
        reels.stop_reel(1, outcome(&["A", "B", "C"]));
        let reel = reels.reel(1).unwrap();
        assert_eq!((reel.target / 128.0).fract(), 0.0);
        assert!(reel.target - start >= 3.0 * 128.0);
        assert!(reel.deceleration <= ReelConfig::default().deceleration);
    }

    #[test]
    fn test_stop_reaches_idle_with_huge_deceleration() {
        let config = ReelConfig {
            deceleration: 1.0e6,
            ..ReelConfig::default()
        };
        let layout = ReelLayout::centered(800.0, 600.0, 1, 3, 1, &config);
        let mut reels = ReelAnimator::new(layout, config);
        reels.set_reel_data(vec![strip("ABC")]);
        reels.start_spin();
        reels.update(FRAME);
        reels.stop_reel(0, outcome(&["C", "C", "C"]));
        run_until_idle(&mut reels, 0);
        assert_eq!(reels.visible_symbols(0), outcome(&["C", "C", "C"]));
    }

    #[test]
    fn test_stop_idle_reel_shows_outcome_immediately() {
        let mut reels = animator();
        reels.stop_reel(4, outcome(&["D", "D", "A"]));
        assert_eq!(reels.phase(4), Some(ReelPhase::Idle));
        assert_eq!(reels.visible_symbols(4), outcome(&["D", "D", "A"]));
        assert!(!reels.stop_reel(5, outcome(&["A"])));
    }

    #[test]
    fn test_symbol_resolution_wraps_strip() {
        let mut reels = animator();
        assert_eq!(reels.visible_symbols(0), outcome(&["A", "B", "C"]));
        assert_eq!(reels.symbol_at(0, -1), Some("_"));

        reels.start_spin();
        // Just over two tiles at 2000px/s.
        reels.update(Duration::from_millis(130));
        assert_eq!(reels.visible_symbols(0), outcome(&["C", "D", "_"]));
        assert_eq!(reels.symbol_at(0, 3), Some("A"));
    }

    #[test]
    fn test_outcome_only_replaces_visible_rows() {
        let mut reels = animator();
        reels.show_final_outcome(&[outcome(&["D", "D", "D"])]);
        assert_eq!(reels.visible_symbols(0), outcome(&["D", "D", "D"]));
        assert_eq!(reels.symbol_at(0, -1), Some("_"));
        assert_eq!(reels.symbol_at(0, 3), Some("D"));
        // Reels missing from the grid show their strip.
        assert_eq!(reels.visible_symbols(1), outcome(&["A", "B", "C"]));
    }

    #[test]
    fn test_show_final_outcome_is_idempotent() {
        let grid = vec![outcome(&["A", "B", "C"]); 5];
        let mut reels = animator();
        reels.start_spin();
        reels.update(FRAME);
        reels.show_final_outcome(&grid);
        let first: Vec<ReelState> = (0..5).map(|i| reels.reel(i).unwrap().clone()).collect();
        reels.show_final_outcome(&grid);
        let second: Vec<ReelState> = (0..5).map(|i| reels.reel(i).unwrap().clone()).collect();
        assert_eq!(first, second);
        assert!(!reels.is_spinning());
        assert!((0..5).all(|i| reels.reel(i).unwrap().position == 0.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut reels = animator();
        reels.set_paylines(vec![Payline::new([1, 1, 1, 1, 1])]);
        reels.set_selected_paylines(1);
        reels.highlight_paylines(&[0], Duration::from_secs(1));
        reels.start_spin();
        reels.update(FRAME);
        reels.reset();
        assert!(!reels.is_animating());
        assert!((0..5).all(|i| reels.reel(i).unwrap() == &ReelState::default()));
    }

    #[test]
    fn test_long_spin_keeps_position_bounded() {
        let mut reels = animator();
        reels.start_spin();
        for _ in 0..600 {
            reels.update(FRAME);
        }
        let period = 10.0 * 128.0;
        assert!((0..5).all(|i| reels.reel(i).unwrap().position < period));
    }

    #[test]
    fn test_highlight_respects_selected_count() {
        let mut reels = animator();
        reels.set_paylines((0..5).map(|r| Payline::new([r % 3; 5])).collect());
        reels.set_selected_paylines(2);
        assert_eq!(reels.highlight_paylines(&[0, 1, 4], Duration::from_secs(3)), 2);
        assert_eq!(reels.highlight().unwrap().paylines, vec![0, 1]);
        assert_eq!(reels.highlight_paylines(&[3], Duration::from_secs(3)), 0);
        assert!(reels.highlight().is_none());
    }

    #[test]
    fn test_highlight_drops_repeated_indices() {
        let mut reels = animator();
        reels.set_paylines((0..5).map(|r| Payline::new([r % 3; 5])).collect());
        reels.set_selected_paylines(5);
        assert_eq!(reels.highlight_paylines(&[3, 1, 3], Duration::from_secs(3)), 2);
        assert_eq!(reels.highlight().unwrap().paylines, vec![3, 1]);
        assert_eq!(reels.highlight_paylines(&[2, 7, 2, 2, 0], Duration::from_secs(3)), 2);
        assert_eq!(reels.highlight().unwrap().paylines, vec![2, 0]);
    }

    #[test]
    fn test_highlight_fades_then_clears() {
        let mut reels = animator();
        reels.set_paylines(vec![Payline::new([0, 1, 2, 1, 0])]);
        reels.set_selected_paylines(1);
        reels.highlight_paylines(&[0], Duration::from_millis(3000));

        let mut last_alpha = reels.highlight_alpha();
        assert_eq!(last_alpha, 1.0);
        for _ in 0..300 {
            reels.update(Duration::from_millis(10));
            let alpha = reels.highlight_alpha();
            assert!(alpha <= last_alpha);
            last_alpha = alpha;
        }
        assert!(reels.highlight().is_none());
        assert_eq!(reels.highlight_alpha(), 0.0);
    }

    #[test]
    fn test_highlight_alpha_in_fade_window() {
        let mut reels = animator();
        reels.set_paylines(vec![Payline::new([1; 5])]);
        reels.set_selected_paylines(1);
        reels.highlight_paylines(&[0], Duration::from_millis(2000));
        reels.update(Duration::from_millis(500));
        assert_eq!(reels.highlight_alpha(), 1.0);
        reels.update(Duration::from_millis(1000));
        assert!((reels.highlight_alpha() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_payline_overlay_geometry() {
        let mut reels = animator();
        reels.set_paylines(vec![Payline::new([0, 1, 2, 1, 0]), Payline::new([1; 5])]);
        reels.set_selected_paylines(2);
        reels.highlight_paylines(&[0, 1], Duration::from_secs(5));

        let mut batch = OverlayBatch::new(1024);
        reels.build_payline_overlay(&mut batch);
        // Four border quads per marker and four connectors per line.
        assert_eq!(batch.quad_count(), 2 * (5 * 4 + 4));
        let first = batch.vertices()[0].color;
        assert_eq!(first, PAYLINE_PALETTE[0].to_array());
    }

    #[test]
    fn test_no_overlay_without_highlight() {
        let reels = animator();
        let mut batch = OverlayBatch::new(16);
        reels.build_payline_overlay(&mut batch);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_clip_to_viewport() {
        let rect = Rect::new(-10.0, 20.0, 100.0, 50.0);
        assert_eq!(clip_to_viewport(rect, Vec2::ZERO, 800, 600), Some(Rect::new(0, 20, 90, 50)));
        assert_eq!(clip_to_viewport(rect, Vec2::new(-200.0, 0.0), 800, 600), None);
    }

    fn renderer_with_atlas(symbols: &[&str]) -> (Renderer, SymbolAtlas, ProgramId) {
        let mock = Arc::new(MockRenderContext::new());
        let mut renderer = Renderer::new(mock, Box::new(NullTarget::new()), 800, 600).unwrap();
        let program = renderer
            .create_program(
                "reels",
                &ProgramSource::new(shaders::REEL_VERTEX, shaders::REEL_FRAGMENT),
                ProgramLayout::Textured,
            )
            .unwrap();
        let mut atlas = SymbolAtlas::new(AtlasConfig {
            size: 256,
            tile_size: 32,
            padding: 2,
        })
        .unwrap();
        let descriptors: Vec<SymbolDescriptor> = symbols
            .iter()
            .map(|id| SymbolDescriptor::new(*id, Default::default()))
            .collect();
        pollster::block_on(atlas.initialize(&mut renderer, &descriptors, &FileImageLoader::new())).unwrap();
        (renderer, atlas, program)
    }

    #[test]
    fn test_render_draws_each_reel_clipped() {
        let (mut renderer, atlas, program) = renderer_with_atlas(&["A", "B", "C", "D", "_"]);
        let mut reels = animator();
        reels.prepare(&mut renderer, program).unwrap();

        renderer.clear(Color::BLACK);
        reels.render(&mut renderer, &atlas).unwrap();
        let stats = renderer.stats();
        assert_eq!(stats.draw_calls, 5);
        // 3 visible + 2 margin rows, 2 triangles each.
        assert_eq!(stats.triangles, 5 * 5 * 2);
        renderer.present().unwrap();

        let frame = renderer.last_frame().unwrap();
        let window = reels.layout().window(0, reels.config());
        let scissor = frame.commands[0].scissor.unwrap();
        assert_eq!(scissor.x, window.x as u32);
        assert_eq!(scissor.height, 3 * 128);
    }

    #[test]
    fn test_render_survives_unknown_symbols() {
        let (mut renderer, atlas, program) = renderer_with_atlas(&["A"]);
        let mut reels = animator();
        reels.prepare(&mut renderer, program).unwrap();
        renderer.clear(Color::BLACK);
        reels.render(&mut renderer, &atlas).unwrap();
        assert_eq!(renderer.stats().draw_calls, 5);
        assert!(reels.missing.contains("B"));
    }
}
