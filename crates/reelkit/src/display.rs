//! The slot display facade.
//!
//! [`SlotDisplay`] owns the renderer, atlas, reels and particles and is the
//! only thing a host talks to. It never ticks on its own: the host calls
//! [`tick`](SlotDisplay::tick) from its frame callback while
//! [`is_running`](SlotDisplay::is_running) is true, and every command that
//! starts an animation restarts the loop.
//!
//! # Example
//!
//! ```ignore
//! use reelkit::{DisplayConfig, RenderSurface, SlotDisplay};
//! use reelkit::data::{PaylineSet, ReelStrips, SymbolSet};
//!
//! let context = GraphicsContext::new_owned_sync()?;
//! let mut display = SlotDisplay::new(DisplayConfig::default());
//! display.initialize_blocking(
//!     RenderSurface::offscreen(context, 800, 600),
//!     &SymbolSet::standard().into_vec(),
//! )?;
//! display.set_reel_data(ReelStrips::standard().into_vec())?;
//! display.set_paylines(PaylineSet::standard().into_vec())?;
//! display.start_spin("spin-1", None)?;
//!
//! while display.is_running() {
//!     display.tick(std::time::Instant::now())?;
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use reelkit_core::geometry::Rect;
use reelkit_core::profiling::{self, profile_function};
use reelkit_render::atlas::{FileImageLoader, ImageLoader};
use reelkit_render::frame::FrameTime;
use reelkit_render::reels::PaylineHighlight;
use reelkit_render::shaders::builtin_programs;
use reelkit_render::{
    Color, EffectConfig, EffectId, FrameTarget, GraphicsContext, NullTarget, OffscreenTarget, OverlayBatch, OverlayRenderer,
    ParticleSimulator, Payline, ProgramLayout, ReelAnimator, ReelConfig, ReelLayout, RenderContext, RenderLoop,
    RenderStats, Renderer, SurfaceTarget, SymbolAtlas, SymbolDescriptor,
};

use crate::celebration::{CelebrationPreset, ScreenEffects, WinDescriptor};
use crate::config::{DisplayConfig, DisplayConfigPatch};
use crate::error::{DisplayError, DisplayResult};
use crate::events::{DisplayEvent, EventBus, EventQueue, SubscriptionId};
use crate::performance::PerformanceMonitor;

/// Quads the overlay buffer holds: payline markers, connectors and the flash.
const OVERLAY_QUADS: usize = 4096;

/// Where frames go and which context creates GPU resources.
pub struct RenderSurface {
    pub context: Arc<dyn RenderContext>,
    pub target: Box<dyn FrameTarget>,
}

impl RenderSurface {
    pub fn new(context: Arc<dyn RenderContext>, target: Box<dyn FrameTarget>) -> Self {
        Self { context, target }
    }

    /// Simulation only; frames are recorded and discarded.
    pub fn headless(context: Arc<dyn RenderContext>) -> Self {
        Self::new(context, Box::new(NullTarget::new()))
    }

    /// Render into an offscreen texture that can be read back.
    pub fn offscreen(context: Arc<GraphicsContext>, width: u32, height: u32) -> Self {
        let target = OffscreenTarget::new(context.clone(), width, height);
        Self::new(context, Box::new(target))
    }

    /// Render into a window surface.
    pub fn window(
        context: Arc<GraphicsContext>,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> DisplayResult<Self> {
        let target = SurfaceTarget::new(context.clone(), surface, width, height)?;
        Ok(Self::new(context, Box::new(target)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TimerAction {
    StopReel { reel: usize, outcome: Vec<String> },
    SpinComplete { spin_id: String },
}

#[derive(Debug, Clone)]
struct Timer {
    due: Duration,
    action: TimerAction,
}

/// Everything that exists only between `initialize` and `destroy`.
struct Engine {
    renderer: Renderer,
    atlas: SymbolAtlas,
    reels: ReelAnimator,
    particles: ParticleSimulator,
    overlay: OverlayRenderer,
    overlay_batch: OverlayBatch,
    screen: ScreenEffects,
}

impl Engine {
    fn is_animating(&self) -> bool {
        self.reels.is_animating() || self.particles.has_active_effects() || self.screen.is_active()
    }
}

pub struct SlotDisplay {
    config: DisplayConfig,
    engine: Option<Engine>,
    render_loop: RenderLoop,
    events: EventBus,
    timers: Vec<Timer>,
    performance: PerformanceMonitor,
    loader: Arc<dyn ImageLoader>,
    current_spin: Option<String>,
    destroyed: bool,
}

impl std::fmt::Debug for SlotDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotDisplay")
            .field("initialized", &self.engine.is_some())
            .field("running", &self.render_loop.is_running())
            .field("timers", &self.timers.len())
            .field("current_spin", &self.current_spin)
            .finish()
    }
}

impl SlotDisplay {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            performance: PerformanceMonitor::new(config.performance.clone()),
            config,
            engine: None,
            render_loop: RenderLoop::new(),
            events: EventBus::new(),
            timers: Vec::new(),
            loader: Arc::new(FileImageLoader::new()),
            current_spin: None,
            destroyed: false,
        }
    }

    /// Replace the loader used for symbol images. Only affects `initialize`.
    pub fn set_image_loader(&mut self, loader: Arc<dyn ImageLoader>) {
        self.loader = loader;
    }

    /// Compile the shaders, pack the atlas and create every buffer.
    ///
    /// Emits [`DisplayEvent::Ready`] on success and [`DisplayEvent::Error`]
    /// on failure.
    pub async fn initialize(&mut self, surface: RenderSurface, symbols: &[SymbolDescriptor]) -> DisplayResult<()> {
        if self.engine.is_some() {
            return Err(DisplayError::AlreadyInitialized);
        }
        if self.destroyed {
            return Err(DisplayError::NotInitialized);
        }

        let loader = self.loader.clone();
        match self.build_engine(surface, symbols, loader.as_ref()).await {
            Ok(engine) => {
                tracing::info!(
                    "Slot display ready: {} reels x {} rows, {} symbols",
                    self.config.reel_count,
                    self.config.visible_rows,
                    engine.atlas.len()
                );
                self.engine = Some(engine);
                self.events.emit(DisplayEvent::Ready);
                Ok(())
            }
            Err(err) => {
                tracing::error!("Slot display failed to initialize: {}", err);
                self.events.emit(DisplayEvent::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// [`initialize`](Self::initialize), blocking the current thread.
    pub fn initialize_blocking(&mut self, surface: RenderSurface, symbols: &[SymbolDescriptor]) -> DisplayResult<()> {
        pollster::block_on(self.initialize(surface, symbols))
    }

    async fn build_engine(
        &self,
        surface: RenderSurface,
        symbols: &[SymbolDescriptor],
        loader: &dyn ImageLoader,
    ) -> DisplayResult<Engine> {
        let config = &self.config;
        config.validate()?;

        let mut renderer = Renderer::new(surface.context, surface.target, config.width, config.height)?;

        let mut reel_program = None;
        let mut overlay_program = None;
        let mut particle_program = None;
        for (name, source, layout) in builtin_programs() {
            let id = renderer.create_program(name, &source, layout)?;
            match layout {
                ProgramLayout::Textured => reel_program = Some(id),
                ProgramLayout::Colored => overlay_program = Some(id),
                ProgramLayout::Particles => particle_program = Some(id),
            }
        }
        let (Some(reel_program), Some(overlay_program), Some(particle_program)) =
            (reel_program, overlay_program, particle_program)
        else {
            return Err(DisplayError::InvalidConfig("missing a built-in program".to_string()));
        };

        let mut atlas = SymbolAtlas::new(config.atlas)?;
        atlas.initialize(&mut renderer, symbols, loader).await?;

        let layout = Self::reel_layout(config);
        let mut reels = ReelAnimator::new(layout, config.reels.clone());
        reels.prepare(&mut renderer, reel_program)?;

        let bounds = Vec2::new(config.width as f32, config.height as f32);
        let mut particles = match config.particle_seed {
            Some(seed) => ParticleSimulator::with_seed(config.max_particles, bounds, seed),
            None => ParticleSimulator::new(config.max_particles, bounds),
        };
        particles.prepare(&mut renderer, particle_program)?;

        let overlay = OverlayRenderer::new(&mut renderer, overlay_program, OVERLAY_QUADS)?;
        let overlay_batch = overlay.batch();

        Ok(Engine {
            renderer,
            atlas,
            reels,
            particles,
            overlay,
            overlay_batch,
            screen: ScreenEffects::default(),
        })
    }

    fn reel_layout(config: &DisplayConfig) -> ReelLayout {
        ReelLayout::centered(
            config.width as f32,
            config.height as f32,
            config.reel_count,
            config.visible_rows,
            config.buffer_rows,
            &config.reels,
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> DisplayResult<&Engine> {
        self.engine.as_ref().ok_or(DisplayError::NotInitialized)
    }

    fn engine_mut(&mut self) -> DisplayResult<&mut Engine> {
        self.engine.as_mut().ok_or(DisplayError::NotInitialized)
    }

    fn check_reel(&self, reel: usize) -> DisplayResult<()> {
        if reel >= self.config.reel_count {
            return Err(DisplayError::ReelIndexOutOfRange {
                index: reel,
                reel_count: self.config.reel_count,
            });
        }
        Ok(())
    }

    /// Make sure frames keep coming until everything is idle again.
    fn request_frames(&mut self) {
        self.render_loop.start();
    }

    /// Full strip contents, one per reel.
    pub fn set_reel_data(&mut self, strips: Vec<Vec<String>>) -> DisplayResult<()> {
        if strips.len() != self.config.reel_count {
            return Err(DisplayError::InvalidConfig(format!(
                "expected {} reel strips, got {}",
                self.config.reel_count,
                strips.len()
            )));
        }
        let engine = self.engine_mut()?;
        let mut unknown: Vec<&str> = strips
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|id| !engine.atlas.contains(id))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();
        if !unknown.is_empty() {
            tracing::warn!("Reel data uses symbols missing from the atlas: {:?}", unknown);
        }
        engine.reels.set_reel_data(strips);
        self.request_frames();
        Ok(())
    }

    /// Every payline of the machine. All of them start out selected.
    pub fn set_paylines(&mut self, paylines: Vec<Payline>) -> DisplayResult<()> {
        let reel_count = self.config.reel_count;
        let engine = self.engine_mut()?;
        if let Some(bad) = paylines.iter().position(|p| p.rows.len() != reel_count) {
            tracing::warn!("Payline {} does not have one row per reel", bad);
        }
        let count = paylines.len();
        engine.reels.set_paylines(paylines);
        engine.reels.set_selected_paylines(count);
        Ok(())
    }

    /// Only the first `count` paylines are eligible for highlighting.
    pub fn set_selected_paylines(&mut self, count: usize) -> DisplayResult<()> {
        self.engine_mut()?.reels.set_selected_paylines(count);
        Ok(())
    }

    /// Start every reel. `overrides` replaces the reel physics for this spin only.
    pub fn start_spin(&mut self, spin_id: impl Into<String>, overrides: Option<ReelConfig>) -> DisplayResult<()> {
        let spin_id = spin_id.into();
        self.engine()?;
        let reel_config = match overrides {
            Some(reels) => {
                self.config.check_reel_override(&reels)?;
                reels
            }
            None => self.config.reels.clone(),
        };
        let engine = self.engine_mut()?;
        engine.reels.set_config(reel_config);
        engine.reels.clear_highlight();
        engine.reels.start_spin();

        self.timers.retain(|t| !matches!(t.action, TimerAction::StopReel { .. }));
        tracing::info!("Spin {} started", spin_id);
        self.current_spin = Some(spin_id);
        self.request_frames();
        Ok(())
    }

    /// Begin stopping `reel` on `outcome`, now or after `delay` of engine time.
    pub fn stop_reel(&mut self, reel: usize, outcome: Vec<String>, delay: Option<Duration>) -> DisplayResult<()> {
        self.check_reel(reel)?;
        self.engine()?;
        match delay.filter(|d| !d.is_zero()) {
            Some(delay) => {
                let due = self.render_loop.elapsed() + delay;
                self.timers.push(Timer {
                    due,
                    action: TimerAction::StopReel { reel, outcome },
                });
            }
            None => {
                self.engine_mut()?.reels.stop_reel(reel, outcome);
            }
        }
        self.request_frames();
        Ok(())
    }

    /// Show the authoritative grid at once and report the spin complete
    /// after the settle delay.
    pub fn show_outcome(&mut self, grid: &[Vec<String>], spin_id: impl Into<String>) -> DisplayResult<()> {
        let spin_id = spin_id.into();
        if grid.len() != self.config.reel_count {
            tracing::warn!(
                "Outcome grid has {} reels, display has {}",
                grid.len(),
                self.config.reel_count
            );
        }
        self.engine_mut()?.reels.show_final_outcome(grid);

        self.timers.retain(|t| !matches!(t.action, TimerAction::StopReel { .. }));
        let due = self.render_loop.elapsed() + self.config.spin_complete_delay;
        self.timers.push(Timer {
            due,
            action: TimerAction::SpinComplete { spin_id },
        });
        self.request_frames();
        Ok(())
    }

    /// Spawn the particle effects, shake and flash of `win.level`.
    pub fn show_win_celebration(&mut self, win: &WinDescriptor) -> DisplayResult<Vec<EffectId>> {
        let preset = CelebrationPreset::for_level(win.level);
        let engine = self.engine_mut()?;
        let ids: Vec<EffectId> = preset
            .effect_configs()
            .iter()
            .map(|config| engine.particles.create_effect(config))
            .collect();
        if let Some(shake) = preset.shake {
            engine.screen.start_shake(shake);
        }
        if let Some(flash) = preset.flash {
            engine.screen.start_flash(flash);
        }
        tracing::info!("Celebrating {:?} win of {}", win.level, win.amount);
        self.request_frames();
        Ok(ids)
    }

    /// Spawn a single particle effect.
    pub fn create_effect(&mut self, config: &EffectConfig) -> DisplayResult<EffectId> {
        let id = self.engine_mut()?.particles.create_effect(config);
        self.request_frames();
        Ok(id)
    }

    /// Highlight paylines by index for `duration`. Returns how many are shown.
    pub fn highlight_paylines(&mut self, indices: &[usize], duration: Duration) -> DisplayResult<usize> {
        let shown = self.engine_mut()?.reels.highlight_paylines(indices, duration);
        if shown > 0 {
            self.request_frames();
        }
        Ok(shown)
    }

    pub fn payline_highlight(&self) -> DisplayResult<Option<&PaylineHighlight>> {
        Ok(self.engine()?.reels.highlight())
    }

    /// Stop and zero every reel.
    pub fn reset_reels(&mut self) -> DisplayResult<()> {
        self.engine_mut()?.reels.reset();
        self.timers.retain(|t| !matches!(t.action, TimerAction::StopReel { .. }));
        self.current_spin = None;
        self.request_frames();
        Ok(())
    }

    /// Drop every particle effect, shake and flash.
    pub fn clear_effects(&mut self) -> DisplayResult<()> {
        let engine = self.engine_mut()?;
        engine.particles.clear_all();
        engine.screen.clear();
        self.request_frames();
        Ok(())
    }

    /// Apply a partial config. Reel physics changes take effect on the next spin.
    pub fn update_config(&mut self, patch: &DisplayConfigPatch) -> DisplayResult<()> {
        let config = patch.apply_to(&self.config)?;
        if let Some(engine) = self.engine.as_mut() {
            if (config.width, config.height) != (self.config.width, self.config.height) {
                engine.renderer.set_viewport(config.width, config.height)?;
                engine.reels.set_layout_origin(Self::reel_layout(&config).origin);
                engine
                    .particles
                    .set_bounds(Vec2::new(config.width as f32, config.height as f32));
            }
            engine
                .particles
                .set_max_particles(&mut engine.renderer, config.max_particles)?;
            self.render_loop.start();
        }
        self.performance.set_thresholds(config.performance.clone());
        self.config = config;
        tracing::debug!("Display config updated");
        Ok(())
    }

    /// Release every GPU resource. Later calls are no-ops.
    pub fn destroy(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        engine.particles.clear_all();
        engine.renderer.destroy();
        self.render_loop.stop();
        self.timers.clear();
        self.current_spin = None;
        self.destroyed = true;
        tracing::info!("Slot display destroyed");
    }

    /// Whether the host should keep calling [`tick`](Self::tick).
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Run one frame at wall-clock time `now`.
    ///
    /// Returns whether the loop is still running afterwards.
    pub fn tick(&mut self, now: Instant) -> DisplayResult<bool> {
        self.engine()?;
        match self.render_loop.tick(now) {
            Some(time) => self.frame(time),
            None => Ok(false),
        }
    }

    /// Run one frame that advances engine time by exactly `delta`.
    pub fn advance(&mut self, delta: Duration) -> DisplayResult<bool> {
        self.engine()?;
        match self.render_loop.tick_with_delta(delta) {
            Some(time) => self.frame(time),
            None => Ok(false),
        }
    }

    fn frame(&mut self, time: FrameTime) -> DisplayResult<bool> {
        profiling::new_frame();
        profile_function!();
        let now = time.elapsed;

        for action in self.take_due_timers(now) {
            match action {
                TimerAction::StopReel { reel, outcome } => {
                    if let Some(engine) = self.engine.as_mut() {
                        engine.reels.stop_reel(reel, outcome);
                    }
                }
                TimerAction::SpinComplete { spin_id } => {
                    tracing::info!("Spin {} complete", spin_id);
                    if self.current_spin.as_deref() == Some(spin_id.as_str()) {
                        self.current_spin = None;
                    }
                    self.events.emit(DisplayEvent::SpinComplete { spin_id });
                }
            }
        }

        let clear_color = self.config.clear_color;
        let (width, height) = (self.config.width, self.config.height);
        let engine = self.engine.as_mut().ok_or(DisplayError::NotInitialized)?;

        engine.reels.update(time.delta);
        engine.particles.update(time.delta_seconds());
        engine.screen.update(time.delta);
        engine.reels.set_shake(engine.screen.shake_offset());

        Self::render(engine, time.elapsed_seconds() as f32, clear_color, width, height)?;

        self.performance.record_frame(time.delta);
        engine.renderer.record_frame_time(time.delta, self.performance.fps());
        let metrics = self
            .performance
            .metrics(&engine.renderer.stats(), engine.particles.active_particle_count());
        let animating = engine.is_animating();
        if let Some(warnings) = self.performance.check(now, &metrics) {
            self.events.emit(DisplayEvent::PerformanceWarning { warnings, metrics });
        }

        if !animating && self.timers.is_empty() {
            self.render_loop.stop();
        }
        Ok(self.render_loop.is_running())
    }

    fn render(engine: &mut Engine, seconds: f32, clear_color: Color, width: u32, height: u32) -> DisplayResult<()> {
        let Engine {
            renderer,
            atlas,
            reels,
            particles,
            overlay,
            overlay_batch,
            screen,
        } = engine;

        renderer.set_time(seconds);
        renderer.clear(clear_color);
        reels.render(renderer, atlas)?;
        particles.render(renderer)?;

        overlay_batch.clear();
        reels.build_payline_overlay(overlay_batch);
        if let Some(flash) = screen.flash_color() {
            overlay_batch.push_rect(Rect::new(0.0, 0.0, width as f32, height as f32), flash);
        }
        overlay.render(renderer, overlay_batch)?;
        renderer.present()?;
        Ok(())
    }

    fn take_due_timers(&mut self, now: Duration) -> Vec<TimerAction> {
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|timer| {
            if timer.due <= now {
                due.push(timer.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.due);
        due.into_iter().map(|t| t.action).collect()
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Engine time: advances only while the loop runs.
    pub fn clock(&self) -> Duration {
        self.render_loop.elapsed()
    }

    pub fn current_spin(&self) -> Option<&str> {
        self.current_spin.as_deref()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn visible_symbols(&self, reel: usize) -> DisplayResult<Vec<String>> {
        self.check_reel(reel)?;
        Ok(self.engine()?.reels.visible_symbols(reel))
    }

    pub fn reels(&self) -> DisplayResult<&ReelAnimator> {
        Ok(&self.engine()?.reels)
    }

    pub fn particles(&self) -> DisplayResult<&ParticleSimulator> {
        Ok(&self.engine()?.particles)
    }

    pub fn atlas(&self) -> DisplayResult<&SymbolAtlas> {
        Ok(&self.engine()?.atlas)
    }

    pub fn stats(&self) -> DisplayResult<RenderStats> {
        Ok(self.engine()?.renderer.stats())
    }

    pub fn renderer(&self) -> DisplayResult<&Renderer> {
        Ok(&self.engine()?.renderer)
    }

    /// Pixels of the last presented frame, for targets that support readback.
    pub fn read_pixels(&self) -> DisplayResult<Option<image::RgbaImage>> {
        Ok(self.engine()?.renderer.read_pixels()?)
    }

    pub fn events(&mut self) -> &mut EventQueue {
        self.events.queue_mut()
    }

    /// Take every pending event, oldest first.
    pub fn drain_events(&mut self) -> Vec<DisplayEvent> {
        self.events.queue_mut().drain().collect()
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, std::sync::mpsc::Receiver<DisplayEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Drop for SlotDisplay {
    fn drop(&mut self) {
        self.destroy();
    }
}
