//! Particle effects for win celebrations.
//!
//! Every active effect is simulated on the CPU and drawn with a single
//! instanced draw call per frame: a static unit quad plus one
//! [`ParticleInstance`] per live particle, regardless of how many effects
//! are running at once.

use std::f32::consts::TAU;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reelkit_core::profiling::{profile_function, profile_scope};

use crate::context::GraphicsResult;
use crate::frame::{BufferId, DrawCommand, ProgramId};
use crate::renderer::{BufferKind, Renderer};
use crate::Color;

/// Downward acceleration applied to coin rain, in px/s².
pub const COIN_GRAVITY: f32 = 400.0;

/// Fraction of velocity kept per 60 Hz step.
pub const DRAG_PER_STEP: f32 = 0.98;

const DEFAULT_COLORS: [Color; 3] = [
    Color::GOLD,
    Color::rgb(1.0, 0.6, 0.1),
    Color::rgb(1.0, 1.0, 0.7),
];

/// Unit quad centred on the origin, two triangles.
const UNIT_QUAD: [[f32; 2]; 6] = [
    [-0.5, -0.5],
    [0.5, -0.5],
    [-0.5, 0.5],
    [-0.5, 0.5],
    [0.5, -0.5],
    [0.5, 0.5],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    /// Radial launch from one point.
    Explosion,
    /// Coins falling from above the screen.
    CoinRain,
    /// Several small explosions at random points.
    SymbolBurst,
    /// Stationary twinkles that only fade.
    Sparkles,
}

#[derive(Debug, Clone)]
pub struct EffectConfig {
    pub kind: EffectKind,
    pub count: usize,
    /// Particles pick uniformly from these; a gold palette when empty.
    pub colors: Vec<Color>,
    pub duration: Duration,
    /// Launch point. The surface centre when unset.
    pub origin: Option<Vec2>,
}

impl EffectConfig {
    pub fn new(kind: EffectKind, count: usize, duration: Duration) -> Self {
        Self {
            kind,
            count,
            colors: Vec::new(),
            duration,
            origin: None,
        }
    }

    pub fn with_colors(mut self, colors: impl Into<Vec<Color>>) -> Self {
        self.colors = colors.into();
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Seconds lived so far.
    pub life: f32,
    /// Seconds until removal.
    pub max_life: f32,
    pub size: f32,
    pub color: Color,
    pub rotation: f32,
    pub rotation_speed: f32,
}

impl Particle {
    pub fn life_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            1.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ParticleEffect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub particles: Vec<Particle>,
    /// Simulation time at creation, in seconds.
    pub started_at: f32,
    pub duration: f32,
    pub active: bool,
}

impl ParticleEffect {
    fn is_finished(&self, now: f32) -> bool {
        self.particles.is_empty() || now - self.started_at >= self.duration
    }
}

/// Per-particle instance data read by the particle shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub size: f32,
    pub rotation: f32,
    pub color: [f32; 4],
    /// Elapsed fraction of the particle's life, 0..=1.
    pub life: f32,
    /// 1.0 for particles that twinkle in the fragment stage.
    pub flicker: f32,
    pub _pad: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<ParticleInstance>(), 48);

impl ParticleInstance {
    fn from_particle(particle: &Particle, kind: EffectKind) -> Self {
        Self {
            position: particle.position.to_array(),
            size: particle.size,
            rotation: particle.rotation,
            color: particle.color.to_array(),
            life: particle.life_fraction(),
            flicker: if kind == EffectKind::Sparkles { 1.0 } else { 0.0 },
            _pad: [0.0; 2],
        }
    }
}

#[derive(Debug)]
struct ParticleBuffers {
    program: ProgramId,
    corners: BufferId,
    instances: BufferId,
    capacity: usize,
}

pub struct ParticleSimulator {
    effects: Vec<ParticleEffect>,
    next_id: u64,
    rng: StdRng,
    max_particles: usize,
    bounds: Vec2,
    time: f32,
    instances: Vec<ParticleInstance>,
    buffers: Option<ParticleBuffers>,
}

impl std::fmt::Debug for ParticleSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSimulator")
            .field("effects", &self.effects.len())
            .field("particles", &self.active_particle_count())
            .field("max_particles", &self.max_particles)
            .finish()
    }
}

impl ParticleSimulator {
    pub fn new(max_particles: usize, bounds: Vec2) -> Self {
        Self::with_rng(max_particles, bounds, StdRng::from_os_rng())
    }

    /// A simulator whose effects are reproducible.
    pub fn with_seed(max_particles: usize, bounds: Vec2, seed: u64) -> Self {
        Self::with_rng(max_particles, bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_particles: usize, bounds: Vec2, rng: StdRng) -> Self {
        Self {
            effects: Vec::new(),
            next_id: 1,
            rng,
            max_particles,
            bounds,
            time: 0.0,
            instances: Vec::new(),
            buffers: None,
        }
    }

    /// Create the unit quad and the instance buffer.
    pub fn prepare(&mut self, renderer: &mut Renderer, program: ProgramId) -> GraphicsResult<()> {
        let corners = renderer.create_buffer("particle corners", bytemuck::cast_slice(&UNIT_QUAD), BufferKind::Vertex)?;
        let instances = Self::create_instance_buffer(renderer, self.max_particles)?;
        self.buffers = Some(ParticleBuffers {
            program,
            corners,
            instances,
            capacity: self.max_particles,
        });
        Ok(())
    }

    fn create_instance_buffer(renderer: &mut Renderer, capacity: usize) -> GraphicsResult<BufferId> {
        let bytes = (capacity.max(1) * std::mem::size_of::<ParticleInstance>()) as u64;
        renderer.create_dynamic_buffer("particle instances", bytes, BufferKind::Vertex)
    }

    pub fn is_prepared(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Change the particle cap. A prepared simulator replaces its instance
    /// buffer when the new cap does not fit, releasing the old one.
    pub fn set_max_particles(&mut self, renderer: &mut Renderer, max_particles: usize) -> GraphicsResult<()> {
        self.max_particles = max_particles;
        let Some(buffers) = self.buffers.as_mut() else {
            return Ok(());
        };
        if buffers.capacity < max_particles {
            let instances = Self::create_instance_buffer(renderer, max_particles)?;
            renderer.destroy_buffer(std::mem::replace(&mut buffers.instances, instances));
            buffers.capacity = max_particles;
        }
        Ok(())
    }

    pub fn set_bounds(&mut self, bounds: Vec2) {
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Spawn an effect. The particle count is clamped to the remaining cap.
    pub fn create_effect(&mut self, config: &EffectConfig) -> EffectId {
        profile_function!();
        let id = EffectId(self.next_id);
        self.next_id += 1;

        let available = self.max_particles.saturating_sub(self.active_particle_count());
        let count = if config.count > available {
            tracing::warn!(
                "Particle cap {} reached, {} spawning {} of {} particles",
                self.max_particles,
                id,
                available,
                config.count
            );
            available
        } else {
            config.count
        };

        let duration = config.duration.as_secs_f32();
        let origin = config.origin.unwrap_or(self.bounds / 2.0);
        let colors: &[Color] = if config.colors.is_empty() {
            &DEFAULT_COLORS
        } else {
            &config.colors
        };

        let mut particles = Vec::with_capacity(count);
        match config.kind {
            EffectKind::Explosion => self.spawn_radial(&mut particles, origin, count, colors, duration, 150.0..400.0),
            EffectKind::SymbolBurst => {
                let centers = self.rng.random_range(3..=5usize).min(count.max(1));
                let margin = self.bounds * 0.15;
                for i in 0..centers {
                    let share = count / centers + usize::from(i < count % centers);
                    let center = Vec2::new(
                        self.rng.random_range(margin.x..=(self.bounds.x - margin.x).max(margin.x)),
                        self.rng.random_range(margin.y..=(self.bounds.y - margin.y).max(margin.y)),
                    );
                    self.spawn_radial(&mut particles, center, share, colors, duration, 100.0..300.0);
                }
            }
            EffectKind::CoinRain => {
                for _ in 0..count {
                    let particle = Particle {
                        position: Vec2::new(
                            self.rng.random_range(0.0..=self.bounds.x.max(1.0)),
                            -self.rng.random_range(20.0..=20.0 + self.bounds.y.max(1.0) * 0.5),
                        ),
                        velocity: Vec2::new(self.rng.random_range(-30.0..=30.0), self.rng.random_range(50.0..=150.0)),
                        life: 0.0,
                        max_life: duration,
                        size: self.rng.random_range(10.0..=16.0),
                        color: self.pick_color(colors),
                        rotation: self.rng.random_range(0.0..TAU),
                        rotation_speed: self.rng.random_range(-4.0..=4.0),
                    };
                    particles.push(particle);
                }
            }
            EffectKind::Sparkles => {
                for _ in 0..count {
                    let position = match config.origin {
                        Some(origin) => {
                            let angle = self.rng.random_range(0.0..TAU);
                            let radius = self.rng.random_range(0.0..=150.0f32);
                            origin + Vec2::from_angle(angle) * radius
                        }
                        None => Vec2::new(
                            self.rng.random_range(0.0..=self.bounds.x.max(1.0)),
                            self.rng.random_range(0.0..=self.bounds.y.max(1.0)),
                        ),
                    };
                    let particle = Particle {
                        position,
                        velocity: Vec2::ZERO,
                        life: 0.0,
                        max_life: duration * self.rng.random_range(0.5..=1.0),
                        size: self.rng.random_range(6.0..=14.0),
                        color: self.pick_color(colors),
                        rotation: self.rng.random_range(0.0..TAU),
                        rotation_speed: 0.0,
                    };
                    particles.push(particle);
                }
            }
        }

        tracing::debug!("Created {} {:?} with {} particles", id, config.kind, particles.len());
        self.effects.push(ParticleEffect {
            id,
            kind: config.kind,
            particles,
            started_at: self.time,
            duration,
            active: true,
        });
        id
    }

    fn pick_color(&mut self, colors: &[Color]) -> Color {
        colors[self.rng.random_range(0..colors.len())]
    }

    fn spawn_radial(
        &mut self,
        particles: &mut Vec<Particle>,
        center: Vec2,
        count: usize,
        colors: &[Color],
        duration: f32,
        speeds: std::ops::Range<f32>,
    ) {
        for i in 0..count {
            let angle = i as f32 / count as f32 * TAU + self.rng.random_range(-0.3..=0.3);
            let speed = self.rng.random_range(speeds.clone());
            particles.push(Particle {
                position: center,
                velocity: Vec2::from_angle(angle) * speed,
                life: 0.0,
                max_life: duration * self.rng.random_range(0.6..=1.0),
                size: self.rng.random_range(4.0..=10.0),
                color: self.pick_color(colors),
                rotation: self.rng.random_range(0.0..TAU),
                rotation_speed: self.rng.random_range(-6.0..=6.0),
            });
        }
    }

    /// Advance every effect by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        profile_function!();
        if dt <= 0.0 {
            return;
        }
        self.time += dt;
        let drag = DRAG_PER_STEP.powf(dt * 60.0);
        let now = self.time;

        for effect in &mut self.effects {
            let gravity = if effect.kind == EffectKind::CoinRain {
                Vec2::new(0.0, COIN_GRAVITY * dt)
            } else {
                Vec2::ZERO
            };
            for particle in &mut effect.particles {
                particle.velocity = particle.velocity * drag + gravity;
                particle.position += particle.velocity * dt;
                particle.rotation += particle.rotation_speed * dt;
                particle.life += dt;
            }
            effect.particles.retain(|p| p.life <= p.max_life);
            if effect.is_finished(now) {
                effect.active = false;
            }
        }

        let before = self.effects.len();
        self.effects.retain(|e| e.active);
        if self.effects.len() != before {
            tracing::trace!("Purged {} finished effects", before - self.effects.len());
        }
    }

    /// Upload all live particles and draw them with one instanced call.
    pub fn render(&mut self, renderer: &mut Renderer) -> GraphicsResult<()> {
        profile_scope!("particles_render");
        let Some(buffers) = self.buffers.as_mut() else {
            return Ok(());
        };

        self.instances.clear();
        for effect in &self.effects {
            self.instances
                .extend(effect.particles.iter().map(|p| ParticleInstance::from_particle(p, effect.kind)));
        }
        self.instances.truncate(buffers.capacity);
        if self.instances.is_empty() {
            return Ok(());
        }

        renderer.update_buffer(buffers.instances, 0, bytemuck::cast_slice(&self.instances))?;
        renderer.draw_arrays(
            DrawCommand::arrays(buffers.program, buffers.corners, 0..UNIT_QUAD.len() as u32)
                .with_instances(buffers.instances, self.instances.len() as u32),
        )
    }

    pub fn has_active_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn active_particle_count(&self) -> usize {
        self.effects.iter().map(|e| e.particles.len()).sum()
    }

    pub fn effect(&self, id: EffectId) -> Option<&ParticleEffect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn effects(&self) -> &[ParticleEffect] {
        &self.effects
    }

    /// Remove one effect immediately. Returns whether it was active.
    pub fn stop_effect(&mut self, id: EffectId) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.id != id);
        before != self.effects.len()
    }

    pub fn clear_all(&mut self) {
        if !self.effects.is_empty() {
            tracing::debug!("Clearing {} particle effects", self.effects.len());
        }
        self.effects.clear();
    }
}
