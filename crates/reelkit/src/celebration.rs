//! Win celebration presets, screen shake and flash.

use std::time::Duration;

use glam::Vec2;
use reelkit_render::{Color, EffectConfig, EffectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WinLevel {
    Small,
    Medium,
    Large,
    Jackpot,
}

/// A win to celebrate. The amount is only reported, never computed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WinDescriptor {
    pub amount: u64,
    pub level: WinLevel,
}

impl WinDescriptor {
    pub fn new(amount: u64, level: WinLevel) -> Self {
        Self { amount, level }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShakeSpec {
    /// Peak offset in pixels.
    pub amplitude: f32,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashSpec {
    /// Color at the start of the flash; alpha fades to zero.
    pub color: Color,
    pub duration: Duration,
}

/// One particle effect of a preset, before the level multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetEffect {
    pub kind: EffectKind,
    pub count: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CelebrationPreset {
    pub particle_multiplier: f32,
    pub palette: Vec<Color>,
    pub effects: Vec<PresetEffect>,
    pub shake: Option<ShakeSpec>,
    pub flash: Option<FlashSpec>,
}

const fn effect(kind: EffectKind, count: usize, millis: u64) -> PresetEffect {
    PresetEffect {
        kind,
        count,
        duration: Duration::from_millis(millis),
    }
}

impl CelebrationPreset {
    pub fn for_level(level: WinLevel) -> Self {
        match level {
            WinLevel::Small => Self {
                particle_multiplier: 1.0,
                palette: vec![Color::WHITE, Color::from_hex(0xC0C0C0), Color::from_hex(0xE0F0FF)],
                effects: vec![effect(EffectKind::Sparkles, 30, 1500)],
                shake: None,
                flash: None,
            },
            WinLevel::Medium => Self {
                particle_multiplier: 1.5,
                palette: vec![Color::GOLD, Color::from_hex(0xFFF3B0), Color::WHITE],
                effects: vec![
                    effect(EffectKind::Explosion, 60, 1500),
                    effect(EffectKind::Sparkles, 30, 2000),
                ],
                shake: None,
                flash: None,
            },
            WinLevel::Large => Self {
                particle_multiplier: 2.0,
                palette: vec![Color::GOLD, Color::from_hex(0xFF9F1C), Color::from_hex(0xFFD166)],
                effects: vec![
                    effect(EffectKind::Explosion, 80, 2000),
                    effect(EffectKind::CoinRain, 60, 3000),
                ],
                shake: None,
                flash: Some(FlashSpec {
                    color: Color::rgba(1.0, 1.0, 1.0, 0.35),
                    duration: Duration::from_millis(400),
                }),
            },
            WinLevel::Jackpot => Self {
                particle_multiplier: 3.0,
                palette: vec![
                    Color::GOLD,
                    Color::from_hex(0xFF4D6D),
                    Color::from_hex(0x4CC9F0),
                    Color::from_hex(0x80ED99),
                    Color::from_hex(0xB388FF),
                ],
                effects: vec![
                    effect(EffectKind::SymbolBurst, 100, 3000),
                    effect(EffectKind::CoinRain, 80, 4000),
                    effect(EffectKind::Sparkles, 60, 4000),
                ],
                shake: Some(ShakeSpec {
                    amplitude: 12.0,
                    duration: Duration::from_millis(800),
                }),
                flash: Some(FlashSpec {
                    color: Color::rgba(1.0, 0.85, 0.3, 0.6),
                    duration: Duration::from_millis(600),
                }),
            },
        }
    }

    /// Particle effects to spawn, counts scaled by the multiplier.
    pub fn effect_configs(&self) -> Vec<EffectConfig> {
        self.effects
            .iter()
            .map(|e| {
                EffectConfig::new(e.kind, scaled_count(e.count, self.particle_multiplier), e.duration)
                    .with_colors(self.palette.clone())
            })
            .collect()
    }
}

/// `count * multiplier`, rounded. Negative or NaN multipliers spawn nothing.
fn scaled_count(count: usize, multiplier: f32) -> usize {
    if multiplier.is_nan() || multiplier <= 0.0 {
        return 0;
    }
    let scaled = (count as f64 * f64::from(multiplier)).round();
    if scaled >= usize::MAX as f64 { usize::MAX } else { scaled as usize }
}

#[derive(Debug, Clone, Copy)]
struct Timed<T> {
    spec: T,
    elapsed: Duration,
    duration: Duration,
}

impl<T> Timed<T> {
    fn remaining_fraction(&self) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (1.0 - self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// Running shake and flash.
#[derive(Debug, Clone, Default)]
pub struct ScreenEffects {
    shake: Option<Timed<ShakeSpec>>,
    flash: Option<Timed<FlashSpec>>,
}

impl ScreenEffects {
    pub fn start_shake(&mut self, spec: ShakeSpec) {
        self.shake = Some(Timed {
            spec,
            elapsed: Duration::ZERO,
            duration: spec.duration,
        });
    }

    pub fn start_flash(&mut self, spec: FlashSpec) {
        self.flash = Some(Timed {
            spec,
            elapsed: Duration::ZERO,
            duration: spec.duration,
        });
    }

    pub fn update(&mut self, dt: Duration) {
        if let Some(shake) = &mut self.shake {
            shake.elapsed += dt;
            if shake.elapsed >= shake.duration {
                self.shake = None;
            }
        }
        if let Some(flash) = &mut self.flash {
            flash.elapsed += dt;
            if flash.elapsed >= flash.duration {
                self.flash = None;
            }
        }
    }

    /// Decaying two-frequency wobble, zero when no shake runs.
    pub fn shake_offset(&self) -> Vec2 {
        let Some(shake) = &self.shake else {
            return Vec2::ZERO;
        };
        let t = shake.elapsed.as_secs_f32();
        let amplitude = shake.spec.amplitude * shake.remaining_fraction();
        Vec2::new((t * 47.0).sin(), (t * 53.0).cos()) * amplitude
    }

    /// Current flash color, `None` once it has faded.
    pub fn flash_color(&self) -> Option<Color> {
        let flash = self.flash.as_ref()?;
        let color = flash.spec.color;
        Some(color.with_alpha(color.a * flash.remaining_fraction()))
    }

    pub fn is_active(&self) -> bool {
        self.shake.is_some() || self.flash.is_some()
    }

    pub fn clear(&mut self) {
        self.shake = None;
        self.flash = None;
    }
}
