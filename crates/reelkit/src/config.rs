//! Display configuration.

use std::time::Duration;

use reelkit_render::{AtlasConfig, Color, ReelConfig};

use crate::error::{DisplayError, DisplayResult};
use crate::performance::PerformanceThresholds;

/// Everything [`SlotDisplay`](crate::SlotDisplay) needs to know up front.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    pub reel_count: usize,
    /// Rows visible in each reel window.
    pub visible_rows: usize,
    /// Rows drawn above and below the window while scrolling.
    pub buffer_rows: usize,
    /// Upper bound on live particles across every effect.
    pub max_particles: usize,
    pub clear_color: Color,
    /// Time between `show_outcome` and the `SpinComplete` event.
    pub spin_complete_delay: Duration,
    /// Seed for particle effects. Random when unset.
    pub particle_seed: Option<u64>,
    pub atlas: AtlasConfig,
    pub reels: ReelConfig,
    pub performance: PerformanceThresholds,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            reel_count: 5,
            visible_rows: 3,
            buffer_rows: 1,
            max_particles: 2000,
            clear_color: Color::from_hex(0x101018),
            spin_complete_delay: Duration::from_millis(300),
            particle_seed: None,
            atlas: AtlasConfig::default(),
            reels: ReelConfig::default(),
            performance: PerformanceThresholds::default(),
        }
    }
}

impl DisplayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_reels(mut self, reel_count: usize, visible_rows: usize) -> Self {
        self.reel_count = reel_count;
        self.visible_rows = visible_rows;
        self
    }

    pub fn with_buffer_rows(mut self, buffer_rows: usize) -> Self {
        self.buffer_rows = buffer_rows;
        self
    }

    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_spin_complete_delay(mut self, delay: Duration) -> Self {
        self.spin_complete_delay = delay;
        self
    }

    pub fn with_particle_seed(mut self, seed: u64) -> Self {
        self.particle_seed = Some(seed);
        self
    }

    pub fn with_atlas(mut self, atlas: AtlasConfig) -> Self {
        self.atlas = atlas;
        self
    }

    pub fn with_reel_config(mut self, reels: ReelConfig) -> Self {
        self.reels = reels;
        self
    }

    pub fn with_performance(mut self, performance: PerformanceThresholds) -> Self {
        self.performance = performance;
        self
    }

    pub fn validate(&self) -> DisplayResult<()> {
        let invalid = |msg: &str| Err(DisplayError::InvalidConfig(msg.to_string()));
        if self.width == 0 || self.height == 0 {
            return invalid("surface size must be non-zero");
        }
        if self.reel_count == 0 {
            return invalid("reel_count must be at least 1");
        }
        if self.visible_rows == 0 {
            return invalid("visible_rows must be at least 1");
        }
        validate_reel_config(&self.reels)?;
        self.atlas
            .validate()
            .map_err(|e| DisplayError::InvalidConfig(e.to_string()))
    }

    /// Checks reel physics that replace `self.reels` on a running display.
    ///
    /// The tile size is baked into the layout and the atlas quads, so it
    /// must stay the same.
    pub fn check_reel_override(&self, reels: &ReelConfig) -> DisplayResult<()> {
        if reels.tile_width != self.reels.tile_width || reels.tile_height != self.reels.tile_height {
            return Err(DisplayError::InvalidConfig(
                "tile size cannot change after initialization".to_string(),
            ));
        }
        validate_reel_config(reels)
    }
}

fn validate_reel_config(reels: &ReelConfig) -> DisplayResult<()> {
    let invalid = |msg: &str| Err(DisplayError::InvalidConfig(msg.to_string()));
    if !(reels.tile_width > 0.0 && reels.tile_height > 0.0) {
        return invalid("reel tiles must have a positive size");
    }
    if !(reels.deceleration > 0.0) {
        return invalid("reel deceleration must be positive");
    }
    if !(reels.base_speed >= 0.0) {
        return invalid("reel base speed must not be negative");
    }
    if reels.snap_epsilon < 0.0 || reels.stop_velocity_threshold < 0.0 {
        return invalid("reel snap tolerances must not be negative");
    }
    Ok(())
}

/// Partial update applied by [`SlotDisplay::update_config`](crate::SlotDisplay::update_config).
///
/// Reel count, visible rows and atlas layout are fixed once initialized.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfigPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_particles: Option<usize>,
    pub clear_color: Option<Color>,
    pub spin_complete_delay: Option<Duration>,
    /// Takes effect on the next spin.
    pub reels: Option<ReelConfig>,
    pub performance: Option<PerformanceThresholds>,
}

impl DisplayConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The config that results from applying this patch to `base`.
    pub fn apply_to(&self, base: &DisplayConfig) -> DisplayResult<DisplayConfig> {
        let mut config = base.clone();
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(max_particles) = self.max_particles {
            config.max_particles = max_particles;
        }
        if let Some(color) = self.clear_color {
            config.clear_color = color;
        }
        if let Some(delay) = self.spin_complete_delay {
            config.spin_complete_delay = delay;
        }
        if let Some(reels) = &self.reels {
            base.check_reel_override(reels)?;
            config.reels = reels.clone();
        }
        if let Some(performance) = &self.performance {
            config.performance = performance.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DisplayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_reels() {
        let config = DisplayConfig::default().with_reels(0, 3);
        assert!(matches!(config.validate(), Err(DisplayError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_atlas() {
        let config = DisplayConfig::default().with_atlas(AtlasConfig {
            size: 64,
            tile_size: 128,
            padding: 2,
        });
        assert!(matches!(config.validate(), Err(DisplayError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_deceleration() {
        let config = DisplayConfig::default().with_reel_config(ReelConfig {
            deceleration: 0.0,
            ..ReelConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let base = DisplayConfig::default();
        let patch = DisplayConfigPatch {
            width: Some(1024),
            max_particles: Some(50),
            ..Default::default()
        };
        let config = patch.apply_to(&base).unwrap();
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, base.height);
        assert_eq!(config.max_particles, 50);
        assert!(DisplayConfigPatch::default().is_empty());
    }

    #[test]
    fn test_patch_cannot_resize_tiles() {
        let patch = DisplayConfigPatch {
            reels: Some(ReelConfig {
                tile_height: 64.0,
                ..ReelConfig::default()
            }),
            ..Default::default()
        };
        assert!(patch.apply_to(&DisplayConfig::default()).is_err());
    }

    #[test]
    fn test_reel_override_checks() {
        let config = DisplayConfig::default();
        assert!(config.check_reel_override(&ReelConfig::default()).is_ok());
        let stalled = ReelConfig {
            deceleration: 0.0,
            ..ReelConfig::default()
        };
        assert!(matches!(
            config.check_reel_override(&stalled),
            Err(DisplayError::InvalidConfig(_))
        ));
        let wider = ReelConfig {
            tile_width: 96.0,
            ..ReelConfig::default()
        };
        assert!(config.check_reel_override(&wider).is_err());
    }

    #[test]
    fn test_patch_is_validated() {
        let patch = DisplayConfigPatch {
            height: Some(0),
            ..Default::default()
        };
        assert!(patch.apply_to(&DisplayConfig::default()).is_err());
    }
}
