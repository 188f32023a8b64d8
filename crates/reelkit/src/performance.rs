//! Frame-rate and resource monitoring.
//!
//! The monitor never throttles anything. It turns threshold breaches into
//! [`PerformanceWarning`]s that the display forwards as advisory events, at
//! most once per cooldown.

use std::time::Duration;

use reelkit_render::RenderStats;
use reelkit_render::frame::FpsCounter;

/// Frames in the rolling FPS window.
pub const FPS_WINDOW: usize = 60;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PerformanceThresholds {
    /// Warn when the rolling FPS falls below this.
    pub min_fps: f32,
    pub max_texture_memory: u64,
    pub max_particles: usize,
    /// Warn when a single frame takes longer than this.
    pub frame_budget: Duration,
    /// Minimum time between two warning events.
    pub cooldown: Duration,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            min_fps: 30.0,
            max_texture_memory: 256 * 1024 * 1024,
            max_particles: 2000,
            frame_budget: Duration::from_millis(50),
            cooldown: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceWarning {
    LowFps { fps: f32, min: f32 },
    HighTextureMemory { bytes: u64, threshold: u64 },
    TooManyParticles { count: usize, threshold: usize },
    FrameTimeExceeded { actual: Duration, budget: Duration },
}

impl PerformanceWarning {
    /// Get severity level (1-2, higher is worse).
    pub fn severity(&self) -> u8 {
        let doubled = match self {
            PerformanceWarning::LowFps { fps, min } => *fps * 2.0 < *min,
            PerformanceWarning::HighTextureMemory { bytes, threshold } => *bytes > threshold * 2,
            PerformanceWarning::TooManyParticles { count, threshold } => *count > threshold * 2,
            PerformanceWarning::FrameTimeExceeded { actual, budget } => *actual > *budget * 2,
        };
        if doubled { 2 } else { 1 }
    }
}

impl std::fmt::Display for PerformanceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceWarning::LowFps { fps, min } => write!(f, "Low frame rate: {:.1} fps (minimum: {:.1})", fps, min),
            PerformanceWarning::HighTextureMemory { bytes, threshold } => write!(
                f,
                "High texture memory: {:.1} MiB (threshold: {:.1} MiB)",
                *bytes as f64 / (1024.0 * 1024.0),
                *threshold as f64 / (1024.0 * 1024.0)
            ),
            PerformanceWarning::TooManyParticles { count, threshold } => {
                write!(f, "Too many particles: {} (threshold: {})", count, threshold)
            }
            PerformanceWarning::FrameTimeExceeded { actual, budget } => write!(
                f,
                "Frame time exceeded: {:.2}ms (budget: {:.2}ms)",
                actual.as_secs_f64() * 1000.0,
                budget.as_secs_f64() * 1000.0
            ),
        }
    }
}

/// Snapshot of the numbers the warnings were computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub fps: f32,
    pub frame_time: Duration,
    pub texture_memory: u64,
    pub particles: usize,
    pub draw_calls: u32,
    pub triangles: u64,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    thresholds: PerformanceThresholds,
    fps: FpsCounter,
    last_frame: Duration,
    /// Engine time of the last emitted warning.
    last_warning: Option<Duration>,
}

impl PerformanceMonitor {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self {
            thresholds,
            fps: FpsCounter::new(FPS_WINDOW),
            last_frame: Duration::ZERO,
            last_warning: None,
        }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: PerformanceThresholds) {
        self.thresholds = thresholds;
    }

    pub fn record_frame(&mut self, frame_time: Duration) {
        self.fps.push(frame_time);
        self.last_frame = frame_time;
    }

    /// Rolling frames per second over the last [`FPS_WINDOW`] frames.
    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    pub fn last_frame_time(&self) -> Duration {
        self.last_frame
    }

    pub fn metrics(&self, stats: &RenderStats, particles: usize) -> PerformanceMetrics {
        PerformanceMetrics {
            fps: self.fps(),
            frame_time: self.last_frame,
            texture_memory: stats.texture_memory,
            particles,
            draw_calls: stats.draw_calls,
            triangles: stats.triangles,
        }
    }

    /// Thresholds breached by `metrics`, ignoring the cooldown.
    pub fn evaluate(&self, metrics: &PerformanceMetrics) -> Vec<PerformanceWarning> {
        let t = &self.thresholds;
        let mut warnings = Vec::new();
        // FPS is meaningless until the window has filled.
        if self.fps.is_full() && metrics.fps < t.min_fps {
            warnings.push(PerformanceWarning::LowFps {
                fps: metrics.fps,
                min: t.min_fps,
            });
        }
        if metrics.texture_memory > t.max_texture_memory {
            warnings.push(PerformanceWarning::HighTextureMemory {
                bytes: metrics.texture_memory,
                threshold: t.max_texture_memory,
            });
        }
        if metrics.particles > t.max_particles {
            warnings.push(PerformanceWarning::TooManyParticles {
                count: metrics.particles,
                threshold: t.max_particles,
            });
        }
        if metrics.frame_time > t.frame_budget {
            warnings.push(PerformanceWarning::FrameTimeExceeded {
                actual: metrics.frame_time,
                budget: t.frame_budget,
            });
        }
        warnings
    }

    /// Warnings to emit at engine time `now`, honoring the cooldown.
    pub fn check(&mut self, now: Duration, metrics: &PerformanceMetrics) -> Option<Vec<PerformanceWarning>> {
        if let Some(last) = self.last_warning
            && now.saturating_sub(last) < self.thresholds.cooldown
        {
            return None;
        }
        let warnings = self.evaluate(metrics);
        if warnings.is_empty() {
            return None;
        }
        for warning in &warnings {
            tracing::warn!("Performance: {}", warning);
        }
        self.last_warning = Some(now);
        Some(warnings)
    }

    pub fn reset(&mut self) {
        self.fps = FpsCounter::new(FPS_WINDOW);
        self.last_frame = Duration::ZERO;
        self.last_warning = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            fps: 60.0,
            frame_time: Duration::from_millis(16),
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_frame_has_no_warnings() {
        let monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        assert!(monitor.evaluate(&metrics()).is_empty());
    }

    #[test]
    fn test_each_threshold() {
        let monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        let m = PerformanceMetrics {
            texture_memory: 300 * 1024 * 1024,
            particles: 5000,
            frame_time: Duration::from_millis(120),
            ..metrics()
        };
        let warnings = monitor.evaluate(&m);
        assert_eq!(warnings.len(), 3);
        assert!(matches!(warnings[0], PerformanceWarning::HighTextureMemory { .. }));
        assert_eq!(warnings[1].severity(), 2);
        assert_eq!(warnings[2].severity(), 2);
    }

    #[test]
    fn test_low_fps_needs_full_window() {
        let mut monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        for _ in 0..10 {
            monitor.record_frame(Duration::from_millis(100));
        }
        let m = PerformanceMetrics {
            fps: monitor.fps(),
            ..metrics()
        };
        assert!(monitor.evaluate(&m).is_empty());

        for _ in 0..FPS_WINDOW {
            monitor.record_frame(Duration::from_millis(100));
        }
        let m = PerformanceMetrics {
            fps: monitor.fps(),
            ..metrics()
        };
        assert_eq!(monitor.evaluate(&m), vec![PerformanceWarning::LowFps { fps: m.fps, min: 30.0 }]);
    }

    #[test]
    fn test_cooldown_limits_events() {
        let mut monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        let bad = PerformanceMetrics {
            particles: 9999,
            ..metrics()
        };
        assert!(monitor.check(Duration::from_secs(1), &bad).is_some());
        assert!(monitor.check(Duration::from_secs(3), &bad).is_none());
        assert!(monitor.check(Duration::from_secs(6), &bad).is_some());
    }

    #[test]
    fn test_warning_display() {
        let warning = PerformanceWarning::FrameTimeExceeded {
            actual: Duration::from_millis(75),
            budget: Duration::from_millis(50),
        };
        assert_eq!(warning.to_string(), "Frame time exceeded: 75.00ms (budget: 50.00ms)");
    }
}
