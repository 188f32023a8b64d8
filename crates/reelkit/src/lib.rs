//! Reelkit - GPU slot machine reel display
//!
//! Reelkit draws the reels of a slot machine and animates them. It does not
//! decide outcomes or payouts: the host tells it which symbols to land on
//! and which wins to celebrate.
//!
//! - **Symbol Atlas**: symbol images packed into a single texture
//! - **Reel Animator**: staggered spins with exact deceleration onto an outcome
//! - **Paylines**: highlighted winning lines with a timed fade
//! - **Particles**: explosions, coin rain, symbol bursts and sparkles
//! - **Events**: ready, spin complete and performance warnings
//!
//! # Quick Start
//!
//! ```ignore
//! use reelkit::prelude::*;
//!
//! let context = GraphicsContext::new_owned_sync()?;
//! let mut display = SlotDisplay::new(DisplayConfig::default());
//! display.initialize_blocking(
//!     RenderSurface::offscreen(context, 800, 600),
//!     &SymbolSet::standard().into_vec(),
//! )?;
//! display.set_reel_data(ReelStrips::standard().into_vec())?;
//! display.set_paylines(PaylineSet::standard().into_vec())?;
//!
//! display.start_spin("spin-1", None)?;
//! // ... later, when the server answers:
//! display.show_outcome(&grid, "spin-1")?;
//!
//! // From the host's frame callback:
//! if display.is_running() {
//!     display.tick(std::time::Instant::now())?;
//! }
//! for event in display.drain_events() {
//!     if let DisplayEvent::SpinComplete { spin_id } = event {
//!         display.show_win_celebration(&WinDescriptor::new(500, WinLevel::Large))?;
//!     }
//! }
//! ```

pub mod celebration;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod events;
pub mod performance;

// Re-export sub-crates
pub use reelkit_core as core;
pub use reelkit_render as render;

pub use celebration::{CelebrationPreset, FlashSpec, ScreenEffects, ShakeSpec, WinDescriptor, WinLevel};
pub use config::{DisplayConfig, DisplayConfigPatch};
pub use display::{RenderSurface, SlotDisplay};
pub use error::{DisplayError, DisplayResult};
pub use events::{DisplayEvent, EventBus, EventQueue, SubscriptionId};
pub use performance::{PerformanceMetrics, PerformanceMonitor, PerformanceThresholds, PerformanceWarning};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::celebration::{WinDescriptor, WinLevel};
    pub use crate::config::{DisplayConfig, DisplayConfigPatch};
    pub use crate::data::{PaylineSet, ReelStrips, SymbolSet};
    pub use crate::display::{RenderSurface, SlotDisplay};
    pub use crate::error::{DisplayError, DisplayResult};
    pub use crate::events::DisplayEvent;
    pub use crate::performance::{PerformanceThresholds, PerformanceWarning};

    pub use reelkit_render::{
        AtlasConfig, Color, EffectConfig, EffectId, EffectKind, GraphicsContext, Payline, ReelConfig, SpeedStagger,
        SymbolDescriptor, SymbolImage,
    };
}
