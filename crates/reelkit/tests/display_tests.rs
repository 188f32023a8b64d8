//! Integration tests for the slot display.
//!
//! Everything runs against a `MockRenderContext` and a `NullTarget`, so no
//! GPU is needed.

use std::sync::Arc;
use std::time::Duration;

use reelkit::data::{PaylineSet, ReelStrips, SymbolSet};
use reelkit::prelude::*;
use reelkit::render::{ReelPhase, SpinPhase};
use reelkit_test_utils::MockRenderContext;

const FRAME: Duration = Duration::from_millis(16);

// ============================================================================
// Helpers
// ============================================================================

fn outcome(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

fn uninitialized() -> SlotDisplay {
    SlotDisplay::new(DisplayConfig::default().with_particle_seed(7))
}

fn headless() -> (Arc<MockRenderContext>, RenderSurface) {
    let mock = Arc::new(MockRenderContext::new());
    let surface = RenderSurface::headless(mock.clone());
    (mock, surface)
}

/// Initialized display with the standard strips and paylines, events drained.
fn display() -> SlotDisplay {
    let mut display = uninitialized();
    let (_, surface) = headless();
    display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap();
    display.set_reel_data(ReelStrips::standard().into_vec()).unwrap();
    display.set_paylines(PaylineSet::standard().into_vec()).unwrap();
    display.drain_events();
    display
}

fn advance_for(display: &mut SlotDisplay, total: Duration, step: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        display.advance(step).unwrap();
        elapsed += step;
    }
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_atlas_packs_four_symbols() {
    let mut display = uninitialized();
    let (mock, surface) = headless();
    let symbols = vec![
        SymbolDescriptor::new("A", SymbolImage::None),
        SymbolDescriptor::new("B", SymbolImage::None),
        SymbolDescriptor::new("C", SymbolImage::None),
        SymbolDescriptor::alias("_", "C"),
    ];
    display.initialize_blocking(surface, &symbols).unwrap();

    let atlas = display.atlas().unwrap();
    assert_eq!(atlas.len(), 4);
    for entry in atlas.entries() {
        assert!((entry.uv.width() - 0.125).abs() < 1e-6);
        assert!((entry.uv.height() - 0.125).abs() < 1e-6);
    }
    let mut origins: Vec<_> = atlas.entries().map(|e| (e.x, e.y)).collect();
    origins.sort();
    origins.dedup();
    assert_eq!(origins.len(), 4);

    // Three built-in programs, each with a vertex and fragment module
    assert!(mock.count_shader_creates() >= 3);
    assert_eq!(mock.count_texture_creates(), 1);
}

#[test]
fn test_every_standard_strip_symbol_has_uv() {
    let display = display();
    let atlas = display.atlas().unwrap();
    for strip in ReelStrips::standard().into_vec() {
        for symbol in strip {
            assert!(atlas.uv(&symbol).is_some(), "no atlas entry for '{symbol}'");
        }
    }
}

#[test]
fn test_initialize_emits_ready() {
    let mut display = uninitialized();
    let (_, surface) = headless();
    display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap();
    assert!(display.is_initialized());
    assert_eq!(display.drain_events(), vec![DisplayEvent::Ready]);
}

#[test]
fn test_initialize_twice_fails() {
    let mut display = display();
    let (_, surface) = headless();
    let err = display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap_err();
    assert_eq!(err, DisplayError::AlreadyInitialized);
}

#[test]
fn test_invalid_config_emits_error() {
    let mut display = SlotDisplay::new(DisplayConfig::default().with_size(0, 600));
    let (_, surface) = headless();
    let err = display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap_err();
    assert!(matches!(err, DisplayError::InvalidConfig(_)));
    assert!(!display.is_initialized());
    assert_eq!(display.drain_events(), vec![DisplayEvent::Error(err)]);
}

#[test]
fn test_commands_before_initialize_fail() {
    let mut display = uninitialized();
    assert_eq!(display.start_spin("1", None), Err(DisplayError::NotInitialized));
    assert_eq!(
        display.set_reel_data(ReelStrips::standard().into_vec()),
        Err(DisplayError::NotInitialized)
    );
    assert_eq!(display.advance(FRAME), Err(DisplayError::NotInitialized));
    assert!(display.stats().is_err());
}

#[test]
fn test_reel_data_must_match_reel_count() {
    let mut display = display();
    let mut strips = ReelStrips::standard().into_vec();
    strips.pop();
    assert!(matches!(
        display.set_reel_data(strips),
        Err(DisplayError::InvalidConfig(_))
    ));
}

// ============================================================================
// Spinning
// ============================================================================

#[test]
fn test_stop_reel_lands_on_outcome() {
    let mut display = display();
    display.start_spin("spin-1", None).unwrap();
    assert!(display.is_running());

    advance_for(&mut display, Duration::from_millis(500), FRAME);
    display.stop_reel(2, outcome(&["A", "B", "C"]), None).unwrap();

    for _ in 0..200 {
        display.advance(FRAME).unwrap();
        if display.reels().unwrap().phase(2) == Some(ReelPhase::Idle) {
            break;
        }
    }

    let reels = display.reels().unwrap();
    assert_eq!(reels.phase(2), Some(ReelPhase::Idle));
    assert_eq!(reels.reel(2).unwrap().velocity, 0.0);
    assert_eq!(display.visible_symbols(2).unwrap(), outcome(&["A", "B", "C"]));
    // The other reels keep spinning
    assert_eq!(reels.phase(0), Some(ReelPhase::Spinning(SpinPhase::Free)));
    assert!(display.is_running());
}

#[test]
fn test_invalid_spin_override_is_rejected() {
    let mut display = display();
    let stalled = ReelConfig {
        deceleration: 0.0,
        ..ReelConfig::default()
    };
    assert!(matches!(
        display.start_spin("spin-1", Some(stalled)),
        Err(DisplayError::InvalidConfig(_))
    ));

    let resized = ReelConfig {
        tile_height: 96.0,
        ..ReelConfig::default()
    };
    assert!(matches!(
        display.start_spin("spin-1", Some(resized)),
        Err(DisplayError::InvalidConfig(_))
    ));

    assert!(!display.reels().unwrap().is_spinning());
    assert_eq!(display.current_spin(), None);

    // A valid override still spins and settles.
    let quick = ReelConfig {
        deceleration: 8000.0,
        ..ReelConfig::default()
    };
    display.start_spin("spin-2", Some(quick)).unwrap();
    display.stop_reel(0, outcome(&["C", "C", "C"]), None).unwrap();
    advance_for(&mut display, Duration::from_secs(2), FRAME);
    assert_eq!(display.reels().unwrap().phase(0), Some(ReelPhase::Idle));
}

#[test]
fn test_stop_reel_out_of_range() {
    let mut display = display();
    assert_eq!(
        display.stop_reel(5, outcome(&["A", "B", "C"]), None),
        Err(DisplayError::ReelIndexOutOfRange {
            index: 5,
            reel_count: 5
        })
    );
}

#[test]
fn test_delayed_stop_waits_for_engine_time() {
    let mut display = display();
    display.start_spin("spin-1", None).unwrap();
    display
        .stop_reel(0, outcome(&["B", "B", "B"]), Some(Duration::from_millis(200)))
        .unwrap();
    assert_eq!(display.pending_timers(), 1);

    display.advance(Duration::from_millis(100)).unwrap();
    assert_eq!(
        display.reels().unwrap().phase(0),
        Some(ReelPhase::Spinning(SpinPhase::Free))
    );

    display.advance(Duration::from_millis(100)).unwrap();
    assert_eq!(display.pending_timers(), 0);
    assert_ne!(
        display.reels().unwrap().phase(0),
        Some(ReelPhase::Spinning(SpinPhase::Free))
    );
}

#[test]
fn test_new_spin_cancels_pending_stops() {
    let mut display = display();
    display.start_spin("spin-1", None).unwrap();
    display
        .stop_reel(1, outcome(&["A", "A", "A"]), Some(Duration::from_secs(1)))
        .unwrap();
    display.start_spin("spin-2", None).unwrap();
    assert_eq!(display.pending_timers(), 0);
    assert_eq!(display.current_spin(), Some("spin-2"));
}

#[test]
fn test_show_outcome_completes_after_delay() {
    let mut display = display();
    display.start_spin("spin-9", None).unwrap();
    advance_for(&mut display, Duration::from_millis(200), FRAME);

    let grid = ReelStrips::standard().grid(&[10, 20, 30, 40, 50], 3);
    display.show_outcome(&grid, "spin-9").unwrap();
    assert!(!display.reels().unwrap().is_spinning());
    for (reel, column) in grid.iter().enumerate() {
        assert_eq!(&display.visible_symbols(reel).unwrap(), column);
    }

    // 13 frames have run, so the event is due at 508ms
    advance_for(&mut display, Duration::from_millis(280), FRAME);
    assert!(display.drain_events().is_empty());

    advance_for(&mut display, Duration::from_millis(32), FRAME);
    assert_eq!(
        display.drain_events(),
        vec![DisplayEvent::SpinComplete {
            spin_id: "spin-9".to_string()
        }]
    );
    assert_eq!(display.current_spin(), None);

    // Nothing left to animate
    assert!(!display.is_running());
}

#[test]
fn test_subscribers_see_spin_complete() {
    let mut display = display();
    let (_, rx) = display.subscribe();
    display.start_spin("spin-3", None).unwrap();
    let grid = ReelStrips::standard().grid(&[0, 0, 0, 0, 0], 3);
    display.show_outcome(&grid, "spin-3").unwrap();
    advance_for(&mut display, Duration::from_millis(300), Duration::from_millis(50));

    assert_eq!(
        rx.try_recv(),
        Ok(DisplayEvent::SpinComplete {
            spin_id: "spin-3".to_string()
        })
    );
}

#[test]
fn test_reset_reels_stops_everything() {
    let mut display = display();
    display.start_spin("spin-1", None).unwrap();
    advance_for(&mut display, Duration::from_millis(100), FRAME);
    display.reset_reels().unwrap();

    let reels = display.reels().unwrap();
    assert!(!reels.is_spinning());
    assert!((0..5).all(|i| reels.reel(i).unwrap().position == 0.0));
}

// ============================================================================
// Effects and paylines
// ============================================================================

#[test]
fn test_effect_expires() {
    let mut display = display();
    let id = display
        .create_effect(&EffectConfig::new(
            EffectKind::Sparkles,
            20,
            Duration::from_millis(1000),
        ))
        .unwrap();
    assert_eq!(display.particles().unwrap().active_particle_count(), 20);
    assert!(display.particles().unwrap().effect(id).is_some());

    advance_for(&mut display, Duration::from_millis(1100), Duration::from_millis(100));

    let particles = display.particles().unwrap();
    assert!(!particles.has_active_effects());
    assert_eq!(particles.active_particle_count(), 0);
    assert!(!display.is_running());
}

#[test]
fn test_particle_warning_respects_cooldown() {
    let mut display = SlotDisplay::new(
        DisplayConfig::default()
            .with_particle_seed(7)
            .with_performance(PerformanceThresholds {
                max_particles: 5,
                cooldown: Duration::from_secs(1),
                ..PerformanceThresholds::default()
            }),
    );
    let (_, surface) = headless();
    display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap();
    display.drain_events();

    display
        .create_effect(&EffectConfig::new(EffectKind::Sparkles, 20, Duration::from_secs(10)))
        .unwrap();
    let warnings = |events: Vec<DisplayEvent>| -> Vec<Vec<PerformanceWarning>> {
        events
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::PerformanceWarning { warnings, .. } => Some(warnings),
                _ => None,
            })
            .collect()
    };

    display.advance(FRAME).unwrap();
    let first = warnings(display.drain_events());
    assert_eq!(first.len(), 1);
    assert_eq!(
        first[0],
        vec![PerformanceWarning::TooManyParticles {
            count: 20,
            threshold: 5
        }]
    );

    // Still over the threshold, but inside the cooldown.
    advance_for(&mut display, Duration::from_millis(900), Duration::from_millis(100));
    assert!(warnings(display.drain_events()).is_empty());

    advance_for(&mut display, Duration::from_millis(200), Duration::from_millis(100));
    assert_eq!(warnings(display.drain_events()).len(), 1);
}

#[test]
fn test_no_warning_within_thresholds() {
    let mut display = display();
    display
        .create_effect(&EffectConfig::new(EffectKind::Sparkles, 20, Duration::from_secs(1)))
        .unwrap();
    advance_for(&mut display, Duration::from_millis(500), FRAME);
    assert!(
        display
            .drain_events()
            .iter()
            .all(|e| !matches!(e, DisplayEvent::PerformanceWarning { .. }))
    );
}

#[test]
fn test_raising_particle_cap_keeps_buffer_count() {
    let mut display = uninitialized();
    let (mock, surface) = headless();
    display
        .initialize_blocking(surface, &SymbolSet::standard().into_vec())
        .unwrap();
    let live = mock.live_buffer_count();

    display
        .update_config(&DisplayConfigPatch {
            max_particles: Some(5000),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(display.particles().unwrap().max_particles(), 5000);
    assert_eq!(mock.live_buffer_count(), live);

    display
        .create_effect(&EffectConfig::new(EffectKind::Explosion, 4000, Duration::from_secs(1)))
        .unwrap();
    let creates = mock.count_buffer_creates();
    advance_for(&mut display, Duration::from_millis(200), FRAME);
    assert_eq!(mock.count_buffer_creates(), creates);
    assert_eq!(mock.live_buffer_count(), live);
}

#[test]
fn test_celebration_spawns_preset_effects() {
    let mut display = display();
    let ids = display
        .show_win_celebration(&WinDescriptor::new(10_000, WinLevel::Jackpot))
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert!(display.particles().unwrap().active_particle_count() > 0);

    display.advance(FRAME).unwrap();
    assert_ne!(display.reels().unwrap().shake(), glam::Vec2::ZERO);

    display.clear_effects().unwrap();
    assert!(!display.particles().unwrap().has_active_effects());
}

#[test]
fn test_highlight_clears_after_duration() {
    let mut display = display();
    let shown = display
        .highlight_paylines(&[0, 3], Duration::from_millis(3000))
        .unwrap();
    assert_eq!(shown, 2);

    for _ in 0..299 {
        display.advance(Duration::from_millis(10)).unwrap();
    }
    assert!(display.payline_highlight().unwrap().is_some());

    display.advance(Duration::from_millis(10)).unwrap();
    assert!(display.payline_highlight().unwrap().is_none());
    assert!(!display.is_running());
}

#[test]
fn test_highlight_respects_selected_paylines() {
    let mut display = display();
    display.set_selected_paylines(5).unwrap();
    let shown = display
        .highlight_paylines(&[1, 7, 12], Duration::from_secs(1))
        .unwrap();
    assert_eq!(shown, 1);
}

// ============================================================================
// Config and lifecycle
// ============================================================================

#[test]
fn test_update_config_resizes() {
    let mut display = display();
    let origin = display.reels().unwrap().layout().origin;
    display
        .update_config(&DisplayConfigPatch {
            width: Some(1024),
            height: Some(768),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(display.config().width, 1024);
    assert_eq!(display.renderer().unwrap().viewport(), (1024, 768));
    assert_ne!(display.reels().unwrap().layout().origin, origin);
}

#[test]
fn test_frames_are_drawn() {
    let mut display = display();
    display.start_spin("spin-1", None).unwrap();
    display.advance(FRAME).unwrap();

    let stats = display.stats().unwrap();
    // One clipped draw per reel
    assert!(stats.draw_calls >= 5);
    assert!(stats.triangles > 0);
    assert!(stats.texture_memory > 0);
}

#[test]
fn test_destroy_is_idempotent() {
    let mut display = display();
    display.destroy();
    display.destroy();
    assert!(!display.is_initialized());
    assert!(!display.is_running());
    assert_eq!(display.start_spin("1", None), Err(DisplayError::NotInitialized));

    let (_, surface) = headless();
    assert_eq!(
        display.initialize_blocking(surface, &SymbolSet::standard().into_vec()),
        Err(DisplayError::NotInitialized)
    );
}
