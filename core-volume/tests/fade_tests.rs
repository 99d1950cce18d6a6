//! Fade engine integration tests.
//!
//! All tests run on a paused Tokio clock so tick timing is exact and
//! no test depends on wall-clock speed.

use core_volume::{FadeOutcome, Volume, VolumeEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::yield_now;
use tokio::time::{advance, sleep};

fn record_levels(volume: &Volume) -> Arc<Mutex<Vec<f32>>> {
    let levels = Arc::new(Mutex::new(Vec::new()));
    let sink = levels.clone();
    volume.subscribe(move |event| {
        if let VolumeEvent::Levels { left, .. } = event {
            sink.lock().unwrap().push(left);
        }
    });
    levels
}

/// Let already-woken tasks run to their next await point.
async fn drain_ready_tasks() {
    for _ in 0..5 {
        yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn fade_completes_exactly_on_target() {
    let volume = Volume::new();
    let levels = record_levels(&volume);

    let fade = volume
        .fade_channel(0.0, Duration::from_millis(100))
        .unwrap();
    assert_eq!(fade.outcome().await, FadeOutcome::Completed);

    assert_eq!(volume.channel(), 0.0);
    // Fade ticks bypass the auto-mute latch.
    assert!(!volume.is_muted());
    assert!(!volume.is_fading());

    let levels = levels.lock().unwrap();
    assert_eq!(*levels.last().unwrap(), 0.0);
    // Strictly non-increasing ramp, observed per tick.
    assert!(levels.windows(2).all(|pair| pair[1] <= pair[0]));
    assert!(levels.len() > 2, "expected intermediate ticks, got {levels:?}");
}

#[tokio::test(start_paused = true)]
async fn cancel_leaves_last_tick_value() {
    let volume = Volume::new();
    let fade = volume
        .fade_channel(0.0, Duration::from_millis(200))
        .unwrap();

    sleep(Duration::from_millis(40)).await;
    drain_ready_tasks().await;

    assert!(volume.cancel_fade());
    assert_eq!(fade.outcome().await, FadeOutcome::Canceled);

    // 40ms into a 200ms fade from 1.0 to 0.0 sits at 0.8; the cancel
    // must not jump to the target.
    assert!((volume.channel() - 0.8).abs() < 1e-3, "got {}", volume.channel());
    assert!(!volume.is_fading());
    assert!(!volume.cancel_fade());
}

#[tokio::test(start_paused = true)]
async fn new_fade_supersedes_running_fade() {
    let volume = Volume::new();

    let first = volume
        .fade_channel(0.0, Duration::from_millis(500))
        .unwrap();
    let second = volume
        .fade_channel(1.0, Duration::from_millis(100))
        .unwrap();

    assert_eq!(first.outcome().await, FadeOutcome::Canceled);
    assert_eq!(second.outcome().await, FadeOutcome::Completed);
    assert_eq!(volume.channel(), 1.0);
    assert!(!volume.is_fading());
}

#[tokio::test(start_paused = true)]
async fn fade_from_silence_never_latches_mute() {
    let volume = Volume::new();
    volume.set_channel(0.9).unwrap();

    let muted_per_event = Arc::new(Mutex::new(Vec::new()));
    let sink = muted_per_event.clone();
    let probe = volume.clone();
    volume.subscribe(move |event| {
        if let VolumeEvent::Levels { left, .. } = event {
            sink.lock().unwrap().push((left, probe.is_muted()));
        }
    });

    let fade = volume
        .fade_channel_from(0.0, 1.0, Duration::from_millis(100))
        .unwrap();
    assert_eq!(fade.outcome().await, FadeOutcome::Completed);

    let observed = muted_per_event.lock().unwrap();
    let (first_level, first_muted) = observed[0];
    assert_eq!(first_level, 0.0, "fade must start from the explicit value");
    assert!(!first_muted, "fade path must not latch auto-mute at zero");
    assert!(observed.iter().all(|(_, muted)| !muted));
    assert_eq!(volume.channel(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn balance_fade_shares_the_single_slot() {
    let volume = Volume::new();

    let channel_fade = volume
        .fade_channel(0.0, Duration::from_millis(500))
        .unwrap();
    let balance_fade = volume
        .fade_balance(Volume::BALANCE_RIGHT, Duration::from_millis(100))
        .unwrap();

    assert_eq!(channel_fade.outcome().await, FadeOutcome::Canceled);
    assert_eq!(balance_fade.outcome().await, FadeOutcome::Completed);
    assert_eq!(volume.balance(), Volume::BALANCE_RIGHT);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_fade_applies_target_immediately() {
    let volume = Volume::new();
    let fade = volume.fade_channel(0.3, Duration::ZERO).unwrap();
    assert_eq!(fade.outcome().await, FadeOutcome::Completed);
    assert_eq!(volume.channel(), 0.3);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_does_not_cancel() {
    let volume = Volume::new();
    let fade = volume
        .fade_channel(0.0, Duration::from_millis(100))
        .unwrap();
    drop(fade);

    sleep(Duration::from_millis(150)).await;
    drain_ready_tasks().await;

    assert_eq!(volume.channel(), 0.0);
    assert!(!volume.is_fading());
}

#[tokio::test(start_paused = true)]
async fn fade_ticks_notify_through_the_immediate_path() {
    let volume = Volume::new();
    let levels = record_levels(&volume);

    let fade = volume
        .fade_channel(0.5, Duration::from_millis(60))
        .unwrap();
    fade.outcome().await;

    // Every tick produced exactly one Levels notification.
    let levels = levels.lock().unwrap();
    assert!(!levels.is_empty());
    assert_eq!(*levels.last().unwrap(), 0.5);
}

#[tokio::test(start_paused = true)]
async fn explicit_advance_marches_the_ramp() {
    let volume = Volume::new();
    let _fade = volume
        .fade_channel(0.0, Duration::from_millis(100))
        .unwrap();

    advance(Duration::from_millis(50)).await;
    drain_ready_tasks().await;
    let midway = volume.channel();
    assert!((midway - 0.5).abs() < 1e-3, "got {midway}");

    advance(Duration::from_millis(60)).await;
    drain_ready_tasks().await;
    assert_eq!(volume.channel(), 0.0);
}
