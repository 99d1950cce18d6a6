//! Integration tests for audio-focus arbitration.
//!
//! This test suite verifies:
//! - The focus-change transition table (gain / loss / transient / duck)
//! - Duck and raise round-trips on the master volume
//! - Crossfade override during arbitration transitions
//! - Event emission and the asynchronous focus pump

mod common;

use common::{drain_events, EngineOp, RecordingEngine, ScriptedFocus};
use core_runtime::events::SessionEvent;
use core_session::{MusicSession, MusicSessionConfig, PlayState};
use core_volume::Volume;
use engine_traits::{FixedRouting, FocusChange, MediaSource};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn music_session(
    engine: Arc<RecordingEngine>,
    focus: Arc<ScriptedFocus>,
) -> Arc<MusicSession> {
    MusicSession::new(
        engine,
        focus,
        Arc::new(FixedRouting::default()),
        MusicSessionConfig::default(),
    )
    .unwrap()
}

fn track_source() -> MediaSource {
    MediaSource::LocalFile {
        path: "/music/track.ogg".into(),
    }
}

// ============================================================================
// Transition Table
// ============================================================================

#[test]
fn test_transient_loss_pauses_playing_tracks() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine.clone(), focus);
    let track = session.load(track_source()).unwrap();
    track.play().unwrap();

    session.handle_focus_change(FocusChange::LossTransient);

    assert_eq!(track.state(), PlayState::Paused);
    assert!(engine.saw(&EngineOp::Pause(track.handle())));
}

#[test]
fn test_gain_resumes_paused_tracks() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine.clone(), focus);
    let track = session.load(track_source()).unwrap();
    track.play().unwrap();
    session.handle_focus_change(FocusChange::LossTransient);

    session.handle_focus_change(FocusChange::Gain);

    assert_eq!(track.state(), PlayState::Playing);
    assert!(engine.saw(&EngineOp::Resume(track.handle())));
}

#[test]
fn test_loss_stops_paused_and_playing_tracks() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine.clone(), focus);
    let playing = session.load(track_source()).unwrap();
    let paused = session.load(track_source()).unwrap();
    paused.play().unwrap();
    paused.pause().unwrap();
    playing.play().unwrap();

    session.handle_focus_change(FocusChange::Loss);

    assert_eq!(playing.state(), PlayState::Stopped);
    assert_eq!(paused.state(), PlayState::Stopped);
    assert!(engine.saw(&EngineOp::Stop(playing.handle())));
    assert!(engine.saw(&EngineOp::Stop(paused.handle())));
}

#[test]
fn test_loss_overrides_crossfade() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine.clone(), focus);
    let track = session.load(track_source()).unwrap();
    track.play().unwrap();
    track.enable_crossfade(Duration::from_millis(400));

    session.handle_focus_change(FocusChange::Loss);

    // Arbitration must land immediately, not behind a fade tail.
    assert!(!track.is_crossfade_enabled());
    assert_eq!(track.state(), PlayState::Stopped);
    assert!(engine.saw(&EngineOp::Stop(track.handle())));
}

// ============================================================================
// Ducking
// ============================================================================

#[test]
fn test_duck_lowers_master_and_propagates() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine, focus);
    let track = session.load(track_source()).unwrap();

    session.handle_focus_change(FocusChange::LossTransientCanDuck);

    assert!(session.master().is_ducked());
    assert!((session.master().offset() - Volume::DUCK_FLOOR).abs() < f32::EPSILON);
    assert!((track.volume().offset() - Volume::DUCK_FLOOR).abs() < f32::EPSILON);
}

#[test]
fn test_gain_restores_the_pre_duck_level() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine, focus);
    session.master().set_channel(0.8).unwrap();

    session.handle_focus_change(FocusChange::LossTransientCanDuck);
    assert!((session.master().calculated_channel() - 0.8 * Volume::DUCK_FLOOR).abs() < 1e-6);

    session.handle_focus_change(FocusChange::Gain);
    assert!(!session.master().is_ducked());
    assert!((session.master().calculated_channel() - 0.8).abs() < 1e-6);
}

#[test]
fn test_repeated_ducks_emit_one_duck_event() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine, focus);
    let mut stream = session.subscribe();

    session.handle_focus_change(FocusChange::LossTransientCanDuck);
    session.handle_focus_change(FocusChange::LossTransientCanDuck);

    let events = drain_events(&mut stream);
    let ducks = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::MasterDucked { .. }))
        .count();
    let changes = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::FocusChanged { .. }))
        .count();
    assert_eq!(ducks, 1);
    assert_eq!(changes, 2);
}

// ============================================================================
// Focus Pump
// ============================================================================

#[tokio::test]
async fn test_focus_pump_applies_external_changes() {
    let engine = RecordingEngine::new();
    let focus = ScriptedFocus::granting();
    let session = music_session(engine.clone(), focus.clone());
    let track = session.load(track_source()).unwrap();
    track.play().unwrap();

    let cancel = CancellationToken::new();
    let pump = {
        let session = Arc::clone(&session);
        let cancel = cancel.clone();
        tokio::spawn(async move { session.run_focus_events(cancel).await })
    };

    // The pump subscribes when it first runs; retry until it is wired up.
    while focus.announce(FocusChange::LossTransient) == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::timeout(Duration::from_secs(1), async {
        while track.state() != PlayState::Paused {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("focus change was never applied");

    cancel.cancel();
    pump.await.unwrap().unwrap();
    assert!(engine.saw(&EngineOp::Pause(track.handle())));
}
