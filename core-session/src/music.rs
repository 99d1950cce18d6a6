//! Music session: exclusive long-form playback with focus arbitration
//! and crossfade.
//!
//! ## Overview
//!
//! A [`MusicSession`] owns [`MusicTrack`]s. At most one track is audibly
//! playing at a time: starting one stops every playing peer, crossfading
//! it out when crossfade is enabled. Focus is requested from the host
//! before every play and abandoned on every pause and stop; the session
//! reacts to asynchronous focus changes by ducking or raising its master
//! volume and driving pooled tracks.
//!
//! ## Architecture
//!
//! ```text
//!   FocusHost ──changes──> run_focus_events ──> handle_focus_change
//!                                                 │ duck/raise master
//!                                                 │ play/pause/stop members
//!                                                 v
//!   MusicTrack.play ──> stop playing peers ──> request focus
//!                                                 │ granted
//!                                                 v
//!                                   engine start ──> state Playing
//!                                                 │ crossfade enabled
//!                                                 v
//!                                   local volume fades 0 -> full
//! ```
//!
//! A crossfaded stop is logically immediate: the track flips to Stopped
//! and abandons focus right away, while the local volume fades out as an
//! audio tail. When the tail completes, the engine stop lands and the
//! pre-fade level is restored.

use crate::config::MusicSessionConfig;
use crate::error::{Result, SessionError};
use crate::playable::{PlayState, Playable, SessionState};
use crate::session::AudioSession;
use core_runtime::events::{EventBus, EventStream, SessionEvent};
use core_volume::{FadeOutcome, SubscriberId, Volume, VolumeEvent};
use engine_traits::{
    FocusChange, FocusHost, FocusKind, MediaHandle, MediaSource, OutputRoute, OutputRouting,
    PlaybackEngine, StreamKind,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Music Track
// ============================================================================

/// A long-form audio object pooled in a [`MusicSession`].
///
/// Tracks are created through [`MusicSession::load`]. Each owns a local
/// [`Volume`] composed with the session master; its calculated levels
/// are pushed into the engine on every change.
pub struct MusicTrack {
    handle: MediaHandle,
    engine: Arc<dyn PlaybackEngine>,
    focus: Arc<dyn FocusHost>,
    events: EventBus,
    session: Weak<MusicSession>,
    volume: Volume,
    state: Mutex<PlayState>,
    crossfade: Mutex<Duration>,
    looping: AtomicBool,
    mute_paused: AtomicBool,
    released: AtomicBool,
    subscription: Mutex<Option<SubscriberId>>,
}

impl MusicTrack {
    pub(crate) fn new(session: &Arc<MusicSession>, handle: MediaHandle) -> Arc<Self> {
        let volume = Volume::new();
        if let Err(error) = volume.set_offset(session.master().calculated_channel()) {
            warn!(handle = %handle, %error, "initial master offset rejected");
        }
        let track = Arc::new(Self {
            handle,
            engine: Arc::clone(&session.engine),
            focus: Arc::clone(&session.focus),
            events: session.events().clone(),
            session: Arc::downgrade(session),
            volume,
            state: Mutex::new(PlayState::Stopped),
            crossfade: Mutex::new(Duration::ZERO),
            looping: AtomicBool::new(false),
            mute_paused: AtomicBool::new(false),
            released: AtomicBool::new(false),
            subscription: Mutex::new(None),
        });
        let weak = Arc::downgrade(&track);
        let id = track.volume.subscribe(move |event| {
            if let VolumeEvent::Levels { .. } = event {
                if let Some(track) = weak.upgrade() {
                    track.handle_volume_change();
                }
            }
        });
        *track.subscription.lock() = Some(id);
        track
    }

    /// Engine handle identifying the loaded media.
    pub fn handle(&self) -> MediaHandle {
        self.handle
    }

    /// Shared handle to the track's local volume.
    pub fn volume(&self) -> Volume {
        self.volume.clone()
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        *self.state.lock()
    }

    /// Start or resume playback.
    ///
    /// Stops every playing peer first (crossfading it out when this
    /// track crossfades in), then requests focus. A denied request or a
    /// muted composed volume leaves everything untouched. State changes
    /// only after the engine confirmed the start.
    pub fn play(&self) -> Result<()> {
        self.ensure_live()?;
        if self.volume.is_muted() {
            debug!(handle = %self.handle, "play skipped, composed volume is muted");
            return Ok(());
        }
        let crossfade = self.crossfade();

        if let Some(session) = self.session.upgrade() {
            for peer in session.pool_by_state(&[PlayState::Playing]) {
                if peer.handle == self.handle {
                    continue;
                }
                if !crossfade.is_zero() {
                    peer.enable_crossfade(crossfade);
                }
                if let Err(error) = peer.stop() {
                    warn!(handle = %peer.handle, %error, "failed to stop playing peer");
                }
            }
        }

        let response = self.focus.request_focus(StreamKind::Music, FocusKind::Gain);
        if !response.is_granted() {
            debug!(handle = %self.handle, "focus denied, playback not started");
            return Ok(());
        }

        // A pending crossfade tail must not stop the engine underneath
        // the restart.
        self.volume.cancel_fade();

        if self.state().is_paused() {
            self.engine.resume(self.handle)?;
        } else {
            self.engine.start(self.handle)?;
        }
        self.set_state(PlayState::Playing);

        if !crossfade.is_zero() {
            self.volume
                .fade_channel_from(Volume::MIN, Volume::MAX, crossfade)?;
        }
        Ok(())
    }

    /// Suspend playback and give focus back. No-op unless playing.
    pub fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.state().is_playing() {
            return Ok(());
        }
        self.engine.pause(self.handle)?;
        self.set_state(PlayState::Paused);
        self.focus.abandon_focus();
        Ok(())
    }

    /// Stop playback, crossfading out when enabled and currently
    /// playing.
    pub fn stop(&self) -> Result<()> {
        self.ensure_live()?;
        let crossfade = self.crossfade();
        if !crossfade.is_zero() && self.state().is_playing() {
            self.stop_crossfaded(crossfade)
        } else {
            self.stop_now()
        }
    }

    fn stop_now(&self) -> Result<()> {
        if self.state().is_stopped() {
            return Ok(());
        }
        self.mute_paused.store(false, Ordering::Release);
        self.engine.stop(self.handle)?;
        self.set_state(PlayState::Stopped);
        self.focus.abandon_focus();
        Ok(())
    }

    /// The logical stop is immediate: state flips and focus is
    /// abandoned now, the fade is only the audio tail. When the tail
    /// completes, the engine stop lands and the pre-fade level comes
    /// back so a later non-crossfaded play is audible. A superseding
    /// fade leaves the engine alone.
    fn stop_crossfaded(&self, crossfade: Duration) -> Result<()> {
        let level = self.volume.channel();
        let fade = self.volume.fade_channel(Volume::MIN, crossfade)?;
        self.mute_paused.store(false, Ordering::Release);
        self.set_state(PlayState::Stopped);
        self.focus.abandon_focus();

        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();
        let volume = self.volume.clone();
        let handle = self.handle;
        // fade_channel succeeded, so a runtime is current to own the tail.
        tokio::spawn(async move {
            if fade.outcome().await != FadeOutcome::Completed {
                return;
            }
            if let Err(error) = engine.stop(handle) {
                warn!(%handle, %error, "crossfade tail stop failed");
                let _ = events.emit(SessionEvent::PlaybackFailed {
                    handle: Some(handle),
                    message: error.to_string(),
                });
            }
            if let Err(error) = volume.set_channel(level) {
                warn!(%handle, %error, "pre-fade level restore failed");
            }
        });
        Ok(())
    }

    /// Deregister from the session and free the engine resources.
    /// Idempotent.
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(id) = self.subscription.lock().take() {
            self.volume.unsubscribe(id);
        }
        self.volume.cancel_fade();
        // Pool deregistration must precede the engine release.
        if let Some(session) = self.session.upgrade() {
            session.deregister(self.handle);
        }
        self.engine.unload(self.handle)?;
        debug!(handle = %self.handle, "music track released");
        Ok(())
    }

    /// Toggle seamless looping, forwarded to the engine immediately.
    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.ensure_live()?;
        self.looping.store(looping, Ordering::Release);
        self.engine.set_looping(self.handle, looping)?;
        Ok(())
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Enable crossfade with the given duration for subsequent play and
    /// stop calls.
    pub fn enable_crossfade(&self, duration: Duration) {
        *self.crossfade.lock() = duration;
    }

    /// Disable crossfade; play and stop act immediately again.
    pub fn disable_crossfade(&self) {
        *self.crossfade.lock() = Duration::ZERO;
    }

    /// The current crossfade duration; zero when disabled.
    pub fn crossfade(&self) -> Duration {
        *self.crossfade.lock()
    }

    pub fn is_crossfade_enabled(&self) -> bool {
        !self.crossfade().is_zero()
    }

    /// Volume hook: mute-pause and auto-resume, then push the calculated
    /// levels into the engine.
    ///
    /// Muting the composed volume while playing pauses the track and
    /// remembers why; unmuting while still paused for that reason
    /// resumes it. An explicit pause in between clears nothing, but the
    /// resume only fires when the pause came from the mute.
    fn handle_volume_change(&self) {
        if self.volume.is_muted() && self.state().is_playing() {
            self.mute_paused.store(true, Ordering::Release);
            if let Err(error) = self.pause() {
                warn!(handle = %self.handle, %error, "mute pause failed");
            }
        } else if !self.volume.is_muted()
            && self.state().is_paused()
            && self.mute_paused.load(Ordering::Acquire)
        {
            self.mute_paused.store(false, Ordering::Release);
            if let Err(error) = self.play() {
                warn!(handle = %self.handle, %error, "mute resume failed");
            }
        }

        if let Err(error) = self.engine.set_volume(
            self.handle,
            self.volume.calculated_left(),
            self.volume.calculated_right(),
        ) {
            warn!(handle = %self.handle, %error, "engine volume push failed");
        }
    }

    fn set_state(&self, next: PlayState) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, next)
        };
        if previous == next {
            return;
        }
        debug!(handle = %self.handle, ?previous, ?next, "music state changed");
        let event = match next {
            PlayState::Playing => SessionEvent::PlaybackStarted {
                handle: self.handle,
            },
            PlayState::Paused => SessionEvent::PlaybackPaused {
                handle: self.handle,
            },
            PlayState::Stopped => SessionEvent::PlaybackStopped {
                handle: self.handle,
            },
        };
        let _ = self.events.emit(event);
    }

    fn ensure_live(&self) -> Result<()> {
        let released = self.released.load(Ordering::Acquire);
        debug_assert!(!released, "operation on a released track");
        if released {
            return Err(SessionError::UseAfterRelease);
        }
        Ok(())
    }
}

impl Playable for MusicTrack {
    fn play(&self) -> Result<()> {
        MusicTrack::play(self)
    }

    fn pause(&self) -> Result<()> {
        MusicTrack::pause(self)
    }

    fn stop(&self) -> Result<()> {
        MusicTrack::stop(self)
    }

    fn release(&self) -> Result<()> {
        MusicTrack::release(self)
    }

    fn state(&self) -> PlayState {
        MusicTrack::state(self)
    }

    fn volume(&self) -> Volume {
        MusicTrack::volume(self)
    }

    fn handle(&self) -> MediaHandle {
        MusicTrack::handle(self)
    }
}

// ============================================================================
// Music Session
// ============================================================================

/// Session managing exclusive music playback.
pub struct MusicSession {
    base: AudioSession<MusicTrack>,
    engine: Arc<dyn PlaybackEngine>,
    focus: Arc<dyn FocusHost>,
    config: MusicSessionConfig,
}

impl MusicSession {
    /// Create a music session around the injected host collaborators.
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        focus: Arc<dyn FocusHost>,
        routing: Arc<dyn OutputRouting>,
        config: MusicSessionConfig,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(SessionError::Config)?;
        let events = EventBus::new(config.event_buffer);
        Ok(Arc::new(Self {
            base: AudioSession::new(StreamKind::Music, routing, events),
            engine,
            focus,
            config,
        }))
    }

    /// Load a media source through the engine and register a track for
    /// it. The configured crossfade, when non-zero, is stamped onto the
    /// new track.
    pub fn load(self: &Arc<Self>, source: MediaSource) -> Result<Arc<MusicTrack>> {
        let handle = self.engine.load(source)?;
        let track = MusicTrack::new(self, handle);
        self.base.add(&track);
        if !self.config.crossfade.is_zero() {
            track.enable_crossfade(self.config.crossfade);
        }
        debug!(handle = %handle, "music track registered");
        Ok(track)
    }

    /// Re-register a previously removed track.
    pub fn add(&self, track: &Arc<MusicTrack>) -> bool {
        self.base.add(track)
    }

    /// Remove a track from the pool without releasing it.
    pub fn remove(&self, track: &Arc<MusicTrack>) -> bool {
        self.base.remove(track)
    }

    pub(crate) fn deregister(&self, handle: MediaHandle) -> bool {
        self.base.deregister(handle)
    }

    /// Snapshot of every pooled track, insertion order.
    pub fn pool_snapshot(&self) -> Vec<Arc<MusicTrack>> {
        self.base.pool_snapshot()
    }

    /// Pooled tracks in the given states, most recently added first.
    pub fn pool_by_state(&self, states: &[PlayState]) -> Vec<Arc<MusicTrack>> {
        self.base.pool_by_state(states)
    }

    /// Shared handle to the master volume.
    pub fn master(&self) -> Volume {
        self.base.master()
    }

    /// Replace the master volume and re-broadcast it to every track.
    pub fn set_master_volume(&self, volume: Volume) {
        self.base.set_master_volume(volume);
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.base.state()
    }

    /// Start the session. When restarting from `Stopped`, every paused
    /// track resumes playing first.
    pub fn start(&self) {
        if self.base.state() == SessionState::Stopped {
            self.transition_members(&[PlayState::Paused], PlayState::Playing);
        }
        self.base.start();
    }

    /// Stop the session, pausing every playing track until the next
    /// start.
    pub fn stop(&self) {
        self.transition_members(&[PlayState::Playing], PlayState::Paused);
        self.base.stop();
    }

    /// Stop and release every track, then go idle.
    pub fn release_all(&self) {
        self.base.release_all();
    }

    /// Resolve the active output route.
    pub fn output_route(&self) -> OutputRoute {
        self.base.output_route()
    }

    /// The session's event bus.
    pub fn events(&self) -> &EventBus {
        self.base.events()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventStream {
        self.base.subscribe()
    }

    /// The configuration the session was built with.
    pub fn config(&self) -> &MusicSessionConfig {
        &self.config
    }

    /// Apply one host focus change to the master volume and the pool.
    ///
    /// | Change | Master volume | Pool |
    /// |---|---|---|
    /// | `Gain` | `raise()` | every Paused track plays |
    /// | `LossTransient` | - | every Playing track pauses |
    /// | `LossTransientCanDuck` | `duck()` | - |
    /// | `Loss` | - | every Paused or Playing track stops |
    pub fn handle_focus_change(&self, change: FocusChange) {
        debug!(?change, "applying focus change");
        let _ = self.events().emit(SessionEvent::FocusChanged {
            stream: StreamKind::Music,
            change,
        });
        match change {
            FocusChange::Gain => {
                if self.master().raise() {
                    let _ = self.events().emit(SessionEvent::MasterRaised {
                        stream: StreamKind::Music,
                    });
                }
                self.transition_members(&[PlayState::Paused], PlayState::Playing);
            }
            FocusChange::LossTransient => {
                self.transition_members(&[PlayState::Playing], PlayState::Paused);
            }
            FocusChange::LossTransientCanDuck => {
                if self.master().duck() {
                    let _ = self.events().emit(SessionEvent::MasterDucked {
                        stream: StreamKind::Music,
                    });
                }
            }
            FocusChange::Loss => {
                self.transition_members(
                    &[PlayState::Paused, PlayState::Playing],
                    PlayState::Stopped,
                );
            }
        }
    }

    /// Drive every track in one of the `from` states to `to`, most
    /// recently added first. Crossfade is disabled on each affected
    /// track first so arbitration transitions land immediately.
    fn transition_members(&self, from: &[PlayState], to: PlayState) {
        for track in self.base.pool_by_state(from) {
            track.disable_crossfade();
            let result = match to {
                PlayState::Playing => track.play(),
                PlayState::Paused => track.pause(),
                PlayState::Stopped => track.stop(),
            };
            if let Err(error) = result {
                warn!(handle = %track.handle(), %error, "focus transition failed");
            }
        }
    }

    /// Pump host focus changes into [`handle_focus_change`] until the
    /// token cancels or the host channel closes.
    ///
    /// [`handle_focus_change`]: MusicSession::handle_focus_change
    #[instrument(skip(self, cancel))]
    pub async fn run_focus_events(&self, cancel: CancellationToken) -> Result<()> {
        let mut changes = self.focus.focus_changes();
        info!("focus event pump started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("focus event pump stopped");
                    return Ok(());
                }
                change = changes.recv() => match change {
                    Ok(change) => self.handle_focus_change(change),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "focus changes lagged, continuing");
                    }
                    Err(RecvError::Closed) => {
                        info!("focus channel closed, pump exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for MusicSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicSession")
            .field("state", &self.state())
            .field("tracks", &self.base.len())
            .field("crossfade", &self.config.crossfade)
            .finish()
    }
}
