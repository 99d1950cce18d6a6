//! Effects session: short polyphonic samples over an engine sound pool.
//!
//! ## Overview
//!
//! An [`EffectsSession`] owns [`EffectSample`]s. Unlike music, effects
//! are polyphonic and do not arbitrate focus: many samples may play at
//! once, capped by [`max_streams`](crate::config::EffectsSessionConfig).
//! Loading is asynchronous; the session routes the engine's
//! load-completion notices back to the owning sample, and playing a
//! sample that has not finished loading is a silent no-op.
//!
//! ```text
//!   PlaybackEngine ──completions──> run_load_events
//!                                       │ handle -> sample map
//!                                       v
//!                                 mark_loaded / warn
//!
//!   EffectSample.play ──> reserve stream (steal oldest at the cap)
//!                     ──> push volume + rate + looping ──> engine start
//! ```

use crate::config::EffectsSessionConfig;
use crate::error::{Result, SessionError};
use crate::playable::{PlayState, Playable, SessionState};
use crate::session::AudioSession;
use core_runtime::events::{EventBus, EventStream, SessionEvent};
use core_volume::{SubscriberId, Volume, VolumeEvent};
use engine_traits::{
    LoadCompletion, MediaHandle, MediaSource, OutputRoute, OutputRouting, PlaybackEngine,
    StreamKind,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Effect Sample
// ============================================================================

/// A short audio sample pooled in an [`EffectsSession`].
///
/// Samples are created through [`EffectsSession::load`] and become
/// playable once the engine reports the load complete. Playback control
/// is guarded by an active-stream flag so pause, stop, and live
/// rate/looping pushes only reach the engine while a stream exists.
pub struct EffectSample {
    handle: MediaHandle,
    engine: Arc<dyn PlaybackEngine>,
    events: EventBus,
    session: Weak<EffectsSession>,
    volume: Volume,
    state: Mutex<PlayState>,
    rate: Mutex<f32>,
    looping: AtomicBool,
    loaded: AtomicBool,
    stream_active: AtomicBool,
    released: AtomicBool,
    subscription: Mutex<Option<SubscriberId>>,
}

impl EffectSample {
    /// Slowest accepted playback rate.
    pub const RATE_MIN: f32 = 0.5;
    /// Fastest accepted playback rate.
    pub const RATE_MAX: f32 = 2.0;

    pub(crate) fn new(session: &Arc<EffectsSession>, handle: MediaHandle) -> Arc<Self> {
        let volume = Volume::new();
        if let Err(error) = volume.set_offset(session.master().calculated_channel()) {
            warn!(handle = %handle, %error, "initial master offset rejected");
        }
        let sample = Arc::new(Self {
            handle,
            engine: Arc::clone(&session.engine),
            events: session.events().clone(),
            session: Arc::downgrade(session),
            volume,
            state: Mutex::new(PlayState::Stopped),
            rate: Mutex::new(1.0),
            looping: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            stream_active: AtomicBool::new(false),
            released: AtomicBool::new(false),
            subscription: Mutex::new(None),
        });
        let weak = Arc::downgrade(&sample);
        let id = sample.volume.subscribe(move |event| {
            if let VolumeEvent::Levels { .. } = event {
                if let Some(sample) = weak.upgrade() {
                    sample.handle_volume_change();
                }
            }
        });
        *sample.subscription.lock() = Some(id);
        sample
    }

    /// Engine handle identifying the loaded sample.
    pub fn handle(&self) -> MediaHandle {
        self.handle
    }

    /// Shared handle to the sample's local volume.
    pub fn volume(&self) -> Volume {
        self.volume.clone()
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        *self.state.lock()
    }

    /// Whether the engine has reported the sample ready.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    /// Start or resume the sample.
    ///
    /// Before the load completes this is a no-op and the state does not
    /// change. A fresh start reserves a stream (stealing the oldest
    /// playing sample at the cap) and pushes volume, rate, and looping
    /// into the engine before starting.
    pub fn play(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.is_loaded() {
            debug!(handle = %self.handle, "play skipped, sample not loaded yet");
            return Ok(());
        }
        if self.stream_active.load(Ordering::Acquire) && self.state().is_paused() {
            self.engine.resume(self.handle)?;
            self.set_state(PlayState::Playing);
            return Ok(());
        }
        if let Some(session) = self.session.upgrade() {
            session.reserve_stream(self.handle);
        }
        self.engine.set_volume(
            self.handle,
            self.volume.calculated_left(),
            self.volume.calculated_right(),
        )?;
        self.engine.set_rate(self.handle, self.rate())?;
        self.engine
            .set_looping(self.handle, self.looping.load(Ordering::Acquire))?;
        self.engine.start(self.handle)?;
        self.stream_active.store(true, Ordering::Release);
        self.set_state(PlayState::Playing);
        Ok(())
    }

    /// Suspend the active stream. No-op without one or unless playing.
    pub fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.stream_active.load(Ordering::Acquire) || !self.state().is_playing() {
            return Ok(());
        }
        self.engine.pause(self.handle)?;
        self.set_state(PlayState::Paused);
        Ok(())
    }

    /// Stop and give the stream back. No-op without an active stream.
    pub fn stop(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.stream_active.load(Ordering::Acquire) {
            return Ok(());
        }
        self.engine.stop(self.handle)?;
        self.stream_active.store(false, Ordering::Release);
        self.set_state(PlayState::Stopped);
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
        debug!(handle = %self.handle, "effect sample released");
        Ok(())
    }

    /// Set the playback rate, valid range
    /// [`RATE_MIN`](Self::RATE_MIN)..=[`RATE_MAX`](Self::RATE_MAX).
    /// Applied at the next start and pushed live while a stream is
    /// active.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        self.ensure_live()?;
        if !(Self::RATE_MIN..=Self::RATE_MAX).contains(&rate) {
            return Err(SessionError::InvalidRate(rate));
        }
        *self.rate.lock() = rate;
        if self.stream_active.load(Ordering::Acquire) {
            self.engine.set_rate(self.handle, rate)?;
        }
        Ok(())
    }

    /// The currently configured playback rate.
    pub fn rate(&self) -> f32 {
        *self.rate.lock()
    }

    /// Toggle looping, pushed live while a stream is active.
    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.ensure_live()?;
        self.looping.store(looping, Ordering::Release);
        if self.stream_active.load(Ordering::Acquire) {
            self.engine.set_looping(self.handle, looping)?;
        }
        Ok(())
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Volume hook: a composed mute stops the sample outright, any other
    /// change pushes the calculated levels into the active stream.
    fn handle_volume_change(&self) {
        if self.volume.is_muted() && !self.state().is_stopped() {
            if let Err(error) = self.stop() {
                warn!(handle = %self.handle, %error, "mute stop failed");
            }
            return;
        }
        if self.stream_active.load(Ordering::Acquire) {
            if let Err(error) = self.engine.set_volume(
                self.handle,
                self.volume.calculated_left(),
                self.volume.calculated_right(),
            ) {
                warn!(handle = %self.handle, %error, "engine volume push failed");
            }
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
        debug!(handle = %self.handle, ?previous, ?next, "effect state changed");
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
        debug_assert!(!released, "operation on a released sample");
        if released {
            return Err(SessionError::UseAfterRelease);
        }
        Ok(())
    }
}

impl Playable for EffectSample {
    fn play(&self) -> Result<()> {
        EffectSample::play(self)
    }

    fn pause(&self) -> Result<()> {
        EffectSample::pause(self)
    }

    fn stop(&self) -> Result<()> {
        EffectSample::stop(self)
    }

    fn release(&self) -> Result<()> {
        EffectSample::release(self)
    }

    fn state(&self) -> PlayState {
        EffectSample::state(self)
    }

    fn volume(&self) -> Volume {
        EffectSample::volume(self)
    }

    fn handle(&self) -> MediaHandle {
        EffectSample::handle(self)
    }
}

// ============================================================================
// Effects Session
// ============================================================================

/// Session managing polyphonic effect samples.
pub struct EffectsSession {
    base: AudioSession<EffectSample>,
    engine: Arc<dyn PlaybackEngine>,
    samples: Mutex<HashMap<MediaHandle, Weak<EffectSample>>>,
    config: EffectsSessionConfig,
}

impl EffectsSession {
    /// Create an effects session around the injected host collaborators.
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        routing: Arc<dyn OutputRouting>,
        config: EffectsSessionConfig,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(SessionError::Config)?;
        let events = EventBus::new(config.event_buffer);
        Ok(Arc::new(Self {
            base: AudioSession::new(StreamKind::Effects, routing, events),
            engine,
            samples: Mutex::new(HashMap::new()),
            config,
        }))
    }

    /// Begin loading a media source through the engine and register a
    /// sample for it. The sample becomes playable once the matching
    /// load completion arrives.
    pub fn load(self: &Arc<Self>, source: MediaSource) -> Result<Arc<EffectSample>> {
        let handle = self.engine.load(source)?;
        let sample = EffectSample::new(self, handle);
        self.add(&sample);
        debug!(handle = %handle, "effect sample registered");
        Ok(sample)
    }

    /// Re-register a previously removed sample. The handle map entry is
    /// refreshed even when the pool already holds the sample.
    pub fn add(&self, sample: &Arc<EffectSample>) -> bool {
        self.samples
            .lock()
            .insert(sample.handle(), Arc::downgrade(sample));
        self.base.add(sample)
    }

    /// Remove a sample from the pool without releasing it. The handle
    /// map entry is dropped only when the pool actually held it.
    pub fn remove(&self, sample: &Arc<EffectSample>) -> bool {
        let removed = self.base.remove(sample);
        if removed {
            self.samples.lock().remove(&sample.handle());
        }
        removed
    }

    pub(crate) fn deregister(&self, handle: MediaHandle) -> bool {
        let removed = self.base.deregister(handle);
        if removed {
            self.samples.lock().remove(&handle);
        }
        removed
    }

    /// Snapshot of every pooled sample, insertion order.
    pub fn pool_snapshot(&self) -> Vec<Arc<EffectSample>> {
        self.base.pool_snapshot()
    }

    /// Pooled samples in the given states, most recently added first.
    pub fn pool_by_state(&self, states: &[PlayState]) -> Vec<Arc<EffectSample>> {
        self.base.pool_by_state(states)
    }

    /// Shared handle to the master volume.
    pub fn master(&self) -> Volume {
        self.base.master()
    }

    /// Replace the master volume and re-broadcast it to every sample.
    pub fn set_master_volume(&self, volume: Volume) {
        self.base.set_master_volume(volume);
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.base.state()
    }

    /// Mark the session started.
    pub fn start(&self) {
        self.base.start();
    }

    /// Mark the session stopped. Samples keep playing; short effects
    /// run out on their own.
    pub fn stop(&self) {
        self.base.stop();
    }

    /// Stop and release every sample, clear the handle map, and shut the
    /// engine's sample pool down.
    pub fn release_all(&self) {
        self.base.release_all();
        self.samples.lock().clear();
        if let Err(error) = self.engine.shutdown() {
            warn!(%error, "engine shutdown failed");
        }
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
    pub fn config(&self) -> &EffectsSessionConfig {
        &self.config
    }

    /// Route one engine load completion to the owning sample and emit
    /// the outcome.
    pub fn handle_load_complete(&self, completion: LoadCompletion) {
        let sample = {
            self.samples
                .lock()
                .get(&completion.handle)
                .and_then(Weak::upgrade)
        };
        match sample {
            Some(sample) if completion.success => {
                sample.mark_loaded();
                debug!(handle = %completion.handle, "sample ready");
            }
            Some(_) => {
                warn!(handle = %completion.handle, "sample load failed");
            }
            None => {
                warn!(handle = %completion.handle, "load completion for unknown sample");
            }
        }
        let _ = self.events().emit(SessionEvent::SampleLoaded {
            handle: completion.handle,
            success: completion.success,
        });
    }

    /// Enforce the stream cap before a new effect starts: when the pool
    /// already plays `max_streams` samples, the oldest playing one is
    /// stopped to make room for `incoming`.
    fn reserve_stream(&self, incoming: MediaHandle) {
        let playing: Vec<_> = self
            .base
            .pool_by_state(&[PlayState::Playing])
            .into_iter()
            .filter(|sample| sample.handle() != incoming)
            .collect();
        if playing.len() < self.config.max_streams {
            return;
        }
        // pool_by_state is most recent first, so the oldest is last.
        if let Some(oldest) = playing.last() {
            debug!(handle = %oldest.handle(), "stream cap reached, stealing oldest");
            if let Err(error) = oldest.stop() {
                warn!(handle = %oldest.handle(), %error, "stream steal failed");
            }
        }
    }

    /// Pump engine load completions into
    /// [`handle_load_complete`](EffectsSession::handle_load_complete)
    /// until the token cancels or the engine channel closes.
    #[instrument(skip(self, cancel))]
    pub async fn run_load_events(&self, cancel: CancellationToken) -> Result<()> {
        let mut completions = self.engine.load_completions();
        info!("load event pump started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("load event pump stopped");
                    return Ok(());
                }
                completion = completions.recv() => match completion {
                    Ok(completion) => self.handle_load_complete(completion),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "load completions lagged, continuing");
                    }
                    Err(RecvError::Closed) => {
                        info!("load completion channel closed, pump exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for EffectsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsSession")
            .field("state", &self.state())
            .field("samples", &self.base.len())
            .field("max_streams", &self.config.max_streams)
            .finish()
    }
}
