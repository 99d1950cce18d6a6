//! # Volume Model
//!
//! Stereo volume with multiplicative offset composition, ducking, mute,
//! advisory balance, and synchronous subscriber fan-out.
//!
//! ## Overview
//!
//! A [`Volume`] stores two channel levels plus a channel offset. The
//! *calculated* output is `stored level × offset` (0 while muted). The
//! offset is what composes volumes: a session writes its master
//! calculated channel into each pooled object's local offset, so a local
//! Volume's calculated levels are already the final engine levels.
//!
//! Ducking is a reversible offset override: `duck()` saves the current
//! offset and drops it to a fixed floor; `raise()` restores the saved
//! value exactly. Offset writes that arrive while ducked are redirected
//! into the saved slot so the duck stays in force and the raise reveals
//! the new base value.
//!
//! `Volume` is a cheap clone over shared state, so the same instance can
//! be held by an owner, its subscribers, and a fade task.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::fade::{spawn_fade, FadeHandle, FadePlan, FadeProperty, FadeSlot};

// ============================================================================
// Events & Subscriptions
// ============================================================================

/// Change notification delivered to Volume subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeEvent {
    /// The calculated per-channel output levels changed.
    Levels { left: f32, right: f32 },
    /// The stereo balance changed.
    Balance { balance: f32 },
}

/// Token returned by [`Volume::subscribe`]; removing a subscriber takes
/// the token back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type SubscriberFn = dyn Fn(VolumeEvent) + Send + Sync;

struct Subscriber {
    id: SubscriberId,
    callback: Arc<SubscriberFn>,
}

// ============================================================================
// Shared State
// ============================================================================

/// Plain-data channel state, always mutated under one lock.
#[derive(Debug, Clone, Copy)]
struct ChannelState {
    left: f32,
    right: f32,
    offset: f32,
    saved_offset: Option<f32>,
    balance: f32,
    muted: bool,
    auto_muted: bool,
}

impl ChannelState {
    fn channel(&self) -> f32 {
        (self.left + self.right) * 0.5
    }

    fn raw_channel(&self) -> f32 {
        self.channel() * self.offset
    }

    fn calculated_left(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.left * self.offset
        }
    }

    fn calculated_right(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.right * self.offset
        }
    }

    fn calculated_channel(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.raw_channel()
        }
    }

    fn levels_event(&self) -> VolumeEvent {
        VolumeEvent::Levels {
            left: self.calculated_left(),
            right: self.calculated_right(),
        }
    }
}

pub(crate) struct VolumeShared {
    state: Mutex<ChannelState>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscriber: AtomicU64,
    fade: Mutex<FadeSlot>,
}

impl VolumeShared {
    /// Invoke every subscriber, in registration order, with no lock held
    /// so callbacks may re-enter the Volume.
    fn dispatch(&self, event: VolumeEvent) {
        let callbacks: Vec<Arc<SubscriberFn>> = {
            let subscribers = self.subscribers.lock();
            subscribers.iter().map(|s| s.callback.clone()).collect()
        };
        for callback in callbacks {
            callback(event);
        }
    }

    /// Apply one fade tick. Returns `false` when `generation` is stale,
    /// which tells the fade task a newer fade owns the slot.
    ///
    /// Fade ticks bypass the auto-mute rule on purpose: a fade passing
    /// through zero must not latch the mute flag mid-flight.
    pub(crate) fn apply_fade_value(
        &self,
        generation: u64,
        property: FadeProperty,
        value: f32,
    ) -> bool {
        let event = {
            let fade = self.fade.lock();
            if fade.generation != generation {
                return false;
            }
            let mut state = self.state.lock();
            match property {
                FadeProperty::Channel => {
                    state.left = value;
                    state.right = value;
                    state.levels_event()
                }
                FadeProperty::Balance => {
                    state.balance = value;
                    VolumeEvent::Balance { balance: value }
                }
            }
        };
        self.dispatch(event);
        true
    }

    /// Release the fade slot after a completed run, unless a newer fade
    /// already claimed it.
    pub(crate) fn clear_fade(&self, generation: u64) {
        let mut fade = self.fade.lock();
        if fade.generation == generation {
            fade.cancel = None;
        }
    }
}

// ============================================================================
// Volume
// ============================================================================

/// Shared-state stereo volume with offset composition, ducking, mute,
/// fades, and synchronous subscriber notification.
#[derive(Clone)]
pub struct Volume {
    shared: Arc<VolumeShared>,
}

impl Volume {
    /// Lowest valid channel level (silence).
    pub const MIN: f32 = 0.0;
    /// Highest valid channel level (unity gain).
    pub const MAX: f32 = 1.0;
    /// Offset applied while ducked. Ducking only engages when the
    /// current offset sits above this floor.
    pub const DUCK_FLOOR: f32 = 0.2;

    /// Balance hard left.
    pub const BALANCE_LEFT: f32 = -1.0;
    /// Balance centered.
    pub const BALANCE_CENTER: f32 = 0.0;
    /// Balance hard right.
    pub const BALANCE_RIGHT: f32 = 1.0;

    /// Preset fade duration for snappy transitions.
    pub const FADE_SHORT: Duration = Duration::from_millis(400);
    /// Preset fade duration for ordinary transitions.
    pub const FADE_NORMAL: Duration = Duration::from_millis(600);
    /// Preset fade duration for slow transitions.
    pub const FADE_LONG: Duration = Duration::from_millis(1000);

    /// Create a volume at unity gain on both channels, centered balance,
    /// offset 1.0, unmuted.
    pub fn new() -> Self {
        Self::with_state(Self::MAX, Self::MAX)
    }

    /// Create a volume with both channels at `level`.
    pub fn mono(level: f32) -> Result<Self> {
        Self::validate_level(level)?;
        Ok(Self::with_state(level, level))
    }

    /// Create a volume with independent channel levels.
    pub fn stereo(left: f32, right: f32) -> Result<Self> {
        Self::validate_level(left)?;
        Self::validate_level(right)?;
        Ok(Self::with_state(left, right))
    }

    fn with_state(left: f32, right: f32) -> Self {
        Self {
            shared: Arc::new(VolumeShared {
                state: Mutex::new(ChannelState {
                    left,
                    right,
                    offset: Self::MAX,
                    saved_offset: None,
                    balance: Self::BALANCE_CENTER,
                    muted: false,
                    auto_muted: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                fade: Mutex::new(FadeSlot::default()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    fn validate_level(value: f32) -> Result<()> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(())
        } else {
            Err(VolumeError::InvalidLevel(value))
        }
    }

    fn validate_offset(value: f32) -> Result<()> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(())
        } else {
            Err(VolumeError::InvalidOffset(value))
        }
    }

    fn validate_balance(value: f32) -> Result<()> {
        if value >= Self::BALANCE_LEFT && value <= Self::BALANCE_RIGHT {
            Ok(())
        } else {
            Err(VolumeError::InvalidBalance(value))
        }
    }

    /// Zero calculated output latches the mute flag; positive output
    /// releases it again, but only when the latch came from this rule
    /// rather than an explicit `mute()`.
    fn adjust_auto_mute(state: &mut ChannelState) {
        if state.raw_channel() == 0.0 {
            if !state.muted {
                state.muted = true;
                state.auto_muted = true;
            }
        } else if state.muted && state.auto_muted {
            state.muted = false;
            state.auto_muted = false;
        }
    }

    /// Run a direct (non-fade) level mutation: apply, re-evaluate the
    /// auto-mute rule, then notify subscribers exactly once.
    fn mutate_levels(&self, mutate: impl FnOnce(&mut ChannelState)) {
        let event = {
            let mut state = self.shared.state.lock();
            mutate(&mut state);
            Self::adjust_auto_mute(&mut state);
            state.levels_event()
        };
        self.shared.dispatch(event);
    }

    // ------------------------------------------------------------------
    // Channel levels
    // ------------------------------------------------------------------

    /// Set both channels to the same level immediately.
    pub fn set_channel(&self, value: f32) -> Result<()> {
        Self::validate_level(value)?;
        self.mutate_levels(|state| {
            state.left = value;
            state.right = value;
        });
        Ok(())
    }

    /// Set each channel independently. There is no fading variant: a
    /// fade drives one mono level, so asymmetric targets cannot ride it.
    pub fn set_channels(&self, left: f32, right: f32) -> Result<()> {
        Self::validate_level(left)?;
        Self::validate_level(right)?;
        // TODO: derive balance from asymmetric sets once the left/right
        // formula is settled; balance stays advisory until then.
        self.mutate_levels(|state| {
            state.left = left;
            state.right = right;
        });
        Ok(())
    }

    /// Set the left channel, leaving the right channel untouched.
    pub fn set_left(&self, value: f32) -> Result<()> {
        Self::validate_level(value)?;
        self.mutate_levels(|state| {
            state.left = value;
        });
        Ok(())
    }

    /// Set the right channel, leaving the left channel untouched.
    pub fn set_right(&self, value: f32) -> Result<()> {
        Self::validate_level(value)?;
        self.mutate_levels(|state| {
            state.right = value;
        });
        Ok(())
    }

    /// Set the channel offset. While ducked, the write lands in the
    /// saved slot instead: the duck stays in force and the eventual
    /// [`raise`](Volume::raise) reveals the new base value.
    pub fn set_offset(&self, value: f32) -> Result<()> {
        Self::validate_offset(value)?;
        self.mutate_levels(|state| {
            if state.saved_offset.is_some() {
                state.saved_offset = Some(value);
            } else {
                state.offset = value;
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ducking
    // ------------------------------------------------------------------

    /// Temporarily drop the offset to [`DUCK_FLOOR`](Volume::DUCK_FLOOR),
    /// saving the current offset for an exact restore. No-op (returns
    /// `false`) when already ducked or when the offset does not exceed
    /// the floor.
    pub fn duck(&self) -> bool {
        let event = {
            let mut state = self.shared.state.lock();
            if state.saved_offset.is_some() || state.offset <= Self::DUCK_FLOOR {
                None
            } else {
                let previous = state.offset;
                state.offset = Self::DUCK_FLOOR;
                state.saved_offset = Some(previous);
                Self::adjust_auto_mute(&mut state);
                Some(state.levels_event())
            }
        };
        match event {
            Some(event) => {
                debug!("volume ducked");
                self.shared.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Restore the offset saved by [`duck`](Volume::duck). No-op
    /// (returns `false`) when not ducked.
    pub fn raise(&self) -> bool {
        let event = {
            let mut state = self.shared.state.lock();
            match state.saved_offset.take() {
                Some(previous) => {
                    state.offset = previous;
                    Self::adjust_auto_mute(&mut state);
                    Some(state.levels_event())
                }
                None => None,
            }
        };
        match event {
            Some(event) => {
                debug!("volume raised");
                self.shared.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Whether a duck is currently in force.
    pub fn is_ducked(&self) -> bool {
        self.shared.state.lock().saved_offset.is_some()
    }

    // ------------------------------------------------------------------
    // Mute
    // ------------------------------------------------------------------

    /// Force calculated output to zero without losing stored levels.
    /// Notifies only on an actual transition; returns whether it fired.
    pub fn mute(&self) -> bool {
        let event = {
            let mut state = self.shared.state.lock();
            if state.muted {
                None
            } else {
                state.muted = true;
                state.auto_muted = false;
                Some(state.levels_event())
            }
        };
        match event {
            Some(event) => {
                self.shared.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Undo [`mute`](Volume::mute). Notifies only on an actual
    /// transition; returns whether it fired.
    pub fn unmute(&self) -> bool {
        let event = {
            let mut state = self.shared.state.lock();
            if state.muted {
                state.muted = false;
                state.auto_muted = false;
                Some(state.levels_event())
            } else {
                None
            }
        };
        match event {
            Some(event) => {
                self.shared.dispatch(event);
                true
            }
            None => false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.shared.state.lock().muted
    }

    // ------------------------------------------------------------------
    // Balance
    // ------------------------------------------------------------------

    /// Set the advisory stereo balance (-1.0 hard left, 1.0 hard right).
    pub fn set_balance(&self, value: f32) -> Result<()> {
        Self::validate_balance(value)?;
        let event = {
            let mut state = self.shared.state.lock();
            state.balance = value;
            VolumeEvent::Balance { balance: value }
        };
        self.shared.dispatch(event);
        Ok(())
    }

    /// Re-center the balance.
    pub fn reset_balance(&self) {
        // Center is always in range.
        let _ = self.set_balance(Self::BALANCE_CENTER);
    }

    // ------------------------------------------------------------------
    // Fades
    // ------------------------------------------------------------------

    /// Fade both channels to `target` over `duration`. Cancels any
    /// in-flight fade on this Volume first.
    pub fn fade_channel(&self, target: f32, duration: Duration) -> Result<FadeHandle> {
        self.begin_fade(FadeProperty::Channel, None, target, duration)
    }

    /// Fade both channels from an explicit `start` to `target`. The
    /// start level is applied through the fade path on the first tick,
    /// which is what a crossfade-in from silence wants: a direct set to
    /// zero would latch the auto-mute rule.
    pub fn fade_channel_from(
        &self,
        start: f32,
        target: f32,
        duration: Duration,
    ) -> Result<FadeHandle> {
        self.begin_fade(FadeProperty::Channel, Some(start), target, duration)
    }

    /// Fade the balance to `target` over `duration`. Shares the single
    /// fade slot with channel fades.
    pub fn fade_balance(&self, target: f32, duration: Duration) -> Result<FadeHandle> {
        self.begin_fade(FadeProperty::Balance, None, target, duration)
    }

    /// Cancel any in-flight fade, leaving levels at the last applied
    /// tick. Returns whether a fade was running.
    pub fn cancel_fade(&self) -> bool {
        let mut fade = self.shared.fade.lock();
        match fade.cancel.take() {
            Some(token) => {
                token.cancel();
                fade.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Whether a fade is currently running on this Volume.
    pub fn is_fading(&self) -> bool {
        self.shared.fade.lock().cancel.is_some()
    }

    fn begin_fade(
        &self,
        property: FadeProperty,
        start: Option<f32>,
        target: f32,
        duration: Duration,
    ) -> Result<FadeHandle> {
        match property {
            FadeProperty::Channel => {
                Self::validate_level(target)?;
                if let Some(start) = start {
                    Self::validate_level(start)?;
                }
            }
            FadeProperty::Balance => Self::validate_balance(target)?,
        }
        let runtime = Handle::try_current().map_err(|_| VolumeError::NoRuntime)?;

        let start = match (start, property) {
            (Some(value), _) => value,
            (None, FadeProperty::Channel) => self.channel(),
            (None, FadeProperty::Balance) => self.balance(),
        };

        let (generation, token) = {
            let mut fade = self.shared.fade.lock();
            if let Some(previous) = fade.cancel.take() {
                previous.cancel();
            }
            fade.generation += 1;
            let token = CancellationToken::new();
            fade.cancel = Some(token.clone());
            (fade.generation, token)
        };

        debug!(
            from = start,
            to = target,
            duration_ms = duration.as_millis() as u64,
            "starting fade"
        );

        Ok(spawn_fade(
            &runtime,
            Arc::downgrade(&self.shared),
            token,
            generation,
            FadePlan {
                property,
                start,
                target,
                duration,
            },
        ))
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    /// Stored left channel level (offset and mute not applied).
    pub fn left(&self) -> f32 {
        self.shared.state.lock().left
    }

    /// Stored right channel level (offset and mute not applied).
    pub fn right(&self) -> f32 {
        self.shared.state.lock().right
    }

    /// Stored mono level: the average of the two channels.
    pub fn channel(&self) -> f32 {
        self.shared.state.lock().channel()
    }

    /// Current channel offset (the ducked value while ducked).
    pub fn offset(&self) -> f32 {
        self.shared.state.lock().offset
    }

    /// Advisory stereo balance.
    pub fn balance(&self) -> f32 {
        self.shared.state.lock().balance
    }

    /// Effective left output: 0 while muted, else `left × offset`.
    pub fn calculated_left(&self) -> f32 {
        self.shared.state.lock().calculated_left()
    }

    /// Effective right output: 0 while muted, else `right × offset`.
    pub fn calculated_right(&self) -> f32 {
        self.shared.state.lock().calculated_right()
    }

    /// Effective mono output: 0 while muted, else `channel × offset`.
    pub fn calculated_channel(&self) -> f32 {
        self.shared.state.lock().calculated_channel()
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Register a change subscriber. Dispatch is synchronous with the
    /// triggering mutation and follows registration order.
    pub fn subscribe(
        &self,
        callback: impl Fn(VolumeEvent) + Send + Sync + 'static,
    ) -> SubscriberId {
        let id = SubscriberId(self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.shared.subscribers.lock().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a subscriber by token. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.shared.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Re-fire the current calculated levels to every subscriber.
    /// Owners call this after swapping in a replacement Volume instance
    /// so downstream state re-syncs.
    pub fn refresh(&self) {
        let event = { self.shared.state.lock().levels_event() };
        self.shared.dispatch(event);
    }

    /// Whether two handles refer to the same underlying Volume.
    pub fn ptr_eq(&self, other: &Volume) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Volume")
            .field("left", &state.left)
            .field("right", &state.right)
            .field("offset", &state.offset)
            .field("balance", &state.balance)
            .field("muted", &state.muted)
            .field("ducked", &state.saved_offset.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn record_events(volume: &Volume) -> Arc<StdMutex<Vec<VolumeEvent>>> {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        volume.subscribe(move |event| sink.lock().unwrap().push(event));
        events
    }

    #[test]
    fn defaults_to_unity_gain() {
        let volume = Volume::new();
        assert_eq!(volume.left(), 1.0);
        assert_eq!(volume.right(), 1.0);
        assert_eq!(volume.offset(), 1.0);
        assert_eq!(volume.balance(), Volume::BALANCE_CENTER);
        assert!(!volume.is_muted());
        assert!(!volume.is_ducked());
    }

    #[test]
    fn calculated_channel_round_trips_set_channel() {
        let volume = Volume::new();
        for value in [0.1_f32, 0.25, 0.5, 0.75, 1.0] {
            volume.set_channel(value).unwrap();
            assert_eq!(volume.calculated_channel(), value);
        }
    }

    #[test]
    fn out_of_range_set_fails_before_mutation_and_notification() {
        let volume = Volume::new();
        volume.set_channel(0.6).unwrap();
        let events = record_events(&volume);

        assert!(matches!(
            volume.set_channel(-0.1),
            Err(VolumeError::InvalidLevel(_))
        ));
        assert!(matches!(
            volume.set_channel(1.1),
            Err(VolumeError::InvalidLevel(_))
        ));
        assert!(matches!(
            volume.set_channel(f32::NAN),
            Err(VolumeError::InvalidLevel(_))
        ));
        assert!(matches!(
            volume.set_offset(2.0),
            Err(VolumeError::InvalidOffset(_))
        ));
        assert!(matches!(
            volume.set_balance(-1.5),
            Err(VolumeError::InvalidBalance(_))
        ));

        assert_eq!(volume.channel(), 0.6);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn mono_getter_averages_channels() {
        let volume = Volume::stereo(1.0, 0.5).unwrap();
        assert_eq!(volume.channel(), 0.75);
    }

    #[test]
    fn offset_scales_calculated_levels() {
        let volume = Volume::new();
        volume.set_channels(0.8, 0.4).unwrap();
        volume.set_offset(0.5).unwrap();
        assert_eq!(volume.calculated_left(), 0.8 * 0.5);
        assert_eq!(volume.calculated_right(), 0.4 * 0.5);
    }

    #[test]
    fn duck_is_idempotent_and_raise_round_trips() {
        let volume = Volume::new();
        volume.set_offset(0.9).unwrap();

        assert!(volume.duck());
        assert_eq!(volume.offset(), Volume::DUCK_FLOOR);
        assert!(volume.is_ducked());

        // Second duck is a no-op.
        assert!(!volume.duck());
        assert_eq!(volume.offset(), Volume::DUCK_FLOOR);

        assert!(volume.raise());
        assert_eq!(volume.offset(), 0.9);
        assert!(!volume.is_ducked());

        // Second raise is a no-op.
        assert!(!volume.raise());
        assert_eq!(volume.offset(), 0.9);
    }

    #[test]
    fn duck_skips_offsets_at_or_below_floor() {
        let volume = Volume::new();
        volume.set_offset(0.1).unwrap();
        assert!(!volume.duck());
        assert_eq!(volume.offset(), 0.1);
        assert!(!volume.is_ducked());
    }

    #[test]
    fn offset_write_while_ducked_lands_in_saved_slot() {
        let volume = Volume::new();
        volume.set_offset(0.8).unwrap();
        assert!(volume.duck());

        volume.set_offset(0.6).unwrap();
        assert_eq!(volume.offset(), Volume::DUCK_FLOOR);

        assert!(volume.raise());
        assert_eq!(volume.offset(), 0.6);
    }

    #[test]
    fn mute_round_trip_restores_calculated_channel() {
        let volume = Volume::new();
        volume.set_channel(0.7).unwrap();

        assert!(volume.mute());
        assert_eq!(volume.calculated_channel(), 0.0);
        assert_eq!(volume.channel(), 0.7);

        assert!(volume.unmute());
        assert_eq!(volume.calculated_channel(), 0.7);
    }

    #[test]
    fn mute_notifies_only_on_transition() {
        let volume = Volume::new();
        let events = record_events(&volume);

        assert!(volume.mute());
        assert!(!volume.mute());
        assert!(volume.unmute());
        assert!(!volume.unmute());

        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn zero_output_latches_auto_mute() {
        let volume = Volume::new();
        volume.set_channel(0.0).unwrap();
        assert!(volume.is_muted());

        volume.set_channel(0.5).unwrap();
        assert!(!volume.is_muted());
        assert_eq!(volume.calculated_channel(), 0.5);
    }

    #[test]
    fn zero_offset_latches_auto_mute_and_releases() {
        let volume = Volume::new();
        volume.set_offset(0.0).unwrap();
        assert!(volume.is_muted());

        volume.set_offset(0.8).unwrap();
        assert!(!volume.is_muted());
    }

    #[test]
    fn explicit_mute_survives_positive_sets() {
        let volume = Volume::new();
        volume.mute();

        volume.set_channel(0.9).unwrap();
        assert!(volume.is_muted());
        assert_eq!(volume.calculated_channel(), 0.0);

        volume.unmute();
        assert_eq!(volume.calculated_channel(), 0.9);
    }

    #[test]
    fn per_channel_sets_notify_with_calculated_levels() {
        let volume = Volume::new();
        volume.set_offset(0.5).unwrap();
        let events = record_events(&volume);

        volume.set_channels(0.8, 0.6).unwrap();
        volume.set_left(0.4).unwrap();
        volume.set_right(0.2).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            VolumeEvent::Levels {
                left: 0.8 * 0.5,
                right: 0.6 * 0.5
            }
        );
        assert_eq!(
            events[2],
            VolumeEvent::Levels {
                left: 0.4 * 0.5,
                right: 0.2 * 0.5
            }
        );
    }

    #[test]
    fn balance_set_fires_balance_event() {
        let volume = Volume::new();
        let events = record_events(&volume);

        volume.set_balance(-0.5).unwrap();
        volume.reset_balance();

        let events = events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                VolumeEvent::Balance { balance: -0.5 },
                VolumeEvent::Balance {
                    balance: Volume::BALANCE_CENTER
                }
            ]
        );
    }

    #[test]
    fn subscribers_fire_in_registration_order() {
        let volume = Volume::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            volume.subscribe(move |_| order.lock().unwrap().push(tag));
        }

        volume.set_channel(0.3).unwrap();
        assert_eq!(order.lock().unwrap().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_by_token() {
        let volume = Volume::new();
        let events = record_events(&volume);
        let id = {
            let sink = events.clone();
            volume.subscribe(move |event| sink.lock().unwrap().push(event))
        };
        assert_eq!(volume.subscriber_count(), 2);

        assert!(volume.unsubscribe(id));
        assert!(!volume.unsubscribe(id));
        assert_eq!(volume.subscriber_count(), 1);

        volume.set_channel(0.4).unwrap();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscriber_may_reenter_the_volume() {
        let volume = Volume::new();
        let observed = Arc::new(StdMutex::new(Vec::new()));

        let inner = volume.clone();
        let sink = observed.clone();
        volume.subscribe(move |event| {
            // Reads back through the public API from inside dispatch.
            sink.lock().unwrap().push((event, inner.calculated_channel()));
        });

        volume.set_channel(0.5).unwrap();
        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].1, 0.5);
    }

    #[test]
    fn refresh_refires_current_levels() {
        let volume = Volume::new();
        volume.set_channel(0.6).unwrap();
        let events = record_events(&volume);

        volume.refresh();
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[VolumeEvent::Levels {
                left: 0.6,
                right: 0.6
            }]
        );
    }

    #[test]
    fn clones_share_state() {
        let volume = Volume::new();
        let alias = volume.clone();
        alias.set_channel(0.25).unwrap();
        assert_eq!(volume.channel(), 0.25);
        assert!(volume.ptr_eq(&alias));
        assert!(!volume.ptr_eq(&Volume::new()));
    }

    #[test]
    fn fade_without_runtime_is_rejected() {
        let volume = Volume::new();
        assert!(matches!(
            volume.fade_channel(0.5, Duration::from_millis(100)),
            Err(VolumeError::NoRuntime)
        ));
    }
}
