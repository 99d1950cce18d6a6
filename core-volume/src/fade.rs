//! Time-driven level interpolation.
//!
//! A fade is a repeating timer task that walks one Volume property
//! (the mono channel level or the balance) linearly from a start value
//! to a target. Every tick routes through the Volume's immediate set
//! path, so subscribers observe each intermediate level exactly as if
//! it had been set by hand.
//!
//! Each Volume owns a single fade slot: starting a new fade cancels the
//! in-flight one synchronously (the slot's generation counter is bumped
//! under the slot lock, and a stale task checks the generation before
//! every apply, so a canceled fade can never land another tick). A fade
//! canceled mid-flight leaves the Volume at its last applied tick value
//! rather than jumping to the target.

use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::volume::VolumeShared;

/// Interval between fade ticks.
pub const FADE_TICK: Duration = Duration::from_millis(20);

/// How a fade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The fade ran to completion and the target value was applied.
    Completed,
    /// The fade was canceled (explicitly, or by a superseding fade)
    /// before reaching the target.
    Canceled,
}

impl FadeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FadeOutcome::Completed)
    }
}

/// Await handle for a running fade.
///
/// The fade is driven by its own timer task; dropping the handle does
/// not cancel it. Use [`Volume::cancel_fade`](crate::Volume::cancel_fade)
/// or start a superseding fade for that.
#[derive(Debug)]
pub struct FadeHandle {
    outcome: oneshot::Receiver<FadeOutcome>,
}

impl FadeHandle {
    /// Wait for the fade to finish and report how it ended.
    pub async fn outcome(self) -> FadeOutcome {
        self.outcome.await.unwrap_or(FadeOutcome::Canceled)
    }
}

/// Which Volume property a fade drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeProperty {
    Channel,
    Balance,
}

/// Per-Volume fade bookkeeping. At most one fade task is live per slot;
/// `generation` invalidates stale tasks after a cancel.
#[derive(Debug, Default)]
pub(crate) struct FadeSlot {
    pub(crate) generation: u64,
    pub(crate) cancel: Option<CancellationToken>,
}

/// Parameters of one fade run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FadePlan {
    pub(crate) property: FadeProperty,
    pub(crate) start: f32,
    pub(crate) target: f32,
    pub(crate) duration: Duration,
}

/// Spawn the timer task driving one fade.
///
/// The task holds only a weak reference to the Volume: if every strong
/// handle is dropped mid-fade, the task winds down on its next tick.
pub(crate) fn spawn_fade(
    runtime: &Handle,
    shared: Weak<VolumeShared>,
    token: CancellationToken,
    generation: u64,
    plan: FadePlan,
) -> FadeHandle {
    let (done, outcome) = oneshot::channel();

    runtime.spawn(async move {
        let started = Instant::now();
        let mut ticker = interval(FADE_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(to = plan.target, "fade canceled");
                    let _ = done.send(FadeOutcome::Canceled);
                    return;
                }
                _ = ticker.tick() => {
                    let Some(volume) = shared.upgrade() else {
                        let _ = done.send(FadeOutcome::Canceled);
                        return;
                    };

                    let progress = if plan.duration.is_zero() {
                        1.0
                    } else {
                        (started.elapsed().as_secs_f32() / plan.duration.as_secs_f32()).min(1.0)
                    };
                    // The final tick must land bit-exactly on the target.
                    let value = if progress >= 1.0 {
                        plan.target
                    } else {
                        plan.start + (plan.target - plan.start) * progress
                    };

                    if !volume.apply_fade_value(generation, plan.property, value) {
                        // A newer fade took the slot between our ticks.
                        let _ = done.send(FadeOutcome::Canceled);
                        return;
                    }

                    if progress >= 1.0 {
                        volume.clear_fade(generation);
                        debug!(to = plan.target, "fade completed");
                        let _ = done.send(FadeOutcome::Completed);
                        return;
                    }
                }
            }
        }
    });

    FadeHandle { outcome }
}
