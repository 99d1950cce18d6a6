//! Generic audio session: pool ownership, master-volume fan-out,
//! lifecycle state, and output-route queries.
//!
//! ## Overview
//!
//! An [`AudioSession`] owns a pool of playable objects and a master
//! [`Volume`]. The master is composed into every pooled object by
//! writing its calculated channel into the object's local-volume offset,
//! so each local volume alone yields the final engine level:
//!
//! ```text
//!   master Volume ──change──> session propagation subscriber
//!        │                          │ set_offset(master.calculated)
//!        │                          v
//!        │                 pooled object local Volume
//!        │                          │ change dispatch
//!        │                          v
//!        └──────────────> object pushes calculated levels to engine
//! ```
//!
//! Propagation is synchronous with the master mutation and traverses the
//! pool most recently added first. The concrete music and effects
//! sessions wrap this type and add focus arbitration and sample routing.

use crate::playable::{PlayState, Playable, SessionState};
use crate::pool::AudioPool;
use core_runtime::events::{EventBus, EventStream, SessionEvent};
use core_volume::{SubscriberId, Volume, VolumeEvent};
use engine_traits::{MediaHandle, OutputRoute, OutputRouting, StreamKind};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// The master volume together with the session's propagation listener.
struct MasterBinding {
    volume: Volume,
    subscription: SubscriberId,
}

/// Pool, master volume, and lifecycle state shared by every session
/// variant.
pub struct AudioSession<T> {
    pool: Arc<AudioPool<T>>,
    master: Mutex<MasterBinding>,
    state: Mutex<SessionState>,
    routing: Arc<dyn OutputRouting>,
    events: EventBus,
    stream: StreamKind,
}

impl<T> AudioSession<T>
where
    T: Playable + 'static,
{
    /// Create a session with a fresh master volume at full level.
    pub fn new(stream: StreamKind, routing: Arc<dyn OutputRouting>, events: EventBus) -> Self {
        let pool = Arc::new(AudioPool::new());
        let master = Volume::new();
        let subscription = Self::bind_master(&master, &pool);
        Self {
            pool,
            master: Mutex::new(MasterBinding {
                volume: master,
                subscription,
            }),
            state: Mutex::new(SessionState::Idle),
            routing,
            events,
            stream,
        }
    }

    /// Subscribe the propagation listener: on every master level change,
    /// write the calculated channel into each pooled object's offset,
    /// most recently added first.
    fn bind_master(master: &Volume, pool: &Arc<AudioPool<T>>) -> SubscriberId {
        let weak = Arc::downgrade(pool);
        let source = master.clone();
        master.subscribe(move |event| {
            if !matches!(event, VolumeEvent::Levels { .. }) {
                return;
            }
            if let Some(pool) = weak.upgrade() {
                let offset = source.calculated_channel();
                for member in pool.snapshot().into_iter().rev() {
                    if let Err(error) = member.volume().set_offset(offset) {
                        warn!(handle = %member.handle(), %error, "master offset propagation failed");
                    }
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Pool access
    // ------------------------------------------------------------------

    /// Add an object to the pool. The current master level is applied to
    /// its local offset so the object is composed from the first moment.
    pub fn add(&self, member: &Arc<T>) -> bool {
        let added = self.pool.add(member);
        if added {
            let offset = self.master().calculated_channel();
            if let Err(error) = member.volume().set_offset(offset) {
                warn!(handle = %member.handle(), %error, "master offset rejected on add");
            }
        }
        added
    }

    /// Remove an object from the pool by identity.
    pub fn remove(&self, member: &Arc<T>) -> bool {
        self.pool.remove(member)
    }

    /// Remove the pooled object owning `handle`, if any.
    pub(crate) fn deregister(&self, handle: MediaHandle) -> bool {
        self.pool.remove_where(|member| member.handle() == handle)
    }

    /// Snapshot of the whole pool, insertion order.
    pub fn pool_snapshot(&self) -> Vec<Arc<T>> {
        self.pool.snapshot()
    }

    /// Snapshot of pool members in the given states, most recently added
    /// first.
    pub fn pool_by_state(&self, states: &[PlayState]) -> Vec<Arc<T>> {
        self.pool.by_state(states)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    // ------------------------------------------------------------------
    // Master volume
    // ------------------------------------------------------------------

    /// Shared handle to the master volume.
    pub fn master(&self) -> Volume {
        self.master.lock().volume.clone()
    }

    /// Replace the master volume. The propagation listener moves to the
    /// replacement and the new level is re-broadcast to every pooled
    /// object immediately, even if numerically unchanged.
    pub fn set_master_volume(&self, volume: Volume) {
        let subscription = Self::bind_master(&volume, &self.pool);
        let previous = {
            let mut master = self.master.lock();
            std::mem::replace(
                &mut *master,
                MasterBinding {
                    volume: volume.clone(),
                    subscription,
                },
            )
        };
        previous.volume.unsubscribe(previous.subscription);
        volume.refresh();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Which stream category the session manages.
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Transition to `Started`. No-op when already started.
    pub fn start(&self) {
        if self.swap_state(SessionState::Started) {
            info!(stream = ?self.stream, "session started");
            let _ = self.events.emit(SessionEvent::SessionStarted {
                stream: self.stream,
            });
        }
    }

    /// Transition to `Stopped`. No-op when already stopped.
    pub fn stop(&self) {
        if self.swap_state(SessionState::Stopped) {
            info!(stream = ?self.stream, "session stopped");
            let _ = self.events.emit(SessionEvent::SessionStopped {
                stream: self.stream,
            });
        }
    }

    fn swap_state(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state == next {
            return false;
        }
        *state = next;
        true
    }

    /// Stop and release every pooled object, most recently added first,
    /// then go `Idle`. Iteration runs over a snapshot, so objects that
    /// deregister themselves from their own `release` are fine.
    pub fn release_all(&self) {
        let members = self.pool.snapshot();
        info!(stream = ?self.stream, count = members.len(), "releasing all pooled objects");
        for member in members.into_iter().rev() {
            if let Err(error) = member.stop() {
                warn!(handle = %member.handle(), %error, "stop during release failed");
            }
            if let Err(error) = member.release() {
                warn!(handle = %member.handle(), %error, "release failed");
            }
        }
        *self.state.lock() = SessionState::Idle;
        let _ = self.events.emit(SessionEvent::SessionReleased {
            stream: self.stream,
        });
    }

    // ------------------------------------------------------------------
    // Host queries
    // ------------------------------------------------------------------

    /// Resolve the active output route. When several connections are
    /// simultaneously reported, A2DP wins over speakerphone, which wins
    /// over a wired headset; the built-in speaker is the fallback.
    pub fn output_route(&self) -> OutputRoute {
        if self.routing.is_a2dp_on() {
            OutputRoute::A2dp
        } else if self.routing.is_speakerphone_on() {
            OutputRoute::Speakerphone
        } else if self.routing.is_wired_headset_on() {
            OutputRoute::Headset
        } else {
            OutputRoute::Speaker
        }
    }

    /// The session's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }
}

impl<T> Drop for AudioSession<T> {
    fn drop(&mut self) {
        // The propagation subscriber holds a handle to the master volume
        // itself; detach it so the volume can be freed.
        let master = self.master.get_mut();
        master.volume.unsubscribe(master.subscription);
    }
}
