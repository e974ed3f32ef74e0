//! Application-level heartbeat over one session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::error::WsError;
use super::frame;
use super::session::Session;

/// Tracks the ping cadence and the reply deadline for the live session.
///
/// Two timers back the protocol: a ping-send timer armed on open and re-armed
/// on every inbound frame, and a reply deadline armed each time a ping goes
/// out. At most one of each is live; arming always cancels the predecessors.
/// One fixed interval serves both timers, so a silent peer is detected after
/// at most two intervals.
pub(crate) struct Heartbeat {
    interval: Duration,
    timers: Mutex<Timers>,
}

#[derive(Default)]
struct Timers {
    /// Bumped on every arm and clear; a timer that fires with a stale
    /// generation lost the race against a cancellation and does nothing.
    generation: u64,
    ping: Option<JoinHandle<()>>,
    reply_deadline: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel(&mut self) {
        if let Some(handle) = self.ping.take() {
            handle.abort();
        }
        if let Some(handle) = self.reply_deadline.take() {
            handle.abort();
        }
    }
}

impl Heartbeat {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            timers: Mutex::new(Timers::default()),
        }
    }

    /// Cancel both timers and schedule a fresh ping one interval out.
    pub(crate) fn arm(self: &Arc<Self>, session: Session) {
        let mut timers = self.lock();
        timers.cancel();
        timers.generation = timers.generation.wrapping_add(1);
        let generation = timers.generation;

        let heartbeat = Arc::clone(self);
        timers.ping = Some(tokio::spawn(async move {
            sleep(heartbeat.interval).await;
            heartbeat.ping_due(generation, session);
        }));
    }

    /// Cancel both timers, then re-arm.
    ///
    /// Called on every inbound frame: any traffic proves the peer alive, so
    /// the deadline introduced by the previous ping must not fire.
    pub(crate) fn reset(self: &Arc<Self>, session: Session) {
        self.arm(session);
    }

    /// Cancel both timers without scheduling a replacement.
    pub(crate) fn clear(&self) {
        let mut timers = self.lock();
        timers.cancel();
        timers.generation = timers.generation.wrapping_add(1);
    }

    fn ping_due(self: &Arc<Self>, generation: u64, session: Session) {
        let mut timers = self.lock();
        if timers.generation != generation {
            return;
        }
        if !session.ready_state().is_open() {
            return;
        }

        session.send_text(frame::PING.to_owned());

        let heartbeat = Arc::clone(self);
        timers.reply_deadline = Some(tokio::spawn(async move {
            sleep(heartbeat.interval).await;
            heartbeat.expire(generation, session);
        }));
    }

    fn expire(&self, generation: u64, session: Session) {
        {
            let timers = self.lock();
            if timers.generation != generation {
                return;
            }
        }

        let err = WsError::HeartbeatTimeout;
        #[cfg(feature = "tracing")]
        tracing::warn!(%err, interval = ?self.interval, "forcing the session closed");
        #[cfg(not(feature = "tracing"))]
        let _ = &err;

        session.close();
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        // We can recover from a poisoned lock because Timers has no
        // inconsistent intermediate state.
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
