//! Transmission bookkeeping and keepalive scheduling.
//!
//! The sender emits a ping once the connection has been idle (no outbound
//! frame) for the keepalive interval. At most one keepalive is pending in the
//! outbound queue at a time.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct HeartbeatState {
    last_transmit: Option<Instant>,
    last_ping: Option<Instant>,
    keepalive_pending: bool,
}

/// Per-connection heartbeat state.
#[derive(Debug, Default)]
pub struct Heartbeat {
    state: Mutex<HeartbeatState>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a keepalive slot if one is due.
    ///
    /// Due when nothing has been transmitted yet, or the last transmission is
    /// older than `interval`, and no keepalive is already queued. Returns
    /// `true` when the caller must enqueue a keepalive.
    pub fn try_schedule_keepalive(&self, now: Instant, interval: Duration) -> bool {
        let mut state = self.state.lock();
        if state.keepalive_pending {
            return false;
        }
        let idle = match state.last_transmit {
            None => true,
            Some(at) => now.saturating_duration_since(at) > interval,
        };
        if idle {
            state.keepalive_pending = true;
        }
        idle
    }

    /// Give back a reserved slot that could not be enqueued.
    pub fn cancel_keepalive(&self) {
        self.state.lock().keepalive_pending = false;
    }

    /// A text frame was written.
    pub fn record_transmit(&self, now: Instant) {
        self.state.lock().last_transmit = Some(now);
    }

    /// A ping frame was written; frees the keepalive slot.
    pub fn record_ping(&self, now: Instant) {
        let mut state = self.state.lock();
        state.last_transmit = Some(now);
        state.last_ping = Some(now);
        state.keepalive_pending = false;
    }

    /// A pong (control frame or text `pong`) was received.
    ///
    /// Returns the round trip since the last ping, if one was sent.
    pub fn record_pong(&self, now: Instant) -> Option<Duration> {
        let rtt = self
            .state
            .lock()
            .last_ping
            .map(|ping| now.saturating_duration_since(ping));
        if let Some(rtt) = rtt {
            debug!(rtt_ms = rtt.as_millis() as u64, "Received pong");
        }
        rtt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(15);

    #[test]
    fn test_keepalive_due_before_first_transmit() {
        let hb = Heartbeat::new();
        assert!(hb.try_schedule_keepalive(Instant::now(), INTERVAL));
        assert!(hb.state.lock().keepalive_pending);
    }

    #[test]
    fn test_single_pending_keepalive() {
        let hb = Heartbeat::new();
        let now = Instant::now();
        assert!(hb.try_schedule_keepalive(now, INTERVAL));
        assert!(!hb.try_schedule_keepalive(now + Duration::from_millis(300), INTERVAL));
        assert!(!hb.try_schedule_keepalive(now + Duration::from_secs(60), INTERVAL));
    }

    #[test]
    fn test_recent_transmit_suppresses_keepalive() {
        let hb = Heartbeat::new();
        let t0 = Instant::now();
        hb.record_transmit(t0);
        assert!(!hb.try_schedule_keepalive(t0 + Duration::from_secs(5), INTERVAL));
        assert!(!hb.try_schedule_keepalive(t0 + INTERVAL, INTERVAL));
        assert!(hb.try_schedule_keepalive(t0 + Duration::from_secs(16), INTERVAL));
    }

    #[test]
    fn test_ping_frees_slot_and_counts_as_transmit() {
        let hb = Heartbeat::new();
        let t0 = Instant::now();
        assert!(hb.try_schedule_keepalive(t0, INTERVAL));

        let t1 = t0 + Duration::from_millis(10);
        hb.record_ping(t1);
        assert!(!hb.state.lock().keepalive_pending);
        assert_eq!(hb.state.lock().last_transmit, Some(t1));
        assert!(!hb.try_schedule_keepalive(t1 + Duration::from_secs(1), INTERVAL));
    }

    #[test]
    fn test_cancel_keepalive() {
        let hb = Heartbeat::new();
        let now = Instant::now();
        assert!(hb.try_schedule_keepalive(now, INTERVAL));
        hb.cancel_keepalive();
        assert!(hb.try_schedule_keepalive(now, INTERVAL));
    }

    #[test]
    fn test_pong_round_trip() {
        let hb = Heartbeat::new();
        let now = Instant::now();
        assert_eq!(hb.record_pong(now), None);

        hb.record_ping(now);
        assert_eq!(
            hb.record_pong(now + Duration::from_millis(20)),
            Some(Duration::from_millis(20))
        );
    }
}
