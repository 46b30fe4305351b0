//! Keepalive sweep.
//!
//! A session is expected to send something at least once per ping interval.
//! Each sweep converts the silence since its last command into a count of
//! missed intervals; reaching the limit evicts the session.

use crate::registry::SessionRegistry;
use bids_core::SessionId;
use std::time::{Duration, Instant};

/// Detects silent sessions.
#[derive(Debug, Clone)]
pub struct KeepaliveMonitor {
    ping_interval: Duration,
    max_missed: u32,
}

impl KeepaliveMonitor {
    pub fn new(ping_interval: Duration, max_missed: u32) -> Self {
        Self {
            ping_interval,
            max_missed,
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub fn max_missed(&self) -> u32 {
        self.max_missed
    }

    /// Whole ping intervals elapsed between `since` and `now`.
    pub fn missed_intervals(&self, since: Instant, now: Instant) -> u32 {
        let interval = self.ping_interval.as_millis().max(1);
        let elapsed = now.saturating_duration_since(since).as_millis();
        u32::try_from(elapsed / interval).unwrap_or(u32::MAX)
    }

    /// Updates every session's missed-interval count and returns the ids of
    /// sessions that reached the limit. The caller evicts them.
    pub fn sweep(&self, registry: &mut SessionRegistry, now: Instant) -> Vec<SessionId> {
        let mut timed_out = Vec::new();
        for session in registry.iter_mut() {
            let missed = self.missed_intervals(session.last_activity(), now);
            if missed > session.missed_intervals() {
                session.set_missed_intervals(missed);
                tracing::debug!(
                    "[{}] {} missed {} ping interval(s)",
                    session.remote_addr,
                    session.id,
                    missed
                );
                if missed >= self.max_missed {
                    timed_out.push(session.id);
                }
            }
        }
        timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, DEFAULT_OUTBOUND_QUEUE};
    use tokio::sync::mpsc;

    fn registry_with(start: Instant) -> (SessionRegistry, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(DEFAULT_OUTBOUND_QUEUE);
        let addr = "127.0.0.1:5000".parse().unwrap();
        let mut registry = SessionRegistry::new();
        registry.insert(Session::new(SessionId(1), addr, tx, start));
        (registry, rx)
    }

    #[test]
    fn test_missed_intervals() {
        let monitor = KeepaliveMonitor::new(Duration::from_secs(15), 5);
        let start = Instant::now();
        assert_eq!(monitor.missed_intervals(start, start), 0);
        assert_eq!(
            monitor.missed_intervals(start, start + Duration::from_secs(14)),
            0
        );
        assert_eq!(
            monitor.missed_intervals(start, start + Duration::from_secs(31)),
            2
        );
    }

    #[test]
    fn test_evicts_after_max_missed() {
        let monitor = KeepaliveMonitor::new(Duration::from_secs(15), 5);
        let start = Instant::now();
        let (mut registry, _rx) = registry_with(start);

        assert!(monitor
            .sweep(&mut registry, start + Duration::from_secs(74))
            .is_empty());
        assert_eq!(
            registry.get(SessionId(1)).unwrap().missed_intervals(),
            4
        );

        assert_eq!(
            monitor.sweep(&mut registry, start + Duration::from_secs(75)),
            vec![SessionId(1)]
        );
    }

    #[test]
    fn test_activity_resets_count() {
        let monitor = KeepaliveMonitor::new(Duration::from_secs(15), 5);
        let start = Instant::now();
        let (mut registry, _rx) = registry_with(start);

        monitor.sweep(&mut registry, start + Duration::from_secs(60));
        let session = registry.get_mut(SessionId(1)).unwrap();
        assert_eq!(session.missed_intervals(), 4);
        session.record_request(start + Duration::from_secs(61));

        // 61 + 74 is still inside five intervals of the last command.
        assert!(monitor
            .sweep(&mut registry, start + Duration::from_secs(135))
            .is_empty());
        assert_eq!(
            monitor.sweep(&mut registry, start + Duration::from_secs(136)),
            vec![SessionId(1)]
        );
    }
}
