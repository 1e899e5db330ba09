//! Divergence and liveness monitoring
//!
//! Two periodic channels: counter broadcasts (`syncCheck`) expose
//! divergence, and heartbeat echoes measure round-trip latency. The
//! latency estimate drives the buffer's debounce interval — a lossy
//! link gets a more patient gap pass, trading responsiveness for
//! fewer spurious resyncs.

use crate::config::SyncConfig;
use crate::logging::log_heartbeat_rtt;
use std::time::{Duration, Instant};

/// Liveness/divergence monitor state
#[derive(Debug)]
pub struct SyncMonitor {
    outstanding: Option<(u64, Instant)>,
    last_rtt: Option<Duration>,
    degraded: bool,
    threshold: Duration,
}

impl SyncMonitor {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            outstanding: None,
            last_rtt: None,
            degraded: false,
            threshold: config.high_latency_threshold(),
        }
    }

    /// A heartbeat left with correlation stamp `stamp`.
    pub fn record_heartbeat_sent(&mut self, stamp: u64, now: Instant) {
        self.outstanding = Some((stamp, now));
    }

    /// A heartbeat echo arrived. Returns the measured round-trip when
    /// the stamp matches the outstanding probe.
    pub fn record_heartbeat_response(&mut self, stamp: u64, now: Instant) -> Option<Duration> {
        let (sent_stamp, sent_at) = self.outstanding?;
        if sent_stamp != stamp {
            return None;
        }
        self.outstanding = None;
        let rtt = now.duration_since(sent_at);
        self.last_rtt = Some(rtt);
        self.degraded = rtt > self.threshold;
        log_heartbeat_rtt(rtt.as_millis() as u64, self.degraded);
        Some(rtt)
    }

    /// Whether the peer's advertised counter indicates actions we
    /// never received: a gap beyond the one in-flight action.
    pub fn counter_gap_detected(&self, peer_counter: u64, local_opp_counter: u64) -> bool {
        peer_counter > local_opp_counter + 1
    }

    /// Debounce interval the buffer should use right now.
    pub fn debounce_for(&self, config: &SyncConfig) -> Duration {
        match self.last_rtt {
            None => config.debounce_default(),
            Some(_) if self.degraded => config.debounce_slow(),
            Some(_) => config.debounce_fast(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }

    /// Forget in-flight probes (room leave / reconnection).
    pub fn reset(&mut self) {
        self.outstanding = None;
        self.last_rtt = None;
        self.degraded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> SyncMonitor {
        SyncMonitor::new(&SyncConfig::default())
    }

    #[test]
    fn rtt_measured_from_matching_stamp() {
        let mut monitor = monitor();
        let sent = Instant::now();
        monitor.record_heartbeat_sent(42, sent);

        let rtt = monitor.record_heartbeat_response(42, sent + Duration::from_millis(80));
        assert_eq!(rtt, Some(Duration::from_millis(80)));
        assert!(!monitor.is_degraded());
    }

    #[test]
    fn mismatched_stamp_is_discarded() {
        let mut monitor = monitor();
        monitor.record_heartbeat_sent(42, Instant::now());
        assert_eq!(monitor.record_heartbeat_response(7, Instant::now()), None);
    }

    #[test]
    fn slow_round_trip_degrades_the_link() {
        let mut monitor = monitor();
        let sent = Instant::now();
        monitor.record_heartbeat_sent(1, sent);
        monitor.record_heartbeat_response(1, sent + Duration::from_millis(350));
        assert!(monitor.is_degraded());

        let config = SyncConfig::default();
        assert_eq!(monitor.debounce_for(&config), config.debounce_slow());
    }

    #[test]
    fn debounce_defaults_before_any_measurement() {
        let config = SyncConfig::default();
        assert_eq!(monitor().debounce_for(&config), config.debounce_default());
    }

    #[test]
    fn gap_detection_allows_one_in_flight_action() {
        let monitor = monitor();
        assert!(!monitor.counter_gap_detected(5, 5));
        assert!(!monitor.counter_gap_detected(6, 5));
        assert!(monitor.counter_gap_detected(7, 5));
    }
}
