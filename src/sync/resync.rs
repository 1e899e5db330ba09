//! Resync coordination
//!
//! One resync session at a time: `Idle → Resyncing → {Completed,
//! TimedOut}`. Entry clears partial buffered data, arms a timeout,
//! and notifies observers; both terminal transitions stamp
//! `last_full_sync` so the monitor's re-trigger cooldown holds even
//! after a failure.

use std::time::{Duration, Instant};

/// What caused a resync to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncTrigger {
    /// Monitor saw the peer's counter run ahead
    MonitorGap,
    /// Buffer hit a gap it could not wait out
    BufferGap,
    /// Reconnection catch-up
    Reconnection,
    /// Explicit user/debug request
    Explicit,
}

impl ResyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResyncTrigger::MonitorGap => "monitor-gap",
            ResyncTrigger::BufferGap => "buffer-gap",
            ResyncTrigger::Reconnection => "reconnection",
            ResyncTrigger::Explicit => "explicit",
        }
    }
}

/// How the responding peer should package its catch-up payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStrategy {
    /// Short game: ship the complete action log
    ActionList,
    /// Long game: ship a compact snapshot instead
    Snapshot,
}

#[derive(Debug, Clone, Copy)]
struct ResyncSession {
    started_at: Instant,
    deadline: Instant,
    trigger: ResyncTrigger,
}

/// Single-session resync state machine
#[derive(Debug)]
pub struct ResyncCoordinator {
    session: Option<ResyncSession>,
    last_full_sync: Option<Instant>,
    timeout: Duration,
    cooldown: Duration,
    snapshot_threshold: usize,
}

impl ResyncCoordinator {
    pub fn new(timeout: Duration, cooldown: Duration, snapshot_threshold: usize) -> Self {
        Self {
            session: None,
            last_full_sync: None,
            timeout,
            cooldown,
            snapshot_threshold,
        }
    }

    pub fn is_resyncing(&self) -> bool {
        self.session.is_some()
    }

    /// Whether enough time has passed since the last full sync for
    /// the monitor to trigger another one.
    pub fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_full_sync {
            Some(last) => now.duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    /// Start a session. Returns `false` (no-op) when one is already
    /// active — concurrent triggers collapse into the running
    /// session.
    pub fn begin(&mut self, trigger: ResyncTrigger, now: Instant) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(ResyncSession {
            started_at: now,
            deadline: now + self.timeout,
            trigger,
        });
        true
    }

    /// Terminal transition: the catch-up payload was fully applied.
    /// Returns the session duration, or `None` if no session was
    /// active (late payload after a timeout — harmless).
    pub fn complete(&mut self, now: Instant) -> Option<Duration> {
        let session = self.session.take()?;
        self.last_full_sync = Some(now);
        Some(now.duration_since(session.started_at))
    }

    /// Terminal transition: deadline elapsed without completion.
    /// Stamps `last_full_sync` anyway to keep the re-trigger cooldown
    /// honest. Returns the trigger of the abandoned session when one
    /// actually timed out.
    pub fn check_timeout(&mut self, now: Instant) -> Option<ResyncTrigger> {
        let session = self.session?;
        if now < session.deadline {
            return None;
        }
        self.session = None;
        self.last_full_sync = Some(now);
        Some(session.trigger)
    }

    /// Deadline of the active session, for the driver's timer wheel.
    pub fn deadline(&self) -> Option<Instant> {
        self.session.map(|s| s.deadline)
    }

    pub fn active_trigger(&self) -> Option<ResyncTrigger> {
        self.session.map(|s| s.trigger)
    }

    /// Choose the catch-up payload for a peer that asked us to help:
    /// long histories go as snapshots to bound the message size.
    pub fn payload_strategy(&self, own_log_len: usize) -> PayloadStrategy {
        if own_log_len > self.snapshot_threshold {
            PayloadStrategy::Snapshot
        } else {
            PayloadStrategy::ActionList
        }
    }

    /// Stamp a completed full sync without a session (snapshot
    /// ingestion on the responding side).
    pub fn note_full_sync(&mut self, now: Instant) {
        self.last_full_sync = Some(now);
    }

    /// Drop any active session without stamping the cooldown (room
    /// leave / full teardown).
    pub fn abort(&mut self) {
        self.session = None;
    }

    pub fn last_full_sync(&self) -> Option<Instant> {
        self.last_full_sync
    }
}
