//! Synchronization subsystem
//!
//! Everything that keeps two peers' action streams consistent: the
//! per-side logs and counters, the out-of-order buffer, the resync
//! coordinator, catch-up planning, and the divergence monitor.
//! [`SyncSession`] is the single owner of all of that state — there
//! is no ambient shared state; components receive the session by
//! reference from the engine driving it.

pub mod action_log;
pub mod buffer;
pub mod catch_up;
pub mod monitor;
pub mod resync;

pub use action_log::{ActionLog, ActionLogs};
pub use buffer::{ActionBuffer, BufferedAction, GapAction, OfferOutcome};
pub use catch_up::{plan_catch_up, CatchUpPlan};
pub use monitor::SyncMonitor;
pub use resync::{PayloadStrategy, ResyncCoordinator, ResyncTrigger};

use crate::config::SyncConfig;
use crate::game::GameBoard;
use tokio::sync::mpsc;

/// Notifications surfaced to the embedding client
///
/// Advisory only: the user is warned, never blocked. Failures always
/// leave the session in a state the monitor can recover from.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A resync session started
    SyncStarted { trigger: &'static str },
    /// A resync session finished successfully
    SyncCompleted { duration_ms: u64 },
    /// A resync session failed (timeout or unusable payload)
    SyncFailed { reason: String },
    /// The buffer applied an action past a lost range
    GapSkipped { lost_from: u64, applied: u64 },
    /// A snapshot was restored onto the board
    SnapshotRestored { cards: usize },
    /// Recovery exhausted every fallback; a fresh session started
    NewSessionStarted,
    /// The peer dropped off the relay
    PeerDisconnected,
    /// The peer came back
    PeerReconnected,
}

/// Counters describing the session's sync behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    pub actions_sent: u64,
    pub actions_applied: u64,
    pub actions_buffered: u64,
    pub actions_ignored: u64,
    pub gaps_skipped: u64,
    pub resyncs_started: u64,
    pub resyncs_completed: u64,
    pub resyncs_timed_out: u64,
    pub snapshots_captured: u64,
    pub snapshots_restored: u64,
}

/// The complete sync state for one room membership
///
/// Owned by the engine; dropped (or reset) on room leave so no timer
/// or buffer outlives the session it belongs to.
pub struct SyncSession {
    pub room_id: String,
    pub config: SyncConfig,
    pub logs: ActionLogs,
    pub buffer: ActionBuffer,
    pub resync: ResyncCoordinator,
    pub monitor: SyncMonitor,
    pub board: GameBoard,
    pub metrics: SyncMetrics,
    observers: Vec<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncSession {
    pub fn new(room_id: impl Into<String>, config: SyncConfig) -> Self {
        let buffer = ActionBuffer::new(config.debounce_default(), config.gap_tolerance);
        let resync = ResyncCoordinator::new(
            config.resync_timeout(),
            config.min_resync_interval(),
            config.snapshot_threshold,
        );
        let monitor = SyncMonitor::new(&config);
        Self {
            room_id: room_id.into(),
            config,
            logs: ActionLogs::new(),
            buffer,
            resync,
            monitor,
            board: GameBoard::new(),
            metrics: SyncMetrics::default(),
            observers: Vec::new(),
        }
    }

    /// Register an observer. Events are fire-and-forget; a dropped
    /// receiver is pruned on the next emit.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: SyncEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Expected sequence number of the next remote action.
    pub fn expected_remote(&self) -> u64 {
        self.logs.opp.expected_next()
    }

    /// Full teardown: logs, buffer, board, pending deadlines. Called
    /// on room leave and before starting a completely new game.
    pub fn reset(&mut self) {
        self.logs.reset();
        self.buffer.clear();
        self.monitor.reset();
        self.board = GameBoard::new();
    }
}
