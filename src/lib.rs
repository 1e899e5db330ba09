//! # tcg-sync
//!
//! Client-side state synchronization for two-player card game
//! clients. Two peers, each fully authoritative over their own action
//! stream, keep a shared game log consistent across an unreliable,
//! unordered relay — detecting divergence and repairing it without a
//! central referee. This crate provides:
//!
//! - **Ordered action logs** with per-side sequence counters
//! - **An out-of-order buffer** with bounded gap skipping and an
//!   adaptive, latency-aware debounce
//! - **A resync protocol** with two payload strategies: full action
//!   replay for short games, checksummed snapshots for long ones
//! - **Snapshot capture/restore** with integrity verification and a
//!   fallback chain that always ends in a playable state
//! - **Liveness monitoring** via counter broadcasts and heartbeat
//!   round-trips
//!
//! ## Architecture
//!
//! [`engine::SyncEngine`] owns a [`sync::SyncSession`] — logs,
//! buffer, resync coordinator, monitor, and board — and reacts to
//! relay messages, local actions, and timer deadlines as a
//! single-logical-thread state machine. [`engine::run`] is the tokio
//! driver. Rendering, rules, and the relay itself stay outside; the
//! [`transport::Transport`] trait and [`sync::SyncEvent`] stream are
//! the only integration points.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tcg_sync::config::SyncConfig;
//! use tcg_sync::engine::SyncEngine;
//! use tcg_sync::sync::SyncSession;
//! use tcg_sync::transport::ChannelTransport;
//!
//! let ((transport, _inbox), _peer) = ChannelTransport::pair();
//! let session = SyncSession::new("room-1", SyncConfig::default());
//! let mut engine = SyncEngine::new(session, transport);
//! engine.join_game(false, std::time::Instant::now());
//! ```

pub mod action;
pub mod config;
pub mod engine;
pub mod errors;
pub mod game;
pub mod logging;
pub mod snapshot;
pub mod sync;
pub mod transport;

// Re-export commonly used types
pub use action::{ActionKind, ActionParam, ActionRecord, Side};
pub use config::SyncConfig;
pub use engine::{EngineCommand, SyncEngine};
pub use errors::{IntegrityError, ReconcileError, Result, SnapshotError, SyncError};
pub use snapshot::{Snapshot, SnapshotStore};
pub use sync::{SyncEvent, SyncMetrics, SyncSession};
pub use transport::{ChannelTransport, Transport, WireMessage};

// Version and build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

/// Utility functions and helpers
pub mod utils {
    use sha2::{Digest, Sha256};

    /// SHA-256 content hash, hex encoded. Used for snapshot
    /// integrity; corruption detection only, peers are mutually
    /// trusting.
    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Current wall-clock time as unix millis, for wire timestamps.
    pub fn now_millis() -> u64 {
        chrono::Utc::now().timestamp_millis() as u64
    }

}
