//! Error types and handling for the sync engine
//!
//! Covers the failure taxonomy of the synchronization layer:
//! - Snapshot integrity and codec failures
//! - Catch-up / restoration reconciliation failures
//! - Transport send failures
//! - Configuration problems
//!
//! Sync-layer errors never propagate into game-rule code; the engine
//! catches them at the point of application and converts them into
//! `SyncEvent` notifications.

use thiserror::Error;

/// Main error type for the sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Snapshot integrity failures detected on ingestion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("checksum mismatch: expected={expected}, computed={computed}")]
    ChecksumMismatch { expected: String, computed: String },

    #[error("missing required snapshot field: {field}")]
    MissingField { field: &'static str },

    #[error("unsupported snapshot version: {version}")]
    UnsupportedVersion { version: u32 },
}

/// Snapshot codec failures
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("snapshot deserialization failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("restoration failed: {reason}")]
    RestoreFailed { reason: String },
}

/// Catch-up / replay reconciliation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("action failed to apply: counter={counter}, reason={reason}")]
    ApplyFailed { counter: u64, reason: String },

    #[error("resync timed out after {elapsed_ms}ms")]
    ResyncTimeout { elapsed_ms: u64 },

    #[error("no usable recovery payload: {reason}")]
    NoRecoveryPath { reason: String },
}

/// Transport adapter failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("channel closed: {context}")]
    ChannelClosed { context: &'static str },

    #[error("message encoding failed: {reason}")]
    Encode { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("configuration parsing failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration value: key={key}, reason={reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Result type alias for the sync engine
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Whether the failure is transient and eligible for retry on the
    /// next monitor tick (transport loss, timeouts), as opposed to a
    /// terminal failure (bad config, corrupt payload).
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Reconcile(ReconcileError::ResyncTimeout { .. }) => true,
            SyncError::Reconcile(ReconcileError::ApplyFailed { .. }) => true,
            SyncError::Integrity(_) => false,
            SyncError::Config(_) => false,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverability_classification() {
        let timeout = SyncError::Reconcile(ReconcileError::ResyncTimeout { elapsed_ms: 10_000 });
        assert!(timeout.is_recoverable());

        let corrupt = SyncError::Integrity(IntegrityError::ChecksumMismatch {
            expected: "aa".into(),
            computed: "bb".into(),
        });
        assert!(!corrupt.is_recoverable());
    }

    #[test]
    fn errors_nest_through_from() {
        let err: SyncError = IntegrityError::MissingField { field: "roomId" }.into();
        assert!(matches!(err, SyncError::Integrity(_)));
    }
}
