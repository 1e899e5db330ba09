//! Logging configuration and utilities for the sync engine
//!
//! Provides structured logging for:
//! - Buffer decisions (apply / buffer / skip / ignore)
//! - Resync lifecycle transitions
//! - Snapshot capture and restoration
//! - Heartbeat latency measurements

use tracing::Span;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use std::io;

/// Initialize the logging system for the sync engine
pub fn init_logging() -> eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tcg_sync=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("tcg-sync logging initialized");
    Ok(())
}

/// Create a tracing span covering one resync session
pub fn resync_span(room_id: &str, own_entries: usize) -> Span {
    tracing::info_span!(
        "resync",
        room_id = %room_id,
        own_entries = own_entries,
        strategy = tracing::field::Empty,
        outcome = tracing::field::Empty,
    )
}

/// Create a tracing span covering one snapshot restoration
pub fn restore_span(snapshot_id: &str, zone_count: usize) -> Span {
    tracing::info_span!(
        "snapshot_restore",
        snapshot_id = %snapshot_id,
        zone_count = zone_count,
        cards_restored = tracing::field::Empty,
        outcome = tracing::field::Empty,
    )
}

/// Log one buffer decision for a remote action
pub fn log_buffer_decision(counter: u64, expected: u64, decision: &str) {
    tracing::debug!(
        counter = counter,
        expected = expected,
        decision = decision,
        "remote action buffered-path decision"
    );
}

/// Log a heartbeat round-trip measurement
pub fn log_heartbeat_rtt(rtt_ms: u64, degraded: bool) {
    tracing::debug!(
        rtt_ms = rtt_ms,
        degraded = degraded,
        "heartbeat round-trip measured"
    );
}
