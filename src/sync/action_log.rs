//! Per-side action logs and counters
//!
//! Each side's log is an ordered, append-only list of applied
//! actions. The counter is the sequence number of the most recently
//! applied action from that side; the next expected remote action
//! carries `counter + 1`. Sequence numbers start at 1.
//!
//! Invariant: `counter >= entries.len()`, with equality whenever no
//! gap has been skipped. A gap skip advances the counter past the
//! lost entries; the next wholesale replacement (resync) restores
//! equality.

use crate::action::ActionRecord;
use serde::{Deserialize, Serialize};

/// Ordered append-only log for one side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    entries: Vec<ActionRecord>,
    counter: u64,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next action in sequence. Returns its sequence
    /// number.
    pub fn append(&mut self, record: ActionRecord) -> u64 {
        self.entries.push(record);
        self.counter += 1;
        self.counter
    }

    /// Append an action whose sequence number jumped past a skipped
    /// gap. The counter lands on `seq`; the lost range stays absent
    /// until a resync replaces the log wholesale.
    pub fn append_at(&mut self, seq: u64, record: ActionRecord) {
        self.entries.push(record);
        self.counter = self.counter.max(seq);
    }

    /// Replace the contents wholesale (resync / snapshot ingestion).
    pub fn replace(&mut self, entries: Vec<ActionRecord>) {
        self.counter = entries.len() as u64;
        self.entries = entries;
    }

    /// Raise the counter to `seq` without touching the entries (used
    /// when a snapshot's counters run ahead of its recorded history).
    pub fn bump_counter(&mut self, seq: u64) {
        self.counter = self.counter.max(seq);
    }

    /// Clear the log and zero the counter (room leave / new game).
    pub fn reset(&mut self) {
        self.entries.clear();
        self.counter = 0;
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Sequence number the next action from this side must carry.
    pub fn expected_next(&self) -> u64 {
        self.counter + 1
    }

    pub fn entries(&self) -> &[ActionRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both sides' logs plus the spectator-visible export feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionLogs {
    /// Actions this client performed
    pub own: ActionLog,
    /// Peer actions, re-read into the local perspective
    pub opp: ActionLog,
    /// In-order applied actions for spectators; deck bootstrap
    /// actions are kept out of it
    pub export: Vec<ActionRecord>,
}

impl ActionLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push onto the spectator feed unless the action is excluded.
    pub fn export_record(&mut self, record: &ActionRecord) {
        if !record.kind.is_deck_bootstrap() {
            self.export.push(record.clone());
        }
    }

    pub fn reset(&mut self) {
        self.own.reset();
        self.opp.reset();
        self.export.clear();
    }
}
