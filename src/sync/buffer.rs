//! Out-of-order action buffer
//!
//! Remote actions can arrive ahead of sequence. The buffer holds them
//! sorted by counter, deduplicated, until the missing predecessors
//! arrive — or until a debounced gap pass decides to stop waiting:
//! small gaps (up to the configured tolerance) are skipped over and
//! repaired by a resync, large gaps park the buffer until a resync
//! completes.
//!
//! The debounce deadline is an owned handle: offering a new
//! out-of-order action always cancels and reschedules it, so passes
//! never stack.

use crate::action::ActionRecord;
use std::time::{Duration, Instant};

/// One out-of-order remote action awaiting its turn
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedAction {
    pub counter: u64,
    pub record: ActionRecord,
}

/// Classification of an incoming remote action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Exactly the expected counter; apply it now
    Processed,
    /// Ahead of sequence; parked until the gap closes
    Buffered,
    /// Stale duplicate; dropped
    Ignored,
}

/// Verdict of a debounced gap pass
#[derive(Debug, Clone, PartialEq)]
pub enum GapAction {
    /// Nothing to do (empty, in-order, or resync in flight)
    None,
    /// Apply this head despite `skipped` missing predecessors, then
    /// request a resync to repair the hole
    Skip {
        head: BufferedAction,
        skipped: u64,
    },
    /// Gap too wide to skip; request a resync and keep waiting
    RequestResync { gap: u64 },
}

/// Ordered buffer of ahead-of-sequence actions
#[derive(Debug)]
pub struct ActionBuffer {
    pending: Vec<BufferedAction>,
    gap_deadline: Option<Instant>,
    debounce: Duration,
    gap_tolerance: u64,
}

impl ActionBuffer {
    pub fn new(debounce: Duration, gap_tolerance: u64) -> Self {
        Self {
            pending: Vec::new(),
            gap_deadline: None,
            debounce,
            gap_tolerance,
        }
    }

    /// Classify an incoming action against `expected_next`. Buffered
    /// actions are inserted in counter order (scanning from the back,
    /// since arrivals are usually nearly in order) and deduplicated
    /// by counter.
    pub fn offer(&mut self, counter: u64, record: ActionRecord, expected_next: u64, now: Instant) -> OfferOutcome {
        if counter == expected_next {
            return OfferOutcome::Processed;
        }
        if counter < expected_next {
            return OfferOutcome::Ignored;
        }

        if !self.insert(BufferedAction { counter, record }) {
            return OfferOutcome::Ignored;
        }
        // Cancel-and-reschedule; the pass runs once the arrival burst
        // settles.
        self.gap_deadline = Some(now + self.debounce);
        OfferOutcome::Buffered
    }

    fn insert(&mut self, action: BufferedAction) -> bool {
        let mut index = self.pending.len();
        while index > 0 {
            let existing = self.pending[index - 1].counter;
            if existing == action.counter {
                return false;
            }
            if existing < action.counter {
                break;
            }
            index -= 1;
        }
        self.pending.insert(index, action);
        true
    }

    /// Pop the contiguous run starting at `expected_next`, dropping
    /// any stale leftovers below it.
    pub fn drain_ready(&mut self, mut expected_next: u64) -> Vec<BufferedAction> {
        let mut ready = Vec::new();
        while let Some(head) = self.pending.first() {
            if head.counter < expected_next {
                self.pending.remove(0);
            } else if head.counter == expected_next {
                ready.push(self.pending.remove(0));
                expected_next += 1;
            } else {
                break;
            }
        }
        if self.pending.is_empty() {
            self.gap_deadline = None;
        }
        ready
    }

    /// Run the debounced gap pass. Clears the deadline; the caller
    /// re-arms it by buffering further arrivals.
    pub fn gap_pass(&mut self, expected_next: u64, resyncing: bool) -> GapAction {
        self.gap_deadline = None;
        if resyncing {
            return GapAction::None;
        }
        let head_counter = match self.pending.first() {
            Some(head) => head.counter,
            None => return GapAction::None,
        };
        if head_counter < expected_next {
            // Stale head; superseded while the pass was pending.
            return GapAction::None;
        }
        let gap = head_counter - expected_next;
        if gap == 0 {
            return GapAction::None;
        }
        if gap <= self.gap_tolerance {
            let head = self.pending.remove(0);
            GapAction::Skip { head, skipped: gap }
        } else {
            GapAction::RequestResync { gap }
        }
    }

    /// Switch the debounce interval (adaptive backpressure).
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Deadline of the pending gap pass, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.gap_deadline
    }

    pub fn head_counter(&self) -> Option<u64> {
        self.pending.first().map(|a| a.counter)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Empty the buffer and cancel the pending pass (room leave,
    /// resync start, import start).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.gap_deadline = None;
    }
}
