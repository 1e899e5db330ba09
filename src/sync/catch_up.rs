//! Catch-up planning (action-replay reconciliation)
//!
//! Input is the peer's complete own-side action log. Planning is a
//! pure function: compute the suffix we have not applied yet, flip
//! every entry into the local perspective, and pick where replay
//! starts. Two markers matter, scanned from the end:
//!
//! - the most recent deck bootstrap (`exchangeData`/`loadDeckData`)
//! - the most recent board reset (`reset`/`setup`)
//!
//! A reset that comes after the latest deck data supersedes it:
//! replay starts at the reset and everything before it is dropped.
//! Otherwise the deck bootstrap is applied first (exactly once) and
//! replay covers everything after it. With neither marker the whole
//! suffix replays.

use crate::action::ActionRecord;

/// Replay plan for one catch-up payload
#[derive(Debug, Clone, PartialEq)]
pub struct CatchUpPlan {
    /// The not-yet-applied suffix, already flipped into the local
    /// perspective. Every entry lands in the opponent log, applied or
    /// not, so counters stay aligned with the peer's numbering.
    pub missing: Vec<ActionRecord>,
    /// Index into `missing` of the deck bootstrap to apply first
    pub bootstrap: Option<usize>,
    /// Index into `missing` where sequential replay begins
    pub replay_start: usize,
}

impl CatchUpPlan {
    /// Nothing to reconcile: the local log already covers the peer's.
    pub fn is_trivially_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Whether the entry at `index` should hit the board.
    pub fn applies(&self, index: usize) -> bool {
        self.bootstrap == Some(index) || index >= self.replay_start
    }

    /// How many suffix entries are recorded but never applied.
    pub fn dropped(&self) -> usize {
        (0..self.missing.len()).filter(|i| !self.applies(*i)).count()
    }
}

/// Build the replay plan from the peer's full log and the local
/// opponent counter.
pub fn plan_catch_up(incoming: &[ActionRecord], local_opp_counter: u64) -> CatchUpPlan {
    let start = (local_opp_counter as usize).min(incoming.len());
    let missing: Vec<ActionRecord> = incoming[start..].iter().map(ActionRecord::flipped).collect();

    let last_bootstrap = missing.iter().rposition(|r| r.kind.is_deck_bootstrap());
    let last_reset = missing.iter().rposition(|r| r.kind.is_board_reset());

    let (bootstrap, replay_start) = match (last_bootstrap, last_reset) {
        // A board reset after the newest deck data supersedes it.
        (Some(b), Some(r)) if r > b => (None, r),
        (Some(b), _) => (Some(b), b + 1),
        (None, Some(r)) => (None, r),
        (None, None) => (None, 0),
    };

    CatchUpPlan {
        missing,
        bootstrap,
        replay_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ActionParam, Side};

    fn game(name: &str) -> ActionRecord {
        ActionRecord::new(
            Side::Own,
            ActionKind::Game(name.into()),
            vec![ActionParam::Side(Side::Own)],
        )
    }

    fn kind(kind: ActionKind) -> ActionRecord {
        ActionRecord::new(Side::Own, kind, vec![ActionParam::Side(Side::Own)])
    }

    #[test]
    fn already_covered_log_is_trivially_complete() {
        let incoming = vec![game("a"), game("b")];
        let plan = plan_catch_up(&incoming, 2);
        assert!(plan.is_trivially_complete());

        let plan = plan_catch_up(&incoming, 5);
        assert!(plan.is_trivially_complete());
    }

    #[test]
    fn suffix_is_flipped_into_local_perspective() {
        let incoming = vec![game("a"), game("b"), game("c")];
        let plan = plan_catch_up(&incoming, 1);
        assert_eq!(plan.missing.len(), 2);
        for record in &plan.missing {
            assert_eq!(record.side, Side::Opp);
            assert_eq!(record.parameters[0], ActionParam::Side(Side::Opp));
        }
    }

    #[test]
    fn no_markers_replays_everything() {
        let incoming = vec![game("a"), game("b")];
        let plan = plan_catch_up(&incoming, 0);
        assert_eq!(plan.bootstrap, None);
        assert_eq!(plan.replay_start, 0);
        assert!((0..2).all(|i| plan.applies(i)));
        assert_eq!(plan.dropped(), 0);
    }

    #[test]
    fn deck_data_applies_first_then_the_rest() {
        let incoming = vec![
            game("stale"),
            kind(ActionKind::ExchangeData),
            game("a"),
            game("b"),
        ];
        let plan = plan_catch_up(&incoming, 0);
        assert_eq!(plan.bootstrap, Some(1));
        assert_eq!(plan.replay_start, 2);
        assert!(!plan.applies(0));
        assert!(plan.applies(1));
        assert!(plan.applies(2));
        assert_eq!(plan.dropped(), 1);
    }

    #[test]
    fn reset_after_deck_data_supersedes_it() {
        let incoming = vec![
            kind(ActionKind::ExchangeData),
            game("pre-reset"),
            kind(ActionKind::Reset),
            game("post-reset"),
        ];
        let plan = plan_catch_up(&incoming, 0);
        assert_eq!(plan.bootstrap, None);
        assert_eq!(plan.replay_start, 2);
        assert!(!plan.applies(0));
        assert!(!plan.applies(1));
        assert!(plan.applies(2));
        assert!(plan.applies(3));
    }

    #[test]
    fn deck_data_after_reset_wins() {
        let incoming = vec![
            kind(ActionKind::Reset),
            kind(ActionKind::LoadDeckData),
            game("a"),
        ];
        let plan = plan_catch_up(&incoming, 0);
        assert_eq!(plan.bootstrap, Some(1));
        assert_eq!(plan.replay_start, 2);
    }

    #[test]
    fn latest_marker_of_each_kind_is_used() {
        let incoming = vec![
            kind(ActionKind::ExchangeData),
            kind(ActionKind::Reset),
            kind(ActionKind::ExchangeData),
            game("a"),
        ];
        let plan = plan_catch_up(&incoming, 0);
        // Newest deck data (index 2) postdates the reset (index 1).
        assert_eq!(plan.bootstrap, Some(2));
        assert_eq!(plan.replay_start, 3);
    }

    #[test]
    fn markers_before_the_suffix_are_invisible() {
        let incoming = vec![
            kind(ActionKind::ExchangeData),
            game("a"),
            game("b"),
        ];
        let plan = plan_catch_up(&incoming, 1);
        assert_eq!(plan.bootstrap, None);
        assert_eq!(plan.replay_start, 0);
        assert_eq!(plan.missing.len(), 2);
    }
}
