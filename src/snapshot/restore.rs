//! Snapshot restoration
//!
//! Rebuilds the live board from a verified snapshot. Card state is
//! re-applied through the same board mutators used during live play
//! so their side effects stay consistent; a missing relationship id
//! is skipped with a warning rather than failing the whole restore.
//! Individual card failures are likewise best-effort — aborting
//! mid-restore would leave the game unplayable, which is worse than a
//! cosmetic hole.

use super::{RestorePhase, Snapshot};
use crate::action::Side;
use crate::errors::Result;
use crate::game::GameBoard;
use tracing::{debug, warn};

/// What a restoration actually rebuilt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub cards_restored: usize,
    pub cards_skipped: usize,
    pub relationships_restored: usize,
    pub relationships_skipped: usize,
}

/// Rebuild `board` from `snapshot`.
///
/// Verifies integrity first (a corrupt snapshot is rejected before
/// any mutation), then resets the board and reconstructs identity,
/// zones, relationships, and orientation. Counter/log/timer
/// reconciliation is the engine's job; this function owns the board.
pub fn restore_snapshot(snapshot: &Snapshot, board: &mut GameBoard) -> Result<RestoreOutcome> {
    snapshot.verify()?;

    let span = crate::logging::restore_span(
        &snapshot.snapshot_id,
        snapshot.zones.own.len() + snapshot.zones.opp.len(),
    );
    let _guard = span.enter();

    // Identity and session fields come back first so deck
    // back-images exist before zones are populated.
    board.reset_board();
    board.exchange_deck_data(
        Side::Own,
        snapshot.players.own.username.clone(),
        snapshot.players.own.deck.clone(),
    );
    board.exchange_deck_data(
        Side::Opp,
        snapshot.players.opponent.username.clone(),
        snapshot.players.opponent.deck.clone(),
    );
    board.meta = snapshot.game_state.clone();

    let mut outcome = RestoreOutcome::default();

    for side in [Side::Own, Side::Opp] {
        for (zone, cards) in snapshot.zones.get(side) {
            board.clear_zone(side, *zone);
            for state in cards {
                let id = state.card.id.clone();
                let mut bare = state.card.clone();
                bare.visual = Default::default();
                bare.counters = Default::default();
                board.place_card(side, *zone, state.location.index, bare);

                // Re-apply captured state through the live mutators.
                let applied = board
                    .set_rotation(&id, state.card.visual.rotation)
                    .and_then(|_| board.set_face_down(&id, state.card.visual.face_down))
                    .and_then(|_| board.set_public(&id, state.card.visual.is_public))
                    .and_then(|_| board.set_position(&id, state.card.visual.position))
                    .and_then(|_| board.set_damage(&id, state.card.counters.damage))
                    .and_then(|_| board.set_ability_used(&id, state.card.counters.ability_used))
                    .and_then(|_| {
                        board.set_special_condition(
                            &id,
                            state.card.counters.special_condition.clone(),
                        )
                    });
                match applied {
                    Ok(()) => outcome.cards_restored += 1,
                    Err(error) => {
                        warn!(card_id = %id, %error, "card state could not be re-applied");
                        outcome.cards_skipped += 1;
                    }
                }
            }
        }
    }

    for relationship in &snapshot.relationships {
        match board.link(
            relationship.kind,
            &relationship.parent,
            &relationship.child,
        ) {
            Ok(()) => outcome.relationships_restored += 1,
            Err(error) => {
                warn!(
                    parent = %relationship.parent,
                    child = %relationship.child,
                    %error,
                    "relationship skipped: card id not found after restore"
                );
                outcome.relationships_skipped += 1;
            }
        }
    }

    board.visual = snapshot.visual_state.clone();

    span.record("cards_restored", outcome.cards_restored);
    span.record("outcome", "ok");
    debug!(?outcome, "snapshot restoration finished");
    Ok(outcome)
}

/// Decide the next step after a failed restoration: replay the
/// embedded history when there is one, otherwise start over.
pub fn fallback_phase(snapshot: &Snapshot) -> RestorePhase {
    if !snapshot.action_history.own.is_empty() || !snapshot.action_history.opp.is_empty() {
        RestorePhase::ReplayHistory
    } else {
        RestorePhase::FreshSession
    }
}
