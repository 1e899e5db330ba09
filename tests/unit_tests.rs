//! Component-level tests for the sync engine

use tcg_sync::*;

mod buffer_tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, Instant};
    use tcg_sync::sync::{ActionBuffer, GapAction, OfferOutcome};

    fn record() -> ActionRecord {
        ActionRecord::new(Side::Opp, ActionKind::Game("draw".into()), vec![])
    }

    /// Replays the engine's buffer discipline without gap passes:
    /// apply in-sequence arrivals, buffer the rest, drain after every
    /// application.
    fn run_arrivals(arrivals: &[u64]) -> Vec<u64> {
        let mut buffer = ActionBuffer::new(Duration::from_millis(500), 3);
        let mut applied = Vec::new();
        let mut counter = 0u64;
        let now = Instant::now();

        for &arrival in arrivals {
            match buffer.offer(arrival, record(), counter + 1, now) {
                OfferOutcome::Processed => {
                    counter = arrival;
                    applied.push(arrival);
                    for action in buffer.drain_ready(counter + 1) {
                        counter = action.counter;
                        applied.push(action.counter);
                    }
                }
                OfferOutcome::Buffered | OfferOutcome::Ignored => {}
            }
        }
        applied
    }

    proptest! {
        /// For any arrival order (with duplicates), applied actions
        /// come out strictly increasing with no duplicates, and when
        /// every counter eventually arrives the whole run applies.
        #[test]
        fn ordering_invariant_holds_for_any_arrival_order(
            mut arrivals in proptest::collection::vec(1u64..=12, 1..40)
        ) {
            let applied = run_arrivals(&arrivals);
            prop_assert!(applied.windows(2).all(|w| w[0] < w[1]));

            // Completing the set forces a full drain.
            arrivals.extend(1..=12);
            let applied = run_arrivals(&arrivals);
            prop_assert_eq!(applied, (1..=12).collect::<Vec<_>>());
        }
    }

    #[test]
    fn gap_of_three_skips_and_four_does_not() {
        let now = Instant::now();

        let mut buffer = ActionBuffer::new(Duration::from_millis(500), 3);
        buffer.offer(4, record(), 1, now);
        assert!(matches!(
            buffer.gap_pass(1, false),
            GapAction::Skip { skipped: 3, .. }
        ));

        let mut buffer = ActionBuffer::new(Duration::from_millis(500), 3);
        buffer.offer(5, record(), 1, now);
        assert!(matches!(
            buffer.gap_pass(1, false),
            GapAction::RequestResync { gap: 4 }
        ));
    }

    #[test]
    fn deadline_reschedules_instead_of_stacking() {
        let mut buffer = ActionBuffer::new(Duration::from_millis(500), 3);
        let start = Instant::now();
        buffer.offer(5, record(), 1, start);
        let first = buffer.deadline().unwrap();
        buffer.offer(6, record(), 1, start + Duration::from_millis(200));
        let second = buffer.deadline().unwrap();
        assert_eq!(second, start + Duration::from_millis(700));
        assert!(second > first);
    }
}

mod catch_up_tests {
    use super::*;
    use tcg_sync::sync::plan_catch_up;

    fn game(name: &str) -> ActionRecord {
        ActionRecord::new(Side::Own, ActionKind::Game(name.into()), vec![])
    }

    #[test]
    fn counter_suffix_is_honored() {
        let incoming: Vec<_> = (0..6).map(|i| game(&format!("a{i}"))).collect();
        let plan = plan_catch_up(&incoming, 4);
        assert_eq!(plan.missing.len(), 2);
        assert!(plan.applies(0));
        assert!(plan.applies(1));
    }

    #[test]
    fn perspective_is_flipped_exactly_once() {
        let incoming = vec![ActionRecord::new(
            Side::Own,
            ActionKind::Game("move".into()),
            vec![ActionParam::Side(Side::Own), ActionParam::Text("hand".into())],
        )];
        let plan = plan_catch_up(&incoming, 0);
        assert_eq!(plan.missing[0].side, Side::Opp);
        assert_eq!(plan.missing[0].parameters[0], ActionParam::Side(Side::Opp));
        assert_eq!(
            plan.missing[0].parameters[1],
            ActionParam::Text("hand".into())
        );
    }
}

mod snapshot_tests {
    use super::*;
    use tcg_sync::game::{Card, DeckData, GameBoard, RelationshipKind, ZoneId};
    use tcg_sync::snapshot::{restore_snapshot, ActionHistory};

    fn populated_board() -> GameBoard {
        let mut board = GameBoard::new();
        board.exchange_deck_data(Side::Own, "ash".into(), DeckData::default());
        board.exchange_deck_data(Side::Opp, "gary".into(), DeckData::default());
        let active = Card::new("Blastoise", "pokemon", "blastoise.png");
        let energy = Card::new("Water Energy", "energy", "water.png");
        let active_id = active.id.clone();
        let energy_id = energy.id.clone();
        board.place_card(Side::Own, ZoneId::Active, 0, active);
        board.place_card(Side::Own, ZoneId::Bench, 0, energy);
        board.set_damage(&active_id, 20).unwrap();
        board.set_face_down(&energy_id, true).unwrap();
        board
            .link(RelationshipKind::Attachment, &active_id, &energy_id)
            .unwrap();
        board
    }

    #[test]
    fn snapshot_round_trip_is_lossless_modulo_volatile_fields() {
        let board = populated_board();
        let first = Snapshot::capture("room-1", &board, ActionHistory::default()).unwrap();

        let mut restored = GameBoard::new();
        restore_snapshot(&first, &mut restored).unwrap();
        assert_eq!(restored, board);

        // Volatile fields differ between captures; everything else
        // matches.
        let second = Snapshot::capture("room-1", &restored, ActionHistory::default()).unwrap();
        assert_ne!(second.snapshot_id, first.snapshot_id);
        assert_eq!(second.zones, first.zones);
        assert_eq!(second.relationships, first.relationships);
        assert_eq!(second.players, first.players);
    }

    #[test]
    fn every_field_is_checksummed() {
        let board = populated_board();
        let snapshot = Snapshot::capture("room-1", &board, ActionHistory::default()).unwrap();

        let mutations: Vec<Box<dyn Fn(&mut Snapshot)>> = vec![
            Box::new(|s| s.room_id.push('x')),
            Box::new(|s| s.timestamp += 1),
            Box::new(|s| s.players.own.username.push('x')),
            Box::new(|s| s.game_state.turn += 1),
            Box::new(|s| s.zones.own.clear()),
            Box::new(|s| s.relationships.clear()),
            Box::new(|s| s.visual_state.board_flipped = true),
            Box::new(|s| {
                s.action_history.opp.push(ActionRecord::new(
                    Side::Opp,
                    ActionKind::Setup,
                    vec![],
                ))
            }),
        ];
        for mutate in mutations {
            let mut tampered = snapshot.clone();
            mutate(&mut tampered);
            assert!(
                tampered.verify().is_err(),
                "mutation escaped the checksum"
            );
        }
    }

    #[test]
    fn card_ids_survive_capture_restore_capture() {
        let board = populated_board();
        let original_ids: Vec<_> = board
            .zone(Side::Own, ZoneId::Active)
            .iter()
            .map(|c| c.id.clone())
            .collect();

        let snapshot = Snapshot::capture("room-1", &board, ActionHistory::default()).unwrap();
        let mut restored = GameBoard::new();
        restore_snapshot(&snapshot, &mut restored).unwrap();

        let restored_ids: Vec<_> = restored
            .zone(Side::Own, ZoneId::Active)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(restored_ids, original_ids);
    }
}

mod resync_tests {
    use std::time::{Duration, Instant};
    use tcg_sync::sync::{PayloadStrategy, ResyncCoordinator, ResyncTrigger};

    #[test]
    fn exactly_one_terminal_transition_per_session() {
        let mut resync = ResyncCoordinator::new(
            Duration::from_secs(10),
            Duration::from_secs(15),
            50,
        );
        let now = Instant::now();

        assert!(resync.begin(ResyncTrigger::Explicit, now));
        assert!(!resync.begin(ResyncTrigger::MonitorGap, now));

        assert!(resync.complete(now + Duration::from_secs(1)).is_some());
        // Session is gone: neither terminal transition can fire again.
        assert!(resync.complete(now + Duration::from_secs(2)).is_none());
        assert!(resync.check_timeout(now + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn strategy_threshold_is_strictly_greater_than() {
        let resync = ResyncCoordinator::new(
            Duration::from_secs(10),
            Duration::from_secs(15),
            50,
        );
        assert_eq!(resync.payload_strategy(0), PayloadStrategy::ActionList);
        assert_eq!(resync.payload_strategy(50), PayloadStrategy::ActionList);
        assert_eq!(resync.payload_strategy(51), PayloadStrategy::Snapshot);
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn default_config_matches_protocol_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.gap_tolerance, 3);
        assert_eq!(config.resync_timeout_ms, 10_000);
        assert_eq!(config.min_resync_interval_ms, 15_000);
        assert_eq!(config.snapshot_threshold, 50);
        assert_eq!(config.high_latency_threshold_ms, 200);
        assert!(config.validate().is_ok());
    }
}
