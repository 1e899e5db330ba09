//! Performance benchmarks for the sync engine
//!
//! Covers the hot paths:
//! - Buffer offer/drain throughput under out-of-order arrival
//! - Catch-up planning over long histories
//! - Snapshot capture, checksum, and restoration

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tcg_sync::game::{Card, DeckData, GameBoard, ZoneId};
use tcg_sync::snapshot::{restore_snapshot, ActionHistory, Snapshot};
use tcg_sync::sync::{plan_catch_up, ActionBuffer, OfferOutcome};
use tcg_sync::{ActionKind, ActionParam, ActionRecord, Side};

fn record(i: u64) -> ActionRecord {
    ActionRecord::new(
        Side::Own,
        ActionKind::Game(format!("move{i}")),
        vec![ActionParam::Side(Side::Own), ActionParam::Number(i as f64)],
    )
}

fn bench_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("action_buffer");
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    for size in [16u64, 64, 256].iter() {
        let mut counters: Vec<u64> = (1..=*size).collect();
        counters.shuffle(&mut rng);

        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(
            BenchmarkId::new("offer_and_drain", size),
            &counters,
            |b, counters| {
                b.iter(|| {
                    let mut buffer = ActionBuffer::new(Duration::from_millis(500), 3);
                    let mut applied = 0u64;
                    let now = Instant::now();
                    for &counter in counters {
                        match buffer.offer(counter, record(counter), applied + 1, now) {
                            OfferOutcome::Processed => {
                                applied = counter;
                                applied += buffer.drain_ready(applied + 1).len() as u64;
                            }
                            _ => {}
                        }
                    }
                    black_box(applied)
                })
            },
        );
    }
    group.finish();
}

fn bench_catch_up_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("catch_up");

    for size in [50usize, 500, 2000].iter() {
        let incoming: Vec<ActionRecord> = (0..*size as u64).map(record).collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("plan", size), &incoming, |b, incoming| {
            b.iter(|| black_box(plan_catch_up(black_box(incoming), 10)))
        });
    }
    group.finish();
}

fn seeded_board(cards: usize) -> GameBoard {
    let mut board = GameBoard::new();
    board.exchange_deck_data(Side::Own, "ash".into(), DeckData::default());
    board.exchange_deck_data(Side::Opp, "gary".into(), DeckData::default());
    for i in 0..cards {
        board.place_card(
            Side::Own,
            ZoneId::Deck,
            i,
            Card::new(format!("card{i}"), "pokemon", format!("card{i}.png")),
        );
    }
    board
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for cards in [10usize, 60, 240].iter() {
        let board = seeded_board(*cards);
        let history = ActionHistory {
            own: (0..*cards as u64).map(record).collect(),
            opp: Vec::new(),
        };

        group.bench_with_input(
            BenchmarkId::new("capture_with_checksum", cards),
            &(&board, &history),
            |b, (board, history)| {
                b.iter(|| {
                    black_box(
                        Snapshot::capture("room-1", board, (*history).clone()).unwrap(),
                    )
                })
            },
        );

        let snapshot = Snapshot::capture("room-1", &board, history).unwrap();
        group.bench_with_input(
            BenchmarkId::new("verify", cards),
            &snapshot,
            |b, snapshot| b.iter(|| black_box(snapshot.verify()).unwrap()),
        );

        group.bench_with_input(
            BenchmarkId::new("restore", cards),
            &snapshot,
            |b, snapshot| {
                b.iter(|| {
                    let mut board = GameBoard::new();
                    restore_snapshot(black_box(snapshot), &mut board).unwrap();
                    black_box(board)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_buffer, bench_catch_up_planning, bench_snapshot);
criterion_main!(benches);
