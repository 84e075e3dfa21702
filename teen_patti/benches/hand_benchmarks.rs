use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use teen_patti::{
    game::{Card, Suit, argmax, compare, deal, rank, shuffled_deck, table_limit},
    room::{Phase, Room, Seat, Snapshot},
};

/// A room mid-round with `n` seated players
fn setup_room_with_players(n: usize) -> Room {
    let mut room = Room::new(1, 5, None);
    let mut deck = shuffled_deck();
    for i in 0..n {
        let (hand, rest) = deal(deck, 3).unwrap();
        deck = rest;
        let mut seat = Seat::new(i as i64 + 1, format!("player{i}"), 1_000);
        seat.hand = hand;
        seat.is_blind = i % 2 == 0;
        room.push_seat(seat);
    }
    room.phase = Phase::Betting;
    room.pot = 100 * n as i64;
    room
}

/// Benchmark ranking a single hand
fn bench_rank_single_hand(c: &mut Criterion) {
    let cards = vec![
        Card(14, Suit::Spade), // Ace
        Card(13, Suit::Spade), // King
        Card(12, Suit::Spade), // Queen (pure sequence)
    ];

    c.bench_function("rank_pure_sequence", |b| {
        b.iter(|| rank(black_box(&cards)));
    });
}

/// Benchmark ranking 100 different hands
fn bench_rank_100_hands(c: &mut Criterion) {
    let all_hands: Vec<Vec<Card>> = (0..100)
        .map(|i| {
            let base = (i % 11) as u8 + 2;
            vec![
                Card(base, Suit::Spade),
                Card(base + 1, Suit::ALL[i % 4]),
                Card(base + 2, Suit::Diamond),
            ]
        })
        .collect();

    c.bench_function("rank_100_hands", |b| {
        b.iter(|| {
            all_hands
                .iter()
                .map(|cards| rank(cards))
                .collect::<Vec<_>>()
        });
    });
}

/// Benchmark head-to-head comparison, as in a show or sideshow
fn bench_compare(c: &mut Criterion) {
    let pair = vec![Card(9, Suit::Club), Card(9, Suit::Heart), Card(4, Suit::Spade)];
    let color = vec![Card(2, Suit::Heart), Card(7, Suit::Heart), Card(11, Suit::Heart)];

    c.bench_function("compare_two_hands", |b| {
        b.iter(|| compare(black_box(&pair), black_box(&color)));
    });
}

/// Benchmark a forced showdown across a full table
fn bench_argmax_full_table(c: &mut Criterion) {
    let deck = shuffled_deck();
    let hands: Vec<&[Card]> = deck[..15].chunks(3).collect();

    c.bench_function("argmax_5_hands", |b| {
        b.iter(|| argmax(black_box(&hands)));
    });
}

/// Benchmark shuffling and dealing a full table
fn bench_shuffle_and_deal(c: &mut Criterion) {
    c.bench_function("shuffle_and_deal_5", |b| {
        b.iter(|| {
            let mut deck = shuffled_deck();
            for _ in 0..5 {
                let (_, rest) = deal(deck, 3).unwrap();
                deck = rest;
            }
            deck
        });
    });
}

fn bench_table_limit(c: &mut Criterion) {
    let balances = [1_000i64, 2_500, 400, 10_000, 750];
    c.bench_function("table_limit_5_players", |b| {
        b.iter(|| table_limit(black_box(balances)));
    });
}

/// Benchmark snapshot generation with different player counts
fn bench_snapshot_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_generation");

    for n_players in [2, 3, 4, 5].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                let room = setup_room_with_players(n);
                b.iter(|| {
                    room.seats
                        .iter()
                        .map(|seat| Snapshot::for_viewer(&room, Some(seat.user_id), 1))
                        .collect::<Vec<_>>()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rank_single_hand,
    bench_rank_100_hands,
    bench_compare,
    bench_argmax_full_table,
    bench_shuffle_and_deal,
    bench_table_limit,
    bench_snapshot_generation,
);
criterion_main!(benches);
