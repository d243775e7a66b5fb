use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use sport_tracker::db::codec;
use sport_tracker::models::{aggregate, Collection, UserRecord};
use std::hint::black_box;

/// A document of `users` records shaped like real browser saves.
fn build_collection(users: usize) -> Collection {
    let mut collection = Collection::new();
    for i in 0..users {
        let history: Vec<_> = (0..30)
            .map(|d| json!({ "date": format!("2025-01-{:02}", d + 1), "success": ((d + i) % 3 != 0) }))
            .collect();
        let pushups = (i % 50) as f64;
        let squats = (i % 30) as f64 * 1.5;
        let record: UserRecord = serde_json::from_value(json!({
            "username": format!("user{:04}", i),
            "level": "intermediate",
            "exercises": ["pushups", "squats", "plank"],
            "targets": { "pushups": pushups, "squats": squats, "plank": 60 },
            "streak": i % 14,
            "totalDays": 30,
            "history": history
        }))
        .expect("Failed to build record");
        collection.upsert(record, "2025-01-31T00:00:00.000Z");
    }
    collection
}

fn benchmark_leaderboard(c: &mut Criterion) {
    let collection = build_collection(1000);
    let encoded = codec::encode(&collection).expect("Failed to encode");

    let mut group = c.benchmark_group("leaderboard");

    group.bench_function("aggregate_1000_users", |b| {
        b.iter(|| aggregate(black_box(&collection)))
    });

    group.bench_function("decode_and_aggregate_1000_users", |b| {
        b.iter(|| {
            let decoded = codec::decode(Some(black_box(encoded.as_slice())));
            aggregate(&decoded.collection)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_leaderboard);
criterion_main!(benches);
