use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use segment_hash::{Gint, GintHash};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_insert_random(c: &mut Criterion) {
    c.bench_function("gint_hash_insert_random_10k", |b| {
        let keys: Vec<Gint> = lcg(1).take(10_000).map(|x| x as Gint).collect();
        b.iter_batched(
            || GintHash::new().unwrap(),
            |mut t| {
                for (i, &k) in keys.iter().enumerate() {
                    t.insert(k, i as Gint).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_aligned(c: &mut Criterion) {
    c.bench_function("gint_hash_insert_aligned_10k", |b| {
        b.iter_batched(
            || GintHash::new().unwrap(),
            |mut t| {
                // Offsets of word-aligned objects, the common case.
                for i in 0..10_000 {
                    t.insert(i * 8, i).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("gint_hash_get_hit", |b| {
        let mut t = GintHash::new().unwrap();
        let keys: Vec<Gint> = lcg(7).take(20_000).map(|x| x as Gint).collect();
        for (i, &k) in keys.iter().enumerate() {
            t.insert(k, i as Gint).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = *it.next().unwrap();
            black_box(t.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("gint_hash_get_miss", |b| {
        let mut t = GintHash::new().unwrap();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            t.insert(x as Gint, i as Gint).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // keys unlikely in the table
            black_box(t.get(miss.next().unwrap() as Gint));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_random, bench_insert_aligned, bench_get_hit, bench_get_miss
}
criterion_main!(benches);
