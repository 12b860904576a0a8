use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use failfast_collections::HashTable;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

// Prints the chain-length histogram once per load factor so regressions in
// the spread function show up next to the timings.
fn report_chains(label: &str, t: &HashTable<String, u64>) {
    let lengths = t.chain_lengths();
    let longest = lengths.iter().copied().max().unwrap_or(0);
    let mut histogram = vec![0usize; longest + 1];
    for l in &lengths {
        histogram[*l] += 1;
    }
    let empty = histogram[0];
    eprintln!(
        "{}: buckets={} len={} empty={} longest={} histogram={:?}",
        label,
        t.bucket_count(),
        t.len(),
        empty,
        longest,
        histogram
    );
}

fn bench_fill_by_load_factor(c: &mut Criterion) {
    for lf in [0.5, 0.75, 1.0] {
        let name = format!("chains::fill_100k_lf_{}", lf);
        let sample: HashTable<String, u64> = {
            let mut t = HashTable::with_capacity_and_load_factor(16, lf).unwrap();
            for (i, x) in lcg(1).take(100_000).enumerate() {
                t.insert(key(x), i as u64);
            }
            t
        };
        report_chains(&name, &sample);

        c.bench_function(&name, |b| {
            b.iter_batched(
                || HashTable::<String, u64>::with_capacity_and_load_factor(16, lf).unwrap(),
                |mut t| {
                    for (i, x) in lcg(1).take(100_000).enumerate() {
                        t.insert(key(x), i as u64);
                    }
                    black_box(t)
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_sequential_keys(c: &mut Criterion) {
    c.bench_function("chains::sequential_u64_lookup", |b| {
        let t: HashTable<u64, u64> = (0..50_000u64).map(|i| (i, i)).collect();
        let lengths = t.chain_lengths();
        eprintln!(
            "sequential u64: longest chain={}",
            lengths.iter().max().copied().unwrap_or(0)
        );
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7919) % 50_000;
            black_box(t.get(&i));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_fill_by_load_factor, bench_sequential_keys
}
criterion_main!(benches);
