use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use failfast_collections::{DynamicArray, HashTable};
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

fn bench_array_push(c: &mut Criterion) {
    c.bench_function("dynamic_array_push_10k", |b| {
        b.iter_batched(
            || DynamicArray::<u64>::new(),
            |mut a| {
                for x in lcg(1).take(10_000) {
                    a.push(x);
                }
                black_box(a)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_array_front_insert(c: &mut Criterion) {
    c.bench_function("dynamic_array_insert_front_1k", |b| {
        b.iter_batched(
            || DynamicArray::<u64>::new(),
            |mut a| {
                for x in lcg(3).take(1_000) {
                    let _ = a.insert(0, x);
                }
                black_box(a)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_array_cursor_filter(c: &mut Criterion) {
    c.bench_function("dynamic_array_cursor_remove_half", |b| {
        let source: DynamicArray<u64> = lcg(5).take(5_000).collect();
        b.iter_batched(
            || source.clone(),
            |mut a| {
                let mut cursor = a.cursor();
                loop {
                    let odd = match cursor.next(&a) {
                        Ok(Some(x)) => x & 1 == 1,
                        _ => break,
                    };
                    if odd {
                        let _ = cursor.remove(&mut a);
                    }
                }
                black_box(a)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_table_insert(c: &mut Criterion) {
    c.bench_function("hash_table_insert_10k", |b| {
        b.iter_batched(
            || HashTable::<String, u64>::new(),
            |mut t| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    t.insert(key(x), i as u64);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_table_get_hit(c: &mut Criterion) {
    c.bench_function("hash_table_get_hit", |b| {
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        let t: HashTable<String, u64> = keys
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, k)| (k, i as u64))
            .collect();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(t.get(k));
        })
    });
}

fn bench_table_get_miss(c: &mut Criterion) {
    c.bench_function("hash_table_get_miss", |b| {
        let t: HashTable<String, u64> = lcg(11)
            .take(10_000)
            .enumerate()
            .map(|(i, x)| (key(x), i as u64))
            .collect();
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in table
            let k = key(miss.next().unwrap());
            black_box(t.get(&k));
        })
    });
}

fn bench_table_cursor_walk(c: &mut Criterion) {
    c.bench_function("hash_table_cursor_walk_10k", |b| {
        let t: HashTable<u64, u64> = lcg(13).take(10_000).map(|x| (x, x)).collect();
        b.iter(|| {
            let mut cursor = t.entries_cursor();
            let mut sum = 0u64;
            while let Ok(Some((_, v))) = cursor.next(&t) {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
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
    targets = bench_array_push, bench_array_front_insert, bench_array_cursor_filter,
        bench_table_insert, bench_table_get_hit, bench_table_get_miss, bench_table_cursor_walk
}
criterion_main!(benches);
