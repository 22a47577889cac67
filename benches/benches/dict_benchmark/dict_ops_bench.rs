use std::{collections::HashMap, hint::black_box, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use zdict::{Dict, SipDict, SipHashType};

const SIZES: &[usize] = &[1_000, 10_000, 100_000];

fn fresh(n: usize) -> SipDict<u64, u64> {
    let mut d = Dict::with_type(SipHashType::with_seed([21; 16]));
    for i in 0..n as u64 {
        d.add(i, i).unwrap();
    }
    d
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict/insert");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("zdict", n), &n, |b, &n| {
            b.iter(|| {
                let mut d = Dict::with_type(SipHashType::with_seed([21; 16]));
                for i in 0..n as u64 {
                    d.add(black_box(i), black_box(i)).unwrap();
                }
                black_box(d.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("std_hashmap", n), &n, |b, &n| {
            b.iter(|| {
                let mut m = HashMap::new();
                for i in 0..n as u64 {
                    m.insert(black_box(i), black_box(i));
                }
                black_box(m.len())
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict/lookup");

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));

        let mut d = fresh(n);
        while d.rehash(100) {}
        let mut m: HashMap<u64, u64> = HashMap::new();
        for i in 0..n as u64 {
            m.insert(i, i);
        }

        let mut rng = StdRng::seed_from_u64(21);
        let keys: Vec<u64> = (0..n as u64).map(|_| rng.gen_range(0..n as u64)).collect();

        group.bench_with_input(BenchmarkId::new("zdict_hit", n), &n, |b, _| {
            b.iter(|| {
                let mut found = 0;
                for k in &keys {
                    if d.get(black_box(k)).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });

        group.bench_with_input(BenchmarkId::new("zdict_miss", n), &n, |b, _| {
            b.iter(|| {
                let mut found = 0;
                for k in &keys {
                    if d.get(black_box(&(k + n as u64))).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });

        group.bench_with_input(BenchmarkId::new("std_hashmap_hit", n), &n, |b, _| {
            b.iter(|| {
                let mut found = 0;
                for k in &keys {
                    if m.get(black_box(k)).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });
    }

    group.finish();
}

/// Стоимость миграции: полный перенос таблицы шагами rehash(100).
fn bench_rehash_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict/rehash");
    group.sample_size(20);

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("drain", n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let mut d = fresh(n);
                    while d.rehash(100) {}
                    d.expand(n * 4).unwrap();
                    d
                },
                |mut d| {
                    while d.rehash(100) {}
                    black_box(d.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict/scan");

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));

        let mut d = fresh(n);
        while d.rehash(100) {}

        group.bench_with_input(BenchmarkId::new("full_walk", n), &n, |b, _| {
            b.iter(|| {
                let mut visited = 0u64;
                let mut cursor = 0;
                loop {
                    cursor = d.scan(cursor, |e| {
                        visited += black_box(*e.value().unwrap_or(&0));
                    });
                    if cursor == 0 {
                        break;
                    }
                }
                black_box(visited)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup,
    bench_rehash_migration,
    bench_scan
);
criterion_main!(benches);
