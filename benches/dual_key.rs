//! Benchmarks for dual-key map operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dualkey::{DenseDualKeyMap, DualKeyMap, DualKeySet};
use std::collections::HashMap;

fn generate_pairs(rows: usize, columns: usize) -> Vec<(String, String)> {
    (0..rows)
        .flat_map(|r| (0..columns).map(move |c| (format!("product:{r:05}"), format!("store:{c:04}"))))
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for (rows, columns) in [(100, 10), (1_000, 50), (100, 1_000)] {
        let pairs = generate_pairs(rows, columns);
        let label = format!("{rows}x{columns}");

        group.bench_with_input(BenchmarkId::new("DualKeyMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut map: DualKeyMap<String, String, u64> = DualKeyMap::new();
                for (i, (r, c)) in pairs.iter().enumerate() {
                    let _ = map.insert(r.clone(), c.clone(), i as u64);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("DenseDualKeyMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut map: DenseDualKeyMap<String, String, u64> = DualKeyMap::new();
                for (i, (r, c)) in pairs.iter().enumerate() {
                    let _ = map.insert(r.clone(), c.clone(), i as u64);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("HashMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut map: HashMap<(String, String), u64> = HashMap::new();
                for (i, (r, c)) in pairs.iter().enumerate() {
                    map.insert((r.clone(), c.clone()), i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for (rows, columns) in [(1_000, 50), (100, 1_000)] {
        let pairs = generate_pairs(rows, columns);
        let label = format!("{rows}x{columns}");

        let mut trie: DualKeyMap<String, String, u64> = DualKeyMap::new();
        let mut dense: DenseDualKeyMap<String, String, u64> = DualKeyMap::new();
        let mut hash: HashMap<(String, String), u64> = HashMap::new();
        for (i, (r, c)) in pairs.iter().enumerate() {
            let _ = trie.insert(r.clone(), c.clone(), i as u64);
            let _ = dense.insert(r.clone(), c.clone(), i as u64);
            hash.insert((r.clone(), c.clone()), i as u64);
        }

        group.bench_with_input(BenchmarkId::new("DualKeyMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut sum = 0u64;
                for (r, c) in pairs {
                    sum += trie.get(r.as_str(), c.as_str()).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("DenseDualKeyMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut sum = 0u64;
                for (r, c) in pairs {
                    sum += dense.get(r.as_str(), c.as_str()).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("HashMap", &label), &pairs, |b, pairs| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in pairs {
                    sum += hash.get(key).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_set_insert(c: &mut Criterion) {
    let pairs = generate_pairs(1_000, 50);

    c.bench_function("set_insert/1000x50", |b| {
        b.iter(|| {
            let mut set: DualKeySet<String, String> = DualKeySet::new();
            for (r, c) in &pairs {
                let _ = set.insert(r.clone(), c.clone());
            }
            black_box(set)
        });
    });
}

fn bench_memory(c: &mut Criterion) {
    // Prints the footprint of each layout once, then times a full scan.
    let pairs = generate_pairs(1_000, 50);
    let mut trie: DualKeyMap<String, String, u64> = DualKeyMap::new();
    let mut dense: DenseDualKeyMap<String, String, u64> = DualKeyMap::new();
    for (i, (r, col)) in pairs.iter().enumerate() {
        let _ = trie.insert(r.clone(), col.clone(), i as u64);
        let _ = dense.insert(r.clone(), col.clone(), i as u64);
    }
    println!(
        "memory 1000x50: trie rows {} bytes, dense rows {} bytes",
        trie.memory_usage(),
        dense.memory_usage()
    );

    c.bench_function("iterate/1000x50", |b| {
        b.iter(|| black_box(trie.iter().map(|(_, _, v)| *v).sum::<u64>()));
    });
}

criterion_group!(benches, bench_insert, bench_lookup, bench_set_insert, bench_memory);
criterion_main!(benches);
