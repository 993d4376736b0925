//! Benchmarks of shardtable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shardtable::Table;

criterion_main!(single_threaded, multi_threaded, snapshot);

const KEYS: u64 = 4_096;
const OPS_PER_THREAD: usize = 20_000;

fn filled_table(shards: usize) -> Table<u64, u64> {
    let table = Table::new(shards).expect("positive shard count");
    for k in 0..KEYS {
        table.upsert(k, k);
    }
    table
}

criterion_group!(single_threaded, lookup_hit, lookup_miss, upsert_existing);

fn lookup_hit(c: &mut Criterion) {
    let table = filled_table(64);
    let mut k = 0u64;
    c.bench_function("lookup hit", |b| {
        b.iter(|| {
            k = (k + 1) % KEYS;
            black_box(table.lookup(&k, 0))
        })
    });
}

fn lookup_miss(c: &mut Criterion) {
    let table = filled_table(64);
    c.bench_function("lookup miss", |b| b.iter(|| black_box(table.lookup(&(KEYS + 1), 0))));
}

fn upsert_existing(c: &mut Criterion) {
    let table = filled_table(64);
    let mut k = 0u64;
    c.bench_function("upsert existing", |b| {
        b.iter(|| {
            k = (k + 1) % KEYS;
            table.upsert(k, k)
        })
    });
}

criterion_group!(multi_threaded, read_heavy_by_shards);

//  90% lookups / 10% upserts from 4 threads, sharded table against a single global lock.
fn read_heavy_by_shards(c: &mut Criterion) {
    const THREADS: usize = 4;

    let mut group = c.benchmark_group("read heavy 4T");

    for shards in [1usize, 19, 64, 256] {
        let table = filled_table(shards);
        group.bench_with_input(BenchmarkId::new("table", shards), &table, |b, table| {
            b.iter(|| {
                thread::scope(|s| {
                    for t in 0..THREADS {
                        s.spawn(move || {
                            let mut rng = StdRng::seed_from_u64(t as u64);
                            for _ in 0..OPS_PER_THREAD {
                                let k = rng.gen_range(0..KEYS);
                                if rng.gen_bool(0.1) {
                                    table.upsert(k, k);
                                } else {
                                    black_box(table.lookup(&k, 0));
                                }
                            }
                        });
                    }
                });
            })
        });
    }

    let global: Mutex<HashMap<u64, u64>> = Mutex::new((0..KEYS).map(|k| (k, k)).collect());
    group.bench_function("global mutex", |b| {
        b.iter(|| {
            thread::scope(|s| {
                for t in 0..THREADS {
                    let global = &global;
                    s.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(t as u64);
                        for _ in 0..OPS_PER_THREAD {
                            let k = rng.gen_range(0..KEYS);
                            let mut map = global.lock().expect("not poisoned");
                            if rng.gen_bool(0.1) {
                                map.insert(k, k);
                            } else {
                                black_box(map.get(&k).copied().unwrap_or(0));
                            }
                        }
                    });
                }
            });
        })
    });

    group.finish();
}

criterion_group!(snapshot, snapshot_by_shards);

fn snapshot_by_shards(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for shards in [1usize, 19, 256] {
        let table = filled_table(shards);
        group.bench_with_input(BenchmarkId::from_parameter(shards), &table, |b, table| {
            b.iter(|| black_box(table.snapshot()))
        });
    }

    group.finish();
}
