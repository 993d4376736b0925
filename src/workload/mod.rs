// Package workload drives a table with a concurrent mix of lookups, upserts,
// removals and periodic snapshots, checking the table's invariants as it goes.

pub mod counters;


use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Workload;
use crate::storage::Table;

use self::counters::Counters;

/// Table type exercised by the workload.
pub type WorkloadTable = Table<u64, String>;

/// Resolved workload parameters.
#[derive(Debug, Clone)]
pub struct Options {
    pub threads: usize,
    pub keys: u64,
    pub ops_per_thread: u64,
    pub write_ratio: f64,
    pub remove_ratio: f64,
    pub snapshot_interval: Duration,
    pub seed: u64,
}

impl Options {
    /// Resolves the configured workload, filling in defaults.
    pub fn from_config(cfg: &Workload, seed: u64) -> Self {
        Self {
            threads: cfg.threads(),
            keys: cfg.keys(),
            ops_per_thread: cfg.ops_per_thread(),
            write_ratio: cfg.write_ratio(),
            remove_ratio: cfg.remove_ratio(),
            snapshot_interval: cfg.snapshot_interval(),
            seed,
        }
    }
}

/// Outcome of a workload run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub lookups: u64,
    pub hits: u64,
    pub upserts: u64,
    pub removes: u64,
    pub snapshots: u64,
    pub largest_snapshot: usize,
    pub final_entries: usize,
    pub violations: u64,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl Report {
    /// Total number of single-key operations performed.
    pub fn operations(&self) -> u64 {
        self.lookups + self.upserts + self.removes
    }
}

/// Builds the value stored by a worker: the key followed by a per-worker version.
///
/// Embedding the key lets snapshots detect a value stored under the wrong key.
pub fn value_for(key: u64, worker: usize, version: u64) -> String {
    format!("{key}:{worker}:{version}")
}

fn value_matches_key(key: u64, value: &str) -> bool {
    value
        .split_once(':')
        .and_then(|(k, _)| k.parse::<u64>().ok())
        == Some(key)
}

/// Stop flag the snapshot thread sleeps on between snapshots.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    /// Waits up to `interval`. Returns true once `stop` has been called.
    fn wait(&self, interval: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.cond.wait_for(&mut stopped, interval);
        }
        *stopped
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }
}

/// Runs the workload against `table` and returns once every worker is done.
///
/// Fails if `opts` describe an empty key space or a thread cannot be spawned.
pub fn run(table: &WorkloadTable, opts: &Options) -> Result<Report> {
    ensure!(opts.keys > 0, "workload key space must not be empty");
    ensure!(
        opts.write_ratio >= 0.0 && opts.remove_ratio >= 0.0 && opts.write_ratio + opts.remove_ratio <= 1.0,
        "workload ratios must be non-negative and sum to at most 1, got write={} remove={}",
        opts.write_ratio,
        opts.remove_ratio
    );

    let counters = Counters::new();
    let stop = StopSignal::default();
    let started = Instant::now();

    debug!(
        component = "workload",
        event = "started",
        threads = opts.threads,
        keys = opts.keys,
        ops_per_thread = opts.ops_per_thread,
        shards = table.shard_count(),
        "workload started"
    );

    thread::scope(|s| -> Result<()> {
        let snapshotter = thread::Builder::new()
            .name("snapshotter".to_string())
            .spawn_scoped(s, || loop {
                check_snapshot(table, &counters);
                if stop.wait(opts.snapshot_interval) {
                    break;
                }
            })
            .context("spawn snapshot thread")?;

        let mut workers = Vec::with_capacity(opts.threads);
        let mut spawn_err = None;
        for worker in 0..opts.threads {
            let counters = &counters;
            match thread::Builder::new()
                .name(format!("worker-{worker}"))
                .spawn_scoped(s, move || run_worker(table, opts, worker, counters))
            {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    spawn_err = Some(err);
                    break;
                }
            }
        }

        for handle in workers {
            if handle.join().is_err() {
                warn!(component = "workload", event = "worker_panicked", "workload worker panicked");
                counters.add_violations(1);
            }
        }
        stop.stop();
        if snapshotter.join().is_err() {
            warn!(component = "workload", event = "snapshotter_panicked", "snapshot thread panicked");
            counters.add_violations(1);
        }

        match spawn_err {
            Some(err) => Err(err).context("spawn workload worker"),
            None => Ok(()),
        }
    })?;

    // One last snapshot once the table is quiescent.
    check_snapshot(table, &counters);
    let final_entries = table.len();

    Ok(Report {
        lookups: counters.lookups.load(Ordering::Relaxed),
        hits: counters.hits.load(Ordering::Relaxed),
        upserts: counters.upserts.load(Ordering::Relaxed),
        removes: counters.removes.load(Ordering::Relaxed),
        snapshots: counters.snapshots.load(Ordering::Relaxed),
        largest_snapshot: counters.largest_snapshot.load(Ordering::Relaxed),
        final_entries,
        violations: counters.violations.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    })
}

fn run_worker(table: &WorkloadTable, opts: &Options, worker: usize, counters: &Counters) {
    let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(worker as u64));
    let (mut lookups, mut hits, mut upserts, mut removes) = (0u64, 0u64, 0u64, 0u64);

    for version in 0..opts.ops_per_thread {
        let key = rng.gen_range(0..opts.keys);
        let roll: f64 = rng.gen();

        if roll < opts.write_ratio {
            table.upsert(key, value_for(key, worker, version));
            upserts += 1;
        } else if roll < opts.write_ratio + opts.remove_ratio {
            table.remove(&key);
            removes += 1;
        } else {
            if let Some(value) = table.get(&key) {
                if !value_matches_key(key, &value) {
                    counters.add_violations(1);
                }
                hits += 1;
            }
            lookups += 1;
        }
    }

    counters.lookups.fetch_add(lookups, Ordering::Relaxed);
    counters.hits.fetch_add(hits, Ordering::Relaxed);
    counters.upserts.fetch_add(upserts, Ordering::Relaxed);
    counters.removes.fetch_add(removes, Ordering::Relaxed);
}

/// Takes a snapshot and checks it: every value must belong to its key, and
/// every key must live in the shard it routes to. Violations go to `counters`.
fn check_snapshot(table: &WorkloadTable, counters: &Counters) {
    let snapshot = table.snapshot();
    let mismatched = snapshot
        .iter()
        .filter(|(key, value)| !value_matches_key(**key, value))
        .count() as u64;

    if mismatched > 0 {
        warn!(
            component = "workload",
            event = "snapshot_violation",
            mismatched,
            entries = snapshot.len(),
            "snapshot holds values stored under the wrong key"
        );
    }

    let (_, misplaced) = audit_routing(table);
    counters.add_violations(mismatched + misplaced);
    counters.add_snapshot(snapshot.len());
}

/// Checks, with every shard locked, that each stored key lives in the shard it
/// routes to. Returns the number of entries and the number of misplaced keys.
pub fn audit_routing(table: &WorkloadTable) -> (usize, u64) {
    let guard = table.lock_all();
    let mut misplaced = 0u64;

    for (idx, data) in guard.shards() {
        for (key, _) in data.iter() {
            if table.shard_index(key) != idx {
                misplaced += 1;
            }
        }
    }

    if misplaced > 0 {
        warn!(
            component = "workload",
            event = "routing_violation",
            misplaced,
            shards = guard.shard_count(),
            "keys found outside of their shard"
        );
    }
    (guard.len(), misplaced)
}
