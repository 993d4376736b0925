// Main entrypoint for the shardtable workload driver.

use anyhow::{bail, Context, Result};
use clap::Parser;
use shardtable::config::{Config, ConfigTrait};
use shardtable::workload::{self, Options, WorkloadTable};
use std::path::PathBuf;
use tracing::{error, info};

const CONFIG_PATH: &str = "cfg/shardtable.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/shardtable.cfg.local.yaml";

/// shardtable - drives a sharded lookup table with a concurrent workload
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,

    /// Seed for the workload's random generators
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the report and final snapshot as JSON on stdout
    #[arg(long)]
    dump: bool,
}

/// Loads the configuration and returns it with the path it came from.
/// Tries local config first, then falls back to default config.
fn load_cfg(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    if let Some(custom_path) = path {
        let cfg = Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        return Ok((cfg, custom_path));
    }

    let local = PathBuf::from(CONFIG_PATH_LOCAL);
    match Config::load(&local) {
        Ok(cfg) => Ok((cfg, local)),
        Err(_) => {
            let path = PathBuf::from(CONFIG_PATH);
            let cfg = Config::load(&path)
                .with_context(|| format!("failed to load config from {}", CONFIG_PATH))?;
            Ok((cfg, path))
        }
    }
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_ref())
        .map(|s| s.as_str())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Workers and the snapshotter are named threads; keep the name on every line.
    if cfg.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_thread_names(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).with_thread_names(true))
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (cfg, cfg_path) = load_cfg(args.cfg)?;

    // Logger needs the loaded config, so the load is reported afterwards.
    configure_logger(&cfg);
    info!(
        component = "config",
        event = "load_success",
        path = ?cfg_path,
        env = %cfg.shardtable.env,
        shards = cfg.table().shards(),
        "config loaded"
    );

    let table = WorkloadTable::from_config(&cfg).context("failed to build table")?;
    let opts = Options::from_config(cfg.workload(), args.seed);

    info!(
        component = "main",
        event = "workload_start",
        shards = table.shard_count(),
        threads = opts.threads,
        keys = opts.keys,
        ops_per_thread = opts.ops_per_thread,
        "starting workload"
    );

    let report = workload::run(&table, &opts).context("workload failed")?;
    let ops_per_sec = report.operations() as f64 / report.elapsed.as_secs_f64().max(f64::EPSILON);

    info!(
        component = "main",
        event = "workload_done",
        operations = report.operations(),
        lookups = report.lookups,
        hits = report.hits,
        upserts = report.upserts,
        removes = report.removes,
        snapshots = report.snapshots,
        largest_snapshot = report.largest_snapshot,
        final_entries = report.final_entries,
        elapsed = %humantime::format_duration(report.elapsed),
        ops_per_sec = ops_per_sec as u64,
        "workload finished"
    );

    if args.dump {
        let dump = serde_json::json!({
            "report": &report,
            "snapshot": table.snapshot(),
        });
        let out = serde_json::to_string_pretty(&dump).context("failed to encode snapshot")?;
        println!("{out}");
    }

    if report.violations > 0 {
        error!(
            component = "main",
            event = "invariant_violation",
            violations = report.violations,
            "table invariants were violated"
        );
        bail!("{} invariant violations detected", report.violations);
    }

    Ok(())
}
