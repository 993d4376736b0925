// Configuration loading and management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::storage::DEFAULT_SHARDS;

mod test_config;
pub use test_config::new_test_config;

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
pub const TEST: &str = "test";

const DEFAULT_KEYS: u64 = 10_000;
const DEFAULT_OPS_PER_THREAD: u64 = 100_000;
const DEFAULT_WRITE_RATIO: f64 = 0.2;
const DEFAULT_REMOVE_RATIO: f64 = 0.05;
const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(rename = "shardtable")]
    pub shardtable: SettingsBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub table: Option<TableSection>,
    pub workload: Option<Workload>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableSection {
    pub shards: Option<usize>,
}

impl TableSection {
    /// Configured shard count, or `DEFAULT_SHARDS`.
    pub fn shards(&self) -> usize {
        self.shards.unwrap_or(DEFAULT_SHARDS)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Workload {
    pub threads: Option<usize>,
    pub keys: Option<u64>,
    #[serde(rename = "ops_per_thread")]
    pub ops_per_thread: Option<u64>,
    #[serde(rename = "write_ratio")]
    pub write_ratio: Option<f64>,
    #[serde(rename = "remove_ratio")]
    pub remove_ratio: Option<f64>,
    #[serde(rename = "snapshot_interval", default, with = "humantime_serde")]
    pub snapshot_interval: Option<Duration>,
}

impl Workload {
    /// Number of worker threads; 0 or unset means one per logical CPU.
    pub fn threads(&self) -> usize {
        match self.threads {
            Some(n) if n > 0 => n,
            _ => num_cpus::get(),
        }
    }

    pub fn keys(&self) -> u64 {
        self.keys.unwrap_or(DEFAULT_KEYS)
    }

    pub fn ops_per_thread(&self) -> u64 {
        self.ops_per_thread.unwrap_or(DEFAULT_OPS_PER_THREAD)
    }

    pub fn write_ratio(&self) -> f64 {
        self.write_ratio.unwrap_or(DEFAULT_WRITE_RATIO)
    }

    pub fn remove_ratio(&self) -> f64 {
        self.remove_ratio.unwrap_or(DEFAULT_REMOVE_RATIO)
    }

    pub fn snapshot_interval(&self) -> Duration {
        self.snapshot_interval.unwrap_or(DEFAULT_SNAPSHOT_INTERVAL)
    }
}

static DEFAULT_TABLE: TableSection = TableSection { shards: None };

static DEFAULT_WORKLOAD: Workload = Workload {
    threads: None,
    keys: None,
    ops_per_thread: None,
    write_ratio: None,
    remove_ratio: None,
    snapshot_interval: None,
};

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    fn is_dev(&self) -> bool;
    fn is_test(&self) -> bool;
    fn table(&self) -> &TableSection;
    fn workload(&self) -> &Workload;
}

// Config type alias for convenience
pub type Config = Settings;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.shardtable.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.shardtable.env == PROD
    }

    fn is_dev(&self) -> bool {
        self.shardtable.env == DEV
    }

    fn is_test(&self) -> bool {
        self.shardtable.env == TEST
    }

    fn table(&self) -> &TableSection {
        self.shardtable.table.as_ref().unwrap_or(&DEFAULT_TABLE)
    }

    fn workload(&self) -> &Workload {
        self.shardtable.workload.as_ref().unwrap_or(&DEFAULT_WORKLOAD)
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::from_yaml(&data).with_context(|| format!("load config from {:?}", abs_path))
    }

    /// Parses and validates configuration from YAML text.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data).context("unmarshal yaml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.table().shards == Some(0) {
            bail!("table.shards must be positive");
        }

        let workload = self.workload();
        let (write, remove) = (workload.write_ratio(), workload.remove_ratio());
        if !(0.0..=1.0).contains(&write) || !(0.0..=1.0).contains(&remove) {
            bail!("workload ratios must be within [0, 1], got write={write} remove={remove}");
        }
        if write + remove > 1.0 {
            bail!("workload.write_ratio + workload.remove_ratio must not exceed 1, got {}", write + remove);
        }
        if workload.keys() == 0 {
            bail!("workload.keys must be positive");
        }
        Ok(())
    }
}
