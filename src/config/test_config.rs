use super::{Config, SettingsBox};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        shardtable: SettingsBox {
            env: super::TEST.to_string(),
            logs: Some(super::Logs {
                level: Some("debug".to_string()),
            }),
            table: Some(super::TableSection { shards: None }),
            workload: Some(super::Workload {
                threads: Some(4),
                keys: Some(256),
                ops_per_thread: Some(2_000),
                write_ratio: Some(0.3),
                remove_ratio: Some(0.1),
                snapshot_interval: Some(Duration::from_millis(1)),
            }),
        },
    }
}
