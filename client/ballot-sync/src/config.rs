//! Synchronizer settings and the TOML loader shared by the client binaries.
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

const fn default_block_poll_interval_ms() -> u64 {
    4_000
}

const fn default_soft_warning_after_failures() -> u32 {
    3
}

/// Synchronizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// How often the node is asked for a new block.
    #[serde(default = "default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,
    /// Number of consecutive failed cycles after which a warning is shown.
    #[serde(default = "default_soft_warning_after_failures")]
    pub soft_warning_after_failures: u32,
}

impl SyncConfig {
    /// Block polling interval as a [`Duration`].
    pub fn block_poll_interval(&self) -> Duration {
        Duration::from_millis(self.block_poll_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            block_poll_interval_ms: default_block_poll_interval_ms(),
            soft_warning_after_failures: default_soft_warning_after_failures(),
        }
    }
}

/// Reads a TOML file and deserializes it into `R`.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let mut contents = String::new();
    {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    }

    let result: R = toml::from_str(&contents)?;

    Ok(result)
}
