//! Runtime configuration for the CLI and the monitor loop.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunemarkError};
use crate::snapshot::DEFAULT_SNAPSHOT_FILE;

/// Tuner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Path of the single-slot safety snapshot file
    pub snapshot_path: String,
    /// Telemetry poll interval for the monitor loop
    pub poll_interval_secs: u64,
    /// Ping probe target
    pub ping_host: String,
    /// Ping probe timeout
    pub ping_timeout_secs: u64,
    /// Rows shown in the top-process listing
    pub top_process_limit: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: DEFAULT_SNAPSHOT_FILE.into(),
            poll_interval_secs: 3,
            ping_host: "8.8.8.8".into(),
            ping_timeout_secs: 2,
            top_process_limit: 20,
        }
    }
}

impl TunerConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TunemarkError::Configuration(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TunemarkError::Configuration(format!("TOML parse error: {}", e)))
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# Tunemark configuration
snapshot_path = "tunemark_snapshot.json"
poll_interval_secs = 3
ping_host = "8.8.8.8"
ping_timeout_secs = 2
top_process_limit = 20
"#
        .into()
    }
}
