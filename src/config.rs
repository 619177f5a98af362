//! Configuration module for Pyrite
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all optional values.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::KV_TABLE_NAME;
use crate::error::{PyriteError, Result};

fn default_table_name() -> String {
    KV_TABLE_NAME.to_string()
}

fn default_client_timeout_ms() -> u64 {
    60_000
}

fn default_safe_batch() -> bool {
    true
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Master server addresses the backend client connects to.
    #[serde(default)]
    pub master_addresses: Vec<String>,

    /// Name of the well-known key-value table holding the keyspace.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// RPC deadline in milliseconds applied to every backend session the
    /// dispatcher creates.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,

    /// When true, every read or write contributes its primary key to the
    /// planner's conflict analysis. When false, keys are not collected and
    /// the planner never detects conflicts, so reads and writes of one batch
    /// may flush concurrently even on overlapping keys. This is the intended
    /// relaxed mode, trading intra-batch read-your-writes for throughput.
    #[serde(default = "default_safe_batch")]
    pub safe_batch: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            master_addresses: Vec::new(),
            table_name: default_table_name(),
            client_timeout_ms: default_client_timeout_ms(),
            safe_batch: default_safe_batch(),
        }
    }
}

impl DispatcherConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PyriteError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The session RPC deadline as a [`Duration`]
    #[inline]
    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}
