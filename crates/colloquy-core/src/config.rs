//! Application configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_title_max_chars() -> usize {
    50
}

fn default_responder_latency_ms() -> u64 {
    2000
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Root of `config.toml`. Every field has a default, so an empty file is a
/// valid configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Overrides the platform data directory (where `sessions/` lives)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Maximum characters in a derived session title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    /// Delay before the simulated responder replies
    #[serde(default = "default_responder_latency_ms")]
    pub responder_latency_ms: u64,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            title_max_chars: default_title_max_chars(),
            responder_latency_ms: default_responder_latency_ms(),
            log_filter: default_log_filter(),
        }
    }
}
