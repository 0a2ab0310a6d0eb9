//! Engine configuration
//!
//! All tunables for the queue engine live here. Values are TOML-loadable so
//! the hosting service can ship a config file, and every field has a default
//! suitable for a single-hospital deployment.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration for the queue engine.
///
/// Deserializable from TOML; missing fields fall back to defaults, so a
/// config file only needs to name the values it overrides.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum time a command waits to enter its hospital's serialization
    /// domain before failing with `ActorBusyTimeout` (milliseconds).
    pub command_timeout_ms: u64,

    /// Cadence of the background statistics refresh (seconds). Wait times
    /// grow with elapsed time, so statistics are republished even when no
    /// command has run.
    pub stats_refresh_secs: u64,

    /// Fixed overhead added to every wait estimate (minutes) covering triage
    /// and room turnover.
    pub triage_overhead_minutes: u32,

    /// Maximum completions retained per specialty for the rolling
    /// service-time average.
    pub service_window_completions: usize,

    /// Maximum age of a completion sample (days); older samples are pruned
    /// even if the window is not full.
    pub service_window_days: i64,

    /// Minimum samples a specialty needs before its own average is used;
    /// below this the estimator falls back to the cross-specialty average.
    pub min_specialty_samples: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 5_000,
            stats_refresh_secs: 30,
            triage_overhead_minutes: 5,
            service_window_completions: 50,
            service_window_days: 7,
            min_specialty_samples: 5,
        }
    }
}

impl QueueConfig {
    /// Serialization-domain acquisition timeout as a `Duration`.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Background statistics refresh interval as a `Duration`.
    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats_refresh_secs)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load configuration from a TOML file.
    pub async fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_toml_str(&contents)?)
    }
}
