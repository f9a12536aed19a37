use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config/tracker.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum retained balloon track points before the oldest are dropped.
    pub track_max_points: usize,
    /// Maximum retained altitude chart points.
    pub chart_max_points: usize,
    /// No frame for this long means the link is stale.
    pub stale_threshold_ms: u64,
    /// Staleness poll cadence.
    pub poll_interval_ms: u64,
    /// Fix pairs closer together than this are too noisy for a speed estimate.
    pub speed_min_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_max_points: 500,
            chart_max_points: 100,
            stale_threshold_ms: 60_000,
            poll_interval_ms: 15_000,
            speed_min_interval_ms: 500,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("STRATOTRACK_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

pub fn load_config() -> anyhow::Result<TrackerConfig> {
    let path = config_path();
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {path:?}: {e}"))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Config file is optional; a missing or broken one falls back to defaults.
pub fn load_or_default() -> TrackerConfig {
    match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("using default tracker config: {e}");
            TrackerConfig::default()
        }
    }
}
