//! Engine tuning knobs.
//!
//! Defines the pause tier table and end-of-track tolerance with defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tiered inter-item pause table keyed on the finished item's duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseTiers {
    /// Durations below this use the short pause (ms).
    pub short_below_ms: u64,
    /// Durations below this (and at/above the short threshold) use the medium pause (ms).
    pub long_below_ms: u64,
    /// Pause after short items (ms).
    pub short_pause_ms: u64,
    /// Pause after medium items (ms).
    pub medium_pause_ms: u64,
    /// Pause after long items (ms).
    pub long_pause_ms: u64,
}

impl Default for PauseTiers {
    fn default() -> Self {
        Self {
            short_below_ms: 20_000,
            long_below_ms: 90_000,
            short_pause_ms: 1_500,
            medium_pause_ms: 3_000,
            long_pause_ms: 5_000,
        }
    }
}

/// Engine configuration loaded from TOML or built from defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Inter-item pause tiers.
    #[serde(default)]
    pub pause: PauseTiers,
    /// How close to the reported duration a stopped position counts as
    /// end-of-track (ms).
    #[serde(default = "default_end_tolerance_ms")]
    pub end_tolerance_ms: u64,
}

fn default_end_tolerance_ms() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pause: PauseTiers::default(),
            end_tolerance_ms: default_end_tolerance_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<EngineConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.end_tolerance_ms, 300);
        assert_eq!(cfg.pause.short_below_ms, 20_000);
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let cfg: EngineConfig = toml::from_str("end_tolerance_ms = 500").unwrap();
        assert_eq!(cfg.end_tolerance_ms, 500);
        assert_eq!(cfg.pause, PauseTiers::default());
    }

    #[test]
    fn pause_table_parses_from_toml() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            [pause]
            short_below_ms = 10000
            long_below_ms = 60000
            short_pause_ms = 1000
            medium_pause_ms = 2000
            long_pause_ms = 4000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pause.short_below_ms, 10_000);
        assert_eq!(cfg.pause.long_pause_ms, 4_000);
    }
}
