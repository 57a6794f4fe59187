//! Agent configuration
//!
//! Layered with the `config` crate: an optional TOML file, then `SURF_*`
//! environment variables on top (`__` separates nested keys, e.g.
//! `SURF_PROVIDERS__TIMEOUT_SECS=5`).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use surf_lib::provider::OpenMeteoConfig;
use surf_lib::{AggregatorConfig, ScoringConfig, Spot, TrendConfig};

/// Config file used when `SURF_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "surf-agent.toml";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name attached to structured events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between background refresh cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Maximum jitter added to each refresh interval, in seconds
    #[serde(default = "default_refresh_jitter")]
    pub refresh_jitter_secs: u64,

    /// Lifetime of cached conditions in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub providers: OpenMeteoConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub aggregator: AggregatorConfig,

    #[serde(default)]
    pub trend: TrendConfig,

    #[serde(default)]
    pub spots: Vec<Spot>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "surf-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_refresh_interval() -> u64 {
    600
}

fn default_refresh_jitter() -> u64 {
    15
}

fn default_cache_ttl() -> u64 {
    900
}

impl AgentConfig {
    /// Load configuration from the file named by `SURF_CONFIG` and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("SURF_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load configuration from a specific file (if it exists) and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("SURF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("Invalid agent configuration")?;
        agent.validate()?;
        Ok(agent)
    }

    /// Reject spot lists the pipeline cannot serve
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spot in &self.spots {
            if spot.id.trim().is_empty() {
                bail!("Spot '{}' has an empty id", spot.name);
            }
            if !seen.insert(spot.id.as_str()) {
                bail!("Duplicate spot id '{}'", spot.id);
            }
            if !spot.profile.wave_height.is_valid() || !spot.profile.wave_period.is_valid() {
                bail!("Spot '{}' has an invalid height or period band", spot.id);
            }
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use surf_lib::Compass;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            tokio_test::assert_ok!(AgentConfig::load_from(&dir.path().join("absent.toml")));

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.refresh_interval_secs, 600);
        assert_eq!(config.cache_ttl_secs, 900);
        assert_eq!(config.providers.timeout_secs, 10);
        assert_eq!(config.trend.threshold, 8.0);
        assert!(config.spots.is_empty());
    }

    #[test]
    fn test_loads_spots_and_overrides() {
        let file = write_config(
            r#"
instance_name = "north-shore"
api_port = 9100

[scoring.thresholds]
epic = 90

[providers]
timeout_secs = 4

[[spots]]
id = "pipeline"
name = "Banzai Pipeline"
latitude = 21.665
longitude = -158.053
utc_offset_minutes = -600

[spots.profile]
wave_height = { min = 1.0, ideal = 2.0, max = 4.0 }
wave_period = { min = 10.0, ideal = 14.0, max = 18.0 }
offshore_wind = ["SE", "E"]
best_swell = ["NW", "W"]
"#,
        );

        let config = AgentConfig::load_from(file.path()).unwrap();
        assert_eq!(config.instance_name, "north-shore");
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.providers.timeout_secs, 4);
        assert_eq!(config.scoring.thresholds.epic, 90);
        assert_eq!(config.scoring.thresholds.good, 60);

        assert_eq!(config.spots.len(), 1);
        let spot = &config.spots[0];
        assert_eq!(spot.utc_offset_minutes, -600);
        assert_eq!(spot.profile.wave_height.ideal, 2.0);
        assert!(spot.profile.is_offshore(Compass::SE));
        assert!(spot.profile.is_best_swell(Compass::NW));
    }

    #[test]
    fn test_duplicate_spot_ids_rejected() {
        let file = write_config(
            r#"
[[spots]]
id = "rincon"
name = "Rincon"
latitude = 34.37
longitude = -119.48

[[spots]]
id = "rincon"
name = "Rincon again"
latitude = 34.37
longitude = -119.48
"#,
        );

        let err = AgentConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate spot id"));
    }

    #[test]
    fn test_invalid_band_rejected() {
        let file = write_config(
            r#"
[[spots]]
id = "backwards"
name = "Backwards"
latitude = 0.0
longitude = 0.0

[spots.profile]
wave_height = { min = 2.0, ideal = 1.0, max = 3.0 }
wave_period = { min = 8.0, ideal = 12.0, max = 16.0 }
"#,
        );

        let err = AgentConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid height or period band"));
    }
}
