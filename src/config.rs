use crate::types::{Config, EngineConfig, Zone};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config = Self::from_yaml(&contents)?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents).context("Invalid config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with. Zones are checked
    /// here once so the per-frame path never has to.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for zone in &self.zones {
            if zone.points.len() < 3 {
                bail!(
                    "Zone '{}' has {} point(s); a polygon needs at least 3",
                    zone.name,
                    zone.points.len()
                );
            }
            if !names.insert(zone.name.as_str()) {
                bail!("Zone '{}' is defined more than once", zone.name);
            }
        }

        self.engine.validate()?;
        if self.output.max_id_attempts == 0 {
            bail!("output.max_id_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn build_zones(&self) -> Vec<Zone> {
        self.zones.iter().map(Zone::from_config).collect()
    }
}

impl EngineConfig {
    /// Bounds the aggregation engine relies on. Checked by `Config::validate`
    /// and again by `AggregationEngine::new` for configs built in code.
    pub fn validate(&self) -> Result<()> {
        if !self.movement_window_seconds.is_finite() || self.movement_window_seconds <= 0.0 {
            bail!("movement_window_seconds must be positive");
        }
        if self.max_expected_persons == 0 {
            bail!("max_expected_persons must be at least 1");
        }
        if self.reconciliation_interval_frames == 0 {
            bail!("reconciliation_interval_frames must be at least 1");
        }
        if self.position_history_len == 0 {
            bail!("position_history_len must be at least 1");
        }
        Ok(())
    }
}
