use crate::core::{BindError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const MIN_AUTOSAVE_INTERVAL: Duration = Duration::from_millis(10);

/// Where the host process is running.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostEnvironment {
    #[default]
    Production,
    /// Test servers, local sessions, CI.
    NonProduction,
}

/// Service-wide options.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```
/// use bindstore::DataServiceConfig;
///
/// let config = DataServiceConfig::from_json_str(r#"{"autosave_interval_secs": 60}"#).unwrap();
/// assert!(config.autosave_enabled);
/// assert_eq!(config.autosave_interval().as_secs(), 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataServiceConfig {
    pub environment: HostEnvironment,

    /// When false, bindings never write outside production.
    pub save_in_non_production: bool,

    pub autosave_enabled: bool,

    /// Seconds between autosave sweeps.
    pub autosave_interval_secs: f64,
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            environment: HostEnvironment::Production,
            save_in_non_production: true,
            autosave_enabled: true,
            autosave_interval_secs: 360.0,
        }
    }
}

impl DataServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(mut self, environment: HostEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn save_in_non_production(mut self, enabled: bool) -> Self {
        self.save_in_non_production = enabled;
        self
    }

    pub fn autosave_enabled(mut self, enabled: bool) -> Self {
        self.autosave_enabled = enabled;
        self
    }

    pub fn autosave_interval(&self) -> Duration {
        if !self.autosave_interval_secs.is_finite() || self.autosave_interval_secs <= 0.0 {
            return MIN_AUTOSAVE_INTERVAL;
        }
        Duration::from_secs_f64(self.autosave_interval_secs).max(MIN_AUTOSAVE_INTERVAL)
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval_secs = interval.as_secs_f64();
        self
    }

    /// Whether bindings created under this config may write at all.
    pub fn saving_allowed(&self) -> bool {
        self.environment == HostEnvironment::Production || self.save_in_non_production
    }

    pub fn validate(&self) -> Result<()> {
        if !self.autosave_interval_secs.is_finite() || self.autosave_interval_secs <= 0.0 {
            return Err(BindError::Config(format!(
                "autosave_interval_secs must be a positive number, got {}",
                self.autosave_interval_secs
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| BindError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|err| {
            BindError::Config(format!("Failed to read '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = DataServiceConfig::default();
        assert!(config.save_in_non_production);
        assert!(config.autosave_enabled);
        assert_eq!(config.autosave_interval(), Duration::from_secs(360));
        assert!(config.saving_allowed());
    }

    #[test]
    fn non_production_can_opt_out_of_saving() {
        let config = DataServiceConfig::new()
            .environment(HostEnvironment::NonProduction)
            .save_in_non_production(false);
        assert!(!config.saving_allowed());

        let production = config.clone().environment(HostEnvironment::Production);
        assert!(production.saving_allowed());
    }

    #[test]
    fn tiny_intervals_are_clamped() {
        let config = DataServiceConfig::new().with_autosave_interval(Duration::from_micros(5));
        assert_eq!(config.autosave_interval(), MIN_AUTOSAVE_INTERVAL);
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let err = DataServiceConfig::from_json_str(r#"{"autosave_interval_secs": -1}"#).unwrap_err();
        assert!(matches!(err, BindError::Config(_)));
    }

    #[test]
    fn environment_parses_snake_case() {
        let config = DataServiceConfig::from_json_str(
            r#"{"environment": "non_production", "save_in_non_production": false}"#,
        )
        .unwrap();
        assert_eq!(config.environment, HostEnvironment::NonProduction);
        assert!(!config.saving_allowed());
    }
}
