//! Engine settings: provider timeout, worker count, regional cache TTL and the
//! retry policy. Read from the `[engine]` table of the calibration file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use pulsecast_core::config::MAX_TTL_SECS;
use pulsecast_core::ConfigError;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Bound on every individual provider call.
    pub provider_timeout_ms: u64,
    /// Lifetime of cached regional aggregates.
    pub regional_ttl_secs: u64,
    /// Size of the private regeneration thread pool.
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 5_000,
            regional_ttl_secs: 300,
            workers: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// The only table this crate reads; everything else belongs to the calibration.
#[derive(Debug, Default, Serialize, Deserialize)]
struct EngineFile {
    #[serde(default)]
    engine: EngineSettings,
}

impl EngineSettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse the `[engine]` table; a file without one yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: EngineFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(file.engine)
    }

    /// Serialize as an `[engine]` table (used by `config show`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = EngineFile {
            engine: self.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn regional_ttl(&self) -> Duration {
        Duration::from_secs(self.regional_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_timeout_ms == 0 {
            return Err(invalid("engine.provider_timeout_ms", "must be > 0"));
        }
        if self.regional_ttl_secs == 0 || self.regional_ttl_secs > MAX_TTL_SECS {
            return Err(invalid(
                "engine.regional_ttl_secs",
                "must be > 0 and at most one week",
            ));
        }
        if self.workers == 0 {
            return Err(invalid("engine.workers", "must be > 0"));
        }
        self.retry.validate()
    }
}

pub(crate) fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineSettings::default().validate().unwrap();
    }

    #[test]
    fn reads_engine_table_and_ignores_calibration() {
        let toml = r#"
[aggregation]
european_weight = 0.5

[engine]
workers = 8
provider_timeout_ms = 250

[engine.retry]
max_attempts = 5
"#;
        let settings = EngineSettings::from_toml(toml).unwrap();
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.provider_timeout(), Duration::from_millis(250));
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.task_timeout_secs, 60);
        assert_eq!(settings.regional_ttl_secs, 300);
    }

    #[test]
    fn missing_engine_table_gives_defaults() {
        let settings = EngineSettings::from_toml("[aggregation]\n").unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn engine_table_round_trips() {
        let settings = EngineSettings {
            workers: 6,
            ..EngineSettings::default()
        };
        let toml = settings.to_toml().unwrap();
        assert!(toml.contains("[engine]"));
        assert_eq!(EngineSettings::from_toml(&toml).unwrap(), settings);
    }

    #[test]
    fn regional_ttl_is_bounded() {
        let settings = EngineSettings {
            regional_ttl_secs: u64::MAX,
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = EngineSettings {
            regional_ttl_secs: MAX_TTL_SECS,
            ..EngineSettings::default()
        };
        settings.validate().unwrap();
    }

    #[test]
    fn zero_workers_rejected() {
        let settings = EngineSettings {
            workers: 0,
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
