//! Runtime configuration, read from an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a simulation instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Milliseconds between dispatcher polls.
    pub poll_interval_ms: u64,
    /// World speed. Divides build, training and travel times.
    pub speed: f64,
    /// Seconds before another worker may take over an unfinished claim.
    pub claim_lease_secs: u64,
    /// JSON snapshot of the world. In-memory only when absent.
    pub state_path: Option<PathBuf>,
    /// Identifies this dispatcher's claims (random when absent).
    pub worker_id: Option<u64>,
    /// Drive time by hand instead of from the wall clock.
    pub manual_clock: bool,
}

/// Longest claim lease accepted from a config file: one week.
pub const MAX_CLAIM_LEASE_SECS: u64 = 7 * 24 * 3600;

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            poll_interval_ms: 1000,
            speed: 1.0,
            claim_lease_secs: 300,
            state_path: None,
            worker_id: None,
            manual_clock: false,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GameConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::Invalid(format!("speed must be positive, got {}", self.speed)));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if !(1..=MAX_CLAIM_LEASE_SECS).contains(&self.claim_lease_secs) {
            return Err(ConfigError::Invalid(format!(
                "claim_lease_secs must be between 1 and {MAX_CLAIM_LEASE_SECS}, got {}",
                self.claim_lease_secs
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn claim_lease(&self) -> chrono::Duration {
        let secs = self.claim_lease_secs.clamp(1, MAX_CLAIM_LEASE_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
            .unwrap_or_else(|| SmallRng::from_entropy().gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"speed": 3.0}"#).unwrap();
        assert_eq!(config.speed, 3.0);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.claim_lease(), chrono::Duration::minutes(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<GameConfig>(r#"{"sped": 3.0}"#).is_err());
    }

    #[test]
    fn speed_must_be_positive() {
        let config = GameConfig { speed: 0.0, ..GameConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn explicit_worker_id_is_kept() {
        let config = GameConfig { worker_id: Some(7), ..GameConfig::default() };
        assert_eq!(config.worker_id(), 7);
    }

    #[test]
    fn load_reports_the_path() {
        let err = GameConfig::load(Path::new("/nonexistent/palisade.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/palisade.json"));
    }
}
