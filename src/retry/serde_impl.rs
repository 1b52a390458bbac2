//! Serde support for [`RetryConfig`] (feature-gated)
//!
//! Durations are written as fractional seconds, and deserialization runs
//! [`RetryConfig::validate`], so an invalid config never makes it out of a
//! configuration file. Every field except `max_attempts` is optional.
//!
//! # Example
//!
//! ```rust,ignore
//! use stillwater_retry::RetryConfig;
//! use std::time::Duration;
//!
//! let json = r#"{"max_attempts": 3, "initial_delay": 0.5, "backoff_multiplier": 2.0}"#;
//! let config: RetryConfig = serde_json::from_str(json).unwrap();
//!
//! assert_eq!(config.initial_delay, Duration::from_millis(500));
//! assert_eq!(config.max_delay, Duration::from_secs(1800));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use super::config::{RetryConfig, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_DELAY};

#[derive(Serialize, Deserialize)]
struct ConfigRepr {
    max_attempts: u32,
    #[serde(default)]
    initial_delay: f64,
    #[serde(default = "default_multiplier")]
    backoff_multiplier: f64,
    #[serde(default = "default_max_delay")]
    max_delay: f64,
    #[serde(default)]
    jitter: f64,
}

fn default_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

fn default_max_delay() -> f64 {
    DEFAULT_MAX_DELAY.as_secs_f64()
}

fn seconds(field: &str, secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        format!(
            "{} must be a non-negative number of seconds, got {}",
            field, secs
        )
    })
}

impl Serialize for RetryConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ConfigRepr {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay.as_secs_f64(),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: self.max_delay.as_secs_f64(),
            jitter: self.jitter.as_secs_f64(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RetryConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let repr = ConfigRepr::deserialize(deserializer)?;
        let config = RetryConfig {
            max_attempts: repr.max_attempts,
            initial_delay: seconds("initial_delay", repr.initial_delay).map_err(D::Error::custom)?,
            backoff_multiplier: repr.backoff_multiplier,
            max_delay: seconds("max_delay", repr.max_delay).map_err(D::Error::custom)?,
            jitter: seconds("jitter", repr.jitter).map_err(D::Error::custom)?,
        };
        config.validate().map_err(D::Error::custom)?;
        Ok(config)
    }
}
