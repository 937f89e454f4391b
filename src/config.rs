//! Configuration types.

use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Score boundaries used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreThresholds {
    /// Scores at or above this are Healthy.
    pub healthy: u8,
    /// Scores at or above this (and below `healthy`) are Unstable.
    pub unstable: u8,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            healthy: 70,
            unstable: 30,
        }
    }
}

impl ScoreThresholds {
    /// Check `0 <= unstable < healthy <= 100`.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.healthy > 100 {
            return Err(ConfigError::InvalidValue {
                key: "SOLACE_HEALTHY_THRESHOLD".to_string(),
                message: format!("{} is above the maximum score of 100", self.healthy),
            });
        }
        if self.unstable >= self.healthy {
            return Err(ConfigError::InvalidValue {
                key: "SOLACE_UNSTABLE_THRESHOLD".to_string(),
                message: format!(
                    "{} must be below the healthy threshold {}",
                    self.unstable, self.healthy
                ),
            });
        }
        Ok(())
    }
}

/// Crisis contact offered whenever a score lands in the Critical band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisResource {
    pub label: String,
    pub phone: String,
    pub sms: String,
}

impl Default for CrisisResource {
    fn default() -> Self {
        Self {
            label: "988 Suicide & Crisis Lifeline".to_string(),
            phone: "988".to_string(),
            sms: "988".to_string(),
        }
    }
}

/// Bounds on how many flows the manager keeps alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowLimits {
    /// Flows untouched for this long are evicted.
    pub idle_ttl: Duration,
    /// Hard cap on live flows; the least recently used one makes room.
    pub max_flows: usize,
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            max_flows: 10_000,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port for the flow API.
    pub port: u16,
    /// Country-code prefix used by the phone formatter, e.g. "+1".
    pub country_code: String,
    pub thresholds: ScoreThresholds,
    pub crisis: CrisisResource,
    pub flows: FlowLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            country_code: "+1".to_string(),
            thresholds: ScoreThresholds::default(),
            crisis: CrisisResource::default(),
            flows: FlowLimits::default(),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = parse_var(&lookup, "SOLACE_PORT")?.unwrap_or(defaults.port);

        let country_code = lookup("SOLACE_COUNTRY_CODE").unwrap_or(defaults.country_code);

        let thresholds = ScoreThresholds {
            healthy: parse_var(&lookup, "SOLACE_HEALTHY_THRESHOLD")?
                .unwrap_or(defaults.thresholds.healthy),
            unstable: parse_var(&lookup, "SOLACE_UNSTABLE_THRESHOLD")?
                .unwrap_or(defaults.thresholds.unstable),
        };

        let crisis = CrisisResource {
            label: lookup("SOLACE_CRISIS_LABEL").unwrap_or(defaults.crisis.label),
            phone: lookup("SOLACE_CRISIS_PHONE").unwrap_or(defaults.crisis.phone),
            sms: lookup("SOLACE_CRISIS_SMS").unwrap_or(defaults.crisis.sms),
        };

        let flows = FlowLimits {
            idle_ttl: parse_var(&lookup, "SOLACE_FLOW_IDLE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.flows.idle_ttl),
            max_flows: parse_var(&lookup, "SOLACE_MAX_FLOWS")?
                .unwrap_or(defaults.flows.max_flows),
        };

        let config = Self {
            port,
            country_code,
            thresholds,
            crisis,
            flows,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the flow core cannot work with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let cc_len = self.country_code.chars().count();
        if !(1..=3).contains(&cc_len) {
            return Err(ConfigError::InvalidValue {
                key: "SOLACE_COUNTRY_CODE".to_string(),
                message: format!(
                    "expected 1-3 characters, got {:?}",
                    self.country_code
                ),
            });
        }
        if self.flows.max_flows == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SOLACE_MAX_FLOWS".to_string(),
                message: "must allow at least one flow".to_string(),
            });
        }
        self.thresholds.validate()
    }
}

/// Read and parse an optional variable.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> std::result::Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::ParseError(format!("{key}={raw:?}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SOLACE_PORT", " 9090 "),
            ("SOLACE_COUNTRY_CODE", "+44"),
            ("SOLACE_HEALTHY_THRESHOLD", "80"),
            ("SOLACE_FLOW_IDLE_TTL_SECS", "120"),
            ("SOLACE_MAX_FLOWS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.country_code, "+44");
        assert_eq!(config.thresholds.healthy, 80);
        assert_eq!(config.thresholds.unstable, 30);
        assert_eq!(config.flows.idle_ttl, Duration::from_secs(120));
        assert_eq!(config.flows.max_flows, 50);
        assert_eq!(config.crisis.phone, "988");
    }

    #[test]
    fn lookup_errors_surface_as_config_errors() {
        let err = AppConfig::from_lookup(lookup(&[("SOLACE_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError(_))));
        assert!(err.to_string().starts_with("Configuration error:"));

        let err = AppConfig::from_lookup(lookup(&[("SOLACE_MAX_FLOWS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8080);
        assert_eq!(config.country_code, "+1");
        assert_eq!(config.thresholds.healthy, 70);
        assert_eq!(config.thresholds.unstable, 30);
        assert_eq!(config.crisis.phone, "988");
    }

    #[test]
    fn country_code_length_is_checked() {
        let mut config = AppConfig::default();
        config.country_code = String::new();
        assert!(config.validate().is_err());

        config.country_code = "+44".to_string();
        assert!(config.validate().is_ok());

        config.country_code = "351".to_string();
        assert!(config.validate().is_ok());

        config.country_code = "+351".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let inverted = ScoreThresholds {
            healthy: 30,
            unstable: 70,
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let equal = ScoreThresholds {
            healthy: 50,
            unstable: 50,
        };
        assert!(equal.validate().is_err());

        let too_high = ScoreThresholds {
            healthy: 101,
            unstable: 30,
        };
        assert!(too_high.validate().is_err());
    }
}
