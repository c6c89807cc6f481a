mod logging;
mod schedule;

pub use logging::*;
pub use schedule::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// IANA zone name used for civil-calendar boundaries.  When absent the
    /// system zone is used.
    #[serde(default)]
    pub timezone: Option<String>,
    /// The normal schedule.
    #[serde(default)]
    pub schedule: ScheduleDef,
    /// Consulted after a failure to compute back-off windows that stay
    /// inside the normal window.
    #[serde(default)]
    pub retry: Option<ScheduleDef>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a TOML document into a config, filling defaults.
    pub fn from_toml(raw: &str) -> crate::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(tz) = &self.timezone {
            if let Err(message) = parse_timezone(tz) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "timezone".into(),
                    message,
                });
            }
        }

        self.schedule.validate_into("schedule", &mut errors);

        if let Some(retry) = &self.retry {
            retry.validate_into("retry", &mut errors);

            // A retry schedule only gets a window to stay inside when the
            // normal schedule produces one with breadth.
            if matches!(self.schedule, ScheduleDef::Now) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "retry".into(),
                    message: "normal schedule fires once; retries are not bounded by a window"
                        .into(),
                });
            }
        }

        if self.logging.filter.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "logging.filter".into(),
                message: "filter must not be empty".into(),
            });
        }

        errors
    }
}
