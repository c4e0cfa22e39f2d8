//! Host configuration loaded from environment variables.

use crate::models::{BracketOptions, PointsTable};
use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

/// Configuration for the `web` host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Finished tournaments are archived this many hours after completion or cancellation.
    pub archive_after_hours: u64,
    /// How often the archive sweep runs.
    pub archive_sweep_minutes: u64,
    /// Options applied to build requests that do not carry their own.
    pub default_options: BracketOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            archive_after_hours: 12,
            archive_sweep_minutes: 30,
            default_options: BracketOptions::default(),
        }
    }
}

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Parse `key` if set, else fall back to `default`. A set but unparsable value is an error.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, format!("cannot parse {:?}", raw))),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// Load from the process environment: HOST, PORT, ARCHIVE_AFTER_HOURS, ARCHIVE_SWEEP_MINUTES,
    /// BRACKET_RESET, POINTS_WIN, POINTS_DRAW, POINTS_LOSS.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let draw = match lookup("POINTS_DRAW") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid("POINTS_DRAW", format!("cannot parse {:?}", raw)))?,
            ),
            _ => None,
        };
        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            archive_after_hours: parse_or(&lookup, "ARCHIVE_AFTER_HOURS", defaults.archive_after_hours)?,
            archive_sweep_minutes: parse_or(
                &lookup,
                "ARCHIVE_SWEEP_MINUTES",
                defaults.archive_sweep_minutes,
            )?,
            default_options: BracketOptions {
                bracket_reset: parse_or(&lookup, "BRACKET_RESET", true)?,
                points: PointsTable {
                    win: parse_or(&lookup, "POINTS_WIN", 3)?,
                    draw,
                    loss: parse_or(&lookup, "POINTS_LOSS", 0)?,
                },
                ..BracketOptions::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive_after_hours == 0 {
            return Err(invalid("ARCHIVE_AFTER_HOURS", "Must be greater than 0"));
        }
        if self.archive_sweep_minutes == 0 {
            return Err(invalid("ARCHIVE_SWEEP_MINUTES", "Must be greater than 0"));
        }
        let points = self.default_options.points;
        if points.win <= points.loss {
            return Err(invalid(
                "POINTS_WIN",
                format!("Must be greater than POINTS_LOSS ({})", points.loss),
            ));
        }
        if let Some(draw) = points.draw {
            if draw < points.loss || draw > points.win {
                return Err(invalid(
                    "POINTS_DRAW",
                    format!("Must lie between {} and {}", points.loss, points.win),
                ));
            }
        }
        Ok(())
    }

    /// Tournaments finished before this instant are due for archiving.
    pub fn archive_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.archive_after_hours as i64)
    }

    pub fn archive_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.archive_sweep_minutes * 60)
    }
}
