use cadence_core::clock::SystemClock;
use cadence_core::error::CoreError;
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file
    pub database_path: String,
    /// IANA zone that decides what "today" is. Detected when unset.
    pub timezone: Option<String>,
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Default number of dates shown by `recur preview`
    pub preview_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "cadence.db".to_string(),
            timezone: None,
            log_level: "warn".to_string(),
            preview_count: 5,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
    }

    /// The clock every command uses for "today".
    pub fn clock(&self) -> Result<SystemClock, CoreError> {
        let zone = match &self.timezone {
            Some(name) => name.clone(),
            None => detect_system_timezone(),
        };
        SystemClock::from_name(&zone)
    }
}

/// Validates that a timezone string is a valid IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database_path, "cadence.db");
        assert_eq!(config.preview_count, 5);
        assert!(config.timezone.is_none());
    }

    #[test]
    fn test_explicit_timezone_builds_clock() {
        let config = Config {
            timezone: Some("Europe/Berlin".to_string()),
            ..Config::default()
        };
        assert_eq!(config.clock().unwrap().timezone(), chrono_tz::Europe::Berlin);

        let bad = Config {
            timezone: Some("Nowhere/Special".to_string()),
            ..Config::default()
        };
        assert!(matches!(bad.clock(), Err(CoreError::InvalidTimezone(_))));
    }

    #[test]
    fn test_detected_timezone_is_valid() {
        assert!(validate_timezone(&detect_system_timezone()).is_ok());
    }
}
