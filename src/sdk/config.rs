use super::clock::TIMEZONEDB_BASE_URL;
use super::geocoding::provider::opencage::OPENCAGE_BASE_URL;
use std::{env, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_RATE_PER_MINUTE: u32 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// How many addresses a ranking run resolves at once.
    pub concurrency: usize,
    pub rate_per_minute: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSourceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub geocoder: GeocoderConfig,
    pub time_source: TimeSourceConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = parse_or(
            "EPOD_GEOCODE_TIMEOUT_SECS",
            non_empty("EPOD_GEOCODE_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?;
        let concurrency: usize = parse_or(
            "EPOD_GEOCODE_CONCURRENCY",
            non_empty("EPOD_GEOCODE_CONCURRENCY"),
            DEFAULT_CONCURRENCY,
        )?;
        let rate_per_minute = parse_or(
            "EPOD_GEOCODE_RATE_PER_MINUTE",
            non_empty("EPOD_GEOCODE_RATE_PER_MINUTE"),
            DEFAULT_RATE_PER_MINUTE,
        )?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EPOD_GEOCODE_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        Ok(Self {
            geocoder: GeocoderConfig {
                api_key: non_empty("OPENCAGE_API_KEY"),
                base_url: non_empty("OPENCAGE_BASE_URL")
                    .unwrap_or_else(|| OPENCAGE_BASE_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
                rate_per_minute,
            },
            time_source: TimeSourceConfig {
                api_key: non_empty("TIMEZONEDB_API_KEY"),
                base_url: non_empty("TIMEZONEDB_BASE_URL")
                    .unwrap_or_else(|| TIMEZONEDB_BASE_URL.to_string()),
            },
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = raw else {
        return Ok(default);
    };
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
