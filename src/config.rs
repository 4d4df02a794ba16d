//! Configuration management module
//!
//! Loads and validates environment-based configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Invalid value for {0}")]
    ParseError(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Where the metrics take their device counts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCountSource {
    /// Fixed 12 total / 10 online
    Placeholder,
    /// Counted from the device store
    Store,
}

impl FromStr for DeviceCountSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "store" => Ok(Self::Store),
            _ => Err(()),
        }
    }
}

/// Metrics feed settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    /// Interval in milliseconds between simulated telemetry updates
    pub tick_interval_ms: u64,
    /// Interval in milliseconds between stream emissions
    pub stream_interval_ms: u64,
    /// Optional seed for reproducible telemetry
    pub seed: Option<u64>,
    pub device_counts: DeviceCountSource,
}

impl FeedSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5000,
            stream_interval_ms: 1000,
            seed: None,
            device_counts: DeviceCountSource::Placeholder,
        }
    }
}

/// Mock backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Whether catalog and profile calls sleep to mimic network latency
    pub simulate_latency: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            simulate_latency: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub format: LogFormat,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub feed: FeedSettings,
    pub backend: BackendSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            backend: BackendSettings::default(),
            logging: LoggingSettings {
                format: LogFormat::Json,
            },
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, SettingsError> {
    env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .map_err(|_| SettingsError::ParseError(name))
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        let tick_interval_ms: u64 = parse_var("FEED_TICK_INTERVAL_MS", "5000")?;
        if tick_interval_ms == 0 {
            return Err(SettingsError::ZeroInterval("FEED_TICK_INTERVAL_MS"));
        }

        let stream_interval_ms: u64 = parse_var("STREAM_INTERVAL_MS", "1000")?;
        if stream_interval_ms == 0 {
            return Err(SettingsError::ZeroInterval("STREAM_INTERVAL_MS"));
        }

        let seed = match env::var("FEED_SEED") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|_| SettingsError::ParseError("FEED_SEED"))?,
            ),
            Err(_) => None,
        };

        let device_counts = parse_var("METRICS_DEVICE_COUNTS", "placeholder")?;
        let simulate_latency = parse_var("SIMULATE_LATENCY", "true")?;

        let format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "json".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => return Err(SettingsError::ParseError("LOG_FORMAT")),
        };

        Ok(Self {
            feed: FeedSettings {
                tick_interval_ms,
                stream_interval_ms,
                seed,
                device_counts,
            },
            backend: BackendSettings { simulate_latency },
            logging: LoggingSettings { format },
        })
    }
}
