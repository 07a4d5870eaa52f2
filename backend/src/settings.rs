//! Service configuration loaded via OrthoConfig.
//!
//! Values merge, lowest precedence first: defaults, configuration file,
//! `LAFF_*` environment variables, command-line flags.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{PipelineConfig, PipelineConfigError};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE: usize = 10;
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_LIMIT: u32 = 10;
const DEFAULT_NAME_URL: &str = "http://uinames.com/api/";
const DEFAULT_JOKE_URL: &str = "http://api.icndb.com/jokes/random";
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 6;
const DEFAULT_RATE_LIMIT_SLOP_SECS: u64 = 5;
const DEFAULT_MAX_ERRORS: u32 = 50;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Output format and verbosity of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// JSON lines at `info`.
    #[default]
    Production,
    /// Human-readable lines at `debug`.
    Development,
}

impl LogMode {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_directive(self) -> &'static str {
        match self {
            Self::Production => "info",
            Self::Development => "debug",
        }
    }
}

impl FromStr for LogMode {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            _ => Err(SettingsError::LogMode {
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Production => "production",
            Self::Development => "development",
        })
    }
}

/// Settings values that parse but are not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("log mode must be production or development, got {value:?}")]
    LogMode { value: String },
    #[error("{key} is not a valid URL: {message}")]
    Url { key: &'static str, message: String },
    #[error(transparent)]
    Pipeline(#[from] PipelineConfigError),
}

/// Runtime configuration for the joke service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LAFF")]
pub struct LaffSettings {
    /// HTTP listen port.
    pub port: Option<u16>,
    /// `production` or `development`.
    pub log_mode: Option<String>,
    /// Client request and graceful shutdown timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Capacity of the name and joke queues.
    pub cache: Option<usize>,
    /// Number of name producers.
    pub workers: Option<usize>,
    /// Number of joke composers; defaults to `workers`.
    pub composers: Option<usize>,
    /// Inbound requests allowed per second.
    pub limit: Option<u32>,
    /// Name upstream endpoint.
    pub name_url: Option<String>,
    /// Joke upstream endpoint.
    pub joke_url: Option<String>,
    /// Aggregate name fetches allowed per minute.
    pub requests_per_minute: Option<u32>,
    /// Seconds added to the upstream's `Retry-After`.
    pub rate_limit_slop_secs: Option<u64>,
    /// Failures after which a pipeline stage stops.
    pub max_errors: Option<u32>,
    /// Timeout for each upstream call in seconds.
    pub upstream_timeout_secs: Option<u64>,
}

impl LaffSettings {
    /// Socket address to bind, on all IPv4 interfaces.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port.unwrap_or(DEFAULT_PORT)))
    }

    /// Parsed log mode.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::LogMode`] for unknown values.
    pub fn log_mode(&self) -> Result<LogMode, SettingsError> {
        self.log_mode
            .as_deref()
            .map_or(Ok(LogMode::default()), LogMode::from_str)
    }

    /// Client request and shutdown timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Inbound requests allowed per second.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Timeout for each upstream call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.upstream_timeout_secs
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        )
    }

    /// Name upstream endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Url`] when the value does not parse.
    pub fn name_url(&self) -> Result<Url, SettingsError> {
        parse_url("name_url", self.name_url.as_deref().unwrap_or(DEFAULT_NAME_URL))
    }

    /// Joke upstream endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Url`] when the value does not parse.
    pub fn joke_url(&self) -> Result<Url, SettingsError> {
        parse_url("joke_url", self.joke_url.as_deref().unwrap_or(DEFAULT_JOKE_URL))
    }

    /// Validated pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Pipeline`] when a sizing value is zero.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, SettingsError> {
        let producers = self.workers.unwrap_or(DEFAULT_WORKERS);
        let config = PipelineConfig {
            producers,
            composers: self.composers.unwrap_or(producers),
            queue_capacity: self.cache.unwrap_or(DEFAULT_CACHE),
            requests_per_minute: self
                .requests_per_minute
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            rate_limit_slop: Duration::from_secs(
                self.rate_limit_slop_secs
                    .unwrap_or(DEFAULT_RATE_LIMIT_SLOP_SECS),
            ),
            max_errors: self.max_errors.unwrap_or(DEFAULT_MAX_ERRORS),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|error| SettingsError::Url {
        key,
        message: error.to_string(),
    })
}
