// Service configuration assembled from command-line arguments and environment

use clap::ArgMatches;
use pagescope_scanner::AnalyzerConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DEBUG_PORT: u16 = 6060;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    ZeroPort,

    #[error("port and debug port must differ (both {0})")]
    PortClash(u16),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),

    #[error("unknown log format: {0} (expected json or text)")]
    UnknownLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    /// Loopback-only listener for health and metrics.
    pub debug_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Runtime worker threads; link workers are twice this.
    pub concurrency: usize,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            debug_port: DEFAULT_DEBUG_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Json,
            concurrency: default_concurrency(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl ServiceConfig {
    /// Build from parsed arguments; anything absent keeps its default.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_format = match lookup::<String>(matches, "log-format") {
            Some(format) => format.parse()?,
            None => defaults.log_format,
        };

        let config = Self {
            port: lookup(matches, "port").unwrap_or(defaults.port),
            debug_port: lookup(matches, "debug-port").unwrap_or(defaults.debug_port),
            log_level: lookup(matches, "log-level").unwrap_or(defaults.log_level),
            log_format,
            concurrency: lookup(matches, "concurrency").unwrap_or(defaults.concurrency),
            request_timeout: lookup::<u64>(matches, "request-timeout")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 || self.debug_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.port == self.debug_port {
            return Err(ConfigError::PortClash(self.port));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel(self.log_level.clone()));
        }
        Ok(())
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            workers: self.concurrency * 2,
            ..AnalyzerConfig::default()
        }
    }
}

// Subcommands only define the arguments they use.
fn lookup<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.try_get_one::<T>(id).ok().flatten().cloned()
}
