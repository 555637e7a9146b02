use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Source forum
    pub forum_url: String,
    pub http_timeout: Duration,

    // Database
    pub database_path: PathBuf,

    // Built-in triggers
    pub sync_interval: Duration,
    pub deletion_window: Duration,
    pub deletion_scan_enabled: bool,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Source forum
            forum_url: normalize_base_url(&required_env("FORUM_URL")?),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),

            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/mirror.sqlite")),

            // Built-in triggers
            sync_interval: Duration::from_secs(parse_env_u64("SYNC_INTERVAL_SECS", 60)?),
            deletion_window: Duration::from_secs(parse_env_u64("DELETION_WINDOW_SECS", 86_400)?),
            deletion_scan_enabled: parse_env_bool("DELETION_SCAN_ENABLED", true)?,

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Configuration pointing at a local forum, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            forum_url: "http://127.0.0.1:9".to_string(),
            http_timeout: Duration::from_secs(5),
            database_path: PathBuf::from("./data/test.sqlite"),
            sync_interval: Duration::ZERO,
            deletion_window: Duration::from_secs(3600),
            deletion_scan_enabled: false,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forum_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        match url::Url::parse(&self.forum_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => {
                return Err(ConfigError::InvalidValue {
                    name: "FORUM_URL".to_string(),
                    message: format!("unsupported scheme '{}'", u.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    name: "FORUM_URL".to_string(),
                    message: e.to_string(),
                });
            }
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.deletion_scan_enabled && self.deletion_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "DELETION_WINDOW_SECS".to_string(),
                message: "must be at least 1 when deletion scanning is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Period between built-in deletion scans.
    ///
    /// Equal to the scan window so consecutive windows tile the timeline
    /// without gaps.
    #[must_use]
    pub fn deletion_scan_interval(&self) -> Duration {
        self.deletion_window
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
