//! Configuration management for the Raincheck engine
//!
//! Handles loading configuration from an optional TOML file and environment
//! variables, and validates every setting before the engine is built.

use crate::RaincheckError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaincheckConfig {
    /// Historical data source settings
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Analysis window and year range
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Per-fetch timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
    /// Retries for transient HTTP failures
    #[serde(default = "default_source_max_retries")]
    pub max_retries: u32,
    /// Adapter calls allowed in flight at once, across all requests
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub meteomatics: MeteomaticsConfig,
}

/// NASA POWER daily point API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_power_base_url")]
    pub base_url: String,
}

/// Meteomatics API; the adapter is only registered when both credentials are set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteomaticsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_meteomatics_base_url")]
    pub base_url: String,
    /// Last date the account may query; later dates are not requested
    pub cutoff: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    /// Half-width of the day-of-year window
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Day offsets evaluated as alternative dates
    #[serde(default = "default_alternative_offsets")]
    pub alternative_offsets: Vec<i64>,
    /// Comfort points separating Better/Risky from Monitor
    #[serde(default = "default_recommendation_margin")]
    pub recommendation_margin: u8,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_source_timeout() -> u64 {
    20
}

fn default_source_max_retries() -> u32 {
    1
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_power_base_url() -> String {
    "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
}

fn default_meteomatics_base_url() -> String {
    "https://api.meteomatics.com".to_string()
}

fn default_start_year() -> i32 {
    1990
}

fn default_end_year() -> i32 {
    2024
}

fn default_window_days() -> u32 {
    7
}

fn default_alternative_offsets() -> Vec<i64> {
    vec![-7, -2, -1, 1, 2, 7]
}

fn default_recommendation_margin() -> u8 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_source_timeout(),
            max_retries: default_source_max_retries(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            power: PowerConfig::default(),
            meteomatics: MeteomaticsConfig::default(),
        }
    }
}

impl SourcesConfig {
    /// Bound for the whole fetch, retries included
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Bound for one HTTP attempt, so that every retry fits in the fetch timeout
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.fetch_timeout() / (self.max_retries + 1)
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_power_base_url(),
        }
    }
}

impl Default for MeteomaticsConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            base_url: default_meteomatics_base_url(),
            cutoff: None,
        }
    }
}

impl MeteomaticsConfig {
    /// Username and password, when both are present and non-empty
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            window_days: default_window_days(),
            alternative_offsets: default_alternative_offsets(),
            recommendation_margin: default_recommendation_margin(),
        }
    }
}

impl AnalysisConfig {
    /// e.g. "1990-2024"
    #[must_use]
    pub fn years_label(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl RaincheckConfig {
    /// Load configuration from `config_path`, or the default location, then
    /// the environment
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.or_else(Self::get_config_path);
        if let Some(config_file) = config_file.filter(|path| path.exists()) {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. RAINCHECK__SOURCES__METEOMATICS__USERNAME
        builder = builder.add_source(
            Environment::with_prefix("RAINCHECK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: RaincheckConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("raincheck").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.sources.timeout_seconds == 0 || self.sources.timeout_seconds > 120 {
            return Err(
                RaincheckError::config("Source timeout must be between 1 and 120 seconds").into(),
            );
        }

        if self.sources.max_retries > 1 {
            return Err(RaincheckError::config("Source max retries cannot exceed 1").into());
        }

        if self.sources.max_concurrent_fetches == 0 || self.sources.max_concurrent_fetches > 32 {
            return Err(RaincheckError::config(
                "Concurrent source fetches must be between 1 and 32",
            )
            .into());
        }

        if self.analysis.start_year > self.analysis.end_year {
            return Err(RaincheckError::config(format!(
                "Analysis start year {} is after end year {}",
                self.analysis.start_year, self.analysis.end_year
            ))
            .into());
        }

        if self.analysis.window_days > 30 {
            return Err(RaincheckError::config("Analysis window cannot exceed 30 days").into());
        }

        if self.analysis.alternative_offsets.iter().any(|o| o.abs() > 60) {
            return Err(
                RaincheckError::config("Alternative date offsets cannot exceed 60 days").into(),
            );
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(RaincheckError::config("Request timeout must be positive").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RaincheckError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RaincheckError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("NASA POWER", &self.sources.power.base_url),
            ("Meteomatics", &self.sources.meteomatics.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RaincheckError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
