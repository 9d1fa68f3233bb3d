//! Configuration management for citedin
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Bibliographic API client configuration
    #[serde(default)]
    pub eutils: EutilsConfig,

    /// Session / depth exploration configuration
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EutilsConfig {
    /// elink endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Source database
    #[serde(default = "default_db")]
    pub dbfrom: String,

    /// Target database
    #[serde(default = "default_db")]
    pub db: String,

    /// Link name selecting cited-in relations
    #[serde(default = "default_linkname")]
    pub linkname: String,

    /// Largest id count still requested with a single GET
    #[serde(default = "default_get_threshold")]
    pub get_threshold: usize,

    /// Ids per POST batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wait before each POST batch in milliseconds
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Requests per second allowed by the API
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplorerConfig {
    /// Depth of the first build when a session opens
    #[serde(default = "default_initial_depth")]
    pub initial_depth: usize,

    /// Fixed delay before every depth-iteration request in milliseconds
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Node count above which the layout runs in low quality
    #[serde(default = "default_low_quality_threshold")]
    pub low_quality_threshold: usize,

    /// Layout canvas width
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,

    /// Layout canvas height
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,

    /// Seed for initial node placement (random when absent)
    #[serde(default)]
    pub layout_seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info,citedin_engine=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_base_url() -> String { crate::DEFAULT_EUTILS_URL.to_string() }
fn default_db() -> String { "pubmed".to_string() }
fn default_linkname() -> String { crate::CITEDIN_LINKNAME.to_string() }
fn default_get_threshold() -> usize { 25 }
fn default_batch_size() -> usize { 250 }
fn default_batch_delay() -> u64 { 750 }
fn default_requests_per_second() -> u32 { 3 }
fn default_user_agent() -> String { format!("citedin/{}", crate::VERSION) }
fn default_initial_depth() -> usize { 1 }
fn default_request_delay() -> u64 { 750 }
fn default_low_quality_threshold() -> usize { 500 }
fn default_canvas_width() -> f64 { 700.0 }
fn default_canvas_height() -> f64 { 500.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "citedin".to_string() }

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dbfrom: default_db(),
            db: default_db(),
            linkname: default_linkname(),
            get_threshold: default_get_threshold(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
            requests_per_second: default_requests_per_second(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            initial_depth: default_initial_depth(),
            request_delay_ms: default_request_delay(),
            low_quality_threshold: default_low_quality_threshold(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            layout_seed: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl EutilsConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl ExplorerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__EXPLORER__INITIAL_DEPTH=2
            .add_source(env_source())

            .build()?;

        Self::finish(config)
    }

    /// Load from a specific config file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let parsed: AppConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.explorer.initial_depth < 1 {
            return Err(AppError::Configuration {
                message: "explorer.initial_depth must be at least 1".to_string(),
            });
        }
        if self.eutils.batch_size < 1 {
            return Err(AppError::Configuration {
                message: "eutils.batch_size must be at least 1".to_string(),
            });
        }
        if self.eutils.requests_per_second < 1 {
            return Err(AppError::Configuration {
                message: "eutils.requests_per_second must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("APP")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.explorer.initial_depth, 1);
        assert_eq!(config.eutils.get_threshold, 25);
        assert_eq!(config.eutils.linkname, "pubmed_pubmed_citedin");
        assert_eq!(config.explorer.request_delay(), Duration::from_millis(750));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_initial_depth_rejected() {
        let mut config = AppConfig::default();
        config.explorer.initial_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_sources_fall_back_to_defaults() {
        let config = Config::builder().build().unwrap();
        let parsed = AppConfig::finish(config).unwrap();
        assert_eq!(parsed.eutils.batch_size, 250);
        assert_eq!(parsed.observability.metrics_port, 0);
    }

    #[test]
    fn test_env_overrides_use_app_prefix() {
        let vars = config::Map::from([
            ("APP__EXPLORER__INITIAL_DEPTH".to_string(), "3".to_string()),
            ("APP__OBSERVABILITY__SERVICE_NAME".to_string(), "citedin-ci".to_string()),
            ("CITEDIN__EUTILS__BATCH_SIZE".to_string(), "10".to_string()),
        ]);
        let config = Config::builder()
            .add_source(env_source().source(Some(vars)))
            .build()
            .unwrap();

        let parsed = AppConfig::finish(config).unwrap();

        assert_eq!(parsed.explorer.initial_depth, 3);
        assert_eq!(parsed.observability.service_name, "citedin-ci");
        assert_eq!(parsed.eutils.batch_size, 250);
    }
}
