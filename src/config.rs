use crate::error::ExporterError;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Largest page the getMonitors endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Routes the server registers besides the metrics path.
pub const RESERVED_PATHS: [&str; 2] = ["/", "/health"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub uptimerobot: UptimeRobotConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UptimeRobotConfig {
    /// Required, but may arrive from the command line after loading.
    #[serde(default = "default_api_key")]
    pub api_key: SecretString,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout (e.g. "10s").
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

/// Collection schedule. All values are humantime strings such as "5m" or "30s".
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Period of the background refresh.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Smallest gap between the starts of two cycles.
    #[serde(default = "default_min_interval", with = "humantime_serde")]
    pub min_interval: Duration,
    /// Snapshot age beyond which a scrape requests a refresh.
    #[serde(default = "default_max_age", with = "humantime_serde")]
    pub max_age: Duration,
    #[serde(default = "default_backoff_initial", with = "humantime_serde")]
    pub backoff_initial: Duration,
    #[serde(default = "default_backoff_max", with = "humantime_serde")]
    pub backoff_max: Duration,
}

fn default_api_key() -> SecretString {
    SecretString::from(String::new())
}

fn default_base_url() -> String {
    "https://api.uptimerobot.com/v2".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9429
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_min_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_age() -> Duration {
    Duration::from_secs(600)
}

fn default_backoff_initial() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(900)
}

impl Default for UptimeRobotConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            page_size: default_page_size(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            min_interval: default_min_interval(),
            max_age: default_max_age(),
            backoff_initial: default_backoff_initial(),
            backoff_max: default_backoff_max(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, overlaid with
    /// `UPTIMEROBOT_EXPORTER__<SECTION>__<KEY>` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("UPTIMEROBOT_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject values the exporter cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ExporterError> {
        let invalid = |msg: String| Err(ExporterError::Config(msg));

        if self.uptimerobot.api_key.expose_secret().trim().is_empty() {
            return invalid("uptimerobot.api_key must not be empty".to_string());
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.uptimerobot.page_size) {
            return invalid(format!(
                "uptimerobot.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.uptimerobot.page_size
            ));
        }
        if self.uptimerobot.timeout.is_zero() {
            return invalid("uptimerobot.timeout must be positive".to_string());
        }
        if !self.server.metrics_path.starts_with('/') {
            return invalid(format!(
                "server.metrics_path must start with '/', got {:?}",
                self.server.metrics_path
            ));
        }
        if RESERVED_PATHS.contains(&self.server.metrics_path.as_str()) {
            return invalid(format!(
                "server.metrics_path {:?} is already served by the exporter",
                self.server.metrics_path
            ));
        }
        if self.collection.interval.is_zero() {
            return invalid("collection.interval must be positive".to_string());
        }
        if self.collection.backoff_initial.is_zero() {
            return invalid("collection.backoff_initial must be positive".to_string());
        }
        if self.collection.backoff_max < self.collection.backoff_initial {
            return invalid(format!(
                "collection.backoff_max ({:?}) is smaller than backoff_initial ({:?})",
                self.collection.backoff_max, self.collection.backoff_initial
            ));
        }

        Ok(())
    }
}
