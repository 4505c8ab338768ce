//! Configuration management for DeepScout services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! Both binaries load a single [`AppConfig`] at startup and fail fast on
//! invalid or missing values. Nothing reads the environment after startup.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Worker loop configuration
    pub worker: WorkerConfig,

    /// Report generator configuration
    pub generator: GeneratorConfig,

    /// Notification delivery configuration
    pub notifier: NotifierConfig,

    /// Signed-link authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file or Postgres)
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Seconds between polling cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Report provider: openai, mock
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    /// API key for the report provider
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Maximum tokens per report
    #[serde(default = "default_generator_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_generator_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Delivery provider: resend, mock
    #[serde(default = "default_notifier_provider")]
    pub provider: String,

    /// API key for the delivery provider
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_notifier_api_base")]
    pub api_base: String,

    /// Sender address for outgoing mail
    pub from_address: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret for signing one-click research links
    pub link_secret: Option<String>,

    /// Public base URL used when minting links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (per client)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_poll_interval() -> u64 { 60 }
fn default_generator_provider() -> String { "openai".to_string() }
fn default_generator_model() -> String { crate::DEFAULT_REPORT_MODEL.to_string() }
fn default_generator_max_tokens() -> u32 { 1500 }
fn default_generator_temperature() -> f32 { 0.7 }
fn default_generation_timeout() -> u64 { 300 }
fn default_notifier_provider() -> String { "resend".to_string() }
fn default_notifier_api_base() -> String { "https://api.resend.com".to_string() }
fn default_notify_timeout() -> u64 { 30 }
fn default_public_base_url() -> String { "http://localhost:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "deepscout".to_string() }
fn default_rate_limit() -> u32 { 10 }
fn default_burst() -> u32 { 20 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://deepscout.db?mode=rwc")?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__WORKER__POLL_INTERVAL_SECS=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get worker poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker.poll_interval_secs)
    }

    /// Get report generation timeout as Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_secs)
    }

    /// Get notification delivery timeout as Duration
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notifier.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
            },
            database: DatabaseConfig {
                url: "sqlite://deepscout.db?mode=rwc".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            worker: WorkerConfig {
                poll_interval_secs: default_poll_interval(),
            },
            generator: GeneratorConfig {
                provider: default_generator_provider(),
                api_key: None,
                api_base: None,
                model: default_generator_model(),
                max_tokens: default_generator_max_tokens(),
                temperature: default_generator_temperature(),
                timeout_secs: default_generation_timeout(),
            },
            notifier: NotifierConfig {
                provider: default_notifier_provider(),
                api_key: None,
                api_base: default_notifier_api_base(),
                from_address: None,
                timeout_secs: default_notify_timeout(),
            },
            auth: AuthConfig {
                link_secret: None,
                public_base_url: default_public_base_url(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.generator.model, "gpt-4");
        assert_eq!(config.generator.max_tokens, 1500);
        assert_eq!(config.notifier.api_base, "https://api.resend.com");
        assert_eq!(config.worker.poll_interval_secs, 60);
    }

    #[test]
    fn test_duration_helpers() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.generation_timeout(), Duration::from_secs(300));
        assert_eq!(config.notify_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_sqlite_default_url() {
        let config = AppConfig::default();
        assert!(config.database.url.starts_with("sqlite://"));
    }
}
