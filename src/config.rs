//! Configuration for the expeditor server.
//!
//! Supports YAML file and environment variable overrides.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Messaging configuration.
    pub messaging: MessagingConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Pricing policy applied to carts and orders.
    pub pricing: PricingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type (sqlite).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Path to database file.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "sqlite".to_string(),
            path: "./data/expeditor.db".to_string(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache type (memory, redis).
    #[serde(rename = "type")]
    pub cache_type: String,
    /// Redis connection URL (ignored for memory).
    pub url: String,
    /// Namespace prefix for all cache keys.
    pub key_prefix: String,
    /// TTL for cached cart bodies, in seconds.
    pub cart_ttl_secs: u64,
    /// TTL for idempotency pointers, in seconds.
    pub idempotency_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: "memory".to_string(),
            url: "redis://localhost:6379".to_string(),
            key_prefix: "expeditor".to_string(),
            cart_ttl_secs: 3600,
            idempotency_ttl_secs: 86400,
        }
    }
}

impl CacheConfig {
    pub fn cart_ttl(&self) -> Duration {
        Duration::from_secs(self.cart_ttl_secs)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }
}

/// Messaging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Messaging type (channel).
    #[serde(rename = "type")]
    pub messaging_type: String,
    /// Bound on a single publish call, in seconds. On timeout the event
    /// is dropped and logged (or left to outbox recovery when enabled).
    pub publish_timeout_secs: u64,
    /// Outbox configuration.
    pub outbox: OutboxConfig,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            messaging_type: "channel".to_string(),
            publish_timeout_secs: 5,
            outbox: OutboxConfig::default(),
        }
    }
}

impl MessagingConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

/// Outbox configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Enable outbox pattern. Default: false.
    /// Can be overridden via EXPEDITOR_OUTBOX_ENABLED env var.
    pub enabled: bool,
    /// Maximum retry attempts per orphaned event. Default: 10.
    pub max_retries: u32,
    /// Interval in seconds for background recovery. Default: 5.
    pub recovery_interval_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 10,
            recovery_interval_secs: 5,
        }
    }
}

impl OutboxConfig {
    /// Check if outbox is enabled (config or env var).
    pub fn is_enabled(&self) -> bool {
        self.enabled
            || std::env::var("EXPEDITOR_OUTBOX_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the HTTP API.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Pricing policy values. Policy, not business logic: the pipeline
/// applies whatever is configured here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Tax rate applied to the cart subtotal.
    pub tax_rate: Decimal,
    /// Flat delivery fee for non-empty carts.
    pub delivery_fee: Decimal,
    /// Flat service fee added at order placement.
    pub service_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),       // 0.08
            delivery_fee: Decimal::new(299, 2), // 2.99
            service_fee: Decimal::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("EXPEDITOR_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STORAGE_PATH") {
            self.storage.path = path;
        }

        if let Ok(url) = std::env::var("CACHE_URL") {
            self.cache.url = url;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
