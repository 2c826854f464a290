//! Configuration management for Granary.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the Granary service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranaryConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Purchase quota configuration
    #[serde(default)]
    pub quota: QuotaConfig,
}

impl Default for GranaryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    "127.0.0.1:8081".parse().unwrap()
}

/// Shared store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Purchase quota configuration.
///
/// Constructed once at startup and passed into the limiter as an
/// immutable value; the decision logic never reads configuration from
/// the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Purchases allowed per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Extra seconds added to the window counter's expiry, to tolerate
    /// clock and processing drift between decision and cleanup
    #[serde(default = "default_ttl_margin_seconds")]
    pub ttl_margin_seconds: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_seconds: default_window_seconds(),
            ttl_margin_seconds: default_ttl_margin_seconds(),
        }
    }
}

fn default_limit() -> u64 {
    1
}

fn default_window_seconds() -> u64 {
    60
}

fn default_ttl_margin_seconds() -> u64 {
    10
}

impl QuotaConfig {
    /// The expiry attached to a window counter at creation.
    pub fn expiry_seconds(&self) -> u64 {
        self.window_seconds + self.ttl_margin_seconds
    }
}

impl GranaryConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GranaryConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::GranaryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Run once at process start; the limiter assumes a valid config.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.quota.limit == 0 {
            return Err(crate::error::GranaryError::Config(
                "quota.limit must be a positive integer".to_string(),
            ));
        }
        if self.quota.window_seconds == 0 {
            return Err(crate::error::GranaryError::Config(
                "quota.window_seconds must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
