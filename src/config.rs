//! Gateway configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult};

/// Which capability-cache backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process bounded TTL cache
    Memory,
    /// Shared cache over a Redis client connection
    Redis,
}

impl CacheBackend {
    /// Parse from a configuration string
    pub fn parse(value: &str) -> GatewayResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(GatewayError::Config(format!(
                "unknown cache backend: {other}"
            ))),
        }
    }

    /// Label used in logs and the health response
    pub fn label(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

/// In-process cache settings
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Default lifetime of a binding when the write does not supply one
    pub expiration: Duration,
    /// Bound on the number of live entries (least-recent evicted first)
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(24 * 60 * 60),
            max_entries: 1000,
        }
    }
}

/// Shared-cache settings
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    /// Default lifetime of a binding when the write does not supply one
    pub expiration: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            expiration: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// An allow-listed issuance backend: a name and its public key
/// (hex SEC1 encoding)
#[derive(Debug, Clone, Deserialize)]
pub struct BackendKey {
    pub name: String,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

/// Parse the backend allow-list from its JSON document form
/// (`[{"name": "...", "pubKey": "0x04..."}, ...]`)
pub fn parse_backends(raw: &str) -> GatewayResult<Vec<BackendKey>> {
    serde_json::from_str(raw)
        .map_err(|e| GatewayError::Config(format!("invalid backends list: {e}")))
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Master switch; when false the interceptor is a pure passthrough
    pub enable: bool,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Backend selection
    pub cache_backend: CacheBackend,
    pub memory_cache: MemoryCacheConfig,
    pub redis_cache: RedisCacheConfig,
    /// Allow-listed issuer public keys
    pub backends: Vec<BackendKey>,
    /// Deadline applied to each cache operation
    pub op_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enable: false,
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            cache_backend: CacheBackend::Memory,
            memory_cache: MemoryCacheConfig::default(),
            redis_cache: RedisCacheConfig::default(),
            backends: Vec::new(),
            op_timeout: Duration::from_millis(500),
        }
    }
}
