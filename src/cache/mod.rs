//! Capability-token cache
//!
//! Maps a canonical address key to its current bearer token. The backend is
//! chosen once at construction; everything above the [`TokenCache`] trait is
//! backend-agnostic.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::address::AddressKey;
use crate::error::CacheError;

mod memory;
mod redis;

pub use memory::MemoryTokenCache;
pub use self::redis::RedisTokenCache;

/// Well-known key used by the liveness probe's round-trip
pub(crate) const HEALTH_SENTINEL_KEY: &str = "capability-cache-health-probe";

/// Value written to the sentinel key
pub(crate) const HEALTH_SENTINEL_VALUE: &str = "ok";

/// Bound on how long a liveness probe may take before the backend is
/// declared unhealthy
pub(crate) const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Capability-token store: address key -> opaque bearer token.
///
/// At most one live token per key; `set` overwrites unconditionally and is
/// atomic with respect to concurrent `get` on the same key. Every operation
/// observes the caller-supplied deadline and fails fast with
/// [`CacheError::Cancelled`] instead of blocking past it.
#[async_trait]
pub trait TokenCache: Send + Sync + 'static {
    /// Store or overwrite the binding for `key`.
    ///
    /// `ttl` bounds the entry's lifetime; `None` means the backend's
    /// configured default expiration.
    async fn set(
        &self,
        key: &AddressKey,
        token: &str,
        ttl: Option<Duration>,
        deadline: Instant,
    ) -> Result<(), CacheError>;

    /// Current token for `key`, or [`CacheError::NotFound`] when no live
    /// binding exists. Never returns a value past its TTL.
    async fn get(&self, key: &AddressKey, deadline: Instant) -> Result<String, CacheError>;

    /// Non-blocking liveness probe: a bounded round-trip on a well-known
    /// sentinel key. Any failure or timeout classifies as unhealthy.
    async fn health_check(&self) -> bool;
}
