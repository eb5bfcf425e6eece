//! Shared cache backend over a Redis client connection

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::time::{timeout, timeout_at, Instant};

use super::{TokenCache, HEALTH_PROBE_TIMEOUT, HEALTH_SENTINEL_KEY, HEALTH_SENTINEL_VALUE};
use crate::address::AddressKey;
use crate::config::RedisCacheConfig;
use crate::error::CacheError;

const KEY_PREFIX: &str = "privacy:token";

/// Shared token cache for multi-instance deployments.
///
/// Expiration is delegated to the server (`SET ... EX`); connection failures
/// surface as [`CacheError::Unavailable`], which the liveness probe treats
/// as unhealthy.
#[derive(Clone)]
pub struct RedisTokenCache {
    manager: ConnectionManager,
    default_ttl: Duration,
}

impl RedisTokenCache {
    /// Connect to the configured Redis endpoint.
    pub async fn connect(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| CacheError::Unavailable(format!("redis client: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(format!("redis connect: {e}")))?;
        Ok(Self {
            manager,
            default_ttl: config.expiration,
        })
    }

    fn namespaced(key: &str) -> String {
        format!("{KEY_PREFIX}:{key}")
    }

    fn ttl_seconds(&self, ttl: Option<Duration>) -> u64 {
        let effective = match ttl {
            Some(d) if !d.is_zero() => d,
            _ => self.default_ttl,
        };
        effective.as_secs().max(1)
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn set(
        &self,
        key: &AddressKey,
        token: &str,
        ttl: Option<Duration>,
        deadline: Instant,
    ) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let namespaced = Self::namespaced(&key.checksummed());
        let seconds = self.ttl_seconds(ttl);

        match timeout_at(deadline, conn.set_ex::<_, _, ()>(namespaced, token, seconds)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CacheError::Unavailable(format!("redis set: {e}"))),
            Err(_) => Err(CacheError::Cancelled),
        }
    }

    async fn get(&self, key: &AddressKey, deadline: Instant) -> Result<String, CacheError> {
        let mut conn = self.manager.clone();
        let namespaced = Self::namespaced(&key.checksummed());

        match timeout_at(deadline, conn.get::<_, Option<String>>(namespaced)).await {
            Ok(Ok(Some(token))) => Ok(token),
            Ok(Ok(None)) => Err(CacheError::NotFound),
            Ok(Err(e)) => Err(CacheError::Unavailable(format!("redis get: {e}"))),
            Err(_) => Err(CacheError::Cancelled),
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.manager.clone();
        let key = Self::namespaced(HEALTH_SENTINEL_KEY);

        let round_trip = async {
            conn.set_ex::<_, _, ()>(&key, HEALTH_SENTINEL_VALUE, 60)
                .await?;
            conn.get::<_, Option<String>>(&key).await
        };

        match timeout(HEALTH_PROBE_TIMEOUT, round_trip).await {
            Ok(Ok(Some(value))) => value == HEALTH_SENTINEL_VALUE,
            Ok(_) => false,
            Err(_) => {
                tracing::debug!("redis health probe timed out");
                false
            }
        }
    }
}
