//! In-process bounded TTL cache backend

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{TokenCache, HEALTH_SENTINEL_KEY, HEALTH_SENTINEL_VALUE};
use crate::address::AddressKey;
use crate::config::MemoryCacheConfig;
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    token: String,
    expires_at: Instant,
}

/// Bounded in-process token cache with absolute per-entry expirations.
///
/// The entry bound is enforced by least-recently-used eviction; expired
/// entries are dropped lazily on lookup.
pub struct MemoryTokenCache {
    config: MemoryCacheConfig,
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryTokenCache {
    pub fn new(config: MemoryCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).expect("nonzero capacity");
        let cache = Self {
            config,
            entries: Mutex::new(LruCache::new(capacity)),
        };
        cache.write_sentinel();
        cache
    }

    fn write_sentinel(&self) {
        let entry = Entry {
            token: HEALTH_SENTINEL_VALUE.to_string(),
            expires_at: Instant::now() + self.config.expiration,
        };
        self.entries.lock().push(HEALTH_SENTINEL_KEY.to_string(), entry);
    }

    fn raw_get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.token.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(d) if !d.is_zero() => d,
            _ => self.config.expiration,
        }
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn set(
        &self,
        key: &AddressKey,
        token: &str,
        ttl: Option<Duration>,
        deadline: Instant,
    ) -> Result<(), CacheError> {
        if Instant::now() >= deadline {
            return Err(CacheError::Cancelled);
        }
        let entry = Entry {
            token: token.to_string(),
            expires_at: Instant::now() + self.effective_ttl(ttl),
        };
        self.entries.lock().push(key.checksummed(), entry);
        Ok(())
    }

    async fn get(&self, key: &AddressKey, deadline: Instant) -> Result<String, CacheError> {
        if Instant::now() >= deadline {
            return Err(CacheError::Cancelled);
        }
        self.raw_get(&key.checksummed()).ok_or(CacheError::NotFound)
    }

    async fn health_check(&self) -> bool {
        self.write_sentinel();
        self.raw_get(HEALTH_SENTINEL_KEY).as_deref() == Some(HEALTH_SENTINEL_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hex: &str) -> AddressKey {
        AddressKey::parse(hex).expect("valid address")
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn test_cache() -> MemoryTokenCache {
        MemoryTokenCache::new(MemoryCacheConfig::default())
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = test_cache();
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        cache
            .set(&key, "secret-token", None, far_deadline())
            .await
            .unwrap();
        let token = cache.get(&key, far_deadline()).await.unwrap();
        assert_eq!(token, "secret-token");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let cache = test_cache();
        let key = addr("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359");

        let err = cache.get(&key, far_deadline()).await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound));
    }

    #[tokio::test]
    async fn test_set_overwrites_prior_binding() {
        let cache = test_cache();
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        cache.set(&key, "first", None, far_deadline()).await.unwrap();
        cache.set(&key, "second", None, far_deadline()).await.unwrap();

        assert_eq!(cache.get(&key, far_deadline()).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_case_variant_keys_share_a_binding() {
        let cache = test_cache();
        let lower = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        let upper = addr("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED");

        cache.set(&lower, "tok", None, far_deadline()).await.unwrap();
        assert_eq!(cache.get(&upper, far_deadline()).await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let cache = test_cache();
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        cache
            .set(&key, "ephemeral", Some(Duration::from_millis(10)), far_deadline())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let err = cache.get(&key, far_deadline()).await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound));
    }

    #[tokio::test]
    async fn test_zero_ttl_falls_back_to_default_expiration() {
        let cache = test_cache();
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        cache
            .set(&key, "tok", Some(Duration::ZERO), far_deadline())
            .await
            .unwrap();
        assert_eq!(cache.get(&key, far_deadline()).await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_entry_bound_evicts_least_recent() {
        let cache = MemoryTokenCache::new(MemoryCacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        let first = addr("0x1111111111111111111111111111111111111111");
        let second = addr("0x2222222222222222222222222222222222222222");
        let third = addr("0x3333333333333333333333333333333333333333");

        cache.set(&first, "t1", None, far_deadline()).await.unwrap();
        cache.set(&second, "t2", None, far_deadline()).await.unwrap();
        cache.set(&third, "t3", None, far_deadline()).await.unwrap();

        // capacity 2: the oldest binding is gone, the newer two remain
        assert!(cache.get(&first, far_deadline()).await.is_err());
        assert_eq!(cache.get(&second, far_deadline()).await.unwrap(), "t2");
        assert_eq!(cache.get(&third, far_deadline()).await.unwrap(), "t3");
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_cancelled() {
        let cache = test_cache();
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        let past = Instant::now() - Duration::from_millis(1);

        let err = cache.get(&key, past).await.unwrap_err();
        assert!(matches!(err, CacheError::Cancelled));

        let err = cache.set(&key, "tok", None, past).await.unwrap_err();
        assert!(matches!(err, CacheError::Cancelled));
    }

    #[tokio::test]
    async fn test_health_check() {
        let cache = test_cache();
        assert!(cache.health_check().await);
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_writers() {
        let cache = std::sync::Arc::new(test_cache());
        let key = addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let token = format!("tok-{i}");
                cache.set(&key, &token, None, far_deadline()).await.unwrap();
                // read-after-write from the writing task
                let seen = cache.get(&key, far_deadline()).await;
                assert!(seen.is_ok());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // one of the written tokens won
        let final_token = cache.get(&key, far_deadline()).await.unwrap();
        assert!(final_token.starts_with("tok-"));
    }
}
