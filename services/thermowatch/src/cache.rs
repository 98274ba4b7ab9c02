//! Volatile key/value cache with optional per-entry expiry

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use moka::Expiry;

use crate::clock::Clock;

pub const LATEST_SNAPSHOT_KEY: &str = "latest_snapshot";
pub const LATEST_SNAPSHOT_TIME_KEY: &str = "latest_snapshot_time";
pub const SENSOR_HEALTH_KEY: &str = "sensor_health";

/// The narrow cache interface the service needs
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait VolatileCache: Send + Sync {
    async fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Store without expiry, replacing any previous value
    async fn set(&self, key: &str, value: String) -> crate::Result<()>;

    /// Store with an expiry, replacing any previous value
    async fn setex(&self, key: &str, value: String, ttl: Duration) -> crate::Result<()>;
}

/// Bound a cache call, reporting an overrun as `CacheUnavailable`
pub async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(crate::ThermowatchError::CacheUnavailable(format!(
            "{} timed out after {:?}",
            operation, timeout
        ))),
    }
}

/// Upper bound on live entries; the service itself only uses a handful of keys
const MAX_ENTRIES: u64 = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
    expires_at: Option<DateTime<Utc>>,
}

/// Per-entry time to live: `setex` entries expire, `set` entries never do
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-process cache backed by `moka`.
///
/// moka evicts expired entries in wall-clock time. Reads additionally check
/// the deadline against the injected clock, so expiry follows the same time
/// source as the rest of the service.
pub struct MemoryCache {
    entries: Cache<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(EntryExpiry)
            .build();
        Self { entries, clock }
    }
}

#[async_trait]
impl VolatileCache for MemoryCache {
    async fn get(&self, key: &str) -> crate::Result<Option<String>> {
        let now = self.clock.now();
        let value = self
            .entries
            .get(key)
            .filter(|e| e.expires_at.is_none_or(|at| at > now))
            .map(|e| e.value);
        tracing::debug!("Cache get '{}': hit={}", key, value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> crate::Result<()> {
        tracing::debug!("Cache set '{}'", key);
        let entry = Entry {
            value,
            ttl: None,
            expires_at: None,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn setex(&self, key: &str, value: String, ttl: Duration) -> crate::Result<()> {
        let expires_after = chrono::Duration::from_std(ttl).map_err(|e| {
            crate::ThermowatchError::CacheUnavailable(format!("Invalid TTL {:?}: {}", ttl, e))
        })?;
        tracing::debug!("Cache setex '{}' ttl={}s", key, ttl.as_secs());
        let entry = Entry {
            value,
            ttl: Some(ttl),
            expires_at: Some(self.clock.now() + expires_after),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}
