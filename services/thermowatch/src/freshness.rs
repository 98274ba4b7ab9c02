//! Tracks whether the last committed snapshot is recent enough to serve

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{self, VolatileCache, LATEST_SNAPSHOT_TIME_KEY};
use crate::clock::Clock;
use crate::config::Config;

pub struct FreshnessTracker {
    cache: Arc<dyn VolatileCache>,
    window: Duration,
    storage_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl FreshnessTracker {
    pub fn new(config: &Config, cache: Arc<dyn VolatileCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            window: config.freshness.window,
            storage_timeout: config.storage.timeout,
            clock,
        }
    }

    /// Commit time of the last snapshot, if one is cached
    pub async fn last_update(&self) -> crate::Result<Option<DateTime<Utc>>> {
        let raw = cache::bounded(
            self.storage_timeout,
            "get latest_snapshot_time",
            self.cache.get(LATEST_SNAPSHOT_TIME_KEY),
        )
        .await?;

        raw.map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    crate::ThermowatchError::Parse(format!(
                        "Invalid snapshot time {:?}: {}",
                        raw, e
                    ))
                })
        })
        .transpose()
    }

    /// True iff a snapshot was committed less than the freshness window ago.
    ///
    /// Any failure to read or parse the commit time counts as not fresh.
    pub async fn is_fresh(&self) -> bool {
        match self.last_update().await {
            Ok(Some(updated_at)) => match (self.clock.now() - updated_at).to_std() {
                Ok(age) => age < self.window,
                Err(_) => {
                    tracing::warn!("Snapshot time {} is in the future", updated_at);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Treating snapshot as stale: {}", e);
                false
            }
        }
    }
}
