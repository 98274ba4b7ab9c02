//! Periodic fetch -> aggregate -> persist pipeline

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::aggregate::aggregate;
use crate::archive::{self, archive_key, DurableArchive};
use crate::cache::{self, VolatileCache, LATEST_SNAPSHOT_KEY, LATEST_SNAPSHOT_TIME_KEY};
use crate::clock::Clock;
use crate::config::Config;
use crate::gateway::{fetch_all, SensorGateway};
use crate::metrics::Metrics;
use crate::model::Snapshot;

/// Lifecycle of the background loop; individual ticks may fail, the loop never does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

pub struct SnapshotScheduler {
    gateway: Arc<dyn SensorGateway>,
    cache: Arc<dyn VolatileCache>,
    archive: Arc<dyn DurableArchive>,
    sensors: Vec<String>,
    interval: Duration,
    storage_timeout: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    state: RwLock<SchedulerState>,
    /// Serialises commits and remembers the newest `taken_at` written to the cache
    last_committed: Mutex<Option<DateTime<Utc>>>,
}

impl SnapshotScheduler {
    pub fn new(
        config: &Config,
        gateway: Arc<dyn SensorGateway>,
        cache: Arc<dyn VolatileCache>,
        archive: Arc<dyn DurableArchive>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gateway,
            cache,
            archive,
            sensors: config.configured_sensors(),
            interval: config.scheduler.interval,
            storage_timeout: config.storage.timeout,
            clock,
            metrics,
            state: RwLock::new(SchedulerState::Stopped),
            last_committed: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Run the pipeline once, now, and report whether the snapshot was persisted
    pub async fn store_now(&self) -> crate::Result<Snapshot> {
        self.metrics.record_manual_store();
        self.tick().await
    }

    /// Tick on the configured interval until `cancel` fires.
    ///
    /// The first tick runs immediately. Cancellation is only observed between
    /// ticks, so a tick in progress always finishes its commit.
    pub async fn run(&self, cancel: CancellationToken) {
        *self.state.write().await = SchedulerState::Running;
        tracing::info!(
            "Snapshot scheduler started: {} sensors every {:?}",
            self.sensors.len(),
            self.interval
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Snapshot scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!("Scheduled snapshot not persisted: {}", e);
                    }
                }
            }
        }

        *self.state.write().await = SchedulerState::Stopped;
        tracing::info!("Snapshot scheduler stopped");
    }

    async fn tick(&self) -> crate::Result<Snapshot> {
        let readings = fetch_all(&self.gateway, &self.sensors, &self.clock).await;
        let snapshot = aggregate(&readings, self.clock.now());

        let result = self.commit(&snapshot).await;
        self.metrics.record_tick(result.is_ok());
        result?;

        self.metrics.record_average(snapshot.average);
        tracing::info!(
            "Snapshot committed at {}: {} readings, average {:?}",
            snapshot.taken_at,
            snapshot.readings.len(),
            snapshot.average
        );
        Ok(snapshot)
    }

    /// Write one snapshot to the cache and the archive.
    ///
    /// The payload is serialised before anything is written. Both stores are
    /// attempted even if the first fails; the first error is returned. A
    /// snapshot without an average is archived only: the cached snapshot and
    /// its time stay untouched so freshness never vouches for an empty sweep.
    async fn commit(&self, snapshot: &Snapshot) -> crate::Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let key = archive_key(snapshot.taken_at);

        let mut last_committed = self.last_committed.lock().await;

        let cache_result = if snapshot.average.is_none() {
            tracing::info!(
                "Snapshot {} has no readings, keeping the cached snapshot",
                snapshot.taken_at
            );
            Ok(())
        } else if matches!(*last_committed, Some(last) if last > snapshot.taken_at) {
            tracing::debug!(
                "Snapshot {} is older than the cached one, archiving only",
                snapshot.taken_at
            );
            Ok(())
        } else {
            let result = self.write_cache(snapshot, payload.clone()).await;
            if result.is_ok() {
                *last_committed = Some(snapshot.taken_at);
            }
            result
        };
        if let Err(e) = &cache_result {
            tracing::warn!("Failed to cache snapshot {}: {}", snapshot.taken_at, e);
        }

        let archive_result = archive::bounded(
            self.storage_timeout,
            &format!("put {}", key),
            self.archive.put(&key, payload.into_bytes()),
        )
        .await;
        if let Err(e) = &archive_result {
            tracing::warn!("Failed to archive snapshot {}: {}", key, e);
        }

        cache_result.and(archive_result)
    }

    /// The time key is only written once the snapshot itself is in place, so
    /// freshness never vouches for a snapshot the cache does not hold.
    async fn write_cache(&self, snapshot: &Snapshot, payload: String) -> crate::Result<()> {
        cache::bounded(
            self.storage_timeout,
            "set latest_snapshot",
            self.cache.set(LATEST_SNAPSHOT_KEY, payload),
        )
        .await?;

        let taken_at = snapshot
            .taken_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        cache::bounded(
            self.storage_timeout,
            "set latest_snapshot_time",
            self.cache.set(LATEST_SNAPSHOT_TIME_KEY, taken_at),
        )
        .await
    }
}
