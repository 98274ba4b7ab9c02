//! Sensor fleet health with a TTL-bounded cached record

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::{self, VolatileCache, SENSOR_HEALTH_KEY};
use crate::clock::Clock;
use crate::config::Config;
use crate::gateway::{fetch_all, SensorGateway};
use crate::metrics::Metrics;
use crate::model::HealthRecord;

/// Counts accessible sensors, reusing a cached record while it is younger than the TTL
pub struct HealthEvaluator {
    gateway: Arc<dyn SensorGateway>,
    cache: Arc<dyn VolatileCache>,
    sensors: Vec<String>,
    ttl: Duration,
    storage_timeout: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    probe_lock: Mutex<()>,
}

impl HealthEvaluator {
    pub fn new(
        config: &Config,
        gateway: Arc<dyn SensorGateway>,
        cache: Arc<dyn VolatileCache>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gateway,
            cache,
            sensors: config.configured_sensors(),
            ttl: config.health.ttl,
            storage_timeout: config.storage.timeout,
            clock,
            metrics,
            probe_lock: Mutex::new(()),
        }
    }

    /// Return the cached record if still within the TTL, otherwise probe the fleet.
    ///
    /// Cache failures never fail the check: an unreadable cache leads to an
    /// uncached probe and an unwritable one only loses the reuse. Only one
    /// probe runs at a time; callers queued behind it reuse its record.
    pub async fn check_health(&self) -> HealthRecord {
        match self.cached_record().await {
            Ok(Some(record)) => {
                tracing::debug!(
                    "Using cached health record: {}/{} accessible",
                    record.accessible,
                    record.total
                );
                return record;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Health cache unreadable, probing without caching: {}", e);
                let _probing = self.probe_lock.lock().await;
                return self.probe().await;
            }
        }

        let _probing = self.probe_lock.lock().await;
        if let Ok(Some(record)) = self.cached_record().await {
            tracing::debug!("Health record refreshed by a concurrent probe");
            return record;
        }
        let record = self.probe().await;
        self.store(&record).await;
        record
    }

    async fn cached_record(&self) -> crate::Result<Option<HealthRecord>> {
        let raw = cache::bounded(
            self.storage_timeout,
            "get sensor_health",
            self.cache.get(SENSOR_HEALTH_KEY),
        )
        .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let record: HealthRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding malformed cached health record: {}", e);
                return Ok(None);
            }
        };

        let within_ttl = match (self.clock.now() - record.computed_at).to_std() {
            Ok(age) => age < self.ttl,
            // Computed "in the future" means the clock stepped back; don't trust it
            Err(_) => false,
        };
        Ok(within_ttl.then_some(record))
    }

    async fn probe(&self) -> HealthRecord {
        self.metrics.record_health_probe();
        let readings = fetch_all(&self.gateway, &self.sensors, &self.clock).await;
        let accessible = readings.iter().filter(|r| r.accessible).count();
        let record = HealthRecord {
            accessible,
            total: self.sensors.len(),
            computed_at: self.clock.now(),
        };
        tracing::info!(
            "Health probe: {}/{} sensors accessible",
            record.accessible,
            record.total
        );
        record
    }

    async fn store(&self, record: &HealthRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize health record: {}", e);
                return;
            }
        };
        let result = cache::bounded(
            self.storage_timeout,
            "setex sensor_health",
            self.cache.setex(SENSOR_HEALTH_KEY, payload, self.ttl),
        )
        .await;
        if let Err(e) = result {
            tracing::warn!("Failed to cache health record: {}", e);
        }
    }
}
