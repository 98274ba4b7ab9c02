//! Sensor gateway: fetches one sensor box and extracts its temperature
//!
//! Every failure mode (transport, status, body) is absorbed here and turned
//! into a [`SensorReading`] without a value, so a sweep never aborts because
//! of a single sensor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::clock::Clock;
use crate::config::SensorApiConfig;
use crate::io::HttpClient;
use crate::model::SensorReading;

/// Channel titles containing this (case-insensitive) are temperature channels.
/// Covers both "Temperature" and the German "Temperatur".
const TEMPERATURE_KEYWORD: &str = "temp";

/// Trait for fetching a single sensor's current reading
#[async_trait]
pub trait SensorGateway: Send + Sync + fmt::Debug {
    async fn fetch(&self, sensor_id: &str) -> SensorReading;
}

#[derive(Debug, Deserialize)]
struct BoxDocument {
    #[serde(default)]
    sensors: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Channel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    last_measurement: Option<Measurement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Measurement {
    created_at: String,
    value: serde_json::Value,
}

/// Extract the first recent, numeric temperature channel from a box document.
///
/// Returns `Ok(None)` when no channel qualifies and `Err` when the body is not
/// a box document at all.
pub fn extract_temperature(
    body: &str,
    now: DateTime<Utc>,
    max_age: Duration,
) -> crate::Result<Option<f64>> {
    let document: BoxDocument = serde_json::from_str(body)
        .map_err(|e| crate::ThermowatchError::Parse(format!("Invalid box document: {}", e)))?;

    for channel in &document.sensors {
        if !channel.title.to_lowercase().contains(TEMPERATURE_KEYWORD) {
            continue;
        }
        let Some(measurement) = &channel.last_measurement else {
            continue;
        };

        let created_at = match DateTime::parse_from_rfc3339(&measurement.created_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                tracing::debug!(
                    "Skipping channel '{}': bad timestamp {:?}: {}",
                    channel.title,
                    measurement.created_at,
                    e
                );
                continue;
            }
        };

        // Timestamps slightly in the future (clock skew) count as recent
        let recent = match (now - created_at).to_std() {
            Ok(age) => age <= max_age,
            Err(_) => true,
        };
        if !recent {
            continue;
        }

        match numeric_value(&measurement.value) {
            Some(value) => return Ok(Some(value)),
            None => {
                tracing::debug!(
                    "Skipping channel '{}': non-numeric value {}",
                    channel.title,
                    measurement.value
                );
            }
        }
    }

    Ok(None)
}

fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Gateway for the openSenseMap box API (`GET {base_url}/boxes/{id}`)
pub struct OpenSenseMapGateway {
    base_url: String,
    max_measurement_age: Duration,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for OpenSenseMapGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSenseMapGateway")
            .field("base_url", &self.base_url)
            .field("max_measurement_age", &self.max_measurement_age)
            .finish()
    }
}

impl OpenSenseMapGateway {
    pub fn new(config: &SensorApiConfig, http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created OpenSenseMapGateway at {}", base_url);
        Self {
            base_url,
            max_measurement_age: config.max_measurement_age,
            http,
            clock,
        }
    }
}

#[async_trait]
impl SensorGateway for OpenSenseMapGateway {
    async fn fetch(&self, sensor_id: &str) -> SensorReading {
        let url = format!("{}/boxes/{}", self.base_url, sensor_id);

        let response = match self.http.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Failed to fetch sensor {}: {}", sensor_id, e);
                return SensorReading::unreachable(sensor_id, self.clock.now());
            }
        };

        let now = self.clock.now();
        if !response.is_success() {
            tracing::debug!(
                "Non-success response from sensor {}: status={}",
                sensor_id,
                response.status
            );
            return SensorReading::unreachable(sensor_id, now);
        }

        let value = match extract_temperature(&response.body, now, self.max_measurement_age) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Sensor {}: {}", sensor_id, e);
                None
            }
        };
        if value.is_none() {
            tracing::debug!("Sensor {} reachable but has no recent temperature", sensor_id);
        }
        SensorReading::reachable(sensor_id, value, now)
    }
}

/// Fetch every sensor in parallel, returning readings in input order.
///
/// Used by both the snapshot scheduler and the health probe so that
/// accessibility is judged identically on both paths.
pub async fn fetch_all(
    gateway: &Arc<dyn SensorGateway>,
    sensor_ids: &[String],
    clock: &Arc<dyn Clock>,
) -> Vec<SensorReading> {
    let mut tasks = JoinSet::new();
    for (index, sensor_id) in sensor_ids.iter().enumerate() {
        let gateway = Arc::clone(gateway);
        let sensor_id = sensor_id.clone();
        tasks.spawn(async move { (index, gateway.fetch(&sensor_id).await) });
    }

    let mut readings: Vec<Option<SensorReading>> = vec![None; sensor_ids.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, reading)) => readings[index] = Some(reading),
            Err(e) => tracing::warn!("Sensor fetch task failed: {}", e),
        }
    }

    readings
        .into_iter()
        .zip(sensor_ids)
        .map(|(reading, id)| {
            reading.unwrap_or_else(|| SensorReading::unreachable(id, clock.now()))
        })
        .collect()
}
