//! Data types shared by the gateway, aggregation, health and readiness paths

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of fetching a single sensor
///
/// `accessible` records whether the sensor answered with a success status.
/// `value` is only present when a recent temperature channel was found, so an
/// accessible sensor may still carry no value.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_id: String,
    pub value: Option<f64>,
    pub accessible: bool,
    pub observed_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn unreachable(sensor_id: &str, observed_at: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            value: None,
            accessible: false,
            observed_at,
        }
    }

    pub fn reachable(sensor_id: &str, value: Option<f64>, observed_at: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            value,
            accessible: true,
            observed_at,
        }
    }
}

/// One committed aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub readings: BTreeMap<String, f64>,
    pub average: Option<f64>,
}

/// Fleet accessibility at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub accessible: usize,
    pub total: usize,
    pub computed_at: DateTime<Utc>,
}

/// Readiness decision, derived on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessVerdict {
    pub ready: bool,
    pub accessible: usize,
    pub total: usize,
    pub minimum_required: usize,
    pub cache_fresh: bool,
}

/// Comfort label for an average temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureStatus {
    #[serde(rename = "Too Cold")]
    TooCold,
    Good,
    #[serde(rename = "Too Hot")]
    TooHot,
}

impl TemperatureStatus {
    pub fn from_average(average: f64) -> Self {
        if average < 10.0 {
            TemperatureStatus::TooCold
        } else if average <= 36.0 {
            TemperatureStatus::Good
        } else {
            TemperatureStatus::TooHot
        }
    }
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureStatus::TooCold => write!(f, "Too Cold"),
            TemperatureStatus::Good => write!(f, "Good"),
            TemperatureStatus::TooHot => write!(f, "Too Hot"),
        }
    }
}
