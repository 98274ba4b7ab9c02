//! Reduces per-sensor readings to a single rounded average

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::model::{SensorReading, Snapshot};

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build a snapshot from the readings that carry a value.
///
/// The average is `None` exactly when no reading has a value.
pub fn aggregate(readings: &[SensorReading], taken_at: DateTime<Utc>) -> Snapshot {
    let readings: BTreeMap<String, f64> = readings
        .iter()
        .filter_map(|r| r.value.map(|v| (r.sensor_id.clone(), v)))
        .collect();

    let average = if readings.is_empty() {
        None
    } else {
        let sum: f64 = readings.values().sum();
        Some(round2(sum / readings.len() as f64))
    };

    Snapshot {
        taken_at,
        readings,
        average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn reading(id: &str, value: Option<f64>) -> SensorReading {
        SensorReading::reachable(id, value, at())
    }

    #[test]
    fn empty_input_has_no_average() {
        let snapshot = aggregate(&[], at());
        assert_eq!(snapshot.average, None);
        assert!(snapshot.readings.is_empty());
        assert_eq!(snapshot.taken_at, at());
    }

    #[test]
    fn absent_values_are_filtered() {
        let readings = vec![
            reading("a", Some(18.0)),
            reading("b", None),
            SensorReading::unreachable("c", at()),
            reading("d", Some(22.0)),
        ];
        let snapshot = aggregate(&readings, at());
        assert_eq!(snapshot.average, Some(20.0));
        assert_eq!(snapshot.readings.len(), 2);
        assert_eq!(snapshot.readings["a"], 18.0);
        assert_eq!(snapshot.readings["d"], 22.0);
    }

    #[test]
    fn only_absent_values_has_no_average() {
        let readings = vec![reading("a", None), SensorReading::unreachable("b", at())];
        let snapshot = aggregate(&readings, at());
        assert_eq!(snapshot.average, None);
        assert!(snapshot.readings.is_empty());
    }

    #[test]
    fn average_is_rounded_to_two_decimals() {
        let readings = vec![
            reading("a", Some(20.0)),
            reading("b", Some(20.0)),
            reading("c", Some(21.0)),
        ];
        assert_eq!(aggregate(&readings, at()).average, Some(20.33));
    }

    #[test]
    fn round2_examples() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(-3.456), -3.46);
        assert_eq!(round2(20.0), 20.0);
    }
}
