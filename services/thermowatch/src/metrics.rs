//! Process-wide counters, rendered in the Prometheus text format

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the scheduler, health evaluator and HTTP handlers
#[derive(Debug)]
pub struct Metrics {
    snapshot_ticks: AtomicU64,
    snapshot_tick_failures: AtomicU64,
    manual_stores: AtomicU64,
    health_probes: AtomicU64,
    last_average_bits: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            snapshot_ticks: AtomicU64::new(0),
            snapshot_tick_failures: AtomicU64::new(0),
            manual_stores: AtomicU64::new(0),
            health_probes: AtomicU64::new(0),
            last_average_bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, success: bool) {
        self.snapshot_ticks.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.snapshot_tick_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_manual_store(&self) {
        self.manual_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_probe(&self) {
        self.health_probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_average(&self, average: Option<f64>) {
        let bits = average.unwrap_or(f64::NAN).to_bits();
        self.last_average_bits.store(bits, Ordering::Relaxed);
    }

    pub fn snapshot_ticks(&self) -> u64 {
        self.snapshot_ticks.load(Ordering::Relaxed)
    }

    pub fn snapshot_tick_failures(&self) -> u64 {
        self.snapshot_tick_failures.load(Ordering::Relaxed)
    }

    pub fn manual_stores(&self) -> u64 {
        self.manual_stores.load(Ordering::Relaxed)
    }

    pub fn health_probes(&self) -> u64 {
        self.health_probes.load(Ordering::Relaxed)
    }

    pub fn last_average(&self) -> Option<f64> {
        let value = f64::from_bits(self.last_average_bits.load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    /// Render all metrics in the Prometheus exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();
        let counters = [
            (
                "thermowatch_snapshot_ticks_total",
                "Snapshot pipeline runs, scheduled or manual",
                self.snapshot_ticks(),
            ),
            (
                "thermowatch_snapshot_tick_failures_total",
                "Snapshot pipeline runs that failed to persist",
                self.snapshot_tick_failures(),
            ),
            (
                "thermowatch_manual_stores_total",
                "Snapshots requested through the store endpoint",
                self.manual_stores(),
            ),
            (
                "thermowatch_health_probes_total",
                "Sensor fleet probes run on health cache misses",
                self.health_probes(),
            ),
        ];
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }

        let name = "thermowatch_last_average_temperature_celsius";
        let _ = writeln!(out, "# HELP {name} Average of the last committed snapshot");
        let _ = writeln!(out, "# TYPE {name} gauge");
        match self.last_average() {
            Some(average) => {
                let _ = writeln!(out, "{name} {average}");
            }
            None => {
                let _ = writeln!(out, "{name} NaN");
            }
        }
        out
    }
}
