//! Readiness: quorum of accessible sensors OR a fresh cached snapshot

use std::sync::Arc;

use crate::freshness::FreshnessTracker;
use crate::health::HealthEvaluator;
use crate::model::{HealthRecord, ReadinessVerdict};

/// Quorum size for a fleet of `total` sensors: a strict majority
pub fn minimum_required(total: usize) -> usize {
    total / 2 + 1
}

/// Combine a health record and snapshot freshness into a verdict.
///
/// A fleet with no configured sensors is never ready.
pub fn decide(health: &HealthRecord, cache_fresh: bool) -> ReadinessVerdict {
    let minimum_required = minimum_required(health.total);
    let quorum = health.accessible >= minimum_required;
    ReadinessVerdict {
        ready: health.total > 0 && (quorum || cache_fresh),
        accessible: health.accessible,
        total: health.total,
        minimum_required,
        cache_fresh,
    }
}

pub struct ReadinessEvaluator {
    health: Arc<HealthEvaluator>,
    freshness: Arc<FreshnessTracker>,
}

impl ReadinessEvaluator {
    pub fn new(health: Arc<HealthEvaluator>, freshness: Arc<FreshnessTracker>) -> Self {
        Self { health, freshness }
    }

    pub async fn evaluate(&self) -> ReadinessVerdict {
        let (health, cache_fresh) =
            tokio::join!(self.health.check_health(), self.freshness.is_fresh());
        let verdict = decide(&health, cache_fresh);
        tracing::debug!(
            "Readiness: ready={} accessible={}/{} required={} fresh={}",
            verdict.ready,
            verdict.accessible,
            verdict.total,
            verdict.minimum_required,
            verdict.cache_fresh
        );
        verdict
    }
}
