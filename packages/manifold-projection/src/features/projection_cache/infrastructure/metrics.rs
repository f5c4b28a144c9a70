//! Prometheus metrics for the projection cache and augmentation memo

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

#[derive(Clone)]
pub struct ProjectionMetrics {
    pub hits: IntCounter,
    pub misses: IntCounter,
    pub cached_misses: IntCounter,
    pub builds: IntCounter,
    pub conflicts: IntCounter,
    pub producer_failures: IntCounter,
    pub malformed: IntCounter,
    pub reentrant: IntCounter,
    pub evictions: IntCounter,
    pub refreshes: IntCounter,
    pub entries: IntGauge,
    pub memo_hits: IntCounter,
    pub memo_builds: IntCounter,
}

impl ProjectionMetrics {
    pub fn new(registry: &Registry, namespace: &str) -> Result<Self, prometheus::Error> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace);
        Ok(Self {
            hits: register_int_counter_with_registry!(
                opts("projection_hits_total", "Projection cache hits"),
                registry
            )?,
            misses: register_int_counter_with_registry!(
                opts("projection_misses_total", "Lookups with no cache node"),
                registry
            )?,
            cached_misses: register_int_counter_with_registry!(
                opts("projection_cached_misses_total", "Lookups answered by a cached miss"),
                registry
            )?,
            builds: register_int_counter_with_registry!(
                opts("projection_builds_total", "Projections built from producer output"),
                registry
            )?,
            conflicts: register_int_counter_with_registry!(
                opts("projection_conflicts_total", "Conflicting primary producers"),
                registry
            )?,
            producer_failures: register_int_counter_with_registry!(
                opts("projection_producer_failures_total", "Producer invocations that failed"),
                registry
            )?,
            malformed: register_int_counter_with_registry!(
                opts("projection_malformed_total", "Producer output that failed to parse"),
                registry
            )?,
            reentrant: register_int_counter_with_registry!(
                opts("projection_reentrant_total", "Reentrant lookups short-circuited"),
                registry
            )?,
            evictions: register_int_counter_with_registry!(
                opts("projection_evictions_total", "Cache nodes evicted by file events"),
                registry
            )?,
            refreshes: register_int_counter_with_registry!(
                opts("projection_refreshes_total", "Global refreshes"),
                registry
            )?,
            entries: register_int_gauge_with_registry!(
                opts("projection_entries", "Cache node count"),
                registry
            )?,
            memo_hits: register_int_counter_with_registry!(
                opts("augment_memo_hits_total", "Augmentations served from the memo"),
                registry
            )?,
            memo_builds: register_int_counter_with_registry!(
                opts("augment_memo_builds_total", "Augmentations computed"),
                registry
            )?,
        })
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = (self.hits.get() + self.cached_misses.get()) as f64;
        let total = hits + self.misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}
