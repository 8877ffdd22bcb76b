//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Context builder metrics
    pub context_builds: CounterVec,
    pub context_build_duration: Histogram,
    pub context_invalidations: Counter,

    // Store maintenance metrics
    pub contexts_purged: Counter,

    // Change bus metrics
    pub bus_events_published: CounterVec,
    pub bus_handler_failures: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let context_builds = register_counter_vec_with_registry!(
            Opts::new("context_builds_total", "Total context builds"),
            &["status"],
            registry
        )?;

        let context_build_duration = register_histogram_with_registry!(
            "context_build_duration_seconds",
            "Context build duration in seconds",
            registry
        )?;

        let context_invalidations = register_counter_with_registry!(
            Opts::new("context_invalidations_total", "Total contexts invalidated"),
            registry
        )?;

        let contexts_purged = register_counter_with_registry!(
            Opts::new("context_purged_total", "Total contexts removed by retention sweeps"),
            registry
        )?;

        let bus_events_published = register_counter_vec_with_registry!(
            Opts::new("bus_events_published_total", "Total change events published"),
            &["kind"],
            registry
        )?;

        let bus_handler_failures = register_counter_vec_with_registry!(
            Opts::new("bus_handler_failures_total", "Total failed handler deliveries"),
            &["kind"],
            registry
        )?;

        Ok(Self {
            registry,
            context_builds,
            context_build_duration,
            context_invalidations,
            contexts_purged,
            bus_events_published,
            bus_handler_failures,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished build
    pub fn record_build(&self, success: bool, seconds: f64) {
        let status = if success { "success" } else { "error" };
        self.context_builds.with_label_values(&[status]).inc();
        self.context_build_duration.observe(seconds);
    }

    pub fn record_invalidation(&self) {
        self.context_invalidations.inc();
    }

    pub fn record_purge(&self, removed: usize) {
        self.contexts_purged.inc_by(removed as f64);
    }

    /// Record a publish and the number of handlers that failed
    pub fn record_publish(&self, kind: &str, failed: usize) {
        self.bus_events_published.with_label_values(&[kind]).inc();
        if failed > 0 {
            self.bus_handler_failures
                .with_label_values(&[kind])
                .inc_by(failed as f64);
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
