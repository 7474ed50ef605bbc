use {
    crate::domain::{correlation::AssetResult, migration},
    prometheus::Encoder,
    prometheus_metric_storage::StorageRegistry,
    std::{sync::OnceLock, time::Duration},
};

/// Metrics for the migrator.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "coa_migrator")]
struct Metrics {
    /// Total number of migrations that were started.
    migrations_started: prometheus::IntCounter,

    /// Migrations that finished, by outcome.
    #[metric(labels("outcome"))]
    migrations_finished: prometheus::IntCounterVec,

    /// Individual asset transfers that failed inside a sealed transaction.
    #[metric(labels("standard"))]
    transfer_failures: prometheus::IntCounterVec,

    /// Answers to the self-pay prompt while sponsoring was rate limited.
    #[metric(labels("decision"))]
    surge_prompts: prometheus::IntCounterVec,

    /// Time it took for submitted transactions to become final, in seconds.
    #[metric(buckets(1, 2, 5, 10, 15, 20, 30, 45, 60, 90, 120))]
    confirmation_time: prometheus::Histogram,
}

pub fn migration_started() {
    get().migrations_started.inc();
}

pub fn migration_succeeded(migration: &migration::Migration) {
    let outcome = if migration.failures().next().is_none() {
        "success"
    } else {
        "partial"
    };
    get()
        .migrations_finished
        .with_label_values(&[outcome])
        .inc();
}

pub fn migration_failed(err: &migration::Error) {
    get()
        .migrations_finished
        .with_label_values(&[err.format_variant()])
        .inc();
}

pub fn transfer_failed(result: &AssetResult) {
    get()
        .transfer_failures
        .with_label_values(&[result.standard.as_str()])
        .inc();
}

pub fn surge_prompt(approved: bool) {
    let decision = if approved { "approved" } else { "declined" };
    get().surge_prompts.with_label_values(&[decision]).inc();
}

pub fn confirmation_time(elapsed: Duration) {
    get().confirmation_time.observe(elapsed.as_secs_f64());
}

/// Renders all metrics in the Prometheus text format.
pub fn encode() -> String {
    let mut buffer = Vec::new();
    let families = registry().registry().gather();
    if let Err(err) = prometheus::TextEncoder::new().encode(&families, &mut buffer) {
        tracing::warn!(?err, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn registry() -> &'static StorageRegistry {
    static REGISTRY: OnceLock<StorageRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| StorageRegistry::new(prometheus::Registry::new()))
}

/// Get the metrics instance.
fn get() -> &'static Metrics {
    Metrics::instance(registry()).expect("unexpected error getting metrics instance")
}
