//! Prometheus-backed `MetricsHooks`, grounded in the teacher's
//! prometheus-exporter plugin: a `Family` per metric, keyed by
//! `Vec<(String, String)>` label pairs exactly as `PrometheusOutput` does,
//! registered once at construction time. Updating a `Family` never touches
//! the registry lock; only `/metrics` encoding does.

use std::time::Duration;

use ladder_core::{MetricsHooks, Quantity, RoleLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

type Labels = Vec<(String, String)>;

fn role_labels(role: &'static str, labels: &RoleLabels<'_>) -> Labels {
    vec![
        ("autoscaler".to_string(), labels.autoscaler.to_string()),
        ("inputter".to_string(), labels.inputter.unwrap_or("").to_string()),
        ("kind".to_string(), labels.kind.to_string()),
        ("role".to_string(), role.to_string()),
    ]
}

fn autoscaler_labels(autoscaler: &str) -> Labels {
    vec![("autoscaler".to_string(), autoscaler.to_string())]
}

pub struct AgentMetrics {
    role_duration_ms: Family<Labels, Histogram>,
    role_errors: Family<Labels, Counter>,
    role_quantity: Family<Labels, Gauge>,
    iterations: Family<Labels, Counter>,
    iteration_duration_ms: Family<Labels, Histogram>,
    running: Family<Labels, Gauge>,
}

const DURATION_BUCKETS: [f64; 8] = [1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0];

impl AgentMetrics {
    /// Builds the metric families and registers them into `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let role_duration_ms =
            Family::<Labels, Histogram>::new_with_constructor(|| Histogram::new(DURATION_BUCKETS.into_iter()));
        let role_errors = Family::<Labels, Counter>::default();
        let role_quantity = Family::<Labels, Gauge>::default();
        let iterations = Family::<Labels, Counter>::default();
        let iteration_duration_ms =
            Family::<Labels, Histogram>::new_with_constructor(|| Histogram::new(DURATION_BUCKETS.into_iter()));
        let running = Family::<Labels, Gauge>::default();

        registry.register("ladder_role_duration_ms", "Duration of a single role call, in milliseconds", role_duration_ms.clone());
        registry.register("ladder_role_errors_total", "Number of role calls that returned an error", role_errors.clone());
        registry.register("ladder_role_quantity", "Last quantity produced by a role call", role_quantity.clone());
        registry.register("ladder_iterations_total", "Number of ticks run", iterations.clone());
        registry.register("ladder_iteration_duration_ms", "Duration of a full tick, in milliseconds", iteration_duration_ms.clone());
        registry.register("ladder_running", "Whether the autoscaler's loop is currently running", running.clone());

        AgentMetrics {
            role_duration_ms,
            role_errors,
            role_quantity,
            iterations,
            iteration_duration_ms,
            running,
        }
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl MetricsHooks for AgentMetrics {
    fn observe_role_duration(&self, role: &'static str, labels: &RoleLabels<'_>, duration: Duration) {
        self.role_duration_ms.get_or_create(&role_labels(role, labels)).observe(ms(duration));
    }

    fn incr_role_error(&self, role: &'static str, labels: &RoleLabels<'_>) {
        self.role_errors.get_or_create(&role_labels(role, labels)).inc();
    }

    fn set_role_quantity(&self, role: &'static str, labels: &RoleLabels<'_>, quantity: Quantity) {
        self.role_quantity.get_or_create(&role_labels(role, labels)).set(quantity.get());
    }

    fn incr_iteration(&self, autoscaler: &str) {
        self.iterations.get_or_create(&autoscaler_labels(autoscaler)).inc();
    }

    fn observe_iteration_duration(&self, autoscaler: &str, duration: Duration) {
        self.iteration_duration_ms.get_or_create(&autoscaler_labels(autoscaler)).observe(ms(duration));
    }

    fn set_running(&self, autoscaler: &str, running: bool) {
        self.running.get_or_create(&autoscaler_labels(autoscaler)).set(if running { 1 } else { 0 });
    }
}
