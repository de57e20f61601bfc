//! Observability seams the core calls into. Concrete backends (Prometheus
//! histograms, a health-check HTTP endpoint, ...) live in the agent; the
//! core only knows about these traits, matching the teacher's split between
//! its core's `metrics`/plugin-event hooks and the metrics/health surfaces a
//! plugin actually wires up.

use std::time::Duration;

use crate::quantity::Quantity;

/// One label tuple for a role invocation: the owning autoscaler, the
/// inputter name (when the call is per-inputter), and the block kind.
pub struct RoleLabels<'a> {
    pub autoscaler: &'a str,
    pub inputter: Option<&'a str>,
    pub kind: &'a str,
}

/// Metrics emission hooks the core calls at every stage boundary.
pub trait MetricsHooks: Send + Sync {
    fn observe_role_duration(&self, role: &'static str, labels: &RoleLabels<'_>, duration: Duration);
    fn incr_role_error(&self, role: &'static str, labels: &RoleLabels<'_>);
    fn set_role_quantity(&self, role: &'static str, labels: &RoleLabels<'_>, quantity: Quantity);

    fn incr_iteration(&self, autoscaler: &str);
    fn observe_iteration_duration(&self, autoscaler: &str, duration: Duration);
    fn set_running(&self, autoscaler: &str, running: bool);
}

/// A no-op implementation, useful for tests and for embedding the core
/// without wiring up an observability backend.
#[derive(Default)]
pub struct NoopMetricsHooks;

impl MetricsHooks for NoopMetricsHooks {
    fn observe_role_duration(&self, _role: &'static str, _labels: &RoleLabels<'_>, _duration: Duration) {}
    fn incr_role_error(&self, _role: &'static str, _labels: &RoleLabels<'_>) {}
    fn set_role_quantity(&self, _role: &'static str, _labels: &RoleLabels<'_>, _quantity: Quantity) {}
    fn incr_iteration(&self, _autoscaler: &str) {}
    fn observe_iteration_duration(&self, _autoscaler: &str, _duration: Duration) {}
    fn set_running(&self, _autoscaler: &str, _running: bool) {}
}

/// The fixed group label every autoscaler instance registers itself under.
pub const HEALTH_GROUP: &str = "autoscaler";

/// Health-check aggregation hook. An autoscaler registers itself at
/// construction time and reports its healthy/unhealthy message whenever
/// asked; transient role failures never mark an instance unhealthy (see
/// spec: "failing role calls do not mark the instance unhealthy").
pub trait HealthHooks: Send + Sync {
    fn register(&self, group: &str, name: &str);
    fn report(&self, group: &str, name: &str, healthy: bool, message: String);
}

#[derive(Default)]
pub struct NoopHealthHooks;

impl HealthHooks for NoopHealthHooks {
    fn register(&self, _group: &str, _name: &str) {}
    fn report(&self, _group: &str, _name: &str, _healthy: bool, _message: String) {}
}
