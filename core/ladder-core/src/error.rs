//! The error taxonomy of the control loop.
//!
//! Kinds, not type names, per the design: each stage of the tick gets an
//! error variant that wraps its cause. A tick-ending error is counted and
//! logged; the loop always continues to the next tick. Only registry
//! duplicate/null registration and startup validation are process-fatal.

use std::time::Duration;

use thiserror::Error;

pub use crate::config::ConfigError;

/// Unknown kind or duplicate registration. Duplicate registration is a
/// startup contract violation and is asserted (panics), not returned, from
/// [`crate::registry::Registry::register`]; `UnknownKind` is the variant
/// that actually flows through `Result`s.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown {role} kind: '{kind}'")]
    UnknownKind { role: &'static str, kind: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Wraps the underlying gatherer failure. Per-inputter; non-fatal to the
/// tick unless every inputter fails.
#[derive(Debug, Error)]
#[error("gather failed: {0}")]
pub struct GatherError(#[source] pub anyhow::Error);

/// Wraps the underlying arranger failure. Per-inputter; non-fatal to the
/// tick unless every inputter fails.
#[derive(Debug, Error)]
#[error("arrange failed: {0}")]
pub struct ArrangeError(#[source] pub anyhow::Error);

/// Error from [`crate::inputter::Inputter::gather_and_arrange`]: either the
/// gather or the arrange step failed.
#[derive(Debug, Error)]
pub enum InputterError {
    #[error(transparent)]
    Gather(#[from] GatherError),
    #[error(transparent)]
    Arrange(#[from] ArrangeError),
}

/// Errors that can abort a single tick. Every variant is logged at error
/// level and then the loop proceeds to the next tick; none of them are
/// fatal to the autoscaler instance itself.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("reading the current quantity failed: {0}")]
    Current(#[source] anyhow::Error),
    #[error("solver didn't receive any input values from the inputters")]
    NoSuccessfulInputs,
    #[error("solve failed: {0}")]
    Solve(#[source] anyhow::Error),
    #[error("filter failed: {0}")]
    Filter(#[source] anyhow::Error),
    #[error("scale failed: {0}")]
    Scale(#[source] anyhow::Error),
    #[error("scaling wait timed out after {0:?}")]
    WaitTimeout(Duration),
    #[error("scaling wait failed: {0}")]
    Wait(#[source] anyhow::Error),
}

/// Returned from the lifecycle control surface: `Run`-while-running,
/// `Stop`-while-stopped, `CancelStop`-while-running.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("autoscaler is already running")]
    AlreadyRunning,
    #[error("autoscaler is not running")]
    NotRunning,
    #[error("autoscaler is not stopped")]
    NotStopped,
}
