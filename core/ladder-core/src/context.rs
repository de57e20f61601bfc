//! The cancellation-capable context threaded through every role call during
//! one tick.

use tokio_util::sync::CancellationToken;

/// Keyed with the owning autoscaler's name under the recognized key
/// `"autoscaler"`, so that role implementations can log or trace with it.
/// A fresh `IterationContext` is minted for every tick; its token is
/// cancelled when [`crate::instance::Autoscaler::stop`] interrupts an
/// in-flight tick.
#[derive(Clone)]
pub struct IterationContext {
    autoscaler: String,
    cancellation: CancellationToken,
}

impl IterationContext {
    pub fn new(autoscaler: impl Into<String>, cancellation: CancellationToken) -> Self {
        IterationContext {
            autoscaler: autoscaler.into(),
            cancellation,
        }
    }

    /// The recognized key is `"autoscaler"`; this accessor is the value.
    pub fn autoscaler_name(&self) -> &str {
        &self.autoscaler
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
