use crate::context::IterationContext;
use crate::quantity::Quantity;

/// The outcome of one filterer invocation: the quantity it produced, and
/// whether the chain should stop here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStep {
    pub quantity: Quantity,
    pub stop: bool,
}

impl FilterStep {
    pub fn continue_with(quantity: Quantity) -> Self {
        FilterStep { quantity, stop: false }
    }

    pub fn stop_with(quantity: Quantity) -> Self {
        FilterStep { quantity, stop: true }
    }
}

/// A policy step that may alter the post-solve quantity and may short-circuit
/// the remaining filter chain.
///
/// Modeled as an explicit tri-valued fold step rather than exceptions for
/// control flow: `Ok(FilterStep { stop: true, .. })` ends the chain with the
/// returned quantity; `Err` likewise ends the chain, but aborts the tick.
pub trait Filterer: Send {
    fn filter(&mut self, ctx: &IterationContext, current: Quantity, new: Quantity) -> anyhow::Result<FilterStep>;
}
