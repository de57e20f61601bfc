use crate::context::IterationContext;
use crate::quantity::Quantity;

/// Reduces an ordered, non-empty collection of per-inputter quantities to a
/// single quantity. Only invoked when at least two inputters are configured;
/// with a single inputter the solve step is skipped and its value passes
/// through untouched.
pub trait Solver: Send {
    fn solve(&mut self, ctx: &IterationContext, qs: &[Quantity]) -> anyhow::Result<Quantity>;
}
