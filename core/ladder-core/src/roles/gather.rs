use crate::context::IterationContext;
use crate::quantity::Quantity;

/// Produces one [`Quantity`] from an external source.
///
/// Pure with respect to core state (it must not reach into the autoscaler's
/// own lifecycle), but is free to perform I/O, and may be invoked
/// concurrently with the gatherers of the other inputters of the same tick.
pub trait Gatherer: Send {
    fn gather(&mut self, ctx: &IterationContext) -> anyhow::Result<Quantity>;
}
