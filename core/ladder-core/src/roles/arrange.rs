use crate::context::IterationContext;
use crate::quantity::Quantity;

/// Transforms `(input, current) -> desired` for one signal. Pure computation
/// over its two inputs plus whatever state the arranger was configured with.
pub trait Arranger: Send {
    fn arrange(&mut self, ctx: &IterationContext, input: Quantity, current: Quantity) -> anyhow::Result<Quantity>;
}
