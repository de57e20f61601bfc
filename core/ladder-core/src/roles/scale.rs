use std::future::Future;
use std::pin::Pin;

use crate::context::IterationContext;
use crate::quantity::{Quantity, ScalingMode};

/// A boxed future, mirroring the core's other boxed-future seams (e.g. an
/// autonomous role implementation that must await I/O). Used for
/// [`Scaler::wait`], which needs to be raced against a timeout.
pub type BoxedWait<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Actuates the target resource: reads its current quantity, writes a new
/// one, and waits for convergence.
///
/// `scale` must be idempotent when `new == current`: it must return
/// `ScalingMode::NotScaling` and must not actuate anything.
pub trait Scaler: Send {
    fn current(&mut self, ctx: &IterationContext) -> anyhow::Result<Quantity>;

    fn scale(&mut self, ctx: &IterationContext, new: Quantity) -> anyhow::Result<(Quantity, ScalingMode)>;

    fn wait<'a>(&'a mut self, ctx: &'a IterationContext, scaled: Quantity, mode: ScalingMode) -> BoxedWait<'a>;
}
