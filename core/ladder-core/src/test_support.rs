//! Mock role implementations used by the boundary-scenario integration
//! tests. Gated behind the `test-support` feature, mirroring the teacher's
//! own `test` feature that gates its in-tree test doubles.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::context::IterationContext;
use crate::quantity::{Quantity, ScalingMode};
use crate::roles::{Arranger, BoxedWait, FilterStep, Filterer, Gatherer, Scaler, Solver};

/// Replays a fixed sequence of quantities, one per call, then repeats the
/// last one forever.
pub struct SequenceGatherer {
    values: Vec<Quantity>,
    next: usize,
}

impl SequenceGatherer {
    pub fn new(values: Vec<Quantity>) -> Self {
        assert!(!values.is_empty(), "SequenceGatherer needs at least one value");
        SequenceGatherer { values, next: 0 }
    }
}

impl Gatherer for SequenceGatherer {
    fn gather(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        let v = self.values[self.next.min(self.values.len() - 1)];
        if self.next < self.values.len() - 1 {
            self.next += 1;
        }
        Ok(v)
    }
}

/// Always fails. Used to exercise the "some inputters fail" paths.
pub struct FailingGatherer;

impl Gatherer for FailingGatherer {
    fn gather(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        Err(anyhow::anyhow!("synthetic gather failure"))
    }
}

/// Adds a fixed offset to the gathered input, ignoring `current`.
pub struct NudgeArranger(pub Quantity);

impl Arranger for NudgeArranger {
    fn arrange(&mut self, _ctx: &IterationContext, input: Quantity, _current: Quantity) -> anyhow::Result<Quantity> {
        Ok(input + self.0)
    }
}

/// Steps `current` towards `input` by at most `step`, never overshooting.
pub struct StepArranger {
    pub step: Quantity,
}

impl Arranger for StepArranger {
    fn arrange(&mut self, _ctx: &IterationContext, input: Quantity, current: Quantity) -> anyhow::Result<Quantity> {
        if input > current {
            Ok((current + self.step).clamp(current, input))
        } else if input < current {
            Ok((current - self.step).clamp(input, current))
        } else {
            Ok(current)
        }
    }
}

/// Sums its inputs, matching the built-in `sum` solver's behavior without
/// depending on the `solve-common` crate.
pub struct SumSolver;

impl Solver for SumSolver {
    fn solve(&mut self, _ctx: &IterationContext, qs: &[Quantity]) -> anyhow::Result<Quantity> {
        Ok(qs.iter().fold(Quantity::ZERO, |acc, q| acc + *q))
    }
}

/// Adds a fixed offset to the post-solve quantity and never stops the chain.
pub struct OffsetFilterer(pub Quantity);

impl Filterer for OffsetFilterer {
    fn filter(&mut self, _ctx: &IterationContext, _current: Quantity, new: Quantity) -> anyhow::Result<FilterStep> {
        Ok(FilterStep::continue_with(new + self.0))
    }
}

/// Stops the chain outright, returning `new` unchanged.
pub struct HaltFilterer;

impl Filterer for HaltFilterer {
    fn filter(&mut self, _ctx: &IterationContext, _current: Quantity, new: Quantity) -> anyhow::Result<FilterStep> {
        Ok(FilterStep::stop_with(new))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedScale {
    pub from: Quantity,
    pub to: Quantity,
    pub mode: ScalingMode,
}

/// Records every `scale()` call it's asked to perform, and reports
/// `current()` as whatever it was last scaled to (starting at `initial`).
/// `wait()` resolves after `wait_delay`, or never if `wait_delay` is `None` —
/// useful for exercising the scaling-wait-timeout race.
pub struct RecordingScaler {
    current: Quantity,
    wait_delay: Option<Duration>,
    pub history: Arc<Mutex<Vec<AppliedScale>>>,
}

impl RecordingScaler {
    pub fn new(initial: Quantity, wait_delay: Option<Duration>) -> Self {
        RecordingScaler {
            current: initial,
            wait_delay,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Like [`Self::new`], but records into a history the caller already
    /// holds a handle to, so tests can inspect it without reaching inside
    /// the registry's boxed trait object.
    pub fn new_with_history(initial: Quantity, wait_delay: Option<Duration>, history: Arc<Mutex<Vec<AppliedScale>>>) -> Self {
        RecordingScaler {
            current: initial,
            wait_delay,
            history,
        }
    }

    pub fn history(&self) -> Arc<Mutex<Vec<AppliedScale>>> {
        Arc::clone(&self.history)
    }
}

impl Scaler for RecordingScaler {
    fn current(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        Ok(self.current)
    }

    fn scale(&mut self, _ctx: &IterationContext, new: Quantity) -> anyhow::Result<(Quantity, ScalingMode)> {
        let mode = ScalingMode::from_transition(self.current, new);
        if mode.is_scaling() {
            self.history.lock().unwrap().push(AppliedScale {
                from: self.current,
                to: new,
                mode,
            });
            self.current = new;
        }
        Ok((new, mode))
    }

    fn wait<'a>(&'a mut self, _ctx: &'a IterationContext, _scaled: Quantity, _mode: ScalingMode) -> BoxedWait<'a> {
        let delay = self.wait_delay;
        Box::pin(async move {
            match delay {
                Some(d) => {
                    tokio::time::sleep(d).await;
                    Ok(())
                }
                None => std::future::pending().await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn sequence_gatherer_repeats_last_value() {
        let mut g = SequenceGatherer::new(vec![Quantity(1), Quantity(2)]);
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(g.gather(&ctx).unwrap(), Quantity(1));
        assert_eq!(g.gather(&ctx).unwrap(), Quantity(2));
        assert_eq!(g.gather(&ctx).unwrap(), Quantity(2));
    }

    #[test]
    fn step_arranger_never_overshoots() {
        let mut a = StepArranger { step: Quantity(1) };
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(a.arrange(&ctx, Quantity(5), Quantity(0)).unwrap(), Quantity(1));
        assert_eq!(a.arrange(&ctx, Quantity(0), Quantity(0)).unwrap(), Quantity(0));
    }

    #[tokio::test]
    async fn recording_scaler_tracks_history() {
        let mut s = RecordingScaler::new(Quantity(0), Some(Duration::from_millis(1)));
        let ctx = IterationContext::new("a", CancellationToken::new());
        let (scaled, mode) = s.scale(&ctx, Quantity(3)).unwrap();
        assert_eq!(scaled, Quantity(3));
        assert_eq!(mode, ScalingMode::ScalingUp);
        s.wait(&ctx, scaled, mode).await.unwrap();
        assert_eq!(s.history().lock().unwrap().len(), 1);
    }
}
