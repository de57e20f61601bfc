//! Built-in solvers: `sum`, `bound`, `dummy`.
//!
//! `sum` is grounded in `autoscaler/solve/dummy.go` (the original's "dummy"
//! solver is in fact a sum — this crate keeps the honest name). `bound` is
//! grounded in `autoscaler/solve/common/bound.go`.

use std::sync::Arc;

use ladder_core::{BlockConfigMap, ConfigError, IterationContext, Quantity, Registries, Solver};

/// Adds every input together.
pub struct Sum;

impl Solver for Sum {
    fn solve(&mut self, _ctx: &IterationContext, qs: &[Quantity]) -> anyhow::Result<Quantity> {
        Ok(qs.iter().fold(Quantity::ZERO, |acc, q| acc + *q))
    }
}

#[derive(Clone, Copy)]
enum BoundKind {
    Max,
    Min,
}

/// Reduces to either the maximum or minimum of its inputs, per `kind`.
pub struct Bound {
    kind: BoundKind,
}

impl Bound {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let kind = match config.get_str("kind")? {
            "max" => BoundKind::Max,
            "min" => BoundKind::Min,
            other => {
                return Err(ConfigError::Invalid {
                    key: "kind".to_string(),
                    reason: format!("must be 'max' or 'min', got '{other}'"),
                })
            }
        };
        Ok(Bound { kind })
    }
}

impl Solver for Bound {
    fn solve(&mut self, _ctx: &IterationContext, qs: &[Quantity]) -> anyhow::Result<Quantity> {
        let mut it = qs.iter().copied();
        let first = it.next().ok_or_else(|| anyhow::anyhow!("qs must not be empty"))?;
        Ok(it.fold(first, |acc, q| match self.kind {
            BoundKind::Max => acc.max(q),
            BoundKind::Min => acc.min(q),
        }))
    }
}

/// Always returns the sum of its inputs, matching `autoscaler/solve/dummy.go`
/// exactly (which, despite the name, sums rather than doing nothing).
pub struct Dummy;

impl Solver for Dummy {
    fn solve(&mut self, _ctx: &IterationContext, qs: &[Quantity]) -> anyhow::Result<Quantity> {
        Ok(qs.iter().fold(Quantity::ZERO, |acc, q| acc + *q))
    }
}

pub fn register(registries: &Registries) {
    registries
        .solvers
        .register("sum", Arc::new(|_: &BlockConfigMap| Ok(Box::new(Sum) as Box<dyn Solver>)));
    registries
        .solvers
        .register("bound", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Bound::from_config(cfg)?) as Box<dyn Solver>)));
    registries
        .solvers
        .register("dummy", Arc::new(|_: &BlockConfigMap| Ok(Box::new(Dummy) as Box<dyn Solver>)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn sum_adds_all_inputs() {
        let mut s = Sum;
        let ctx = IterationContext::new("a", CancellationToken::new());
        let qs = [Quantity::new(1), Quantity::new(2), Quantity::new(3)];
        assert_eq!(s.solve(&ctx, &qs).unwrap(), Quantity::new(6));
    }

    #[test]
    fn bound_max_picks_largest() {
        let mut map = std::collections::HashMap::new();
        map.insert("kind".to_string(), ladder_core::ConfigValue::String("max".to_string()));
        let mut b = Bound::from_config(&BlockConfigMap(map)).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        let qs = [Quantity::new(5), Quantity::new(9), Quantity::new(1)];
        assert_eq!(b.solve(&ctx, &qs).unwrap(), Quantity::new(9));
    }
}
