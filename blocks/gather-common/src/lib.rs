//! Built-in gatherers: `random` and `fixed`.
//!
//! Grounded in the original's `autoscaler/gather/common/random.go`. `fixed`
//! is this crate's own addition — a constant-quantity stand-in used wherever
//! a signal needs to exist without wiring up a real external source.

use ladder_core::{BlockConfigMap, ConfigError, Gatherer, IterationContext, Quantity, Registries};
use rand::Rng;

/// Returns a uniformly distributed integer in `[min_limit, max_limit)` on
/// every call.
pub struct Random {
    min_limit: i64,
    max_limit: i64,
}

impl Random {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let min_limit = config.get_i64("min_limit")?;
        let max_limit = config.get_i64("max_limit")?;
        if min_limit < 0 || max_limit < 0 {
            return Err(ConfigError::Invalid {
                key: "min_limit/max_limit".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if max_limit <= min_limit {
            return Err(ConfigError::Invalid {
                key: "max_limit".to_string(),
                reason: "must be greater than min_limit".to_string(),
            });
        }
        Ok(Random { min_limit, max_limit })
    }
}

impl Gatherer for Random {
    fn gather(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        let v = rand::thread_rng().gen_range(self.min_limit..self.max_limit);
        Ok(Quantity::new(v))
    }
}

/// Always returns the same configured quantity.
pub struct Fixed {
    quantity: Quantity,
}

impl Fixed {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        Ok(Fixed {
            quantity: Quantity::new(config.get_i64("quantity")?),
        })
    }
}

impl Gatherer for Fixed {
    fn gather(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        Ok(self.quantity)
    }
}

/// Registers every gatherer kind in this crate with `registries.gatherers`.
pub fn register(registries: &Registries) {
    registries.gatherers.register(
        "random",
        std::sync::Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Random::from_config(cfg)?) as Box<dyn Gatherer>)),
    );
    registries.gatherers.register(
        "fixed",
        std::sync::Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Fixed::from_config(cfg)?) as Box<dyn Gatherer>)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;

    fn cfg(pairs: &[(&str, i64)]) -> BlockConfigMap {
        let mut map = HashMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), ladder_core::ConfigValue::Integer(*v));
        }
        BlockConfigMap(map)
    }

    #[test]
    fn random_rejects_inverted_bounds() {
        let c = cfg(&[("min_limit", 10), ("max_limit", 5)]);
        assert!(Random::from_config(&c).is_err());
    }

    #[test]
    fn random_stays_in_bounds() {
        let c = cfg(&[("min_limit", 1), ("max_limit", 4)]);
        let mut g = Random::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        for _ in 0..50 {
            let q = g.gather(&ctx).unwrap().get();
            assert!((1..4).contains(&q));
        }
    }

    #[test]
    fn fixed_returns_configured_quantity() {
        let c = cfg(&[("quantity", 42)]);
        let mut g = Fixed::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(g.gather(&ctx).unwrap(), Quantity::new(42));
    }
}
