//! Built-in arrangers: `constant_factor`, `in_list`, `threshold`, `dummy`.
//!
//! Each is grounded in its counterpart under
//! `autoscaler/arrange/common/*.go` and `autoscaler/arrange/dummy.go` in the
//! original implementation.

use std::sync::Arc;

use ladder_core::{Arranger, BlockConfigMap, ConfigError, IterationContext, Quantity, Registries};

/// Divides the gathered input by a constant `factor`, rounding per
/// `round_type` (`"ceil"` or `"floor"`).
pub struct ConstantFactor {
    factor: i64,
    round_ceil: bool,
}

impl ConstantFactor {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let factor = config.get_i64("factor")?;
        let round_type = config.get_str("round_type")?;
        let round_ceil = match round_type {
            "ceil" => true,
            "floor" => false,
            other => {
                return Err(ConfigError::Invalid {
                    key: "round_type".to_string(),
                    reason: format!("must be 'ceil' or 'floor', got '{other}'"),
                })
            }
        };
        if factor == 0 {
            return Err(ConfigError::Invalid {
                key: "factor".to_string(),
                reason: "must not be zero".to_string(),
            });
        }
        Ok(ConstantFactor { factor, round_ceil })
    }
}

impl Arranger for ConstantFactor {
    fn arrange(&mut self, _ctx: &IterationContext, input: Quantity, _current: Quantity) -> anyhow::Result<Quantity> {
        let n = input.get() as f64 / self.factor as f64;
        let rounded = if self.round_ceil { n.ceil() } else { n.floor() };
        Ok(Quantity::new(rounded as i64))
    }
}

/// Scales up or down by a percentage of `current` whenever the input matches
/// one of two configured value lists. Upscale takes priority when the input
/// appears in both lists.
pub struct InList {
    match_upscale: Vec<i64>,
    match_downscale: Vec<i64>,
    match_up_magnitude: i64,
    match_down_magnitude: i64,
}

impl InList {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        Ok(InList {
            match_upscale: config.get_i64_list("match_upscale")?,
            match_downscale: config.get_i64_list("match_downscale")?,
            match_up_magnitude: config.get_i64("match_up_magnitude")?,
            match_down_magnitude: config.get_i64("match_down_magnitude")?,
        })
    }
}

impl Arranger for InList {
    fn arrange(&mut self, _ctx: &IterationContext, input: Quantity, current: Quantity) -> anyhow::Result<Quantity> {
        let magnitude = if current.get() == 0 { 1 } else { current.get() };
        if self.match_upscale.contains(&input.get()) {
            let delta = magnitude * self.match_up_magnitude / 100;
            return Ok(Quantity::new(current.get() + delta));
        }
        if self.match_downscale.contains(&input.get()) {
            let delta = magnitude * self.match_down_magnitude / 100;
            return Ok(Quantity::new(current.get() - delta));
        }
        Ok(current)
    }
}

/// Scales by a percentage of `current` once the input crosses an upper or
/// lower threshold, clamped to a configured `[min, max]` delta. `inverse`
/// flips which side of the threshold triggers which direction.
pub struct Threshold {
    up_threshold: i64,
    down_threshold: i64,
    inverse: bool,
    up_percent: i64,
    down_percent: i64,
    up_min: i64,
    up_max: i64,
    down_min: i64,
    down_max: i64,
}

impl Threshold {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let inverse = config.get_bool_or("inverse", false)?;
        let up_threshold = config.get_i64("scaleup_threshold")?;
        let down_threshold = config.get_i64("scaledown_threshold")?;
        if !inverse && down_threshold >= up_threshold {
            return Err(ConfigError::Invalid {
                key: "scaledown_threshold".to_string(),
                reason: "must be less than scaleup_threshold in regular mode".to_string(),
            });
        }
        if inverse && down_threshold <= up_threshold {
            return Err(ConfigError::Invalid {
                key: "scaledown_threshold".to_string(),
                reason: "must be greater than scaleup_threshold in inverse mode".to_string(),
            });
        }
        let up_percent = config.get_i64("scaleup_percent")?;
        let down_percent = config.get_i64("scaledown_percent")?;
        if !(0..=100).contains(&down_percent) {
            return Err(ConfigError::Invalid {
                key: "scaledown_percent".to_string(),
                reason: "must be between 0 and 100".to_string(),
            });
        }
        Ok(Threshold {
            up_threshold,
            down_threshold,
            inverse,
            up_percent,
            down_percent,
            up_min: config.get_i64("scaleup_min_quantity")?,
            up_max: config.get_i64("scaleup_max_quantity")?,
            down_min: config.get_i64("scaledown_min_quantity")?,
            down_max: config.get_i64("scaledown_max_quantity")?,
        })
    }
}

impl Arranger for Threshold {
    fn arrange(&mut self, _ctx: &IterationContext, input: Quantity, current: Quantity) -> anyhow::Result<Quantity> {
        let up_hit = (!self.inverse && input.get() > self.up_threshold) || (self.inverse && input.get() < self.up_threshold);
        let down_hit = (!self.inverse && input.get() < self.down_threshold) || (self.inverse && input.get() > self.down_threshold);

        let (percent, min, max, up) = if up_hit {
            (self.up_percent, self.up_min, self.up_max, true)
        } else if down_hit {
            (self.down_percent, self.down_min, self.down_max, false)
        } else {
            return Ok(current);
        };

        let mut delta = percent * current.get() / 100;
        if delta < min {
            delta = min;
        } else if delta > max {
            delta = max;
        }

        Ok(if up {
            Quantity::new(current.get() + delta)
        } else {
            Quantity::new(current.get() - delta)
        })
    }
}

/// Ignores its input and always returns a fixed configured quantity.
pub struct Dummy {
    quantity: Quantity,
}

impl Dummy {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        Ok(Dummy {
            quantity: Quantity::new(config.get_i64_or("quantity", 0)?),
        })
    }
}

impl Arranger for Dummy {
    fn arrange(&mut self, _ctx: &IterationContext, _input: Quantity, _current: Quantity) -> anyhow::Result<Quantity> {
        Ok(self.quantity)
    }
}

pub fn register(registries: &Registries) {
    registries.arrangers.register(
        "constant_factor",
        Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(ConstantFactor::from_config(cfg)?) as Box<dyn Arranger>)),
    );
    registries
        .arrangers
        .register("in_list", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(InList::from_config(cfg)?) as Box<dyn Arranger>)));
    registries
        .arrangers
        .register("threshold", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Threshold::from_config(cfg)?) as Box<dyn Arranger>)));
    registries
        .arrangers
        .register("dummy", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Dummy::from_config(cfg)?) as Box<dyn Arranger>)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use ladder_core::ConfigValue;
    use tokio_util::sync::CancellationToken;

    fn int_cfg(pairs: &[(&str, i64)]) -> BlockConfigMap {
        let mut map = HashMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), ConfigValue::Integer(*v));
        }
        BlockConfigMap(map)
    }

    #[test]
    fn constant_factor_ceils() {
        let mut c = int_cfg(&[("factor", 50)]);
        c.0.insert("round_type".to_string(), ConfigValue::String("ceil".to_string()));
        let mut a = ConstantFactor::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(a.arrange(&ctx, Quantity::new(520), Quantity::ZERO).unwrap(), Quantity::new(11));
    }

    #[test]
    fn threshold_scales_up_past_threshold() {
        let c = int_cfg(&[
            ("scaleup_threshold", 80),
            ("scaledown_threshold", 20),
            ("scaleup_percent", 50),
            ("scaledown_percent", 50),
            ("scaleup_min_quantity", 1),
            ("scaleup_max_quantity", 100),
            ("scaledown_min_quantity", 1),
            ("scaledown_max_quantity", 100),
        ]);
        let mut a = Threshold::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(a.arrange(&ctx, Quantity::new(90), Quantity::new(10)).unwrap(), Quantity::new(15));
    }

    #[test]
    fn in_list_prioritizes_upscale_when_input_in_both() {
        let mut c = int_cfg(&[("match_up_magnitude", 50), ("match_down_magnitude", 50)]);
        c.0.insert(
            "match_upscale".to_string(),
            ConfigValue::List(vec![ConfigValue::Integer(5)]),
        );
        c.0.insert(
            "match_downscale".to_string(),
            ConfigValue::List(vec![ConfigValue::Integer(5)]),
        );
        let mut a = InList::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(a.arrange(&ctx, Quantity::new(5), Quantity::new(10)).unwrap(), Quantity::new(15));
    }
}
