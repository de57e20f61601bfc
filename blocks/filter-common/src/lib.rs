//! Built-in filterers: `limit`, `scaling_kind_interval`, `dummy`.
//!
//! Grounded in `autoscaler/filter/common/limit.go`,
//! `autoscaler/filter/common/scalingkindinterval.go`, and
//! `autoscaler/filter/dummy.go`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ladder_core::{BlockConfigMap, ConfigError, FilterStep, Filterer, IterationContext, Quantity, Registries, ScalingMode};

/// Clamps the post-solve quantity into `[min, max]`.
pub struct Limit {
    min: i64,
    max: i64,
}

impl Limit {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let min = config.get_i64("min")?;
        let max = config.get_i64("max")?;
        if min < 0 || max < 0 {
            return Err(ConfigError::Invalid {
                key: "min/max".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if max <= min {
            return Err(ConfigError::Invalid {
                key: "max".to_string(),
                reason: "must be greater than min".to_string(),
            });
        }
        Ok(Limit { min, max })
    }
}

impl Filterer for Limit {
    fn filter(&mut self, _ctx: &IterationContext, _current: Quantity, new: Quantity) -> anyhow::Result<FilterStep> {
        let clamped = new.get().clamp(self.min, self.max);
        if clamped != new.get() {
            log::info!("limit filter: clamping {new} to {clamped}");
        }
        Ok(FilterStep::continue_with(Quantity::new(clamped)))
    }
}

fn parse_duration(config: &BlockConfigMap, key: &str) -> Result<Duration, ConfigError> {
    let raw = config.get_str(key)?;
    humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Only lets a scaling decision through once the autoscaler has remained in
/// that scaling mode continuously for the configured duration; otherwise it
/// re-asserts `current` and keeps the chain going.
pub struct ScalingKindInterval {
    up_duration: Duration,
    down_duration: Duration,
    mode: ScalingMode,
    mode_started: Instant,
}

impl ScalingKindInterval {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        Ok(ScalingKindInterval {
            up_duration: parse_duration(config, "scale_up_duration")?,
            down_duration: parse_duration(config, "scale_down_duration")?,
            mode: ScalingMode::NotScaling,
            mode_started: Instant::now(),
        })
    }
}

impl Filterer for ScalingKindInterval {
    fn filter(&mut self, _ctx: &IterationContext, current: Quantity, new: Quantity) -> anyhow::Result<FilterStep> {
        let new_mode = ScalingMode::from_transition(current, new);
        if let ScalingMode::NotScaling = new_mode {
            self.mode = ScalingMode::NotScaling;
            return Ok(FilterStep::continue_with(new));
        }

        if self.mode != new_mode {
            self.mode = new_mode;
            self.mode_started = Instant::now();
        }

        let elapsed = self.mode_started.elapsed();
        let required = match self.mode {
            ScalingMode::ScalingUp => self.up_duration,
            ScalingMode::ScalingDown => self.down_duration,
            ScalingMode::NotScaling => Duration::ZERO,
        };

        if elapsed < required {
            log::info!("scaling_kind_interval: {} for {elapsed:?} < {required:?}, holding at {current}", self.mode);
            return Ok(FilterStep::continue_with(current));
        }

        Ok(FilterStep::continue_with(new))
    }
}

/// Always returns a fixed configured quantity, pass-through by default.
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

impl Filterer for Dummy {
    fn filter(&mut self, _ctx: &IterationContext, _current: Quantity, _new: Quantity) -> anyhow::Result<FilterStep> {
        Ok(FilterStep::continue_with(self.quantity))
    }
}

pub fn register(registries: &Registries) {
    registries
        .filterers
        .register("limit", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Limit::from_config(cfg)?) as Box<dyn Filterer>)));
    registries.filterers.register(
        "scaling_kind_interval",
        Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(ScalingKindInterval::from_config(cfg)?) as Box<dyn Filterer>)),
    );
    registries
        .filterers
        .register("dummy", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Dummy::from_config(cfg)?) as Box<dyn Filterer>)));
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
    fn limit_clamps_above_max() {
        let c = int_cfg(&[("min", 1), ("max", 10)]);
        let mut f = Limit::from_config(&c).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        let step = f.filter(&ctx, Quantity::ZERO, Quantity::new(20)).unwrap();
        assert_eq!(step.quantity, Quantity::new(10));
        assert!(!step.stop);
    }

    #[test]
    fn scaling_kind_interval_holds_until_duration_elapses() {
        let mut map = HashMap::new();
        map.insert("scale_up_duration".to_string(), ConfigValue::String("1h".to_string()));
        map.insert("scale_down_duration".to_string(), ConfigValue::String("1h".to_string()));
        let mut f = ScalingKindInterval::from_config(&BlockConfigMap(map)).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        let step = f.filter(&ctx, Quantity::new(10), Quantity::new(20)).unwrap();
        assert_eq!(step.quantity, Quantity::new(10));
    }
}
