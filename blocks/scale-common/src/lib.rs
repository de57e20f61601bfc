//! Built-in scalers: `stdout`, `dummy`.
//!
//! Grounded in `autoscaler/scale/common/stdout.go` and
//! `autoscaler/scale/dummy.go`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ladder_core::{BlockConfigMap, BoxedWait, ConfigError, IterationContext, Quantity, Registries, Scaler, ScalingMode};

/// Prints every scaling action to stdout and tracks "current" in memory —
/// there is nothing real behind it to actuate.
pub struct Stdout {
    message_prefix: String,
    current: i64,
}

impl Stdout {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        Ok(Stdout {
            message_prefix: config.get_str("message_prefix")?.to_string(),
            current: 0,
        })
    }
}

impl Scaler for Stdout {
    fn current(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        Ok(Quantity::new(self.current))
    }

    fn scale(&mut self, _ctx: &IterationContext, new: Quantity) -> anyhow::Result<(Quantity, ScalingMode)> {
        let mode = ScalingMode::from_transition(Quantity::new(self.current), new);
        let action = match mode {
            ScalingMode::ScalingUp => "scaling up",
            ScalingMode::ScalingDown => "scaling down",
            ScalingMode::NotScaling => "not scaling",
        };
        println!("{} {action}: {new}", self.message_prefix);
        self.current = new.get();
        Ok((new, mode))
    }

    fn wait<'a>(&'a mut self, _ctx: &'a IterationContext, _scaled: Quantity, _mode: ScalingMode) -> BoxedWait<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Satisfies the `Scaler` contract without actuating anything; `wait` sleeps
/// for a configured `wait_duration` (default zero), which is useful for
/// exercising the scaling-wait-timeout race in tests.
pub struct Dummy {
    current: Arc<Mutex<i64>>,
    wait_duration: Duration,
}

impl Dummy {
    pub fn from_config(config: &BlockConfigMap) -> Result<Self, ConfigError> {
        let wait_duration = match config.0.get("wait_duration") {
            Some(v) => {
                let raw = v.as_str().map_err(|got| ConfigError::WrongType {
                    key: "wait_duration".to_string(),
                    expected: "string",
                    got,
                })?;
                humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid {
                    key: "wait_duration".to_string(),
                    reason: e.to_string(),
                })?
            }
            None => Duration::ZERO,
        };
        Ok(Dummy {
            current: Arc::new(Mutex::new(0)),
            wait_duration,
        })
    }
}

impl Scaler for Dummy {
    fn current(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
        Ok(Quantity::new(*self.current.lock().unwrap()))
    }

    fn scale(&mut self, _ctx: &IterationContext, new: Quantity) -> anyhow::Result<(Quantity, ScalingMode)> {
        let mut current = self.current.lock().unwrap();
        let mode = ScalingMode::from_transition(Quantity::new(*current), new);
        *current = new.get();
        Ok((new, mode))
    }

    fn wait<'a>(&'a mut self, _ctx: &'a IterationContext, _scaled: Quantity, _mode: ScalingMode) -> BoxedWait<'a> {
        let delay = self.wait_duration;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        })
    }
}

pub fn register(registries: &Registries) {
    registries
        .scalers
        .register("stdout", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Stdout::from_config(cfg)?) as Box<dyn Scaler>)));
    registries
        .scalers
        .register("dummy", Arc::new(|cfg: &BlockConfigMap| Ok(Box::new(Dummy::from_config(cfg)?) as Box<dyn Scaler>)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use ladder_core::ConfigValue;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn dummy_tracks_current_and_mode() {
        let mut map = HashMap::new();
        map.insert("wait_duration".to_string(), ConfigValue::String("1ms".to_string()));
        let mut s = Dummy::from_config(&BlockConfigMap(map)).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(s.current(&ctx).unwrap(), Quantity::ZERO);
        let (scaled, mode) = s.scale(&ctx, Quantity::new(5)).unwrap();
        assert_eq!(scaled, Quantity::new(5));
        assert_eq!(mode, ScalingMode::ScalingUp);
        s.wait(&ctx, scaled, mode).await.unwrap();
        assert_eq!(s.current(&ctx).unwrap(), Quantity::new(5));
    }

    #[test]
    fn stdout_requires_message_prefix() {
        let c = BlockConfigMap(HashMap::new());
        assert!(Stdout::from_config(&c).is_err());
    }
}
