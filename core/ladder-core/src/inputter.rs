//! The inputter composite: one gatherer and zero-or-one arranger, run
//! back-to-back to produce the quantity for a single signal in one tick.

use std::sync::Arc;
use std::time::Instant;

use crate::config::InputterConfig;
use crate::context::IterationContext;
use crate::error::{ArrangeError, GatherError, InputterError};
use crate::hooks::{MetricsHooks, RoleLabels};
use crate::quantity::Quantity;
use crate::registry::{ArrangerRegistry, GathererRegistry};
use crate::roles::{Arranger, Gatherer};

pub struct Inputter {
    name: String,
    gatherer: Box<dyn Gatherer>,
    gatherer_kind: String,
    arranger: Option<Box<dyn Arranger>>,
    metrics: Arc<dyn MetricsHooks>,
}

impl Inputter {
    /// Builds the composite from configuration. The gatherer is mandatory;
    /// if `arrange.kind` is absent, the inputter forwards the gather output
    /// unchanged instead of constructing an arranger.
    pub fn build(
        cfg: &InputterConfig,
        gatherers: &GathererRegistry,
        arrangers: &ArrangerRegistry,
        metrics: Arc<dyn MetricsHooks>,
    ) -> anyhow::Result<Self> {
        let gatherer = gatherers.create(&cfg.gather.kind, &cfg.gather.config)?;
        let arranger = match &cfg.arrange {
            Some(arrange_cfg) if !arrange_cfg.kind.is_empty() => {
                Some(arrangers.create(&arrange_cfg.kind, &arrange_cfg.config)?)
            }
            _ => None,
        };
        Ok(Inputter {
            name: cfg.name.clone(),
            gatherer,
            gatherer_kind: cfg.gather.kind.clone(),
            arranger,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs gather then (if configured) arrange for this signal.
    pub fn gather_and_arrange(&mut self, ctx: &IterationContext, current: Quantity) -> Result<Quantity, InputterError> {
        let labels = RoleLabels {
            autoscaler: ctx.autoscaler_name(),
            inputter: Some(&self.name),
            kind: &self.gatherer_kind,
        };

        let start = Instant::now();
        let gathered = self.gatherer.gather(ctx);
        self.metrics.observe_role_duration("gather", &labels, start.elapsed());
        let gathered = match gathered {
            Ok(q) => {
                self.metrics.set_role_quantity("gather", &labels, q);
                q
            }
            Err(e) => {
                self.metrics.incr_role_error("gather", &labels);
                return Err(InputterError::Gather(GatherError(e)));
            }
        };

        let Some(arranger) = &mut self.arranger else {
            return Ok(gathered);
        };

        let start = Instant::now();
        let arranged = arranger.arrange(ctx, gathered, current);
        self.metrics.observe_role_duration("arrange", &labels, start.elapsed());
        match arranged {
            Ok(q) => {
                self.metrics.set_role_quantity("arrange", &labels, q);
                Ok(q)
            }
            Err(e) => {
                self.metrics.incr_role_error("arrange", &labels);
                Err(InputterError::Arrange(ArrangeError(e)))
            }
        }
    }
}
