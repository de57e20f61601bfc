//! Core control-loop library: the per-instance pipeline (gather, arrange,
//! solve, filter, scale), the five role registries, and the lifecycle state
//! machine that drives one autoscaler's periodic tick.
//!
//! This crate has no opinion on configuration file formats, CLI surfaces, or
//! concrete observability backends — those live in the agent binary crate,
//! which wires concrete [`hooks::MetricsHooks`]/[`hooks::HealthHooks`]
//! implementations and built-in block kinds into the registries before
//! constructing any [`instance::Autoscaler`].

pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod instance;
pub mod inputter;
pub mod quantity;
pub mod registry;
pub mod roles;
pub mod status;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use config::{AutoscalerConfig, BlockConfig, BlockConfigMap, ConfigValue, InputterConfig};
pub use context::IterationContext;
pub use error::{ArrangeError, GatherError, InputterError, LifecycleError, RegistryError, TickError};
pub use hooks::{HealthHooks, MetricsHooks, NoopHealthHooks, NoopMetricsHooks, RoleLabels};
pub use instance::Autoscaler;
pub use quantity::{Quantity, ScalingMode};
pub use registry::{ArrangerRegistry, FiltererRegistry, GathererRegistry, Registries, Registry, ScalerRegistry, SolverRegistry};
pub use roles::{Arranger, BoxedWait, FilterStep, Filterer, Gatherer, Scaler, Solver};
pub use status::{LifecycleState, Status};
