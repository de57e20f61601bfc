//! Process-wide name -> factory registries, one per role.
//!
//! Each registry is a readers-writers lock around a `HashMap`, matching the
//! teacher's split between a writer-guarded registration path and a
//! reader-guarded lookup/creation path (see e.g. the metrics registry's
//! `MetricReader`/`MetricSender` split). Registration of a duplicate name is
//! a startup-contract violation and panics rather than returning an error,
//! mirroring the source's process-fatal behavior for that case.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::{BlockConfigMap, ConfigError};
use crate::error::RegistryError;
use crate::roles::{Arranger, Filterer, Gatherer, Scaler, Solver};

/// A factory turns a block's configuration into a fresh, owned role
/// implementation.
pub type Factory<T> = Arc<dyn Fn(&BlockConfigMap) -> Result<Box<T>, ConfigError> + Send + Sync>;

/// A name -> factory table for one role.
pub struct Registry<T: ?Sized> {
    role: &'static str,
    factories: RwLock<HashMap<String, Factory<T>>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(role: &'static str) -> Self {
        Registry {
            role,
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a factory under `name`.
    ///
    /// # Panics
    /// Panics if `name` is already registered. This is a startup contract,
    /// not a runtime error: built-in and plugin registration happens before
    /// any autoscaler instance is constructed, so a duplicate name indicates
    /// a programming mistake, not a transient failure.
    pub fn register(&self, name: impl Into<String>, factory: Factory<T>) {
        let name = name.into();
        let mut factories = self.factories.write().expect("registry lock poisoned");
        if factories.contains_key(&name) {
            panic!("duplicate registration of {} kind '{name}'", self.role);
        }
        factories.insert(name, factory);
    }

    /// Creates a fresh role implementation from a registered kind.
    pub fn create(&self, name: &str, config: &BlockConfigMap) -> Result<Box<T>, RegistryError> {
        let factories = self.factories.read().expect("registry lock poisoned");
        let factory = factories.get(name).ok_or_else(|| RegistryError::UnknownKind {
            role: self.role,
            kind: name.to_string(),
        })?;
        Ok(factory(config)?)
    }

    /// Sorted list of the currently registered kinds.
    pub fn names(&self) -> Vec<String> {
        let factories = self.factories.read().expect("registry lock poisoned");
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Clears all registrations. Used for test isolation between test cases
    /// that each want a clean registry.
    pub fn reset_all(&self) {
        self.factories.write().expect("registry lock poisoned").clear();
    }
}

pub type GathererRegistry = Registry<dyn Gatherer>;
pub type ArrangerRegistry = Registry<dyn Arranger>;
pub type SolverRegistry = Registry<dyn Solver>;
pub type FiltererRegistry = Registry<dyn Filterer>;
pub type ScalerRegistry = Registry<dyn Scaler>;

/// The five role registries, grouped for convenient sharing across
/// autoscaler instances. Cloning is cheap: each field is reference-counted
/// internally via the `Arc` inside the factory map, and the whole struct is
/// normally held behind an `Arc<Registries>`.
pub struct Registries {
    pub gatherers: GathererRegistry,
    pub arrangers: ArrangerRegistry,
    pub solvers: SolverRegistry,
    pub filterers: FiltererRegistry,
    pub scalers: ScalerRegistry,
}

impl Default for Registries {
    fn default() -> Self {
        Registries {
            gatherers: Registry::new("gatherer"),
            arrangers: Registry::new("arranger"),
            solvers: Registry::new("solver"),
            filterers: Registry::new("filterer"),
            scalers: Registry::new("scaler"),
        }
    }
}

impl Registries {
    pub fn reset_all(&self) {
        self.gatherers.reset_all();
        self.arrangers.reset_all();
        self.solvers.reset_all();
        self.filterers.reset_all();
        self.scalers.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IterationContext;
    use crate::quantity::Quantity;
    use tokio_util::sync::CancellationToken;

    struct FixedGatherer(Quantity);
    impl Gatherer for FixedGatherer {
        fn gather(&mut self, _ctx: &IterationContext) -> anyhow::Result<Quantity> {
            Ok(self.0)
        }
    }

    #[test]
    fn create_unknown_kind_errors() {
        let reg: GathererRegistry = Registry::new("gatherer");
        let err = reg.create("nope", &BlockConfigMap::default()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind { kind, .. } if kind == "nope"));
    }

    #[test]
    fn register_and_create_roundtrip() {
        let reg: GathererRegistry = Registry::new("gatherer");
        reg.register("fixed", Arc::new(|_: &BlockConfigMap| Ok(Box::new(FixedGatherer(Quantity(7))) as Box<dyn Gatherer>)));
        let mut g = reg.create("fixed", &BlockConfigMap::default()).unwrap();
        let ctx = IterationContext::new("a", CancellationToken::new());
        assert_eq!(g.gather(&ctx).unwrap(), Quantity(7));
        assert_eq!(reg.names(), vec!["fixed".to_string()]);
    }

    #[test]
    #[should_panic(expected = "duplicate registration")]
    fn duplicate_registration_is_fatal() {
        let reg: GathererRegistry = Registry::new("gatherer");
        let factory: Factory<dyn Gatherer> =
            Arc::new(|_: &BlockConfigMap| Ok(Box::new(FixedGatherer(Quantity(1))) as Box<dyn Gatherer>));
        reg.register("dup", factory.clone());
        reg.register("dup", factory);
    }

    #[test]
    fn reset_all_clears_registrations() {
        let registries = Registries::default();
        registries
            .gatherers
            .register("fixed", Arc::new(|_: &BlockConfigMap| Ok(Box::new(FixedGatherer(Quantity(1))) as Box<dyn Gatherer>)));
        assert_eq!(registries.gatherers.names().len(), 1);
        registries.reset_all();
        assert!(registries.gatherers.names().is_empty());
    }
}
