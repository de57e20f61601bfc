//! Integration tests driving a real `Autoscaler` through its public
//! lifecycle API, using the `test-support` mock roles instead of a
//! hand-rolled harness. Run with `--features test-support`.
//!
//! Timing note: warmup and uptime are tracked with `std::time::Instant`, not
//! `tokio::time`, so `tokio::time::pause`/`advance` cannot fast-forward them;
//! these tests use small real sleeps instead. Tests that don't depend on
//! warmup or scaling-wait timing use a long tick interval and rely on
//! `tokio::time::interval`'s immediate first tick to get exactly one tick
//! before `stop()` cuts the loop off.

#![cfg(feature = "test-support")]

use std::sync::Arc;
use std::time::Duration;

use ladder_core::test_support::{
    AppliedScale, FailingGatherer, HaltFilterer, OffsetFilterer, RecordingScaler, SequenceGatherer, StepArranger, SumSolver,
};
use ladder_core::{
    Arranger, AutoscalerConfig, BlockConfig, Filterer, Gatherer, InputterConfig, LifecycleError, NoopHealthHooks,
    NoopMetricsHooks, Quantity, Registries, Scaler, Solver,
};

const LONG_INTERVAL: Duration = Duration::from_secs(10);

fn registries() -> Registries {
    Registries::default()
}

fn register_recording_scaler(registries: &Registries, initial: i64, wait_delay: Option<Duration>) -> Arc<std::sync::Mutex<Vec<AppliedScale>>> {
    let history = Arc::new(std::sync::Mutex::new(Vec::new()));
    let history_for_factory = Arc::clone(&history);
    registries.scalers.register(
        "recording",
        Arc::new(move |_cfg: &_| {
            Ok(Box::new(RecordingScaler::new_with_history(Quantity::new(initial), wait_delay, Arc::clone(&history_for_factory)))
                as Box<dyn Scaler>)
        }),
    );
    history
}

fn register_sequence_gatherer(registries: &Registries, values: Vec<i64>) {
    registries.gatherers.register(
        "sequence",
        Arc::new(move |_cfg: &_| Ok(Box::new(SequenceGatherer::new(values.iter().map(|v| Quantity::new(*v)).collect())) as Box<dyn Gatherer>)),
    );
}

fn register_failing_gatherer(registries: &Registries) {
    registries
        .gatherers
        .register("failing", Arc::new(|_cfg: &_| Ok(Box::new(FailingGatherer) as Box<dyn Gatherer>)));
}

fn register_step_arranger(registries: &Registries, step: i64) {
    registries
        .arrangers
        .register("step", Arc::new(move |_cfg: &_| Ok(Box::new(StepArranger { step: Quantity::new(step) }) as Box<dyn Arranger>)));
}

fn register_sum_solver(registries: &Registries) {
    registries.solvers.register("sum", Arc::new(|_cfg: &_| Ok(Box::new(SumSolver) as Box<dyn Solver>)));
}

fn register_offset_filterer(registries: &Registries, name: &'static str, offset: i64) {
    registries
        .filterers
        .register(name, Arc::new(move |_cfg: &_| Ok(Box::new(OffsetFilterer(Quantity::new(offset))) as Box<dyn Filterer>)));
}

fn register_halt_filterer(registries: &Registries) {
    registries.filterers.register("halt", Arc::new(|_cfg: &_| Ok(Box::new(HaltFilterer) as Box<dyn Filterer>)));
}

fn single_inputter(gather_kind: &str, arrange_kind: Option<&str>) -> InputterConfig {
    InputterConfig {
        name: "in".to_string(),
        description: String::new(),
        gather: BlockConfig::new(gather_kind),
        arrange: arrange_kind.map(BlockConfig::new),
    }
}

fn base_config(name: &str, inputters: Vec<InputterConfig>) -> AutoscalerConfig {
    AutoscalerConfig {
        name: name.to_string(),
        description: String::new(),
        disabled: false,
        interval: LONG_INTERVAL,
        warmup: Duration::ZERO,
        scaling_wait_timeout: Duration::ZERO,
        scale: BlockConfig::new("recording"),
        solve: None,
        filters: vec![],
        inputters,
    }
}

/// Lets exactly one immediate tick run, then stops the loop before a second
/// one can fire (the interval is long enough that it never would anyway).
async fn run_one_tick(instance: &Arc<ladder_core::Autoscaler>) {
    let handle = tokio::spawn(Arc::clone(instance).run());
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    instance.stop(Duration::ZERO).await.unwrap();
    let _ = handle.await;
}

#[tokio::test]
async fn dry_run_never_scales() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![100]);
    register_step_arranger(&registries, 1);
    let history = register_recording_scaler(&registries, 0, None);

    let mut config = base_config("dry-run-scenario", vec![single_inputter("sequence", Some("step"))]);
    config.filters = vec![];
    let instance = ladder_core::Autoscaler::build(
        &config,
        true, // dry_run
        &registries,
        Arc::new(NoopMetricsHooks),
        Arc::new(NoopHealthHooks),
    )
    .unwrap();

    run_one_tick(&instance).await;
    assert!(history.lock().unwrap().is_empty(), "dry-run must never call scale()");
}

#[tokio::test]
async fn warmup_suppresses_scaling_until_elapsed() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![100]);
    register_step_arranger(&registries, 1);
    let history = register_recording_scaler(&registries, 0, Some(Duration::ZERO));

    let mut config = base_config("warmup-scenario", vec![single_inputter("sequence", Some("step"))]);
    config.interval = Duration::from_millis(5);
    config.warmup = Duration::from_millis(60);

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();

    let handle = tokio::spawn(Arc::clone(&instance).run());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(history.lock().unwrap().is_empty(), "no scaling should happen before warmup elapses");

    tokio::time::sleep(Duration::from_millis(80)).await;
    instance.stop(Duration::ZERO).await.unwrap();
    let _ = handle.await;
    assert!(!history.lock().unwrap().is_empty(), "scaling should resume once warmup has elapsed");
}

#[tokio::test]
async fn filter_chain_applies_in_configured_order() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![1]);
    let history = register_recording_scaler(&registries, 0, Some(Duration::ZERO));
    register_offset_filterer(&registries, "plus10", 10);
    register_offset_filterer(&registries, "plus20", 20);

    let mut config = base_config("filter-chain-scenario", vec![single_inputter("sequence", None)]);
    config.filters = vec![BlockConfig::new("plus10"), BlockConfig::new("plus20")];

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();
    run_one_tick(&instance).await;

    let applied = history.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].to, Quantity::new(31)); // 1 + 10 + 20
}

#[tokio::test]
async fn halt_filterer_stops_the_chain() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![1]);
    let history = register_recording_scaler(&registries, 0, Some(Duration::ZERO));
    register_halt_filterer(&registries);
    register_offset_filterer(&registries, "plus100", 100);

    let mut config = base_config("halt-scenario", vec![single_inputter("sequence", None)]);
    config.filters = vec![BlockConfig::new("halt"), BlockConfig::new("plus100")];

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();
    run_one_tick(&instance).await;

    let applied = history.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].to, Quantity::new(1), "the halt filterer must prevent plus100 from running");
}

#[tokio::test]
async fn multiple_inputters_are_combined_by_the_configured_solver() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![10]);
    register_sum_solver(&registries);
    let history = register_recording_scaler(&registries, 0, Some(Duration::ZERO));

    let inputters: Vec<InputterConfig> = (0..5)
        .map(|i| InputterConfig {
            name: format!("in{i}"),
            description: String::new(),
            gather: BlockConfig::new("sequence"),
            arrange: None,
        })
        .collect();

    let mut config = base_config("sum-scenario", inputters);
    config.solve = Some(BlockConfig::new("sum"));

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();
    run_one_tick(&instance).await;

    let applied = history.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].to, Quantity::new(50));
}

#[tokio::test]
async fn tick_survives_every_inputter_failing() {
    let registries = registries();
    register_failing_gatherer(&registries);
    register_sum_solver(&registries);
    let history = register_recording_scaler(&registries, 0, None);

    let inputters: Vec<InputterConfig> = (0..3)
        .map(|i| InputterConfig {
            name: format!("in{i}"),
            description: String::new(),
            gather: BlockConfig::new("failing"),
            arrange: None,
        })
        .collect();

    let mut config = base_config("all-fail-scenario", inputters);
    config.solve = Some(BlockConfig::new("sum"));

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();
    run_one_tick(&instance).await;

    assert!(history.lock().unwrap().is_empty(), "no successful inputs means scale() is never reached");
    assert!(!instance.running(), "the loop itself must still shut down cleanly on stop()");
}

#[tokio::test]
async fn scale_is_recorded_even_when_the_wait_times_out() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![5]);
    // wait() never resolves; scaling_wait_timeout below will always win the race.
    let history = register_recording_scaler(&registries, 0, Some(Duration::from_secs(3600)));

    let mut config = base_config("wait-timeout-scenario", vec![single_inputter("sequence", None)]);
    config.scaling_wait_timeout = Duration::from_millis(10);

    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();
    run_one_tick(&instance).await;

    let applied = history.lock().unwrap();
    assert_eq!(applied.len(), 1, "scale() itself succeeds; only the wait times out");
    assert_eq!(applied[0].to, Quantity::new(5));
}

#[tokio::test]
async fn lifecycle_transitions_are_rejected_out_of_order() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![1]);
    register_recording_scaler(&registries, 0, Some(Duration::ZERO));

    let config = base_config("lifecycle-scenario", vec![single_inputter("sequence", None)]);
    let instance = ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).unwrap();

    assert_eq!(instance.stop(Duration::from_secs(1)).await.unwrap_err(), LifecycleError::NotRunning);
    assert_eq!(instance.cancel_stop().unwrap_err(), LifecycleError::NotStopped);

    let handle = tokio::spawn(Arc::clone(&instance).run());
    tokio::task::yield_now().await;
    assert_eq!(Arc::clone(&instance).run().await.unwrap_err(), LifecycleError::AlreadyRunning);

    instance.stop(Duration::from_millis(50)).await.unwrap();
    assert_eq!(instance.cancel_stop().unwrap(), ());
    let _ = handle.await;
}

#[test]
fn build_rejects_missing_name_and_missing_inputters() {
    let registries = registries();
    register_sequence_gatherer(&registries, vec![1]);
    register_recording_scaler(&registries, 0, None);

    let mut config = base_config("", vec![single_inputter("sequence", None)]);
    assert!(ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).is_err());

    config.name = "named".to_string();
    config.inputters.clear();
    assert!(ladder_core::Autoscaler::build(&config, false, &registries, Arc::new(NoopMetricsHooks), Arc::new(NoopHealthHooks)).is_err());
}
