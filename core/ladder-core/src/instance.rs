//! The autoscaler instance: construction, the periodic loop, lifecycle
//! transitions, and the tick that drives one pass of the pipeline.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{Mutex as TokioMutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::config::AutoscalerConfig;
use crate::context::IterationContext;
use crate::error::{LifecycleError, TickError};
use crate::hooks::{HealthHooks, MetricsHooks, RoleLabels, HEALTH_GROUP};
use crate::inputter::Inputter;
use crate::quantity::Quantity;
use crate::registry::Registries;
use crate::roles::{Filterer, Scaler, Solver};
use crate::status::Status;

struct LifecycleInner {
    running: bool,
    /// Wall-clock, not monotonic: reported verbatim (as epoch seconds) to
    /// HTTP clients on the 409 "already stopped" response, which has no way
    /// to interpret an `Instant`.
    stop_deadline: Option<SystemTime>,
    /// Ends the current run of the loop. Recreated on every `run()`, never
    /// reused once cancelled.
    loop_cancel: Option<CancellationToken>,
    /// Single-use-per-stop-cycle signal that unblocks an in-progress pause
    /// early. An idempotent `Notify`: a `cancel_stop()` with nothing waiting
    /// is simply dropped, which is how the "unbuffered send could deadlock"
    /// hazard is avoided (see SPEC_FULL.md §9).
    pause_cancel: Option<Arc<Notify>>,
    /// Cancellation token for the tick currently in flight, if any. `stop()`
    /// cancels it so role implementations observe cancellation instead of
    /// a fresh tick racing the pause.
    current_iteration_cancel: Option<CancellationToken>,
}

impl Default for LifecycleInner {
    fn default() -> Self {
        LifecycleInner {
            running: false,
            stop_deadline: None,
            loop_cancel: None,
            pause_cancel: None,
            current_iteration_cancel: None,
        }
    }
}

/// One configured control loop with its own roles, interval, and lifecycle.
pub struct Autoscaler {
    name: String,
    interval: Duration,
    warmup: Duration,
    scaling_wait_timeout: Duration,
    dry_run: bool,

    scaler: TokioMutex<Box<dyn Scaler>>,
    scaler_kind: String,
    filterers: TokioMutex<Vec<(String, Box<dyn Filterer>)>>,
    solver: TokioMutex<Option<Box<dyn Solver>>>,
    solver_kind: Option<String>,
    inputters: Vec<Arc<TokioMutex<Inputter>>>,

    metrics: Arc<dyn MetricsHooks>,
    health: Arc<dyn HealthHooks>,

    start_time: StdMutex<Option<Instant>>,
    state: StdMutex<LifecycleInner>,
}

impl Autoscaler {
    /// Validates `config`, builds every role from the given registries, and
    /// registers the instance with the health hook. Any factory failure
    /// aborts construction.
    pub fn build(
        config: &AutoscalerConfig,
        dry_run: bool,
        registries: &Registries,
        metrics: Arc<dyn MetricsHooks>,
        health: Arc<dyn HealthHooks>,
    ) -> anyhow::Result<Arc<Self>> {
        config.validate()?;

        if config.interval.is_zero() {
            log::warn!(
                "autoscaler '{}': interval is 0, it will tick as fast as possible",
                config.name
            );
        }

        let scaler = registries.scalers.create(&config.scale.kind, &config.scale.config)?;
        let scaler_kind = config.scale.kind.clone();

        let mut filterers = Vec::with_capacity(config.filters.len());
        for f in &config.filters {
            filterers.push((f.kind.clone(), registries.filterers.create(&f.kind, &f.config)?));
        }

        let (solver, solver_kind) = if config.inputters.len() > 1 {
            let solve_cfg = config.solve.as_ref().expect("validate() requires solve.kind here");
            (Some(registries.solvers.create(&solve_cfg.kind, &solve_cfg.config)?), Some(solve_cfg.kind.clone()))
        } else {
            (None, None)
        };

        let mut inputters = Vec::with_capacity(config.inputters.len());
        for i in &config.inputters {
            let inputter = Inputter::build(i, &registries.gatherers, &registries.arrangers, Arc::clone(&metrics))?;
            inputters.push(Arc::new(TokioMutex::new(inputter)));
        }

        health.register(HEALTH_GROUP, &config.name);

        Ok(Arc::new(Autoscaler {
            name: config.name.clone(),
            interval: config.interval,
            warmup: config.warmup,
            scaling_wait_timeout: config.scaling_wait_timeout,
            dry_run,
            scaler: TokioMutex::new(scaler),
            scaler_kind,
            filterers: TokioMutex::new(filterers),
            solver: TokioMutex::new(solver),
            solver_kind,
            inputters,
            metrics,
            health,
            start_time: StdMutex::new(None),
            state: StdMutex::new(LifecycleInner::default()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn running(&self) -> bool {
        self.state.lock().expect("lifecycle lock poisoned").running
    }

    /// The instance's current externally-visible status. Before the first
    /// `run()`, there is no meaningful deadline to report, so this falls
    /// back to "stopped as of now" rather than inventing an idle variant;
    /// instances that were never constructed because they're disabled in
    /// configuration never reach this type at all (see agent-side handling).
    pub fn status(&self) -> Status {
        let state = self.state.lock().expect("lifecycle lock poisoned");
        if state.running {
            Status::running()
        } else {
            Status::stopped(state.stop_deadline.unwrap_or_else(SystemTime::now))
        }
    }

    /// Starts the periodic loop. Fails if already running. Runs until
    /// `stop()` cancels it, then returns `Ok(())` — tick failures never end
    /// the loop, only lifecycle control does.
    pub async fn run(self: Arc<Self>) -> Result<(), LifecycleError> {
        let loop_cancel = {
            let mut state = self.state.lock().expect("lifecycle lock poisoned");
            if state.running {
                return Err(LifecycleError::AlreadyRunning);
            }
            state.running = true;
            state.stop_deadline = None;
            let token = CancellationToken::new();
            state.loop_cancel = Some(token.clone());
            token
        };
        *self.start_time.lock().expect("start_time lock poisoned") = Some(Instant::now());
        self.metrics.set_running(&self.name, true);
        log::info!("autoscaler '{}' started", self.name);

        let period = if self.interval.is_zero() { Duration::from_millis(1) } else { self.interval };
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let iteration_cancel = CancellationToken::new();
                    {
                        let mut state = self.state.lock().expect("lifecycle lock poisoned");
                        state.current_iteration_cancel = Some(iteration_cancel.clone());
                    }
                    let ctx = IterationContext::new(self.name.clone(), iteration_cancel);
                    if let Err(e) = self.tick(ctx).await {
                        log::error!("autoscaler '{}' tick failed: {e}", self.name);
                    }
                    self.state.lock().expect("lifecycle lock poisoned").current_iteration_cancel = None;
                }
                _ = loop_cancel.cancelled() => {
                    break;
                }
            }
        }

        {
            let mut state = self.state.lock().expect("lifecycle lock poisoned");
            state.running = false;
            state.loop_cancel = None;
        }
        self.metrics.set_running(&self.name, false);
        log::info!("autoscaler '{}' stopped", self.name);
        Ok(())
    }

    /// Pauses the loop for `duration`, or until `cancel_stop()` is called,
    /// whichever comes first. The resumption is owned entirely by the
    /// detached task spawned here: nothing else ever calls `run()` again for
    /// this pause cycle, so the instance resumes exactly once (see
    /// SPEC_FULL.md §9).
    pub async fn stop(self: &Arc<Self>, duration: Duration) -> Result<(), LifecycleError> {
        let (loop_cancel, pause_notify) = {
            let mut state = self.state.lock().expect("lifecycle lock poisoned");
            if !state.running {
                return Err(LifecycleError::NotRunning);
            }
            state.running = false;
            state.stop_deadline = Some(SystemTime::now() + duration);
            if let Some(tok) = state.current_iteration_cancel.take() {
                tok.cancel();
            }
            let loop_cancel = state.loop_cancel.take().expect("running implies loop_cancel is set");
            let pause_notify = Arc::new(Notify::new());
            state.pause_cancel = Some(Arc::clone(&pause_notify));
            (loop_cancel, pause_notify)
        };
        loop_cancel.cancel();
        log::info!("autoscaler '{}' stopping for {duration:?}", self.name);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    log::debug!("autoscaler '{}' pause elapsed, resuming", this.name);
                }
                _ = pause_notify.notified() => {
                    log::debug!("autoscaler '{}' pause cancelled early, resuming", this.name);
                }
            }
            {
                let mut state = this.state.lock().expect("lifecycle lock poisoned");
                state.stop_deadline = None;
                state.pause_cancel = None;
            }
            if let Err(e) = Arc::clone(&this).run().await {
                log::error!("autoscaler '{}' failed to resume after stop: {e}", this.name);
            }
        });
        Ok(())
    }

    /// Ends an in-progress pause early. Fails if the instance is currently
    /// running, or was never paused to begin with.
    pub fn cancel_stop(&self) -> Result<(), LifecycleError> {
        let state = self.state.lock().expect("lifecycle lock poisoned");
        if state.running {
            return Err(LifecycleError::NotStopped);
        }
        match &state.pause_cancel {
            Some(notify) => {
                notify.notify_one();
                Ok(())
            }
            None => Err(LifecycleError::NotStopped),
        }
    }

    /// One pass of the pipeline: read the current quantity, fan out to every
    /// inputter, solve, filter, gate on warmup, then scale and wait.
    async fn tick(&self, ctx: IterationContext) -> Result<(), TickError> {
        let tick_start = Instant::now();
        self.metrics.incr_iteration(&self.name);

        let scale_labels = RoleLabels {
            autoscaler: &self.name,
            inputter: None,
            kind: &self.scaler_kind,
        };
        let current = {
            let mut scaler = self.scaler.lock().await;
            let start = Instant::now();
            let result = scaler.current(&ctx);
            self.metrics.observe_role_duration("current", &scale_labels, start.elapsed());
            match result {
                Ok(q) => {
                    self.metrics.set_role_quantity("current", &scale_labels, q);
                    q
                }
                Err(e) => {
                    self.metrics.incr_role_error("current", &scale_labels);
                    return Err(TickError::Current(e));
                }
            }
        };

        let mut join_set = tokio::task::JoinSet::new();
        for inputter in &self.inputters {
            let inputter = Arc::clone(inputter);
            let ctx = ctx.clone();
            join_set.spawn(async move {
                let mut guard = inputter.lock().await;
                let name = guard.name().to_string();
                (name, guard.gather_and_arrange(&ctx, current))
            });
        }

        let mut successes: Vec<Quantity> = Vec::with_capacity(self.inputters.len());
        let mut errors: Vec<String> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(q))) => successes.push(q),
                Ok((name, Err(e))) => errors.push(format!("{name}: {e}")),
                Err(join_err) => log::error!("autoscaler '{}' inputter task panicked: {join_err}", self.name),
            }
        }
        if !errors.is_empty() {
            let mut msg = format!("solver got {} errors from inputs:", errors.len());
            for e in &errors {
                msg = format!("{msg} {e};");
            }
            log::warn!("autoscaler '{}': {msg}", self.name);
        }
        if successes.is_empty() {
            return Err(TickError::NoSuccessfulInputs);
        }

        let solved = if successes.len() == 1 {
            successes[0]
        } else {
            let solve_labels = RoleLabels {
                autoscaler: &self.name,
                inputter: None,
                kind: self.solver_kind.as_deref().unwrap_or(""),
            };
            let mut solver = self.solver.lock().await;
            let solver = solver.as_mut().expect("solver is required when len(inputters) > 1");
            let start = Instant::now();
            let result = solver.solve(&ctx, &successes);
            self.metrics.observe_role_duration("solve", &solve_labels, start.elapsed());
            match result {
                Ok(q) => {
                    self.metrics.set_role_quantity("solve", &solve_labels, q);
                    q
                }
                Err(e) => {
                    self.metrics.incr_role_error("solve", &solve_labels);
                    return Err(TickError::Solve(e));
                }
            }
        };

        let mut filtered = solved;
        {
            let mut filterers = self.filterers.lock().await;
            for (kind, filterer) in filterers.iter_mut() {
                let filter_labels = RoleLabels {
                    autoscaler: &self.name,
                    inputter: None,
                    kind,
                };
                let start = Instant::now();
                let result = filterer.filter(&ctx, current, filtered);
                self.metrics.observe_role_duration("filter", &filter_labels, start.elapsed());
                match result {
                    Ok(step) => {
                        filtered = step.quantity;
                        self.metrics.set_role_quantity("filter", &filter_labels, filtered);
                        if step.stop {
                            break;
                        }
                    }
                    Err(e) => {
                        self.metrics.incr_role_error("filter", &filter_labels);
                        log::warn!("autoscaler '{}': filter '{kind}' failed: {e}", self.name);
                        return Err(TickError::Filter(e));
                    }
                }
            }
        }
        if filtered != solved {
            log::info!("autoscaler '{}': filter chain changed {solved} to {filtered}", self.name);
        }

        let warming_up = self
            .start_time
            .lock()
            .expect("start_time lock poisoned")
            .map(|t| t.elapsed() < self.warmup)
            .unwrap_or(false);
        if warming_up {
            log::info!("autoscaler '{}': still warming up, skipping scale", self.name);
            self.metrics.observe_iteration_duration(&self.name, tick_start.elapsed());
            return Ok(());
        }

        if self.dry_run {
            log::info!("autoscaler '{}': dry-run, would scale towards {filtered}", self.name);
            self.metrics.observe_iteration_duration(&self.name, tick_start.elapsed());
            return Ok(());
        }

        let mut scaler = self.scaler.lock().await;
        let start = Instant::now();
        let scale_result = scaler.scale(&ctx, filtered);
        self.metrics.observe_role_duration("scale", &scale_labels, start.elapsed());
        let (scaled, mode) = match scale_result {
            Ok(v) => {
                self.metrics.set_role_quantity("scale", &scale_labels, v.0);
                v
            }
            Err(e) => {
                self.metrics.incr_role_error("scale", &scale_labels);
                return Err(TickError::Scale(e));
            }
        };
        if mode.is_scaling() {
            let start = Instant::now();
            let wait_result = if self.scaling_wait_timeout.is_zero() {
                scaler.wait(&ctx, scaled, mode).await
            } else {
                tokio::select! {
                    res = scaler.wait(&ctx, scaled, mode) => res,
                    _ = tokio::time::sleep(self.scaling_wait_timeout) => {
                        self.metrics.observe_role_duration("wait", &scale_labels, start.elapsed());
                        self.metrics.incr_role_error("wait", &scale_labels);
                        return Err(TickError::WaitTimeout(self.scaling_wait_timeout));
                    }
                }
            };
            self.metrics.observe_role_duration("wait", &scale_labels, start.elapsed());
            if let Err(e) = wait_result {
                self.metrics.incr_role_error("wait", &scale_labels);
                return Err(TickError::Wait(e));
            }
        }
        drop(scaler);

        self.metrics.observe_iteration_duration(&self.name, tick_start.elapsed());
        Ok(())
    }
}
