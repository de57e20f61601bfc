//! Entry point: parses CLI flags, loads configuration, registers the
//! built-in blocks, builds one `Autoscaler` per enabled entry, and runs the
//! HTTP control surface alongside them.
//!
//! Unlike the teacher's prometheus-exporter plugin — which runs inside a
//! synchronous host process and spins up its own current-thread runtime —
//! this agent is async end-to-end, so the control surface just runs as a
//! task on the same multi-threaded runtime as everything else.

mod cli;
mod config;
mod control;
mod health;
mod metrics;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use env_logger::Env;
use ladder_core::{Autoscaler, Registries};
use prometheus_client::registry::Registry;
use tokio::signal;

use crate::control::AppState;
use crate::health::AgentHealth;
use crate::metrics::AgentMetrics;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9090";

fn init_logging(args: &cli::Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if args.json_log {
        builder.format(|f, record| {
            use std::io::Write;
            let line = serde_json::json!({
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(f, "{line}")
        });
    }
    builder.init();
}

fn build_registries() -> Registries {
    let registries = Registries::default();
    gather_common::register(&registries);
    arrange_common::register(&registries);
    solve_common::register(&registries);
    filter_common::register(&registries);
    scale_common::register(&registries);
    registries
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(&args);
    log::info!("starting ladder-agent v{VERSION}");

    let loaded = config::load(std::path::Path::new(&args.config_file))?;

    let mut seen_names = std::collections::HashSet::new();
    for autoscaler_config in &loaded.autoscalers {
        if !seen_names.insert(autoscaler_config.name.as_str()) {
            anyhow::bail!("duplicate autoscaler name '{}' in configuration", autoscaler_config.name);
        }
    }

    let mut metrics_registry = Registry::default();
    let agent_metrics = Arc::new(AgentMetrics::new(&mut metrics_registry));
    let health = Arc::new(AgentHealth::new());
    let registries = build_registries();

    let mut instances = HashMap::new();
    let mut disabled_names = Vec::new();

    for autoscaler_config in &loaded.autoscalers {
        if autoscaler_config.disabled {
            disabled_names.push(autoscaler_config.name.clone());
            continue;
        }
        let instance = Autoscaler::build(
            autoscaler_config,
            args.dry_run,
            &registries,
            Arc::clone(&agent_metrics) as Arc<dyn ladder_core::MetricsHooks>,
            Arc::clone(&health) as Arc<dyn ladder_core::HealthHooks>,
        )?;
        instances.insert(autoscaler_config.name.clone(), instance);
    }

    if instances.is_empty() {
        log::warn!("no enabled autoscalers configured, the agent will only serve the control surface");
    }

    // Any instance's loop returning an error is fatal to the whole process:
    // this channel lets the supervisor tasks below surface that into the
    // top-level `select!` without the loops themselves knowing about it.
    let (fatal_tx, mut fatal_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let mut join_set = tokio::task::JoinSet::new();
    for instance in instances.values() {
        let instance = Arc::clone(instance);
        let health = Arc::clone(&health);
        let fatal_tx = fatal_tx.clone();
        join_set.spawn(async move {
            let name = instance.name().to_string();
            if let Err(e) = instance.run().await {
                log::error!("autoscaler '{name}' exited with an error: {e}");
                health.report("autoscaler", &name, false, format!("crashed: {e}"));
                let _ = fatal_tx.send(format!("autoscaler '{name}' failed: {e}"));
            }
        });
    }
    drop(fatal_tx);

    let listen_address = args
        .listen_address
        .clone()
        .or(loaded.listen_address.clone())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
    let addr: SocketAddr = listen_address.parse()?;

    let state = Arc::new(AppState {
        instances,
        disabled_names,
        health,
        registry: Arc::new(Mutex::new(metrics_registry)),
        started_at: Instant::now(),
    });

    tokio::select! {
        result = control::serve(addr, state) => {
            if let Err(e) = result {
                log::error!("control surface stopped with an error: {e}");
            }
        }
        _ = signal::ctrl_c() => {
            log::info!("received shutdown signal");
        }
        Some(reason) = fatal_rx.recv() => {
            log::error!("fatal: {reason}");
            std::process::exit(1);
        }
    }

    join_set.shutdown().await;
    // Give in-flight ticks a moment to observe cancellation before the
    // process exits.
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    Ok(())
}
