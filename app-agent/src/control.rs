//! The HTTP control surface: instance listing, stop/cancel-stop, the
//! health-check endpoint, and `/metrics`.
//!
//! Grounded in the teacher's prometheus-exporter plugin for the server
//! skeleton (`make_service_fn`/`service_fn`, `Server::bind(..).serve(..)`)
//! and extended with hand-rolled routing for the extra endpoints, since the
//! dependency stack carries no router crate.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use ladder_core::{Autoscaler, LifecycleState};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde_json::json;

use crate::health::AgentHealth;

pub struct AppState {
    pub instances: HashMap<String, Arc<Autoscaler>>,
    pub disabled_names: Vec<String>,
    pub health: Arc<AgentHealth>,
    pub registry: Arc<Mutex<Registry>>,
    pub started_at: Instant,
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("building a JSON response never fails")
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    json!({ "error": message.into() })
}

fn status_to_message(status: ladder_core::Status) -> String {
    status.to_string()
}

async fn list_autoscalers(state: &AppState) -> Response<Body> {
    let mut autoscalers = serde_json::Map::new();
    for (name, instance) in &state.instances {
        let status = instance.status();
        let status_label = match status.state {
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Disabled => "disabled",
        };
        autoscalers.insert(name.clone(), json!({ "status": status_label }));
    }
    json_response(StatusCode::OK, json!({ "autoscalers": autoscalers }))
}

async fn stop_autoscaler(state: &AppState, name: &str, duration_raw: &str) -> Response<Body> {
    let Some(instance) = state.instances.get(name) else {
        return json_response(StatusCode::BAD_REQUEST, error_body(format!("unknown autoscaler '{name}'")));
    };
    let duration: Duration = match humantime::parse_duration(duration_raw) {
        Ok(d) => d,
        Err(e) => return json_response(StatusCode::BAD_REQUEST, error_body(format!("invalid duration: {e}"))),
    };
    match instance.stop(duration).await {
        Ok(()) => json_response(StatusCode::ACCEPTED, json!({ "status": "stopping" })),
        Err(e) => {
            let mut body = error_body(e.to_string());
            if let Some(deadline) = instance.status().stop_deadline_unix() {
                let map = body.as_object_mut().expect("error_body always returns an object");
                map.insert("deadline".to_string(), json!(deadline));
                map.insert("required-action".to_string(), json!("Need to cancel current stop state first"));
            }
            json_response(StatusCode::CONFLICT, body)
        }
    }
}

async fn cancel_stop_autoscaler(state: &AppState, name: &str) -> Response<Body> {
    let Some(instance) = state.instances.get(name) else {
        return json_response(StatusCode::BAD_REQUEST, error_body(format!("unknown autoscaler '{name}'")));
    };
    match instance.cancel_stop() {
        Ok(()) => json_response(StatusCode::ACCEPTED, json!({ "status": "resuming" })),
        Err(e) => json_response(StatusCode::BAD_REQUEST, error_body(e.to_string())),
    }
}

async fn health_check(state: &AppState) -> Response<Body> {
    let mut groups = state.health.snapshot();
    let autoscaler_group = groups.entry("autoscaler".to_string()).or_default();
    for name in &state.disabled_names {
        autoscaler_group.entry(name.clone()).or_insert((true, "disabled".to_string()));
    }
    // Live instances override the registered placeholder message with their
    // current status, unless they were reported unhealthy by the
    // supervisor task (a crash outranks a stale "running").
    for (name, instance) in &state.instances {
        let entry = autoscaler_group.entry(name.clone()).or_insert((true, String::new()));
        if entry.0 {
            entry.1 = status_to_message(instance.status());
        }
    }

    let mut all_healthy = true;
    let mut rendered_groups = serde_json::Map::new();
    for (group, entries) in &groups {
        let mut rendered_entries = serde_json::Map::new();
        for (name, (healthy, message)) in entries {
            all_healthy &= *healthy;
            rendered_entries.insert(name.clone(), json!(message));
        }
        rendered_groups.insert(group.clone(), serde_json::Value::Object(rendered_entries));
    }

    let uptime = state.started_at.elapsed().as_secs_f64();
    let verdict = if all_healthy { "Ok" } else { "Error" };
    let status_code = if all_healthy { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    json_response(
        status_code,
        json!({
            "status": verdict,
            "uptime_seconds": uptime,
            "groups": rendered_groups,
        }),
    )
}

fn metrics_response(state: &AppState) -> Response<Body> {
    let registry = state.registry.lock().expect("metrics registry lock poisoned");
    let mut buf = String::new();
    if let Err(e) = encode(&mut buf, &*registry) {
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string()));
    }
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/openmetrics-text; version=1.0.0; charset=utf-8")
        .body(Body::from(buf))
        .expect("building the metrics response never fails")
}

async fn route(req: Request<Body>, state: Arc<AppState>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    let response = match method {
        Method::GET if segments.len() == 1 && segments[0] == "autoscalers" => list_autoscalers(&state).await,
        Method::GET if segments.len() == 1 && segments[0] == "health" => health_check(&state).await,
        Method::GET if segments.len() == 1 && segments[0] == "metrics" => metrics_response(&state),
        Method::PUT if segments.len() == 4 && segments[0] == "autoscalers" && segments[2] == "stop" => {
            stop_autoscaler(&state, segments[1], segments[3]).await
        }
        Method::PUT if segments.len() == 3 && segments[0] == "autoscalers" && segments[2] == "cancel-stop" => {
            cancel_stop_autoscaler(&state, segments[1]).await
        }
        _ => json_response(StatusCode::NOT_FOUND, error_body("no such route")),
    };
    Ok(response)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Infallible>(service_fn(move |req| route(req, Arc::clone(&state)))) }
    });
    log::info!("control surface listening on {addr}");
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
