//! `HealthHooks` backing store for the `/health` endpoint.
//!
//! The core only ever calls `register`, at instance construction: per spec,
//! transient tick failures never flip an instance unhealthy, and a Stopped
//! instance is still "healthy" (it reports its remaining pause duration).
//! The only thing that legitimately marks an entry unhealthy is its
//! supervising task in `main.rs` observing `run()` itself return an error,
//! which `report` records.

use std::collections::HashMap;
use std::sync::Mutex;

use ladder_core::HealthHooks;

#[derive(Clone)]
struct Entry {
    healthy: bool,
    message: String,
}

#[derive(Default)]
pub struct AgentHealth {
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl AgentHealth {
    pub fn new() -> Self {
        AgentHealth::default()
    }

    /// Snapshot of `group -> {name -> (healthy, message)}` for the
    /// health-check endpoint to render.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, (bool, String)>> {
        let entries = self.entries.lock().expect("health lock poisoned");
        let mut groups: HashMap<String, HashMap<String, (bool, String)>> = HashMap::new();
        for ((group, name), entry) in entries.iter() {
            groups
                .entry(group.clone())
                .or_default()
                .insert(name.clone(), (entry.healthy, entry.message.clone()));
        }
        groups
    }
}

impl HealthHooks for AgentHealth {
    fn register(&self, group: &str, name: &str) {
        let mut entries = self.entries.lock().expect("health lock poisoned");
        entries.insert(
            (group.to_string(), name.to_string()),
            Entry {
                healthy: true,
                message: "registered".to_string(),
            },
        );
    }

    fn report(&self, group: &str, name: &str, healthy: bool, message: String) {
        let mut entries = self.entries.lock().expect("health lock poisoned");
        entries.insert((group.to_string(), name.to_string()), Entry { healthy, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_report_overwrites() {
        let health = AgentHealth::new();
        health.register("autoscaler", "a");
        assert_eq!(health.snapshot()["autoscaler"]["a"].0, true);
        health.report("autoscaler", "a", false, "crashed".to_string());
        let snap = health.snapshot();
        assert_eq!(snap["autoscaler"]["a"], (false, "crashed".to_string()));
    }
}
