//! The externally-visible lifecycle status of an autoscaler instance.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Stopped,
    Disabled,
}

/// `stop_deadline` is only meaningful when `state == Stopped`. Tracked as a
/// wall-clock `SystemTime` rather than a monotonic `Instant` because it is
/// reported verbatim (as epoch seconds) to HTTP clients, which have no way
/// to interpret a process-local `Instant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: LifecycleState,
    pub stop_deadline: Option<SystemTime>,
}

impl Status {
    pub fn running() -> Self {
        Status {
            state: LifecycleState::Running,
            stop_deadline: None,
        }
    }

    pub fn stopped(deadline: SystemTime) -> Self {
        Status {
            state: LifecycleState::Stopped,
            stop_deadline: Some(deadline),
        }
    }

    pub fn disabled() -> Self {
        Status {
            state: LifecycleState::Disabled,
            stop_deadline: None,
        }
    }

    /// The stop deadline as seconds since the Unix epoch, for clients that
    /// don't share our clock.
    pub fn stop_deadline_unix(&self) -> Option<u64> {
        self.stop_deadline.map(|d| d.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            LifecycleState::Running => f.write_str("running"),
            LifecycleState::Disabled => f.write_str("disabled"),
            LifecycleState::Stopped => {
                let remaining = self
                    .stop_deadline
                    .and_then(|d| d.duration_since(SystemTime::now()).ok())
                    .unwrap_or(Duration::ZERO);
                write!(f, "stopped for {remaining:?} more")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_display_mentions_remaining() {
        let status = Status::stopped(SystemTime::now() + Duration::from_secs(5));
        assert!(status.to_string().starts_with("stopped for"));
    }

    #[test]
    fn stop_deadline_unix_reports_epoch_seconds() {
        let epoch_plus_10 = UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(Status::stopped(epoch_plus_10).stop_deadline_unix(), Some(10));
    }

    #[test]
    fn running_display() {
        assert_eq!(Status::running().to_string(), "running");
    }
}
