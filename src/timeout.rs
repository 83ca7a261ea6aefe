//! Timeout enforcement for the wait loops
//!
//! Every wait is unbounded unless configured:
//! - `queue_seconds`: how long a build may sit in the queue
//! - `stream_overall_seconds`: wall-clock time spent streaming console output
//! - `stream_idle_seconds`: time without new console bytes
//! - `stop_seconds`: how long to wait for an aborted build to stop
//!
//! The enforcer does NOT cancel anything itself - it only reports timeout
//! conditions. Time is read from the injected clock, as an offset from the
//! clock's origin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound for any configured timeout (one day)
pub const MAX_TIMEOUT_SECONDS: u64 = 86400;

/// Timeout configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_overall_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_idle_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_seconds: Option<u64>,
}

impl TimeoutConfig {
    /// Validate bounds: each value in (0, 86400], idle not above overall
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        let values = [
            ("queue_seconds", self.queue_seconds),
            ("stream_overall_seconds", self.stream_overall_seconds),
            ("stream_idle_seconds", self.stream_idle_seconds),
            ("stop_seconds", self.stop_seconds),
        ];
        for (key, value) in values {
            if let Some(value) = value {
                if value == 0 || value > MAX_TIMEOUT_SECONDS {
                    return Err(TimeoutValidationError::OutOfBounds { key, value });
                }
            }
        }

        if let (Some(idle), Some(overall)) = (self.stream_idle_seconds, self.stream_overall_seconds) {
            if idle > overall {
                return Err(TimeoutValidationError::IdleExceedsOverall { idle, overall });
            }
        }

        Ok(())
    }

    pub fn queue(&self) -> Limits {
        Limits::overall(secs(self.queue_seconds))
    }

    pub fn stream(&self) -> Limits {
        Limits {
            overall: secs(self.stream_overall_seconds),
            idle: secs(self.stream_idle_seconds),
        }
    }

    pub fn stop(&self) -> Limits {
        Limits::overall(secs(self.stop_seconds))
    }
}

fn secs(value: Option<u64>) -> Option<Duration> {
    value.map(Duration::from_secs)
}

/// Timeout validation errors
#[derive(Debug, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("{key} must be in (0, {MAX_TIMEOUT_SECONDS}], got {value}")]
    OutOfBounds { key: &'static str, value: u64 },

    #[error("stream_idle_seconds ({idle}) must not exceed stream_overall_seconds ({overall})")]
    IdleExceedsOverall { idle: u64, overall: u64 },
}

/// Limits applied to one wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub overall: Option<Duration>,
    pub idle: Option<Duration>,
}

impl Limits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn overall(overall: Option<Duration>) -> Self {
        Self {
            overall,
            idle: None,
        }
    }
}

/// Timeout check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    /// No timeout has occurred
    Ok,
    /// Overall wall-clock timeout exceeded
    OverallTimeout,
    /// Idle timeout exceeded
    IdleTimeout,
}

impl TimeoutStatus {
    /// Returns true if a timeout occurred
    pub fn is_timeout(&self) -> bool {
        !matches!(self, TimeoutStatus::Ok)
    }
}

/// Timeout enforcer for one wait
#[derive(Debug, Clone)]
pub struct TimeoutEnforcer {
    limits: Limits,

    /// When the wait started
    start: Duration,

    /// Last activity (set by the console streamer on new bytes)
    last_activity: Duration,
}

impl TimeoutEnforcer {
    pub fn new(limits: Limits, now: Duration) -> Self {
        Self {
            limits,
            start: now,
            last_activity: now,
        }
    }

    /// Call this when new data arrives
    pub fn record_activity(&mut self, now: Duration) {
        self.last_activity = now;
    }

    /// Check for timeout conditions; overall wins over idle
    pub fn check(&self, now: Duration) -> TimeoutStatus {
        if let Some(overall) = self.limits.overall {
            if self.elapsed(now) > overall {
                return TimeoutStatus::OverallTimeout;
            }
        }

        if let Some(idle) = self.limits.idle {
            if now.saturating_sub(self.last_activity) > idle {
                return TimeoutStatus::IdleTimeout;
            }
        }

        TimeoutStatus::Ok
    }

    /// Time since the wait started
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.start)
    }
}
