//! Paced waiting
//!
//! Every wait in the lifecycle (queue admission, console streaming, build
//! stop) is a fixed-interval poll. A [`Waiter`] moves through
//! `Waiting -> Resolved | TimedOut | Cancelled`: it sleeps on the injected
//! [`Clock`], applies the configured [`Limits`], and observes the interrupt
//! flag from [`SignalState`].

mod clock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::signal::SignalState;
use crate::timeout::{Limits, TimeoutEnforcer, TimeoutStatus};

/// What a wait is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    JobCreation,
    QueueAdmission,
    ConsoleOutput,
    BuildStop,
}

impl WaitPhase {
    /// Teardown waits must finish even after an interrupt
    pub fn is_cancellable(&self) -> bool {
        !matches!(self, WaitPhase::BuildStop)
    }
}

impl fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitPhase::JobCreation => f.write_str("job creation"),
            WaitPhase::QueueAdmission => f.write_str("queue admission"),
            WaitPhase::ConsoleOutput => f.write_str("console output"),
            WaitPhase::BuildStop => f.write_str("the build to stop"),
        }
    }
}

/// State of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Waiting,
    Resolved,
    TimedOut,
    Cancelled,
}

/// Why a wait ended without resolving
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("gave up waiting for {phase} after {}s{}", secs(.elapsed), idle_suffix(.idle))]
    TimedOut {
        phase: WaitPhase,
        elapsed: Duration,
        idle: bool,
    },

    #[error("interrupted while waiting for {phase}")]
    Cancelled { phase: WaitPhase },
}

fn secs(duration: &Duration) -> u64 {
    duration.as_secs()
}

fn idle_suffix(idle: &bool) -> &'static str {
    if *idle {
        " without new output"
    } else {
        ""
    }
}

/// Shared pacing context: clock, interrupt flag, poll interval
#[derive(Clone)]
pub struct Pacer {
    clock: Arc<dyn Clock>,
    signals: Arc<SignalState>,
    interval: Duration,
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock>, signals: Arc<SignalState>, interval: Duration) -> Self {
        Self {
            clock,
            signals,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn signals(&self) -> &SignalState {
        &self.signals
    }

    /// Fail fast between steps when an interrupt arrived
    pub fn ensure_not_cancelled(&self, phase: WaitPhase) -> Result<(), WaitError> {
        if phase.is_cancellable() && self.signals.is_cancel_requested() {
            return Err(WaitError::Cancelled { phase });
        }
        Ok(())
    }

    /// Start a wait bounded by `limits`
    pub fn waiter(&self, phase: WaitPhase, limits: Limits) -> Waiter<'_> {
        Waiter {
            pacer: self,
            phase,
            enforcer: TimeoutEnforcer::new(limits, self.clock.now()),
            ticks: 0,
            state: WaitState::Waiting,
        }
    }
}

/// One running wait
pub struct Waiter<'a> {
    pacer: &'a Pacer,
    phase: WaitPhase,
    enforcer: TimeoutEnforcer,
    ticks: u64,
    state: WaitState,
}

impl Waiter<'_> {
    pub fn phase(&self) -> WaitPhase {
        self.phase
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Number of completed pauses
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time spent in pauses (ticks times interval), excluding request time
    pub fn paced(&self) -> Duration {
        let ticks = u32::try_from(self.ticks).unwrap_or(u32::MAX);
        self.pacer
            .interval
            .checked_mul(ticks)
            .unwrap_or(Duration::MAX)
    }

    /// New data arrived; resets the idle limit
    pub fn record_activity(&mut self) {
        self.enforcer.record_activity(self.pacer.clock.now());
    }

    /// Evaluate interrupt and limits without sleeping
    pub fn check(&mut self) -> Result<(), WaitError> {
        if let Err(e) = self.pacer.ensure_not_cancelled(self.phase) {
            self.state = WaitState::Cancelled;
            return Err(e);
        }

        let now = self.pacer.clock.now();
        match self.enforcer.check(now) {
            TimeoutStatus::Ok => Ok(()),
            status => {
                self.state = WaitState::TimedOut;
                Err(WaitError::TimedOut {
                    phase: self.phase,
                    elapsed: self.enforcer.elapsed(now),
                    idle: status == TimeoutStatus::IdleTimeout,
                })
            }
        }
    }

    /// Sleep one interval, then re-check
    pub fn pause(&mut self) -> Result<(), WaitError> {
        self.check()?;
        self.pacer.clock.sleep(self.pacer.interval);
        self.ticks += 1;
        self.check()
    }

    pub fn resolve(&mut self) {
        self.state = WaitState::Resolved;
    }
}
