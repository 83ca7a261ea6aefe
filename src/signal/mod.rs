//! Interrupt handling (SIGINT/SIGTERM)
//!
//! The first interrupt raises the cancellation flag. Cancellable wait loops
//! observe it and return [`WaitError::Cancelled`](crate::poll::WaitError),
//! which unwinds the lifecycle through its teardown (stop the build, delete
//! the job).
//!
//! A second interrupt exits on the spot with the cancelled exit code,
//! abandoning whatever teardown is still running.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::ExitCode;

/// Interrupts received so far
///
/// Shared between the installed handler and every [`Pacer`](crate::poll::Pacer).
#[derive(Debug, Default)]
pub struct SignalState {
    received: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// At least one interrupt arrived
    pub fn is_cancel_requested(&self) -> bool {
        self.signal_count() >= 1
    }

    /// A second interrupt arrived
    pub fn is_immediate_exit(&self) -> bool {
        self.signal_count() >= 2
    }

    pub fn signal_count(&self) -> u8 {
        self.received.load(Ordering::SeqCst)
    }

    /// Count one interrupt and say what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        let previous = self
            .received
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
            .unwrap_or(u8::MAX);

        match previous {
            0 => SignalAction::Unwind,
            1 => SignalAction::Exit,
            _ => SignalAction::Ignore,
        }
    }
}

/// What the handler does for one interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Let the wait loops notice and run teardown
    Unwind,
    /// Leave now
    Exit,
    Ignore,
}

/// Process-wide Ctrl+C handler feeding a [`SignalState`]
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn with_state(state: Arc<SignalState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Register with the OS; `ctrlc` allows this once per process
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::Unwind => {
                eprintln!("\n> Interrupted, stopping the build and removing the job (Ctrl+C again to skip)");
            }
            SignalAction::Exit => {
                eprintln!("\n> Interrupted twice, exiting without cleanup");
                std::process::exit(ExitCode::Cancelled.as_i32());
            }
            SignalAction::Ignore => {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_until_first_interrupt() {
        let state = SignalState::new();
        assert!(!state.is_cancel_requested());
        assert!(!state.is_immediate_exit());
    }

    #[test]
    fn test_interrupt_escalation() {
        let state = SignalState::new();

        assert_eq!(state.handle_signal(), SignalAction::Unwind);
        assert!(state.is_cancel_requested());
        assert!(!state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::Exit);
        assert!(state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }

    #[test]
    fn test_count_saturates() {
        let state = SignalState::new();
        for _ in 0..300 {
            state.handle_signal();
        }
        assert_eq!(state.signal_count(), u8::MAX);
        assert!(state.is_cancel_requested());
    }

    #[test]
    fn test_handler_shares_state() {
        let state = Arc::new(SignalState::new());
        let handler = SignalHandler::with_state(Arc::clone(&state));

        handler.state().handle_signal();

        assert!(state.is_cancel_requested());
    }
}
