//! Scoped teardown
//!
//! A stack of cleanup actions. Each side-effecting step that succeeds
//! pushes the action that undoes it; whatever is still armed when the run
//! ends is executed in reverse order. Every action runs isolated: an error
//! or a panic in one is recorded and the next still runs.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Cleanup owed to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownAction {
    /// Delete the transient job
    DeleteJob,
    /// Stop the build (cancel the queue item or abort the running build)
    StopBuild,
}

impl fmt::Display for TeardownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownAction::DeleteJob => write!(f, "delete job"),
            TeardownAction::StopBuild => write!(f, "stop build"),
        }
    }
}

/// One action that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub action: TeardownAction,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Teardown {
    stack: Vec<TeardownAction>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm an action; arming twice is a no-op
    pub fn push(&mut self, action: TeardownAction) {
        if !self.stack.contains(&action) {
            self.stack.push(action);
        }
    }

    /// Remove an armed action; returns whether it was armed
    pub fn disarm(&mut self, action: TeardownAction) -> bool {
        let before = self.stack.len();
        self.stack.retain(|armed| *armed != action);
        self.stack.len() != before
    }

    pub fn is_armed(&self, action: TeardownAction) -> bool {
        self.stack.contains(&action)
    }

    /// Armed actions in registration order
    pub fn pending(&self) -> &[TeardownAction] {
        &self.stack
    }

    /// Run every armed action, most recent first, and empty the stack
    pub fn unwind<E, F>(&mut self, mut run: F) -> Vec<TeardownFailure>
    where
        E: fmt::Display,
        F: FnMut(TeardownAction) -> Result<(), E>,
    {
        let mut failures = Vec::new();
        while let Some(action) = self.stack.pop() {
            let message = match panic::catch_unwind(AssertUnwindSafe(|| run(action))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            failures.push(TeardownFailure { action, message });
        }
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
