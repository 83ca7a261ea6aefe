//! Failure taxonomy and stable exit codes
//!
//! Every error that can end a run is a [`JobError`]. Its [`FailureKind`]
//! picks the process exit code; a finished build maps its result through
//! [`ExitCode::for_result`].

use std::io;
use std::path::PathBuf;

use jenkdo_protocol::{BuildResult, ProtocolError};

use crate::client::TransportError;
use crate::config::ConfigError;
use crate::job::HandleError;
use crate::lifecycle::TeardownFailure;
use crate::poll::WaitError;
use crate::template::TemplateError;

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Build succeeded (or its result was ignored)
    Success = 0,
    /// Server rejection, bad input or configuration, failed teardown
    Fatal = 1,
    /// Build request was not accepted into the queue
    TriggerRejected = 2,
    /// Network failure talking to the server
    Transport = 20,
    /// Build finished with FAILURE
    BuildFailed = 40,
    /// Build finished UNSTABLE
    BuildUnstable = 41,
    /// Build finished NOT_BUILT or with an unrecognised result
    BuildNotBuilt = 42,
    /// Interrupted, aborted, or declined at the prompt
    Cancelled = 80,
    /// A wait exceeded its configured timeout
    TimedOut = 81,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Exit code for a finished build's terminal result
    pub fn for_result(result: Option<&BuildResult>) -> Self {
        match result {
            Some(BuildResult::Success) => ExitCode::Success,
            Some(BuildResult::Unstable) => ExitCode::BuildUnstable,
            Some(BuildResult::Failure) => ExitCode::BuildFailed,
            Some(BuildResult::Aborted) => ExitCode::Cancelled,
            Some(BuildResult::NotBuilt) | Some(BuildResult::Other(_)) | None => {
                ExitCode::BuildNotBuilt
            }
        }
    }
}

/// Failure kind - categorizes the cause of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Unreadable pipeline/template file or unusable job name
    Input,
    /// Configuration missing or invalid
    Config,
    /// Template has no placeholder
    Template,
    /// Server answered a state-changing call with an unexpected status
    Rejected,
    /// Build request not accepted
    TriggerRejected,
    /// Connection or timeout at the HTTP layer
    Transport,
    /// Response did not decode
    Protocol,
    /// Interrupted, aborted in queue, or declined
    Cancelled,
    /// A wait timed out
    TimedOut,
    /// A teardown action failed
    Teardown,
}

impl FailureKind {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::Input
            | FailureKind::Config
            | FailureKind::Template
            | FailureKind::Rejected
            | FailureKind::Protocol
            | FailureKind::Teardown => ExitCode::Fatal,
            FailureKind::TriggerRejected => ExitCode::TriggerRejected,
            FailureKind::Transport => ExitCode::Transport,
            FailureKind::Cancelled => ExitCode::Cancelled,
            FailureKind::TimedOut => ExitCode::TimedOut,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Input => "Input file error",
            FailureKind::Config => "Configuration error",
            FailureKind::Template => "Job template error",
            FailureKind::Rejected => "Server rejected the request",
            FailureKind::TriggerRejected => "Build could not be started",
            FailureKind::Transport => "Server unreachable",
            FailureKind::Protocol => "Unexpected server response",
            FailureKind::Cancelled => "Cancelled",
            FailureKind::TimedOut => "Timed out",
            FailureKind::Teardown => "Cleanup failed",
        }
    }
}

/// Top-level error for a lifecycle run
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("cannot read '{}': {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot derive a job name from '{0}'")]
    InvalidName(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("server rejected {operation} of job '{job}' with HTTP {status}")]
    Rejected {
        operation: &'static str,
        job: String,
        status: u16,
        artifact: Option<PathBuf>,
    },

    #[error("build of job '{job}' was not accepted")]
    TriggerRejected { job: String },

    #[error("queue item of job '{job}' was cancelled on the server")]
    QueueItemCancelled { job: String },

    #[error("script execution failed with HTTP {status}")]
    ScriptRejected { status: u16 },

    #[error("declined at the confirmation prompt")]
    Declined,

    #[error("{} teardown action(s) failed", failures.len())]
    TeardownFailed { failures: Vec<TeardownFailure> },
}

impl JobError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            JobError::Input { .. } | JobError::InvalidName(_) => FailureKind::Input,
            JobError::Template(_) => FailureKind::Template,
            JobError::Config(_) => FailureKind::Config,
            JobError::Transport(_) => FailureKind::Transport,
            JobError::Protocol(_) | JobError::Handle(_) => FailureKind::Protocol,
            JobError::Wait(WaitError::Cancelled { .. }) => FailureKind::Cancelled,
            JobError::Wait(WaitError::TimedOut { .. }) => FailureKind::TimedOut,
            JobError::Rejected { .. } | JobError::ScriptRejected { .. } => FailureKind::Rejected,
            JobError::TriggerRejected { .. } => FailureKind::TriggerRejected,
            JobError::QueueItemCancelled { .. } | JobError::Declined => FailureKind::Cancelled,
            JobError::TeardownFailed { .. } => FailureKind::Teardown,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.failure_kind().exit_code()
    }
}
