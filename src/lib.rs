//! jenkdo - run a pipeline file as a throwaway Jenkins job
//!
//! Validates the pipeline, creates a transient job from a template, triggers
//! a build, waits for it to leave the queue, streams its console output and
//! cleans up the job and the build however the run ends.

pub mod cancel;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod mock;
pub mod poll;
pub mod registrar;
pub mod script;
pub mod signal;
pub mod stream;
pub mod template;
pub mod terminal;
pub mod timeout;
pub mod trigger;
pub mod validate;

pub use error::{ExitCode, FailureKind, JobError};
pub use job::RemoteJob;
pub use lifecycle::{BuildOptions, Confirmation, Lifecycle};
pub use stream::BuildOutcome;
