//! Jenkdo Protocol Types
//!
//! Endpoint layout and response decoding for the automation server's job,
//! queue, build and progressive-log APIs. Nothing in this crate performs I/O.

pub mod build;
pub mod endpoints;
pub mod error;
pub mod progressive;
pub mod queue;

pub use build::{BuildResult, BuildStatus};
pub use endpoints::{child_url, Endpoints};
pub use error::ProtocolError;
pub use progressive::{LogFetch, RawLogResponse};
pub use queue::{queue_id_from_location, Executable, QueueDecision, QueueItem};

/// Parent folder used for transient jobs when none is configured.
pub const DEFAULT_FOLDER: &str = "debug";

/// Fixed cadence of every polling loop, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Queue ticks after which the waiting-in-queue progress line is shown.
pub const QUEUE_PROGRESS_THRESHOLD_TICKS: u64 = 9;

/// Console lines containing this marker are pipeline-framework bookkeeping.
pub const PIPELINE_MARKER: &str = "[Pipeline]";

/// Form field carrying the pipeline text for validation.
pub const VALIDATE_FIELD: &str = "jenkinsfile";

/// Form field carrying the script text for the script console.
pub const SCRIPT_FIELD: &str = "script";
