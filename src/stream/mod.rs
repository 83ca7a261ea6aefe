//! Console streaming
//!
//! [`ConsoleStreamer::watch`] follows a running build's console with the
//! progressive-text protocol until the build stops, then reports the
//! terminal result. Each iteration reads the build status first and the
//! log second, so the iteration that sees the build finished still drains
//! whatever was written before it finished. The result reported is the one
//! from that finished status; status reads are never fatal.

mod cursor;

use std::sync::Arc;

use jenkdo_protocol::progressive::{MORE_DATA_HEADER, TEXT_SIZE_HEADER};
use jenkdo_protocol::{BuildResult, BuildStatus, LogFetch, ProtocolError, RawLogResponse};
use tracing::{debug, info, warn};

pub use cursor::{is_visible, LogCursor, StreamUpdate};

use crate::client::{HttpResponse, JenkinsClient};
use crate::error::{ExitCode, JobError};
use crate::poll::{Pacer, WaitPhase};
use crate::terminal::Terminal;
use crate::timeout::Limits;

/// How a watched build ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub build_number: Option<u64>,
    pub result: Option<BuildResult>,
    /// Console bytes received
    pub console_bytes: u64,
    /// Console lines hidden by the marker filter
    pub suppressed_lines: u64,
}

impl BuildOutcome {
    pub fn exit_code(&self, ignore_result: bool) -> ExitCode {
        if ignore_result {
            ExitCode::Success
        } else {
            ExitCode::for_result(self.result.as_ref())
        }
    }

    /// Result text as shown to the user
    pub fn result_label(&self) -> &str {
        self.result.as_ref().map(BuildResult::as_str).unwrap_or("UNKNOWN")
    }
}

pub struct ConsoleStreamer {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
    pacer: Pacer,
    limits: Limits,
}

impl ConsoleStreamer {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>, pacer: Pacer, limits: Limits) -> Self {
        Self {
            client,
            terminal,
            pacer,
            limits,
        }
    }

    /// Stream the console of the build at `build_url` until it finishes
    pub fn watch(&self, build_url: &str, verbose: bool) -> Result<BuildOutcome, JobError> {
        self.terminal.info("> Attempting to get console output:");
        self.terminal.blank();

        let mut cursor = LogCursor::new(verbose);
        let streamed = self.follow(build_url, &mut cursor);
        self.print(cursor.finish());
        let status = streamed?;

        let outcome = BuildOutcome {
            build_number: status.number,
            result: status.result,
            console_bytes: cursor.total_bytes(),
            suppressed_lines: cursor.suppressed_lines(),
        };
        info!(
            build = build_url,
            result = outcome.result_label(),
            bytes = outcome.console_bytes,
            "build ended"
        );

        self.terminal.blank();
        self.terminal
            .info(format!("> Build ended with result: {}", outcome.result_label()));
        Ok(outcome)
    }

    /// Poll until the build is finished and its log drained; returns the finished status
    fn follow(&self, build_url: &str, cursor: &mut LogCursor) -> Result<BuildStatus, JobError> {
        let mut waiter = self.pacer.waiter(WaitPhase::ConsoleOutput, self.limits);

        loop {
            let finished = self.read_status(build_url).filter(|status| !status.building);
            let start = cursor.start_at();

            let fetch = match self.client.progressive_text(build_url, start) {
                Ok(response) => match LogFetch::decode(start, &raw_log(&response)) {
                    Ok(LogFetch::ServerError { status }) => {
                        self.report_server_error(&response);
                        LogFetch::ServerError { status }
                    }
                    Ok(fetch) => fetch,
                    Err(e) => {
                        warn!(build = build_url, start, error = %e, "undecodable console chunk, retrying");
                        waiter.pause()?;
                        continue;
                    }
                },
                Err(e) => {
                    warn!(build = build_url, start, error = %e, "console fetch failed, retrying");
                    waiter.pause()?;
                    continue;
                }
            };

            let drained = match &fetch {
                LogFetch::NotStarted => {
                    debug!(build = build_url, "console not available yet");
                    true
                }
                LogFetch::ServerError { .. } | LogFetch::Empty => true,
                LogFetch::Chunk {
                    next_start, more, ..
                } => {
                    debug!(build = build_url, start, next = next_start, more, "console chunk");
                    let update = cursor.accept(&fetch);
                    self.print(update);
                    waiter.record_activity();
                    !more
                }
            };

            if let Some(status) = finished.filter(|_| drained) {
                waiter.resolve();
                return Ok(status);
            }
            waiter.pause()?;
        }
    }

    /// Current build status; `None` when it could not be read, which counts as running
    fn read_status(&self, build_url: &str) -> Option<BuildStatus> {
        let status = self
            .client
            .build_status(build_url)
            .map_err(JobError::from)
            .and_then(|response| decode_status(&response).map_err(JobError::from));
        match status {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(build = build_url, error = %e, "build status unavailable");
                None
            }
        }
    }

    fn print(&self, update: StreamUpdate) {
        for line in update.lines {
            self.terminal.line(line);
        }
    }

    fn report_server_error(&self, response: &HttpResponse) {
        warn!(status = response.status, "console fetch answered with an error");
        self.terminal.error("> Something goes wrong");
        self.terminal.line(response.text());
        for (name, value) in &response.headers {
            self.terminal.line(format!("{}: {}", name, value));
        }
    }
}

fn raw_log(response: &HttpResponse) -> RawLogResponse<'_> {
    RawLogResponse {
        status: response.status,
        content_length: response.content_length(),
        text_size: response.header(TEXT_SIZE_HEADER),
        more_data: response.header(MORE_DATA_HEADER),
        body: &response.body,
    }
}

pub(crate) fn decode_status(response: &HttpResponse) -> Result<BuildStatus, ProtocolError> {
    BuildStatus::decode(response.status, &response.body)
}
