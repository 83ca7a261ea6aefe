//! Shared harness for lifecycle scenario tests
//!
//! Wires a [`Lifecycle`] to a scripted [`MockServer`] and a [`ManualClock`],
//! with diagnostics written under a scratch directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use jenkdo::client::{HttpResponse, JenkinsClient, Method, Transport};
use jenkdo::diagnostics::Diagnostics;
use jenkdo::lifecycle::FixedAnswer;
use jenkdo::mock::MockServer;
use jenkdo::poll::{ManualClock, Pacer};
use jenkdo::signal::SignalState;
use jenkdo::terminal::{Capture, Terminal};
use jenkdo::timeout::TimeoutConfig;
use jenkdo::{BuildOptions, BuildOutcome, JobError, Lifecycle, RemoteJob};
use jenkdo_protocol::Endpoints;
use tempfile::TempDir;

pub const BASE: &str = "http://ci";
pub const VALIDATE_URL: &str = "http://ci/pipeline-model-converter/validate";
pub const CONFIG_URL: &str = "http://ci/job/debug/job/smoke/config.xml";
pub const CREATE_URL: &str = "http://ci/job/debug/createItem";
pub const DELETE_URL: &str = "http://ci/job/debug/job/smoke/doDelete";
pub const TRIGGER_URL: &str = "http://ci/job/debug/job/smoke/build";
pub const QUEUE_URL: &str = "http://ci/queue/item/42/";
pub const QUEUE_API: &str = "http://ci/queue/item/42/api/json";
pub const CANCEL_URL: &str = "http://ci/queue/cancelItem";
pub const BUILD_URL: &str = "http://ci/job/debug/job/smoke/7/";
pub const STATUS_URL: &str = "http://ci/job/debug/job/smoke/7/api/json";
pub const STOP_URL: &str = "http://ci/job/debug/job/smoke/7/stop";
pub const LOG_URL: &str = "http://ci/job/debug/job/smoke/7/logText/progressiveText";

pub const ADMITTED: &str =
    r#"{"executable":{"number":7,"url":"http://ci/job/debug/job/smoke/7/"}}"#;
pub const RUNNING: &str = r#"{"building":true,"result":null,"number":7}"#;

pub fn finished(result: &str) -> String {
    format!(r#"{{"building":false,"result":"{}","number":7}}"#, result)
}

pub fn chunk(text: &str, next: u64, more: bool) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", text.len().to_string())
        .with_header("X-Text-Size", next.to_string())
        .with_header("X-More-Data", more.to_string())
        .with_body(text)
}

pub fn empty_chunk(at: u64) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Length", "0")
        .with_header("X-Text-Size", at.to_string())
}

pub fn smoke_job() -> RemoteJob {
    RemoteJob::new(
        "smoke",
        "pipeline { agent any; stages { stage('x') { steps { sh 'echo hello' } } } }",
        "<flow-definition><script>{{ jenkinsfile | forceescape() }}</script></flow-definition>",
    )
}

pub fn yes() -> BuildOptions {
    BuildOptions {
        assume_yes: true,
        ..BuildOptions::default()
    }
}

pub struct Harness {
    pub server: Arc<MockServer>,
    pub clock: Arc<ManualClock>,
    pub signals: Arc<SignalState>,
    pub capture: Capture,
    pub logs: TempDir,
    pub lifecycle: Lifecycle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeouts(TimeoutConfig::default())
    }

    pub fn with_timeouts(timeouts: TimeoutConfig) -> Self {
        let server = Arc::new(MockServer::new());
        Self::build(server.clone(), server, timeouts)
    }

    /// Route requests through `transport` while scripting `server`
    pub fn with_transport(server: Arc<MockServer>, transport: Arc<dyn Transport>) -> Self {
        Self::build(server, transport, TimeoutConfig::default())
    }

    fn build(server: Arc<MockServer>, transport: Arc<dyn Transport>, timeouts: TimeoutConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let signals = Arc::new(SignalState::new());
        let (terminal, capture) = Terminal::capture();
        let logs = TempDir::new().unwrap();

        let client = JenkinsClient::new(transport, Endpoints::new(BASE, "debug"));
        let pacer = Pacer::new(clock.clone(), signals.clone(), Duration::from_millis(100));
        let lifecycle = Lifecycle::new(
            client,
            Arc::new(terminal),
            pacer,
            Diagnostics::new(logs.path().join("logs")),
            &timeouts,
        );

        Self {
            server,
            clock,
            signals,
            capture,
            logs,
            lifecycle,
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.logs.path().join("logs")
    }

    pub fn run(&self, job: &mut RemoteJob, options: BuildOptions) -> Result<BuildOutcome, JobError> {
        self.lifecycle.run(job, &options, &mut FixedAnswer(true))
    }

    /// Validation, creation and deletion all accepted
    pub fn accept_registration(&self) -> &Self {
        self.server
            .on(
                Method::Post,
                VALIDATE_URL,
                HttpResponse::new(200).with_body("Validation successful"),
            )
            .on(Method::Post, CREATE_URL, HttpResponse::new(200))
            .on(Method::Post, DELETE_URL, HttpResponse::new(200));
        self
    }

    /// Registration accepted and the trigger answered 201 with a queue location
    pub fn accept_job(&self) -> &Self {
        self.accept_registration();
        self.server.on(
            Method::Post,
            TRIGGER_URL,
            HttpResponse::new(201).with_header("Location", QUEUE_URL),
        );
        self
    }

    /// Admitted on the first queue poll, one console chunk, then finished
    pub fn quick_build(&self, result: &str) -> &Self {
        self.server
            .on_json(QUEUE_API, ADMITTED)
            .on_json(STATUS_URL, &finished(result))
            .on(Method::Post, LOG_URL, chunk("hello\n", 6, false));
        self
    }

    /// Position of the first request to a route; panics if never hit
    pub fn index(&self, method: Method, url: &str) -> usize {
        self.server
            .first_index(method, url)
            .unwrap_or_else(|| panic!("no {} {} request", method, url))
    }

    /// Every request target in order, as "METHOD url"
    pub fn trace(&self) -> Vec<String> {
        self.server
            .requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect()
    }
}
