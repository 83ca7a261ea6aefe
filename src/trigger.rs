//! Build trigger and queue resolution
//!
//! A build request lands in the server queue first. [`BuildTrigger::start`]
//! records the queue location on the handle, and
//! [`BuildTrigger::resolve_queue`] polls that location until an executor
//! takes the item, at which point the handle switches to the build's
//! number and URL.

use std::sync::Arc;

use jenkdo_protocol::{QueueDecision, QUEUE_PROGRESS_THRESHOLD_TICKS};
use tracing::{debug, info, warn};

use crate::client::JenkinsClient;
use crate::error::JobError;
use crate::job::RemoteJob;
use crate::poll::{Pacer, WaitPhase};
use crate::terminal::Terminal;
use crate::timeout::Limits;

/// Location header of an accepted build request
const LOCATION_HEADER: &str = "location";

pub struct BuildTrigger {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
    pacer: Pacer,
    limits: Limits,
}

impl BuildTrigger {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>, pacer: Pacer, limits: Limits) -> Self {
        Self {
            client,
            terminal,
            pacer,
            limits,
        }
    }

    /// Request a build.
    ///
    /// Returns the queue location on HTTP 201. Any other answer is reported
    /// and yields `None`, leaving the handle unstarted.
    pub fn start(&self, job: &mut RemoteJob) -> Result<Option<String>, JobError> {
        self.terminal.info("> Starting...");

        let response = self.client.trigger_build(job.name())?;
        let location = response.header(LOCATION_HEADER).map(str::to_string);

        match (response.status, location) {
            (201, Some(queue_url)) => {
                info!(job = job.name(), queue = %queue_url, "build queued");
                job.enqueue(queue_url.clone())?;
                Ok(Some(queue_url))
            }
            (status, location) => {
                warn!(
                    job = job.name(),
                    status,
                    has_location = location.is_some(),
                    "build request not accepted"
                );
                self.terminal.error("> Something goes wrong");
                self.terminal.line(response.text());
                Ok(None)
            }
        }
    }

    /// Poll the queue item until it becomes a build
    pub fn resolve_queue(&self, job: &mut RemoteJob) -> Result<(), JobError> {
        let queue_url = match job.queue_location() {
            Some(url) => url.to_string(),
            None => {
                return Err(JobError::TriggerRejected {
                    job: job.name().to_string(),
                })
            }
        };

        let mut waiter = self.pacer.waiter(WaitPhase::QueueAdmission, self.limits);
        let mut progress_shown = false;

        let admitted = loop {
            let decision = match self.client.queue_item(&queue_url) {
                Ok(response) => QueueDecision::decode(response.status, &response.body),
                Err(e) => QueueDecision::TransientError {
                    detail: e.to_string(),
                },
            };

            match decision {
                QueueDecision::Admitted { number, url } => {
                    waiter.resolve();
                    break (number, url);
                }
                QueueDecision::Cancelled => {
                    if progress_shown {
                        self.terminal.end_progress();
                    }
                    return Err(JobError::QueueItemCancelled {
                        job: job.name().to_string(),
                    });
                }
                QueueDecision::StillQueued { reason } => {
                    debug!(queue = %queue_url, ticks = waiter.ticks(), %reason, "still queued");
                    if waiter.ticks() >= QUEUE_PROGRESS_THRESHOLD_TICKS {
                        self.terminal.progress(format!(
                            "> Waiting in queue for {} seconds. Reason: {}",
                            waiter.paced().as_secs(),
                            reason
                        ));
                        progress_shown = true;
                    }
                }
                QueueDecision::TransientError { detail } => {
                    warn!(queue = %queue_url, %detail, "queue poll failed, retrying");
                }
            }

            if let Err(e) = waiter.pause() {
                if progress_shown {
                    self.terminal.end_progress();
                }
                return Err(e.into());
            }
        };

        if progress_shown {
            self.terminal.end_progress();
        }

        let (number, url) = admitted;
        job.admit(number, url)?;
        info!(job = job.name(), number, "build started");
        self.terminal
            .info(format!("> Building '{}' started", job.name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpResponse, Method};
    use crate::mock::MockServer;
    use crate::poll::ManualClock;
    use crate::signal::SignalState;
    use crate::terminal::Capture;
    use jenkdo_protocol::Endpoints;
    use std::time::Duration;

    const BUILD_URL: &str = "http://ci/job/debug/job/smoke/build";
    const QUEUE_URL: &str = "http://ci/queue/item/42/";
    const QUEUE_API: &str = "http://ci/queue/item/42/api/json";
    const ADMITTED: &str = r#"{"executable":{"number":7,"url":"http://ci/job/debug/job/smoke/7/"}}"#;

    struct Fixture {
        server: Arc<MockServer>,
        clock: Arc<ManualClock>,
        signals: Arc<SignalState>,
        capture: Capture,
        trigger: BuildTrigger,
    }

    fn fixture_with(limits: Limits) -> Fixture {
        let server = Arc::new(MockServer::new());
        let clock = Arc::new(ManualClock::new());
        let signals = Arc::new(SignalState::new());
        let (terminal, capture) = Terminal::capture();
        let client = JenkinsClient::new(server.clone(), Endpoints::new("http://ci", "debug"));
        let pacer = Pacer::new(clock.clone(), signals.clone(), Duration::from_millis(100));
        let trigger = BuildTrigger::new(client, Arc::new(terminal), pacer, limits);
        Fixture {
            server,
            clock,
            signals,
            capture,
            trigger,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Limits::unbounded())
    }

    fn queued_job() -> RemoteJob {
        let mut job = RemoteJob::new("smoke", "", "");
        job.enqueue(QUEUE_URL).unwrap();
        job
    }

    #[test]
    fn test_start_records_queue_location() {
        let f = fixture();
        f.server.on(
            Method::Post,
            BUILD_URL,
            HttpResponse::new(201).with_header("Location", QUEUE_URL),
        );
        let mut job = RemoteJob::new("smoke", "", "");

        let location = f.trigger.start(&mut job).unwrap();

        assert_eq!(location.as_deref(), Some(QUEUE_URL));
        assert_eq!(job.queue_location(), Some(QUEUE_URL));
        assert!(f.server.requests()[0].authenticated);
    }

    #[test]
    fn test_start_rejection_leaves_job_unstarted() {
        let f = fixture();
        f.server.on(
            Method::Post,
            BUILD_URL,
            HttpResponse::new(500).with_body("boom"),
        );
        let mut job = RemoteJob::new("smoke", "", "");

        assert_eq!(f.trigger.start(&mut job).unwrap(), None);
        assert_eq!(job.queue_location(), None);
        assert_eq!(
            f.capture.lines(),
            vec!["> Starting...", "> Something goes wrong", "boom"]
        );
    }

    #[test]
    fn test_start_without_location_is_rejected() {
        let f = fixture();
        f.server.on(Method::Post, BUILD_URL, HttpResponse::new(201));
        let mut job = RemoteJob::new("smoke", "", "");

        assert_eq!(f.trigger.start(&mut job).unwrap(), None);
        assert_eq!(job.queue_location(), None);
    }

    #[test]
    fn test_resolve_after_three_queued_polls() {
        let f = fixture();
        f.server.on_json(QUEUE_API, "{}");
        f.server.on_json(QUEUE_API, "{}");
        f.server.on_json(QUEUE_API, "{}");
        f.server.on_json(QUEUE_API, ADMITTED);
        let mut job = queued_job();

        f.trigger.resolve_queue(&mut job).unwrap();

        assert_eq!(job.build_number(), Some(7));
        assert_eq!(job.build_location(), Some("http://ci/job/debug/job/smoke/7/"));
        assert_eq!(job.queue_location(), None);
        assert_eq!(f.server.count(Method::Get, QUEUE_API), 4);
        assert!(f.server.requests().iter().all(|r| !r.authenticated));
        assert_eq!(f.clock.sleep_count(), 3);
        assert_eq!(f.capture.lines(), vec!["> Building 'smoke' started"]);
    }

    #[test]
    fn test_progress_line_after_threshold() {
        let f = fixture();
        for _ in 0..12 {
            f.server
                .on_json(QUEUE_API, r#"{"why":"Waiting for next available executor"}"#);
        }
        f.server.on_json(QUEUE_API, ADMITTED);
        let mut job = queued_job();

        f.trigger.resolve_queue(&mut job).unwrap();

        let output = f.capture.contents();
        assert!(output.starts_with(
            "\r> Waiting in queue for 0 seconds. Reason: Waiting for next available executor"
        ));
        assert!(output.contains("\r> Waiting in queue for 1 seconds."));
        assert!(output.ends_with("executor\n> Building 'smoke' started\n"));
        assert_eq!(output.matches('\r').count(), 3);
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let f = fixture();
        f.server.on(Method::Get, QUEUE_API, HttpResponse::new(503));
        f.server.fail(Method::Get, QUEUE_API, "connection reset");
        f.server.on_json(QUEUE_API, "not json");
        f.server.on_json(QUEUE_API, ADMITTED);
        let mut job = queued_job();

        f.trigger.resolve_queue(&mut job).unwrap();

        assert_eq!(job.build_number(), Some(7));
        assert_eq!(f.server.count(Method::Get, QUEUE_API), 4);
    }

    #[test]
    fn test_cancelled_queue_item() {
        let f = fixture();
        f.server.on_json(QUEUE_API, r#"{"cancelled":true}"#);
        let mut job = queued_job();

        let err = f.trigger.resolve_queue(&mut job).unwrap_err();

        assert!(matches!(err, JobError::QueueItemCancelled { .. }));
        assert_eq!(job.queue_location(), Some(QUEUE_URL));
    }

    #[test]
    fn test_queue_timeout() {
        let f = fixture_with(Limits::overall(Some(Duration::from_secs(2))));
        f.server.on_json(QUEUE_API, "{}");
        let mut job = queued_job();

        let err = f.trigger.resolve_queue(&mut job).unwrap_err();

        assert_eq!(err.exit_code().as_i32(), 81);
        assert_eq!(job.queue_location(), Some(QUEUE_URL));
        assert!(f.capture.contents().ends_with('\n'));
    }

    #[test]
    fn test_interrupt_stops_polling() {
        let f = fixture();
        f.server.on_json(QUEUE_API, "{}");
        let signals = f.signals.clone();
        f.clock.set_sleep_hook(move |count| {
            if count == 5 {
                signals.handle_signal();
            }
        });
        let mut job = queued_job();

        let err = f.trigger.resolve_queue(&mut job).unwrap_err();

        assert_eq!(err.exit_code().as_i32(), 80);
        assert_eq!(f.server.count(Method::Get, QUEUE_API), 5);
    }

    #[test]
    fn test_unstarted_job_is_not_polled() {
        let f = fixture();
        let mut job = RemoteJob::new("smoke", "", "");

        let err = f.trigger.resolve_queue(&mut job).unwrap_err();

        assert!(matches!(err, JobError::TriggerRejected { .. }));
        assert!(f.server.requests().is_empty());
    }
}
