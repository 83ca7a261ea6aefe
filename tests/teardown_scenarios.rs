//! Teardown scenarios: interrupts, timeouts, failing cleanup and panics
//!
//! Whatever stops the run, the build must be stopped (queue item cancelled
//! or abort sent) before the job is deleted, and every pending action runs
//! even when an earlier one fails.

mod fixtures;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use fixtures::*;
use jenkdo::client::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use jenkdo::lifecycle::TeardownAction;
use jenkdo::mock::MockServer;
use jenkdo::timeout::TimeoutConfig;
use jenkdo::{BuildOptions, ExitCode, JobError};

/// Raise the interrupt flag after the `at`-th sleep
fn interrupt_at(h: &Harness, at: u64) {
    let signals = Arc::clone(&h.signals);
    h.clock.set_sleep_hook(move |count| {
        if count == at {
            signals.handle_signal();
        }
    });
}

// =============================================================================
// Test 1: Interrupts
// =============================================================================

#[test]
fn test_interrupt_in_queue_cancels_item_then_deletes() {
    let h = Harness::new();
    h.accept_job();
    h.server
        .on_json(QUEUE_API, r#"{"why":"Waiting for next available executor"}"#)
        .on(Method::Post, CANCEL_URL, HttpResponse::new(204));
    interrupt_at(&h, 2);

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    assert!(matches!(err, JobError::Wait(_)));
    assert_eq!(err.exit_code(), ExitCode::Cancelled);
    assert_eq!(h.server.count(Method::Get, QUEUE_API), 2);

    let cancels = h.server.requests_to(Method::Post, CANCEL_URL);
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].form_value("id"), Some("42"));
    assert!(h.index(Method::Post, CANCEL_URL) < h.index(Method::Post, DELETE_URL));
    assert_eq!(h.server.count(Method::Post, STOP_URL), 0);

    let out = h.capture.contents();
    assert!(out.contains("> 'smoke' stopped from queue, HTTP code: 204"));
    assert!(out.contains("> Job 'smoke' deleted"));
}

#[test]
fn test_interrupt_while_streaming_aborts_then_deletes() {
    let h = Harness::new();
    h.accept_job();
    h.server
        .on_json(QUEUE_API, ADMITTED)
        .on_json(STATUS_URL, RUNNING)
        .on(Method::Post, LOG_URL, chunk("step 1\n", 7, false))
        .on(Method::Post, LOG_URL, empty_chunk(7))
        .on(Method::Post, STOP_URL, HttpResponse::new(200));

    let signals = Arc::clone(&h.signals);
    let server = Arc::clone(&h.server);
    h.clock.set_sleep_hook(move |count| {
        if count == 2 {
            signals.handle_signal();
            // The server reports the abort on the next status read
            server.on_json(STATUS_URL, &finished("ABORTED"));
        }
    });

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::Cancelled);
    assert_eq!(h.server.count(Method::Post, CANCEL_URL), 0);
    assert_eq!(h.server.count(Method::Post, STOP_URL), 1);
    assert!(h.index(Method::Post, STOP_URL) < h.index(Method::Post, DELETE_URL));

    // Stop waits for the build to report it is no longer running
    let trace = h.trace();
    let stop = trace.iter().position(|t| t == &format!("POST {}", STOP_URL)).unwrap();
    let delete = trace.iter().position(|t| t == &format!("POST {}", DELETE_URL)).unwrap();
    assert!(trace[stop..delete]
        .iter()
        .any(|t| t == &format!("GET {}", STATUS_URL)));

    let out = h.capture.contents();
    assert!(out.contains("step 1\n"));
    assert!(out.contains("> 'smoke' abort request sent. Waiting for stop..."));
    assert!(out.contains("> 'smoke' stopped"));
    assert!(out.contains("> Job 'smoke' deleted"));
}

#[test]
fn test_interrupt_during_validation_creates_nothing() {
    let h = Harness::new();
    h.accept_job();
    h.signals.handle_signal();

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::Cancelled);
    assert!(err.to_string().contains("job creation"));
    assert_eq!(h.trace(), vec![format!("POST {}", VALIDATE_URL)]);
}

#[test]
fn test_keep_with_interrupt_still_stops_build() {
    let h = Harness::new();
    h.accept_job();
    h.server
        .on_json(QUEUE_API, "{}")
        .on(Method::Post, CANCEL_URL, HttpResponse::new(204));
    interrupt_at(&h, 1);

    let options = BuildOptions { keep: true, ..yes() };
    let err = h.run(&mut smoke_job(), options).unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::Cancelled);
    assert_eq!(h.server.count(Method::Post, CANCEL_URL), 1);
    assert_eq!(h.server.count(Method::Post, DELETE_URL), 0);
}

// =============================================================================
// Test 2: Timeouts
// =============================================================================

#[test]
fn test_queue_timeout_cancels_item() {
    let h = Harness::with_timeouts(TimeoutConfig {
        queue_seconds: Some(1),
        ..TimeoutConfig::default()
    });
    h.accept_job();
    h.server.on_json(QUEUE_API, "{}");

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::TimedOut);
    assert_eq!(h.server.count(Method::Post, CANCEL_URL), 1);
    assert_eq!(h.server.count(Method::Post, DELETE_URL), 1);
}

// =============================================================================
// Test 3: Failing cleanup
// =============================================================================

#[test]
fn test_failed_stop_does_not_skip_delete() {
    let h = Harness::new();
    h.accept_job();
    h.server
        .on_json(QUEUE_API, ADMITTED)
        .on_json(STATUS_URL, RUNNING)
        .on(Method::Post, LOG_URL, empty_chunk(0))
        .fail(Method::Post, STOP_URL, "connection reset");
    interrupt_at(&h, 1);

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    // The interrupt is reported, not the cleanup failure
    assert_eq!(err.exit_code(), ExitCode::Cancelled);
    assert_eq!(h.server.count(Method::Post, STOP_URL), 1);
    assert_eq!(h.server.count(Method::Post, DELETE_URL), 1);
}

#[test]
fn test_failed_delete_after_success_is_reported() {
    let h = Harness::new();
    h.server
        .on(
            Method::Post,
            VALIDATE_URL,
            HttpResponse::new(200).with_body("ok"),
        )
        .on(Method::Post, CREATE_URL, HttpResponse::new(200))
        .on(
            Method::Post,
            TRIGGER_URL,
            HttpResponse::new(201).with_header("Location", QUEUE_URL),
        )
        .on(
            Method::Post,
            DELETE_URL,
            HttpResponse::new(500).with_body("delete refused"),
        );
    h.quick_build("SUCCESS");

    let err = h.run(&mut smoke_job(), yes()).unwrap_err();

    match &err {
        JobError::TeardownFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].action, TeardownAction::DeleteJob);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), ExitCode::Fatal);
    assert!(h.logs_dir().join("smoke_delete_log.html").exists());
    assert!(h.capture.contents().contains("> Unable to delete 'smoke' job"));
}

// =============================================================================
// Test 4: Panics
// =============================================================================

/// Delegates to the scripted server but panics on one route
struct PanicOn {
    inner: Arc<MockServer>,
    url: &'static str,
}

impl Transport for PanicOn {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.inner.execute(request);
        if request.url == self.url {
            panic!("transport exploded on {}", request.url);
        }
        response
    }
}

#[test]
fn test_panic_while_streaming_still_tears_down() {
    let server = Arc::new(MockServer::new());
    let transport = Arc::new(PanicOn {
        inner: Arc::clone(&server),
        url: LOG_URL,
    });
    let h = Harness::with_transport(server, transport);
    h.accept_job();
    h.server
        .on_json(QUEUE_API, ADMITTED)
        .on_json(STATUS_URL, &finished("SUCCESS"))
        .on(Method::Post, STOP_URL, HttpResponse::new(200));

    let mut job = smoke_job();
    let result = panic::catch_unwind(AssertUnwindSafe(|| h.run(&mut job, yes())));

    assert!(result.is_err());
    assert_eq!(h.server.count(Method::Post, STOP_URL), 1);
    assert_eq!(h.server.count(Method::Post, DELETE_URL), 1);
    assert!(h.index(Method::Post, STOP_URL) < h.index(Method::Post, DELETE_URL));
}
