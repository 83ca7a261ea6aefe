//! Lifecycle coordinator
//!
//! Sequences one run: validate, confirm, create the job, trigger the build,
//! resolve the queue item, stream the console. Teardown actions are armed
//! as soon as there is something to undo and are always unwound, whether
//! the run finished, failed, was interrupted or panicked.

mod teardown;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use teardown::{Teardown, TeardownAction, TeardownFailure};

use crate::cancel::Canceller;
use crate::client::JenkinsClient;
use crate::diagnostics::Diagnostics;
use crate::error::JobError;
use crate::job::RemoteJob;
use crate::poll::{Pacer, WaitPhase};
use crate::registrar::Registrar;
use crate::stream::{BuildOutcome, ConsoleStreamer};
use crate::terminal::Terminal;
use crate::timeout::TimeoutConfig;
use crate::trigger::BuildTrigger;
use crate::validate::Validator;

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Leave the job on the server afterwards
    pub keep: bool,
    /// Show pipeline-internal marker lines
    pub verbose: bool,
    /// Skip the confirmation after validation
    pub assume_yes: bool,
    /// Replace an existing job with the same name
    pub force: bool,
    /// Exit 0 whatever the build result
    pub ignore_result: bool,
}

/// Asks the user whether to go on after validation
pub trait Confirmation {
    fn confirm(&mut self) -> Result<bool, JobError>;
}

/// Always answers with the given value
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirmation for FixedAnswer {
    fn confirm(&mut self) -> Result<bool, JobError> {
        Ok(self.0)
    }
}

pub struct Lifecycle {
    validator: Validator,
    registrar: Registrar,
    trigger: BuildTrigger,
    streamer: ConsoleStreamer,
    canceller: Canceller,
    pacer: Pacer,
}

impl Lifecycle {
    pub fn new(
        client: JenkinsClient,
        terminal: Arc<Terminal>,
        pacer: Pacer,
        diagnostics: Diagnostics,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            validator: Validator::new(client.clone(), Arc::clone(&terminal)),
            registrar: Registrar::new(client.clone(), Arc::clone(&terminal), diagnostics),
            trigger: BuildTrigger::new(
                client.clone(),
                Arc::clone(&terminal),
                pacer.clone(),
                timeouts.queue(),
            ),
            streamer: ConsoleStreamer::new(
                client.clone(),
                Arc::clone(&terminal),
                pacer.clone(),
                timeouts.stream(),
            ),
            canceller: Canceller::new(client, terminal, pacer.clone(), timeouts.stop()),
            pacer,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Run the whole lifecycle for `job`, then unwind its teardown
    pub fn run(
        &self,
        job: &mut RemoteJob,
        options: &BuildOptions,
        confirmation: &mut dyn Confirmation,
    ) -> Result<BuildOutcome, JobError> {
        let mut teardown = Teardown::new();

        let driven = panic::catch_unwind(AssertUnwindSafe(|| {
            self.drive(job, options, confirmation, &mut teardown)
        }));

        let failures = self.unwind(job, &mut teardown);

        match driven {
            Err(payload) => panic::resume_unwind(payload),
            Ok(Err(e)) => Err(e),
            Ok(Ok(_)) if !failures.is_empty() => Err(JobError::TeardownFailed { failures }),
            Ok(Ok(outcome)) => Ok(outcome),
        }
    }

    fn drive(
        &self,
        job: &mut RemoteJob,
        options: &BuildOptions,
        confirmation: &mut dyn Confirmation,
        teardown: &mut Teardown,
    ) -> Result<BuildOutcome, JobError> {
        let report = self.validator.validate(job.pipeline_source())?;
        debug!(job = job.name(), bytes = report.len(), "validation report received");

        if !options.assume_yes && !confirmation.confirm()? {
            return Err(JobError::Declined);
        }

        self.pacer.ensure_not_cancelled(WaitPhase::JobCreation)?;
        self.registrar.create(job, options.force)?;
        if !options.keep {
            teardown.push(TeardownAction::DeleteJob);
        }

        self.pacer.ensure_not_cancelled(WaitPhase::QueueAdmission)?;
        if self.trigger.start(job)?.is_none() {
            return Err(JobError::TriggerRejected {
                job: job.name().to_string(),
            });
        }
        teardown.push(TeardownAction::StopBuild);

        self.trigger.resolve_queue(job)?;
        let build_url = match job.build_location() {
            Some(url) => url.to_string(),
            None => {
                return Err(JobError::TriggerRejected {
                    job: job.name().to_string(),
                })
            }
        };

        let outcome = self.streamer.watch(&build_url, options.verbose)?;
        teardown.disarm(TeardownAction::StopBuild);
        info!(job = job.name(), result = outcome.result_label(), "run complete");
        Ok(outcome)
    }

    fn unwind(&self, job: &mut RemoteJob, teardown: &mut Teardown) -> Vec<TeardownFailure> {
        if !teardown.pending().is_empty() {
            debug!(job = job.name(), pending = ?teardown.pending(), "unwinding teardown");
        }

        let failures = teardown.unwind(|action| match action {
            TeardownAction::StopBuild => self.canceller.stop(job).map(|_| ()),
            TeardownAction::DeleteJob => self.registrar.delete(job),
        });

        for failure in &failures {
            warn!(job = job.name(), action = %failure.action, error = %failure.message, "teardown action failed");
        }
        failures
    }
}
