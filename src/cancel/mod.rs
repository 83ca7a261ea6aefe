//! Stopping a build
//!
//! [`Canceller::stop`] looks at where the handle's build is and takes
//! exactly one of three paths: cancel the queue item, abort the running
//! build and wait for the server to confirm, or do nothing.

use std::sync::Arc;

use jenkdo_protocol::queue_id_from_location;
use tracing::{debug, info, warn};

use crate::client::JenkinsClient;
use crate::error::JobError;
use crate::job::{Placement, RemoteJob};
use crate::poll::{Pacer, WaitPhase};
use crate::stream::decode_status;
use crate::terminal::Terminal;
use crate::timeout::Limits;

/// Which stop path ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Queue item cancelled; carries the server's status code
    QueueCancelled { status: u16 },
    /// Abort sent and the build reported `building: false`
    BuildStopped,
    /// Nothing outstanding on the server
    AlreadyStopped,
}

pub struct Canceller {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
    pacer: Pacer,
    limits: Limits,
}

impl Canceller {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>, pacer: Pacer, limits: Limits) -> Self {
        Self {
            client,
            terminal,
            pacer,
            limits,
        }
    }

    /// Stop whatever the handle has outstanding
    pub fn stop(&self, job: &mut RemoteJob) -> Result<StopOutcome, JobError> {
        match job.placement().clone() {
            Placement::Queued { queue_url } => self.cancel_queued(job, &queue_url),
            Placement::Building { url, .. } => self.abort_build(job, &url),
            Placement::Unstarted | Placement::Settled => {
                self.terminal
                    .info(format!("> Building '{}' job already stopped", job.name()));
                Ok(StopOutcome::AlreadyStopped)
            }
        }
    }

    fn cancel_queued(&self, job: &mut RemoteJob, queue_url: &str) -> Result<StopOutcome, JobError> {
        let id = queue_id_from_location(queue_url)?;
        let response = self.client.cancel_queue_item(id)?;
        info!(job = job.name(), id, status = response.status, "queue item cancelled");

        job.release_queue()?;
        self.terminal.info(format!(
            "> '{}' stopped from queue, HTTP code: {}",
            job.name(),
            response.status
        ));
        Ok(StopOutcome::QueueCancelled {
            status: response.status,
        })
    }

    fn abort_build(&self, job: &RemoteJob, build_url: &str) -> Result<StopOutcome, JobError> {
        let response = self.client.stop_build(build_url)?;
        debug!(job = job.name(), status = response.status, "abort requested");
        self.terminal.info(format!(
            "> '{}' abort request sent. Waiting for stop...",
            job.name()
        ));

        let mut waiter = self.pacer.waiter(WaitPhase::BuildStop, self.limits);
        loop {
            waiter.pause()?;
            let building = self
                .client
                .build_status(build_url)
                .map_err(JobError::from)
                .and_then(|r| decode_status(&r).map_err(JobError::from));
            match building {
                Ok(status) if !status.building => break,
                Ok(_) => {}
                Err(e) => warn!(job = job.name(), error = %e, "build status unavailable while stopping"),
            }
        }
        waiter.resolve();

        info!(job = job.name(), "build stopped");
        self.terminal.info(format!("> '{}' stopped", job.name()));
        Ok(StopOutcome::BuildStopped)
    }
}
