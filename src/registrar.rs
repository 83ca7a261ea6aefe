//! Job registration
//!
//! Creates the transient job from the rendered template and deletes it
//! again. Anything but HTTP 200 is a rejection: the response body is saved
//! as a diagnostic artifact and the call fails.

use std::sync::Arc;

use tracing::{info, warn};

use crate::client::{HttpResponse, JenkinsClient};
use crate::diagnostics::Diagnostics;
use crate::error::JobError;
use crate::job::RemoteJob;
use crate::template;
use crate::terminal::Terminal;

pub struct Registrar {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
    diagnostics: Diagnostics,
}

impl Registrar {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>, diagnostics: Diagnostics) -> Self {
        Self {
            client,
            terminal,
            diagnostics,
        }
    }

    /// Whether a job with this name exists (any non-404 answer to a config read)
    pub fn exists(&self, job: &RemoteJob) -> Result<bool, JobError> {
        let response = self.client.fetch_job_config(job.name())?;
        Ok(response.status != 404)
    }

    /// Create the job, replacing an existing one first when `force` is set
    pub fn create(&self, job: &RemoteJob, force: bool) -> Result<(), JobError> {
        let config_xml = template::render(job.job_definition_template(), job.pipeline_source())?;

        if force && self.exists(job)? {
            info!(job = job.name(), "replacing existing job");
            self.delete(job)?;
        }

        let response = self.client.create_job(job.name(), &config_xml)?;
        if response.status != 200 {
            return Err(self.rejected(job, "create", &response));
        }

        info!(job = job.name(), "job created");
        self.terminal.info(format!("> Job '{}' created", job.name()));
        Ok(())
    }

    /// Delete the job
    pub fn delete(&self, job: &RemoteJob) -> Result<(), JobError> {
        let response = self.client.delete_job(job.name())?;
        if response.status != 200 {
            return Err(self.rejected(job, "delete", &response));
        }

        info!(job = job.name(), "job deleted");
        self.terminal.info(format!("> Job '{}' deleted", job.name()));
        Ok(())
    }

    fn rejected(&self, job: &RemoteJob, operation: &'static str, response: &HttpResponse) -> JobError {
        self.terminal
            .error(format!("> Unable to {} '{}' job", operation, job.name()));

        let artifact = match self
            .diagnostics
            .persist(job.name(), operation, &response.text())
        {
            Ok(path) => {
                self.terminal
                    .error(format!("> See '{}' for additional info", path.display()));
                Some(path)
            }
            Err(e) => {
                warn!(job = job.name(), operation, error = %e, "could not save failure artifact");
                None
            }
        };

        JobError::Rejected {
            operation,
            job: job.name().to_string(),
            status: response.status,
            artifact,
        }
    }
}
