//! Pipeline validation
//!
//! Validation is advisory: whatever the server says is shown to the user
//! and returned, and the caller decides whether to go on.

use std::sync::Arc;

use tracing::info;

use crate::client::JenkinsClient;
use crate::error::JobError;
use crate::terminal::Terminal;

pub struct Validator {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
}

impl Validator {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>) -> Self {
        Self { client, terminal }
    }

    /// Submit the pipeline text and return the server's report unfiltered
    pub fn validate(&self, pipeline_source: &str) -> Result<String, JobError> {
        self.terminal.info("> Validating...");

        let response = self.client.validate_pipeline(pipeline_source)?;
        let report = response.text();
        info!(status = response.status, "pipeline validation answered");

        self.terminal.info("> Validation response:");
        self.terminal.raw(&report);
        if !report.is_empty() && !report.ends_with('\n') {
            self.terminal.blank();
        }
        Ok(report)
    }
}
