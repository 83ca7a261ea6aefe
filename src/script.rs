//! Script console
//!
//! Runs a script on the server's script console and prints what it
//! returns.

use std::sync::Arc;

use tracing::info;

use crate::client::JenkinsClient;
use crate::error::JobError;
use crate::terminal::Terminal;

pub struct ScriptRunner {
    client: JenkinsClient,
    terminal: Arc<Terminal>,
}

impl ScriptRunner {
    pub fn new(client: JenkinsClient, terminal: Arc<Terminal>) -> Self {
        Self { client, terminal }
    }

    /// Execute `script`; anything but HTTP 200 is an error
    pub fn run(&self, script: &str) -> Result<String, JobError> {
        let response = self.client.run_script(script)?;
        let output = response.text();
        info!(status = response.status, bytes = output.len(), "script executed");

        if response.status != 200 {
            self.terminal.error(format!(
                "> Script execution failed with code {}",
                response.status
            ));
            self.terminal.error("> Response:");
            self.terminal.line(&output);
            return Err(JobError::ScriptRejected {
                status: response.status,
            });
        }

        self.terminal.line(&output);
        Ok(output)
    }
}
