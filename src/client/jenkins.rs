//! Jenkins HTTP client
//!
//! One method per server interaction of the job lifecycle. Methods return
//! the raw response: deciding what a status code means is the caller's job.

use std::sync::Arc;

use jenkdo_protocol::progressive::START_FIELD;
use jenkdo_protocol::{Endpoints, SCRIPT_FIELD, VALIDATE_FIELD};
use tracing::debug;

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Result type for client calls
pub type ClientResult = Result<HttpResponse, TransportError>;

/// Host-side client for the automation server
#[derive(Clone)]
pub struct JenkinsClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
}

impl JenkinsClient {
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn send(&self, request: HttpRequest) -> ClientResult {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(url = %request.url, status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    pub fn validate_pipeline(&self, pipeline: &str) -> ClientResult {
        self.send(
            HttpRequest::post(self.endpoints.validate())
                .authenticated()
                .form(VALIDATE_FIELD, pipeline),
        )
    }

    /// Fetch the job definition; 404 means the job does not exist
    pub fn fetch_job_config(&self, name: &str) -> ClientResult {
        self.send(HttpRequest::get(self.endpoints.job_config(name)).authenticated())
    }

    pub fn create_job(&self, name: &str, config_xml: &str) -> ClientResult {
        self.send(
            HttpRequest::post(self.endpoints.create_item())
                .authenticated()
                .query("name", name)
                .body("text/xml", config_xml.as_bytes().to_vec()),
        )
    }

    pub fn delete_job(&self, name: &str) -> ClientResult {
        self.send(HttpRequest::post(self.endpoints.delete_job(name)).authenticated())
    }

    pub fn trigger_build(&self, name: &str) -> ClientResult {
        self.send(HttpRequest::post(self.endpoints.build_job(name)).authenticated())
    }

    /// Poll a queue item; sent without credentials
    pub fn queue_item(&self, queue_url: &str) -> ClientResult {
        self.send(HttpRequest::get(Endpoints::queue_api(queue_url)))
    }

    pub fn cancel_queue_item(&self, id: u64) -> ClientResult {
        self.send(
            HttpRequest::post(self.endpoints.cancel_queue_item())
                .authenticated()
                .form("id", id.to_string()),
        )
    }

    pub fn build_status(&self, build_url: &str) -> ClientResult {
        self.send(HttpRequest::get(Endpoints::build_api(build_url)).authenticated())
    }

    pub fn stop_build(&self, build_url: &str) -> ClientResult {
        self.send(HttpRequest::post(Endpoints::build_stop(build_url)).authenticated())
    }

    pub fn progressive_text(&self, build_url: &str, start: u64) -> ClientResult {
        self.send(
            HttpRequest::post(Endpoints::progressive_text(build_url))
                .authenticated()
                .form(START_FIELD, start.to_string()),
        )
    }

    pub fn run_script(&self, script: &str) -> ClientResult {
        self.send(
            HttpRequest::post(self.endpoints.script_text())
                .authenticated()
                .form(SCRIPT_FIELD, script),
        )
    }
}
