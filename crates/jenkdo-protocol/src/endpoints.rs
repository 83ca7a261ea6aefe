//! URL layout of the automation server.
//!
//! Job-scoped paths live under a parent folder (`/job/{folder}/job/{name}`);
//! queue and build paths are derived from server-issued locations.

/// Join `segment` onto `url` with exactly one separating slash.
///
/// Server-issued locations usually end in `/`, but not always.
pub fn child_url(url: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        url.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

/// Endpoint builder bound to a server base URL and job folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    folder: String,
}

impl Endpoints {
    /// Create endpoints for `base`; an empty `folder` places jobs at the root.
    pub fn new(base: impl Into<String>, folder: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        let folder = folder.into().trim_matches('/').to_string();
        Self { base, folder }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn folder_root(&self) -> String {
        if self.folder.is_empty() {
            self.base.clone()
        } else {
            format!("{}/job/{}", self.base, self.folder)
        }
    }

    /// Root URL of the named job.
    pub fn job(&self, name: &str) -> String {
        format!("{}/job/{}", self.folder_root(), name)
    }

    pub fn validate(&self) -> String {
        format!("{}/pipeline-model-converter/validate", self.base)
    }

    pub fn job_config(&self, name: &str) -> String {
        format!("{}/config.xml", self.job(name))
    }

    /// Job creation; the job name travels as the `name` query parameter.
    pub fn create_item(&self) -> String {
        format!("{}/createItem", self.folder_root())
    }

    pub fn delete_job(&self, name: &str) -> String {
        format!("{}/doDelete", self.job(name))
    }

    pub fn build_job(&self, name: &str) -> String {
        format!("{}/build", self.job(name))
    }

    pub fn cancel_queue_item(&self) -> String {
        format!("{}/queue/cancelItem", self.base)
    }

    pub fn script_text(&self) -> String {
        format!("{}/scriptText", self.base)
    }

    /// Queue item status; readable without credentials.
    pub fn queue_api(queue_url: &str) -> String {
        child_url(queue_url, "api/json")
    }

    pub fn build_api(build_url: &str) -> String {
        child_url(build_url, "api/json")
    }

    pub fn build_stop(build_url: &str) -> String {
        child_url(build_url, "stop")
    }

    pub fn progressive_text(build_url: &str) -> String {
        child_url(build_url, "logText/progressiveText")
    }
}
