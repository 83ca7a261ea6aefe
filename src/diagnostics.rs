//! Failure artifacts.
//!
//! When the server rejects a state-changing call, its response body is
//! saved as `{dir}/{job}_{operation}_log.html` for offline inspection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Default artifact directory, relative to the working directory
pub const DEFAULT_LOGS_DIR: &str = "./logs";

/// Diagnostics sink rooted at one directory
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, job: &str, operation: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_log.html", job, operation))
    }

    /// Write `content`, creating the directory if needed; returns the path
    pub fn persist(&self, job: &str, operation: &str, content: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.artifact_path(job, operation);
        fs::write(&path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "saved failure artifact");
        Ok(path)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_LOGS_DIR)
    }
}
