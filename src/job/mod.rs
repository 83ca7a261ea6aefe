//! Remote job handle
//!
//! One [`RemoteJob`] tracks one transient job for one build: its name, the
//! immutable pipeline and template texts, and where the build currently is
//! on the server.
//!
//! Placement: Unstarted → Queued → Building → Settled, with Queued → Settled
//! when the queue item is cancelled. Because the queue and build locators
//! live inside one enum, a handle can never hold both, and the build number
//! and URL are always set together.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::error::JobError;
use crate::template::DEFAULT_TEMPLATE;

/// Extensions stripped from the pipeline file name to form the job name
const PIPELINE_EXTENSIONS: &[&str] = &["groovy", "jenkinsfile"];

/// Where the handle's build is on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// No build requested yet
    Unstarted,
    /// Waiting in the server queue
    Queued { queue_url: String },
    /// Admitted and assigned a build number
    Building { number: u64, url: String },
    /// Queue item cancelled; no server-side work outstanding
    Settled,
}

impl Placement {
    fn kind(&self) -> PlacementKind {
        match self {
            Placement::Unstarted => PlacementKind::Unstarted,
            Placement::Queued { .. } => PlacementKind::Queued,
            Placement::Building { .. } => PlacementKind::Building,
            Placement::Settled => PlacementKind::Settled,
        }
    }
}

/// Placement without its data, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    Unstarted,
    Queued,
    Building,
    Settled,
}

impl fmt::Display for PlacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementKind::Unstarted => write!(f, "unstarted"),
            PlacementKind::Queued => write!(f, "queued"),
            PlacementKind::Building => write!(f, "building"),
            PlacementKind::Settled => write!(f, "settled"),
        }
    }
}

/// Errors for handle operations
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("invalid placement transition from {from} to {to}")]
    InvalidTransition {
        from: PlacementKind,
        to: PlacementKind,
    },
}

/// Derive the job name from the pipeline file name
pub fn job_name_from_path(path: &Path) -> Result<String, JobError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| JobError::InvalidName(path.display().to_string()))?;

    let lower = file_name.to_ascii_lowercase();
    let stem = PIPELINE_EXTENSIONS
        .iter()
        .find_map(|ext| {
            let suffix = format!(".{}", ext);
            lower
                .ends_with(&suffix)
                .then(|| &file_name[..file_name.len() - suffix.len()])
        })
        .or_else(|| {
            Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
        })
        .unwrap_or(file_name);

    if stem.is_empty() {
        return Err(JobError::InvalidName(file_name.to_string()));
    }
    Ok(stem.to_string())
}

fn read_source(path: &Path) -> Result<String, JobError> {
    fs::read_to_string(path).map_err(|source| JobError::Input {
        path: path.to_path_buf(),
        source,
    })
}

/// One transient job and its single build
#[derive(Debug, Clone)]
pub struct RemoteJob {
    name: String,
    pipeline_source: String,
    job_definition_template: String,
    placement: Placement,
}

impl RemoteJob {
    pub fn new(
        name: impl Into<String>,
        pipeline_source: impl Into<String>,
        job_definition_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pipeline_source: pipeline_source.into(),
            job_definition_template: job_definition_template.into(),
            placement: Placement::Unstarted,
        }
    }

    /// Read both texts once; the job is named after the pipeline file.
    /// Without a template path the bundled template is used.
    pub fn open(pipeline_path: &Path, template_path: Option<&Path>) -> Result<Self, JobError> {
        let name = job_name_from_path(pipeline_path)?;
        let pipeline = read_source(pipeline_path)?;
        let template = match template_path {
            Some(path) => read_source(path)?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Ok(Self::new(name, pipeline, template))
    }

    /// Build a handle from any two readers
    pub fn from_readers(
        name: impl Into<String>,
        mut pipeline: impl Read,
        mut template: impl Read,
    ) -> io::Result<Self> {
        let mut pipeline_source = String::new();
        pipeline.read_to_string(&mut pipeline_source)?;
        let mut job_definition_template = String::new();
        template.read_to_string(&mut job_definition_template)?;
        Ok(Self::new(name, pipeline_source, job_definition_template))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline_source(&self) -> &str {
        &self.pipeline_source
    }

    pub fn job_definition_template(&self) -> &str {
        &self.job_definition_template
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn queue_location(&self) -> Option<&str> {
        match &self.placement {
            Placement::Queued { queue_url } => Some(queue_url),
            _ => None,
        }
    }

    pub fn build_number(&self) -> Option<u64> {
        match &self.placement {
            Placement::Building { number, .. } => Some(*number),
            _ => None,
        }
    }

    pub fn build_location(&self) -> Option<&str> {
        match &self.placement {
            Placement::Building { url, .. } => Some(url),
            _ => None,
        }
    }

    fn transition(&mut self, next: Placement) -> Result<(), HandleError> {
        let allowed = matches!(
            (self.placement.kind(), next.kind()),
            (PlacementKind::Unstarted, PlacementKind::Queued)
                | (PlacementKind::Queued, PlacementKind::Building)
                | (PlacementKind::Queued, PlacementKind::Settled)
        );
        if !allowed {
            return Err(HandleError::InvalidTransition {
                from: self.placement.kind(),
                to: next.kind(),
            });
        }
        self.placement = next;
        Ok(())
    }

    /// The build request was accepted into the queue
    pub fn enqueue(&mut self, queue_url: impl Into<String>) -> Result<(), HandleError> {
        self.transition(Placement::Queued {
            queue_url: queue_url.into(),
        })
    }

    /// The queue item became a build; clears the queue location
    pub fn admit(&mut self, number: u64, url: impl Into<String>) -> Result<(), HandleError> {
        self.transition(Placement::Building {
            number,
            url: url.into(),
        })
    }

    /// The queue item was cancelled before admission
    pub fn release_queue(&mut self) -> Result<(), HandleError> {
        self.transition(Placement::Settled)
    }
}
