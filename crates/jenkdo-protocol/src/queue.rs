//! Queue item types.
//!
//! A triggered build first exists as a queue item. Polling the item's JSON
//! tells whether an executor has picked it up (`executable` present) or why
//! it is still waiting (`why`).

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Block reason reported when the server gives none.
pub const UNKNOWN_REASON: &str = "Unknown";

/// Queue item JSON (`{queue_url}api/json`), reduced to the fields we use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(default)]
    pub id: Option<u64>,
    /// Human-readable reason the item is still queued.
    #[serde(default)]
    pub why: Option<String>,
    /// Present once the item has become a build.
    #[serde(default)]
    pub executable: Option<Executable>,
    #[serde(default)]
    pub cancelled: Option<bool>,
}

/// The build a queue item resolved into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub number: u64,
    pub url: String,
}

/// Decoded outcome of one queue poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueDecision {
    /// An executor picked the item up.
    Admitted { number: u64, url: String },
    /// Still waiting for an executor.
    StillQueued { reason: String },
    /// The item was cancelled on the server before it ran.
    Cancelled,
    /// The poll itself failed; retry with unchanged state.
    TransientError { detail: String },
}

impl QueueDecision {
    /// Decode a raw queue poll response.
    pub fn decode(status: u16, body: &[u8]) -> Self {
        if status != 200 {
            return Self::TransientError {
                detail: ProtocolError::UnexpectedStatus(status).to_string(),
            };
        }

        match serde_json::from_slice::<QueueItem>(body) {
            Ok(item) => Self::from_item(item),
            Err(e) => Self::TransientError {
                detail: ProtocolError::Json(e).to_string(),
            },
        }
    }

    pub fn from_item(item: QueueItem) -> Self {
        match item.executable {
            Some(Executable { number, url }) => Self::Admitted { number, url },
            None if item.cancelled == Some(true) => Self::Cancelled,
            None => Self::StillQueued {
                reason: item.why.unwrap_or_else(|| UNKNOWN_REASON.to_string()),
            },
        }
    }
}

/// Numeric queue id from the final path segment of a queue location.
pub fn queue_id_from_location(location: &str) -> Result<u64, ProtocolError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| ProtocolError::InvalidQueueLocation(location.to_string()))
}
