//! Build status types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Build JSON (`{build_url}api/json`), reduced to the fields we use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    /// A missing field reads as not building.
    #[serde(default)]
    pub building: bool,
    /// Terminal result; null while the build runs.
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub number: Option<u64>,
}

impl BuildStatus {
    /// Decode a build status response; anything but 200 is an error.
    pub fn decode(status: u16, body: &[u8]) -> Result<Self, ProtocolError> {
        if status != 200 {
            return Err(ProtocolError::UnexpectedStatus(status));
        }
        Ok(serde_json::from_slice(body)?)
    }
}

/// Terminal result of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    Other(String),
}

impl BuildResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
            Self::Other(other) => other,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for BuildResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SUCCESS" => Self::Success,
            "UNSTABLE" => Self::Unstable,
            "FAILURE" => Self::Failure,
            "NOT_BUILT" => Self::NotBuilt,
            "ABORTED" => Self::Aborted,
            _ => Self::Other(value),
        }
    }
}

impl From<BuildResult> for String {
    fn from(value: BuildResult) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_build() {
        let status = BuildStatus::decode(200, br#"{"building":true,"result":null,"number":7}"#).unwrap();
        assert!(status.building);
        assert_eq!(status.result, None);
        assert_eq!(status.number, Some(7));
    }

    #[test]
    fn test_finished_build() {
        let status = BuildStatus::decode(200, br#"{"building":false,"result":"FAILURE"}"#).unwrap();
        assert!(!status.building);
        assert_eq!(status.result, Some(BuildResult::Failure));
    }

    #[test]
    fn test_missing_building_reads_as_stopped() {
        let status = BuildStatus::decode(200, b"{}").unwrap();
        assert!(!status.building);
    }

    #[test]
    fn test_unknown_result_is_preserved() {
        let status = BuildStatus::decode(200, br#"{"building":false,"result":"CUSTOM"}"#).unwrap();
        assert_eq!(status.result, Some(BuildResult::Other("CUSTOM".to_string())));
        assert_eq!(status.result.unwrap().to_string(), "CUSTOM");
    }

    #[test]
    fn test_non_200_is_an_error() {
        assert!(matches!(
            BuildStatus::decode(404, b""),
            Err(ProtocolError::UnexpectedStatus(404))
        ));
    }
}
