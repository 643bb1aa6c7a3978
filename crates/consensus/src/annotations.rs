//! Block annotation written by the proposer.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Persisted in the header's driver annotation. The claimed proposal time is
/// only used to reject headers from the future; it plays no part in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAnnotation {
    /// RFC3339 wall-clock time, UTC, second precision
    #[serde(rename = "Time")]
    pub time: String,
}

impl BlockAnnotation {
    /// Annotation claiming `time`.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time: time.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Annotation claiming the current time.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Parses the claimed time.
    pub fn time(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(&self.time).map(|t| t.with_timezone(&Utc))
    }

    /// JSON encoding stored in the header.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a header's block annotation.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}
