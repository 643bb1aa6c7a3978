//! Proposal driver annotation.

use serde::{Deserialize, Serialize};

/// Attached to a proposal (never persisted on-chain). Tells peers where the
/// referenced block data can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalDriverAnnotation {
    /// Location hints, tried in order.
    #[serde(rename = "Locations")]
    pub locations: Vec<String>,
}

impl ProposalDriverAnnotation {
    /// Creates an annotation from location hints.
    pub fn new(locations: Vec<String>) -> Self {
        Self { locations }
    }

    /// JSON encoding carried in the proposal.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes an annotation received with a proposal.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}
