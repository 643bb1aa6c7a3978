//! Types exchanged between the consensus engine and the strategy.
//!
//! This module defines the data the engine hands to the decision layer:
//! - [`Validator`] and [`ValidatorSet`] - who may propose and vote
//! - [`BlockHeader`] and [`ProposedHeader`] - candidates for the current round
//! - [`RoundView`] - what the engine knows when a round starts
//! - [`Proposal`] and [`ProposalDestination`] - how a proposal goes back out
//! - [`VoteSummary`] - prevote tally used for the precommit decision

use ballot_types::H256;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;

/// Public key of a validator, opaque to the decision layer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PubKey(Bytes);

impl PubKey {
    /// Wraps raw key bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({self})")
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(8)];
        write!(f, "0x{}", hex::encode(shown))?;
        if self.0.len() > 8 {
            write!(f, "..")?;
        }
        Ok(())
    }
}

impl From<&[u8]> for PubKey {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

/// Validator information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    /// Consensus public key
    pub pub_key: PubKey,
    /// Voting power
    pub power: u64,
}

impl Validator {
    /// Create a new validator
    pub fn new(pub_key: PubKey, power: u64) -> Self {
        Self { pub_key, power }
    }
}

/// Ordered validators for one height.
///
/// The order is significant: proposer selection indexes into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    /// Validators in canonical order
    pub validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Create a new validator set from a list of validators
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    /// Sum of all voting power
    pub fn total_power(&self) -> u64 {
        self.validators
            .iter()
            .fold(0u64, |acc, v| acc.saturating_add(v.power))
    }

    /// Power required for a byzantine majority of this set
    pub fn majority_power(&self) -> u64 {
        byzantine_majority(self.total_power())
    }

    /// Get the number of validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if the validator set is empty
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Get a validator by index
    pub fn get(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Get a validator by public key
    pub fn get_by_pub_key(&self, pub_key: &PubKey) -> Option<&Validator> {
        self.validators.iter().find(|v| &v.pub_key == pub_key)
    }
}

/// Smallest power strictly greater than two thirds of `total`.
///
/// For n = 3f + 1 equal-power validators this is 2f + 1.
pub fn byzantine_majority(total: u64) -> u64 {
    // Widen so 2 * total cannot overflow
    ((total as u128 * 2 / 3) + 1) as u64
}

/// Opaque annotation bytes.
///
/// `driver` belongs to this decision layer; `user` belongs to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    /// Application-owned annotation
    pub user: Bytes,
    /// Driver-owned annotation
    pub driver: Bytes,
}

/// Block header as persisted in consensus history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Hash of this header
    pub hash: H256,
    /// Hash of the parent header
    pub prev_block_hash: H256,
    /// Block height
    pub height: u64,
    /// Block-data identifier, as text bytes
    pub data_id: Bytes,
    /// Header annotations; `driver` carries the block annotation
    pub annotations: Annotations,
}

/// A header proposed in a specific round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedHeader {
    /// The proposed block header
    pub header: BlockHeader,
    /// Round the header was proposed in
    pub round: u32,
    /// Proposer of the header
    pub proposer_pub_key: PubKey,
    /// Proposal annotations; `driver` carries location hints
    pub annotations: Annotations,
}

/// Engine state at round entry.
#[derive(Debug, Clone, Default)]
pub struct RoundView {
    /// Height being decided
    pub height: u64,
    /// Round within the height
    pub round: u32,
    /// Validators for this height
    pub validator_set: ValidatorSet,
    /// Headers already proposed in this round (non-empty after a restart)
    pub proposed_headers: Vec<ProposedHeader>,
}

/// Proposal handed back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Block-data identifier for the header
    pub data_id: String,
    /// Goes into the header's driver annotation
    pub block_annotations: Bytes,
    /// Goes into the proposal's driver annotation
    pub proposal_annotations: Bytes,
}

/// Where to send a proposal, if anywhere.
#[derive(Debug)]
pub enum ProposalDestination {
    /// Send the proposal on this channel
    Channel(mpsc::Sender<Proposal>),
    /// No proposal is expected; only valid when recovering a round we already
    /// proposed in
    Absent,
}

impl ProposalDestination {
    /// Creates a channel destination together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Proposal>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::Channel(tx), rx)
    }
}

/// Why the engine is asking for consideration. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsiderReason {
    /// Hashes of headers that arrived since the last call
    pub new_proposed_blocks: Vec<H256>,
    /// Block-data identifiers whose retrieval completed since the last call
    pub updated_block_data_ids: Vec<String>,
    /// Whether a majority of voting power is already online
    pub majority_voting_power_present: bool,
}

/// Prevote tally for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteSummary {
    /// Power of validators that are reachable
    pub available_power: u64,
    /// Prevote power per block hash
    pub prevote_block_power: HashMap<H256, u64>,
    /// Power that prevoted nil
    pub nil_prevote_power: u64,
}

impl VoteSummary {
    /// Creates an empty tally.
    pub fn new(available_power: u64) -> Self {
        Self {
            available_power,
            ..Default::default()
        }
    }

    /// Adds a prevote; `None` is a nil prevote.
    pub fn add_prevote(&mut self, block_hash: Option<H256>, power: u64) {
        match block_hash {
            Some(hash) => {
                let entry = self.prevote_block_power.entry(hash).or_default();
                *entry = entry.saturating_add(power);
            }
            None => self.nil_prevote_power = self.nil_prevote_power.saturating_add(power),
        }
    }

    /// Prevote power for `block_hash`.
    pub fn prevote_power(&self, block_hash: &H256) -> u64 {
        self.prevote_block_power.get(block_hash).copied().unwrap_or(0)
    }

    /// Block hash with the most prevote power and that power.
    ///
    /// Ties go to the smallest hash.
    pub fn most_voted_prevote_hash(&self) -> Option<(H256, u64)> {
        self.prevote_block_power
            .iter()
            .map(|(hash, power)| (*hash, *power))
            .max_by(|(ha, pa), (hb, pb)| pa.cmp(pb).then_with(|| hb.cmp(ha)))
    }
}
