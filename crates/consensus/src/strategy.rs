//! Consensus strategy backed by an application and a transaction buffer.
//!
//! The engine drives the strategy through four hooks, always for the round it
//! most recently entered:
//!
//! ```text
//! enter_round ──► consider_proposed_blocks* ──► decide_precommit
//!      │                 (until Accept or timeout)
//!      └─ proposer? build batch ─► provide ─► cache ─► send proposal
//! ```
//!
//! Hooks take `&mut self`, so a strategy is never driven concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_blockdata::{
    BlockDataProvider, BlockDataRetriever, DataId, DataIdError, ProposalDriverAnnotation,
    ProvideError, RequestCache,
};
use ballot_core::{AppError, AppManager, Mempool};
use ballot_types::H256;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::annotations::BlockAnnotation;
use crate::proposer::{ProposerSelection, RoundRobin};
use crate::simulation::{simulate_batch, SimulationOutcome};
use crate::types::{
    byzantine_majority, ConsiderReason, Proposal, ProposalDestination, ProposedHeader, PubKey,
    RoundView, VoteSummary,
};

/// Errors that can occur in strategy hooks
#[derive(Debug, Error)]
pub enum StrategyError {
    /// No candidate could be accepted yet. Not a failure; the engine calls
    /// again when more proposals or data arrive.
    #[error("no proposed block is ready to be chosen")]
    ProposedBlockChoiceNotReady,

    /// The round was cancelled before the proposal was accepted.
    #[error("round entry cancelled before the proposal was sent")]
    Cancelled,

    /// The engine dropped the proposal receiver.
    #[error("proposal channel closed")]
    ProposalChannelClosed,

    /// Block data could not be made available to peers.
    #[error("failed to provide block data: {0}")]
    Provide(#[from] ProvideError),

    /// The block annotation could not be encoded.
    #[error("failed to encode block annotation: {0}")]
    BlockAnnotation(#[source] serde_json::Error),

    /// The proposal driver annotation could not be encoded.
    #[error("failed to encode driver annotation: {0}")]
    DriverAnnotation(#[source] serde_json::Error),
}

/// Result type for strategy hooks
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Hooks invoked by the consensus engine.
///
/// The engine calls these sequentially, and `consider_proposed_blocks`,
/// `choose_proposed_block` and `decide_precommit` only for the round most
/// recently passed to `enter_round`.
#[async_trait]
pub trait ConsensusStrategy: Send {
    /// Records the new round and, if we are its proposer, sends a proposal.
    async fn enter_round(
        &mut self,
        cancel: &CancellationToken,
        round_view: &RoundView,
        destination: ProposalDestination,
    ) -> StrategyResult<()>;

    /// Returns the hash of the first acceptable candidate, or
    /// [`StrategyError::ProposedBlockChoiceNotReady`].
    async fn consider_proposed_blocks(
        &mut self,
        headers: &[ProposedHeader],
        reason: &ConsiderReason,
    ) -> StrategyResult<H256>;

    /// Like [`consider_proposed_blocks`](Self::consider_proposed_blocks) but
    /// maps "not ready" to `None`; called when the engine must prevote now.
    async fn choose_proposed_block(&mut self, headers: &[ProposedHeader])
        -> StrategyResult<Option<H256>>;

    /// Precommit target for the round, `None` for nil.
    async fn decide_precommit(&mut self, votes: &VoteSummary) -> StrategyResult<Option<H256>>;
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Header height differs from the current round.
    #[error("height {got} does not match current height {expected}")]
    HeightMismatch {
        /// Current height
        expected: u64,
        /// Header height
        got: u64,
    },

    /// Proposal round differs from the current round.
    #[error("round {got} does not match current round {expected}")]
    RoundMismatch {
        /// Current round
        expected: u32,
        /// Proposal round
        got: u32,
    },

    /// The header's data id did not parse.
    #[error("invalid data id: {0}")]
    InvalidDataId(DataIdError),

    /// The data id names another height or round.
    #[error("data id is for height {height} round {round}")]
    DataIdMismatch {
        /// Height in the data id
        height: u64,
        /// Round in the data id
        round: u32,
    },

    /// A transaction in the batch does not apply.
    #[error("transaction {index} ({tx_hash}) invalid: {reason}")]
    InvalidTransaction {
        /// Position in the batch
        index: usize,
        /// Transaction hash
        tx_hash: H256,
        /// Application's reason
        reason: String,
    },

    /// The application could not evaluate the batch.
    #[error("simulation of transaction {index} failed: {error}")]
    StateUnavailable {
        /// Position in the batch
        index: usize,
        /// Underlying failure
        error: AppError,
    },

    /// The block annotation is missing or malformed.
    #[error("invalid block annotation: {0}")]
    InvalidBlockAnnotation(String),

    /// The proposer claims a time after our clock.
    #[error("proposal time {proposed} is after local time {now}")]
    FutureTime {
        /// Claimed proposal time
        proposed: DateTime<Utc>,
        /// Local time at evaluation
        now: DateTime<Utc>,
    },
}

/// Why a candidate cannot be judged yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    /// Retrieval of its block data was just started.
    RetrievalStarted,
    /// Its block data is still being retrieved.
    RetrievalPending,
    /// Retrieval could not be started.
    RetrievalFailed(String),
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateVerdict {
    /// The candidate is valid; vote for this header hash.
    Accept(H256),
    /// The candidate is invalid.
    Reject(RejectReason),
    /// The candidate may become valid once its data arrives.
    Defer(DeferReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoundContext {
    height: u64,
    round: u32,
}

/// [`ConsensusStrategy`] that proposes from a [`Mempool`] and validates
/// candidates by simulating them on an [`AppManager`].
pub struct AppConsensusStrategy<A: AppManager> {
    app: Arc<A>,
    mempool: Arc<dyn Mempool>,
    provider: Arc<dyn BlockDataProvider>,
    retriever: Arc<dyn BlockDataRetriever>,
    cache: Arc<RequestCache>,
    selection: Box<dyn ProposerSelection>,
    signer: Option<PubKey>,
    current: Option<RoundContext>,
}

impl<A: AppManager> AppConsensusStrategy<A> {
    /// Creates a strategy using round-robin proposer selection.
    ///
    /// `cache` must be the cache `retriever` publishes into. `signer` is the
    /// local validator key, `None` for a non-validating node.
    pub fn new(
        app: Arc<A>,
        mempool: Arc<dyn Mempool>,
        provider: Arc<dyn BlockDataProvider>,
        retriever: Arc<dyn BlockDataRetriever>,
        cache: Arc<RequestCache>,
        signer: Option<PubKey>,
    ) -> Self {
        let signer_label = signer
            .as_ref()
            .map_or_else(|| "none".to_string(), |k| k.to_string());
        info!(signer = %signer_label, "Consensus strategy created");

        Self {
            app,
            mempool,
            provider,
            retriever,
            cache,
            selection: Box::new(RoundRobin),
            signer,
            current: None,
        }
    }

    /// Replaces the proposer selection policy.
    pub fn with_proposer_selection(mut self, selection: Box<dyn ProposerSelection>) -> Self {
        self.selection = selection;
        self
    }

    /// Current (height, round), if a round has been entered.
    pub fn current_round(&self) -> Option<(u64, u32)> {
        self.current.map(|c| (c.height, c.round))
    }

    /// Waits for every background retrieval started so far.
    pub async fn wait(&self) {
        self.retriever.wait().await;
    }

    /// Evaluates one candidate against the current round.
    async fn evaluate_candidate(&self, ctx: RoundContext, ph: &ProposedHeader) -> CandidateVerdict {
        if ph.header.height != ctx.height {
            return CandidateVerdict::Reject(RejectReason::HeightMismatch {
                expected: ctx.height,
                got: ph.header.height,
            });
        }
        if ph.round != ctx.round {
            return CandidateVerdict::Reject(RejectReason::RoundMismatch {
                expected: ctx.round,
                got: ph.round,
            });
        }

        let raw_id = match std::str::from_utf8(&ph.header.data_id) {
            Ok(s) => s,
            Err(_) => {
                return CandidateVerdict::Reject(RejectReason::InvalidDataId(DataIdError::NotUtf8))
            }
        };
        let id: DataId = match raw_id.parse() {
            Ok(id) => id,
            Err(e) => return CandidateVerdict::Reject(RejectReason::InvalidDataId(e)),
        };
        if id.height != ctx.height || id.round != ctx.round {
            return CandidateVerdict::Reject(RejectReason::DataIdMismatch {
                height: id.height,
                round: id.round,
            });
        }

        if !id.is_empty() {
            let Some(request) = self.cache.get(raw_id) else {
                return match self.retriever.retrieve(raw_id, &ph.annotations.driver) {
                    Ok(()) => CandidateVerdict::Defer(DeferReason::RetrievalStarted),
                    Err(e) => {
                        warn!(
                            height = ctx.height,
                            round = ctx.round,
                            data_id = raw_id,
                            error = %e,
                            "Failed to start block data retrieval"
                        );
                        CandidateVerdict::Defer(DeferReason::RetrievalFailed(e.to_string()))
                    }
                };
            };
            let Some(data) = request.data() else {
                return CandidateVerdict::Defer(DeferReason::RetrievalPending);
            };

            match simulate_batch(self.app.as_ref(), &data.transactions).await {
                SimulationOutcome::Valid { .. } => {}
                SimulationOutcome::InvalidTransaction {
                    index,
                    tx_hash,
                    reason,
                } => {
                    return CandidateVerdict::Reject(RejectReason::InvalidTransaction {
                        index,
                        tx_hash,
                        reason,
                    })
                }
                SimulationOutcome::StateUnavailable { index, error } => {
                    return CandidateVerdict::Reject(RejectReason::StateUnavailable { index, error })
                }
            }
        }

        let annotation = match BlockAnnotation::from_json(&ph.header.annotations.driver) {
            Ok(a) => a,
            Err(e) => {
                return CandidateVerdict::Reject(RejectReason::InvalidBlockAnnotation(e.to_string()))
            }
        };
        let proposed = match annotation.time() {
            Ok(t) => t,
            Err(e) => {
                return CandidateVerdict::Reject(RejectReason::InvalidBlockAnnotation(e.to_string()))
            }
        };
        let now = Utc::now();
        if proposed > now {
            return CandidateVerdict::Reject(RejectReason::FutureTime { proposed, now });
        }

        CandidateVerdict::Accept(ph.header.hash)
    }
}

#[async_trait]
impl<A: AppManager + 'static> ConsensusStrategy for AppConsensusStrategy<A> {
    async fn enter_round(
        &mut self,
        cancel: &CancellationToken,
        round_view: &RoundView,
        destination: ProposalDestination,
    ) -> StrategyResult<()> {
        let height = round_view.height;
        let round = round_view.round;
        if self.current.is_some_and(|c| c.height < height) {
            let pruned = self.cache.prune_below(height);
            if pruned > 0 {
                debug!(height, pruned, "Pruned block data of earlier heights");
            }
        }
        self.current = Some(RoundContext { height, round });

        debug!(height, round, "Entering round");

        let Some(signer) = self.signer.as_ref() else {
            return Ok(());
        };

        let Some(proposer) = self
            .selection
            .select(height, round, &round_view.validator_set)
        else {
            warn!(height, round, "Round has no validators");
            return Ok(());
        };
        if &proposer.pub_key != signer {
            debug!(height, round, proposer = %proposer.pub_key, "Not the proposer");
            return Ok(());
        }

        let sender = match destination {
            ProposalDestination::Channel(sender) => sender,
            ProposalDestination::Absent => {
                let already_proposed = round_view
                    .proposed_headers
                    .iter()
                    .any(|ph| &ph.proposer_pub_key == signer);
                if already_proposed {
                    debug!(height, round, "Already proposed in this round");
                    return Ok(());
                }
                panic!(
                    "BUG: no proposal destination at height {height} round {round}, \
                     and no header of ours was proposed"
                );
            }
        };

        let block_annotation = BlockAnnotation::now()
            .to_json()
            .map_err(StrategyError::BlockAnnotation)?;

        let txs = self.mempool.buffered(None).await;
        let n_txs = txs.len();

        let (data_id, driver_annotation) = if txs.is_empty() {
            let data_id = DataId::empty(height, round).to_string();
            self.cache
                .set_immediately_available(&data_id, Vec::new(), Bytes::new());
            (data_id, Bytes::new())
        } else {
            let provided = self.provider.provide(height, round, &txs).await?;
            let driver = ProposalDriverAnnotation::new(provided.addrs)
                .to_json()
                .map_err(StrategyError::DriverAnnotation)?;
            self.cache
                .set_immediately_available(&provided.data_id, txs, provided.encoded);
            (provided.data_id, Bytes::from(driver))
        };

        let proposal = Proposal {
            data_id: data_id.clone(),
            block_annotations: Bytes::from(block_annotation),
            proposal_annotations: driver_annotation,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(height, round, "Proposal cancelled");
                return Err(StrategyError::Cancelled);
            }
            sent = sender.send(proposal) => {
                sent.map_err(|_| StrategyError::ProposalChannelClosed)?;
            }
        }

        info!(height, round, data_id = %data_id, n_txs, "Proposal sent");
        Ok(())
    }

    async fn consider_proposed_blocks(
        &mut self,
        headers: &[ProposedHeader],
        reason: &ConsiderReason,
    ) -> StrategyResult<H256> {
        let Some(ctx) = self.current else {
            warn!("Asked to consider proposed blocks before entering a round");
            return Err(StrategyError::ProposedBlockChoiceNotReady);
        };

        debug!(
            height = ctx.height,
            round = ctx.round,
            candidates = headers.len(),
            new = reason.new_proposed_blocks.len(),
            updated = reason.updated_block_data_ids.len(),
            "Considering proposed blocks"
        );

        for ph in headers {
            match self.evaluate_candidate(ctx, ph).await {
                CandidateVerdict::Accept(hash) => {
                    debug!(
                        height = ctx.height,
                        round = ctx.round,
                        block_hash = %hash,
                        "Accepted proposed block"
                    );
                    return Ok(hash);
                }
                CandidateVerdict::Reject(why) => debug!(
                    height = ctx.height,
                    round = ctx.round,
                    block_hash = %ph.header.hash,
                    reason = %why,
                    "Rejected proposed block"
                ),
                CandidateVerdict::Defer(why) => debug!(
                    height = ctx.height,
                    round = ctx.round,
                    block_hash = %ph.header.hash,
                    reason = ?why,
                    "Deferred proposed block"
                ),
            }
        }

        Err(StrategyError::ProposedBlockChoiceNotReady)
    }

    async fn choose_proposed_block(
        &mut self,
        headers: &[ProposedHeader],
    ) -> StrategyResult<Option<H256>> {
        match self
            .consider_proposed_blocks(headers, &ConsiderReason::default())
            .await
        {
            Ok(hash) => Ok(Some(hash)),
            Err(StrategyError::ProposedBlockChoiceNotReady) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn decide_precommit(&mut self, votes: &VoteSummary) -> StrategyResult<Option<H256>> {
        let majority = byzantine_majority(votes.available_power);

        let decision = match votes.most_voted_prevote_hash() {
            Some((hash, power)) if power >= majority => Some(hash),
            _ => None,
        };

        let (height, round) = self.current_round().unwrap_or_default();
        debug!(
            height,
            round,
            majority,
            available_power = votes.available_power,
            precommit = %decision.map_or_else(|| "nil".to_string(), |h| h.to_string()),
            "Decided precommit"
        );

        Ok(decision)
    }
}
