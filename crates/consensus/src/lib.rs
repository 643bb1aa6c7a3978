//! # Ballot Consensus
//!
//! Decision layer for a Tendermint-style BFT engine. The engine owns networking,
//! timeouts and vote collection; this crate answers the questions it asks at
//! each step of a round.
//!
//! ## Round Flow
//!
//! ```text
//! Round r, Height h:
//!
//! ┌──────────────┐
//! │ ENTER ROUND  │  proposer = select(h, r, validators)
//! │              │  IF we are proposer:
//! │              │      txs = mempool.buffered()
//! │              │      data_id = provide(h, r, txs)   (or the empty id)
//! │              │      send Proposal{data_id, Time, Locations}
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   CONSIDER   │  FOR each proposed header, in order:
//! │              │      data missing   -> retrieve in background, defer
//! │              │      data invalid   -> reject
//! │              │      time in future -> reject
//! │              │      otherwise      -> accept (prevote hash)
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  PRECOMMIT   │  IF most prevoted hash has >= 2/3·P + 1 power:
//! │              │      precommit hash
//! │              │  ELSE:
//! │              │      precommit nil
//! └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ballot_consensus::{AppConsensusStrategy, ConsensusStrategy, ProposalDestination};
//!
//! let mut strategy = AppConsensusStrategy::new(
//!     app, mempool, store.clone(), retriever, cache, Some(my_key),
//! );
//!
//! let (dest, mut proposals) = ProposalDestination::channel(1);
//! strategy.enter_round(&cancel, &round_view, dest).await?;
//! let proposal = proposals.recv().await;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod annotations;
pub mod proposer;
pub mod simulation;
pub mod strategy;
pub mod types;

// Re-export main types at crate root for convenience
pub use annotations::BlockAnnotation;
pub use proposer::{selection_for, ProposerSelection, RoundRobin, StakeWeighted};
pub use simulation::{simulate_batch, SimulationOutcome};
pub use strategy::{
    AppConsensusStrategy, CandidateVerdict, ConsensusStrategy, DeferReason, RejectReason,
    StrategyError, StrategyResult,
};
pub use types::{
    byzantine_majority, Annotations, BlockHeader, ConsiderReason, Proposal, ProposalDestination,
    ProposedHeader, PubKey, RoundView, Validator, ValidatorSet, VoteSummary,
};
