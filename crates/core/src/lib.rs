//! # Ballot Core - Collaborator Abstractions
//!
//! This crate provides the traits that the ballot decision layer consumes
//! from the rest of the node:
//!
//! - **Application**: speculative (non-committing) transaction execution
//! - **Mempool**: snapshot of pending transactions to propose
//!
//! # Design Philosophy
//!
//! 1. **Trait-based abstractions**: the decision layer depends on these
//!    traits rather than on a concrete application or mempool.
//!
//! 2. **Thread safety**: all traits require `Send + Sync` for safe concurrent use.
//!
//! 3. **Async-first**: simulation may hit storage, so all entry points are async.
//!
//! # Swappable Components
//!
//! | Component | Trait | Default Impl |
//! |-----------|-------|--------------|
//! | Application | `AppManager` | provided by the host node |
//! | Mempool | `Mempool` | `ballot_mempool::TxBuffer` |

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod traits;

// Re-export commonly used types
pub use traits::{
    // App
    AppError, AppManager, AppResult, TxResult,
    // Mempool
    Mempool, MempoolError, MempoolResult, TxFilter,
};
