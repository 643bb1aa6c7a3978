//! Collaborator traits for the ballot decision layer.
//!
//! This module defines abstract traits for the components the decision layer
//! consumes but does not own, so that different implementations can be
//! swapped in.
//!
//! # Architecture
//!
//! - **App**: speculative execution against committed or intermediate state
//! - **Mempool**: the buffer of pending transactions used when proposing
//!
//! ```ignore
//! use ballot_core::traits::{AppManager, Mempool};
//!
//! async fn propose_all<A: AppManager, M: Mempool>(app: &A, mempool: &M) {
//!     for tx in mempool.buffered(None).await {
//!         let (res, _state) = app.simulate(&tx).await?;
//!     }
//! }
//! ```

mod app;
mod mempool;

pub use app::*;
pub use mempool::*;
