//! # Ballot Mempool
//!
//! Pending transaction buffer for the ballot decision layer.
//!
//! [`TxBuffer`] keeps transactions in arrival order and only accepts a
//! transaction that applies cleanly on top of everything already buffered:
//! - Duplicate, oversized and over-capacity transactions are refused up front
//! - Each accepted transaction advances the buffer's speculative state
//! - [`TxBuffer::rebase`] drops committed transactions and re-validates the rest
//!
//! ## Example
//!
//! ```rust,ignore
//! use ballot_config::MempoolConfig;
//! use ballot_core::Mempool;
//! use ballot_mempool::TxBuffer;
//!
//! let buffer = TxBuffer::new(app, MempoolConfig::default());
//! buffer.add_tx(tx).await?;
//!
//! // Everything buffered, in proposal order
//! let txs = buffer.buffered(None).await;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod pool;

pub use pool::TxBuffer;

// The error type lives next to the trait it belongs to.
pub use ballot_core::{MempoolError, MempoolResult};
