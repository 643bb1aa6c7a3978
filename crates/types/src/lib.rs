//! # Ballot Types
//!
//! Core type definitions shared by the ballot crates.
//!
//! This crate provides the fundamental types used throughout ballot:
//! - [`H256`] - 32-byte hashes with Keccak256 support
//! - [`Transaction`] - opaque application transactions, addressed by their hash
//!
//! ## Example
//!
//! ```rust
//! use ballot_types::{H256, Transaction};
//!
//! let tx = Transaction::new(b"transfer 10 to bob".to_vec());
//! assert_eq!(tx.hash(), H256::keccak256(b"transfer 10 to bob"));
//! assert_ne!(tx.hash(), H256::NIL);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod hash;
pub mod transaction;

// Re-export main types at crate root
pub use hash::{H256, HASH_SIZE};
pub use transaction::Transaction;

/// Result type alias for ballot types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with ballot types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}
