//! # Ballot Block Data
//!
//! Proposed headers reference their transactions indirectly, through a
//! content-addressed block-data identifier. This crate owns everything on
//! either side of that indirection:
//!
//! - **Identifiers** ([`DataId`]): `<height>:<round>:<n_txs>:<data_len>:<hash>`
//! - **Encoding**: the canonical RLP batch encoding the identifier hashes
//! - **Dissemination** ([`BlockDataProvider`]): publishing a local batch
//! - **Retrieval** ([`BlockDataRetriever`], [`ProposedBlockDataRetriever`]):
//!   fetching a remote batch in the background and verifying it
//! - **Caching** ([`RequestCache`]): per-identifier pending/ready records
//!   shared between the consensus strategy and the retriever
//!
//! [`MemoryBlockDataStore`] implements both the provider and the fetcher, so
//! several validators sharing one store form a complete local network.
//!
//! ## Example
//!
//! ```rust
//! use ballot_blockdata::{DataId, ZERO_HASH_SUFFIX};
//!
//! let id = DataId::empty(10, 2);
//! assert_eq!(id.to_string(), format!("10:2{ZERO_HASH_SUFFIX}"));
//! assert_eq!(id.to_string().parse::<DataId>().unwrap(), id);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod annotation;
pub mod data_id;
pub mod encoding;
pub mod provider;
pub mod request_cache;
pub mod retriever;
pub mod store;

pub use annotation::ProposalDriverAnnotation;
pub use data_id::{
    data_id, parse_data_id, DataId, DataIdError, ZERO_HASH, ZERO_HASH_BYTES, ZERO_HASH_SUFFIX,
};
pub use encoding::{decode_transactions, encode_transactions, verify_block_data, BlockDataError};
pub use provider::{BlockDataProvider, ProvideError, ProvidedBlockData};
pub use request_cache::{BlockData, BlockDataRequest, RequestCache};
pub use retriever::{
    BlockDataFetcher, BlockDataRetriever, FetchError, ProposedBlockDataRetriever, RetrieveError,
};
pub use store::MemoryBlockDataStore;
