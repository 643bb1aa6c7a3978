//! # Ballot Configuration
//!
//! This crate provides configuration parsing and logging setup for the ballot
//! decision layer.
//!
//! All settings live in one `ballot.toml` file. Every section is optional and
//! falls back to its defaults, and the whole file is validated after parsing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ballot_config::{init_tracing, Config};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("ballot.toml"))?;
//! init_tracing(&config.logging)?;
//!
//! println!("Max block data: {} bytes", config.block_data.max_data_bytes);
//! println!("Fetch timeout: {:?}", config.retrieval.fetch_timeout());
//! ```
//!
//! ## Configuration Sections
//!
//! - `[consensus]` - Proposer selection policy
//! - `[mempool]` - Pending transaction buffer limits
//! - `[block_data]` - Dissemination limits and location hints
//! - `[retrieval]` - Background fetch attempts, timeouts and backoff
//! - `[logging]` - Logging settings (level, format)

mod config;
mod error;
mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;
