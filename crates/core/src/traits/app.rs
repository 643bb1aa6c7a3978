//! Application state machine traits for speculative execution.
//!
//! The decision layer never commits transactions itself. It only asks the
//! application what *would* happen if a transaction were applied, either on top
//! of the latest committed state or on top of a speculative state returned by a
//! previous simulation.

use async_trait::async_trait;
use ballot_types::Transaction;
use thiserror::Error;

/// Errors raised by the application while trying to evaluate a transaction.
///
/// These are infrastructure failures (the state could not be read), not
/// verdicts about the transaction. A transaction that is simply invalid is
/// reported through [`TxResult::error`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The state needed for simulation could not be loaded.
    #[error("state unavailable: {0}")]
    StateUnavailable(String),

    /// The transaction bytes could not be decoded by the application.
    #[error("transaction decode failed: {0}")]
    Decode(String),

    /// Generic application error.
    #[error("application error: {0}")]
    Internal(String),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Outcome of simulating a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxResult {
    /// Business-logic rejection, if the transaction would fail.
    pub error: Option<String>,
    /// Gas consumed by the simulated execution.
    pub gas_used: u64,
}

impl TxResult {
    /// A successful result with the given gas usage.
    pub fn ok(gas_used: u64) -> Self {
        Self {
            error: None,
            gas_used,
        }
    }

    /// A rejected result carrying the application's reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            gas_used: 0,
        }
    }

    /// Returns true if the transaction would apply cleanly.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Speculative execution entry points of the application.
///
/// Implementations must never persist anything; the returned state is an
/// in-memory overlay that callers may feed into
/// [`simulate_with_state`](AppManager::simulate_with_state) to chain several
/// transactions.
#[async_trait]
pub trait AppManager: Send + Sync {
    /// Intermediate speculative state.
    type State: Clone + Send + Sync;

    /// Simulates `tx` against the latest committed state.
    async fn simulate(&self, tx: &Transaction) -> AppResult<(TxResult, Self::State)>;

    /// Simulates `tx` against a speculative `state`.
    async fn simulate_with_state(
        &self,
        state: Self::State,
        tx: &Transaction,
    ) -> AppResult<(TxResult, Self::State)>;
}
