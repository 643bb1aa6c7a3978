//! Chained simulation of a proposed batch.

use ballot_core::{AppError, AppManager};
use ballot_types::{Transaction, H256};
use tracing::trace;

/// Result of simulating every transaction of a batch in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// Every transaction applies on top of the previous one.
    Valid {
        /// Total gas of the batch
        gas_used: u64,
    },
    /// A transaction was rejected by the application.
    InvalidTransaction {
        /// Position in the batch
        index: usize,
        /// Hash of the rejected transaction
        tx_hash: H256,
        /// Application's reason
        reason: String,
    },
    /// The application could not evaluate a transaction.
    StateUnavailable {
        /// Position in the batch
        index: usize,
        /// Underlying failure
        error: AppError,
    },
}

impl SimulationOutcome {
    /// Returns true if the whole batch applies.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Simulates `txs` in order, the first against committed state and each
/// later one against the state left by its predecessor. Stops at the first
/// failure.
pub async fn simulate_batch<A>(app: &A, txs: &[Transaction]) -> SimulationOutcome
where
    A: AppManager + ?Sized,
{
    let mut state: Option<A::State> = None;
    let mut gas_used = 0u64;

    for (index, tx) in txs.iter().enumerate() {
        let simulated = match state.take() {
            None => app.simulate(tx).await,
            Some(prev) => app.simulate_with_state(prev, tx).await,
        };

        let (result, next) = match simulated {
            Ok(out) => out,
            Err(error) => return SimulationOutcome::StateUnavailable { index, error },
        };

        if let Some(reason) = result.error {
            return SimulationOutcome::InvalidTransaction {
                index,
                tx_hash: tx.hash(),
                reason,
            };
        }

        trace!(index, tx_hash = %tx.hash(), gas_used = result.gas_used, "Simulated transaction");
        gas_used = gas_used.saturating_add(result.gas_used);
        state = Some(next);
    }

    SimulationOutcome::Valid { gas_used }
}
