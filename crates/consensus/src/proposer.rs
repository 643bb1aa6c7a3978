//! # Proposer Selection
//!
//! Every correct node must agree on who proposes at a given (height, round),
//! so selection is a pure function of its inputs.
//!
//! - [`RoundRobin`]: `validators[(height + round) % n]`
//! - [`StakeWeighted`]: round robin over cumulative voting power, so a
//!   validator with twice the power proposes twice as often

use ballot_config::ProposerSelectionKind;

use crate::types::{Validator, ValidatorSet};

/// Chooses the proposer for a round.
pub trait ProposerSelection: Send + Sync {
    /// Returns the proposer, or `None` for an empty set.
    fn select<'a>(
        &self,
        height: u64,
        round: u32,
        validators: &'a ValidatorSet,
    ) -> Option<&'a Validator>;
}

/// Plain round robin over the set order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl ProposerSelection for RoundRobin {
    fn select<'a>(
        &self,
        height: u64,
        round: u32,
        validators: &'a ValidatorSet,
    ) -> Option<&'a Validator> {
        if validators.is_empty() {
            return None;
        }
        let slot = (height as u128 + round as u128) % validators.len() as u128;
        validators.get(slot as usize)
    }
}

/// Round robin over cumulative voting power.
///
/// Slot `(height + round) % total_power` is mapped onto the validator whose
/// cumulative power range contains it. Over `total_power` consecutive slots
/// each validator is chosen exactly `power` times. A set with no power falls
/// back to [`RoundRobin`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeWeighted;

impl ProposerSelection for StakeWeighted {
    fn select<'a>(
        &self,
        height: u64,
        round: u32,
        validators: &'a ValidatorSet,
    ) -> Option<&'a Validator> {
        let total = validators
            .validators
            .iter()
            .map(|v| v.power as u128)
            .sum::<u128>();
        if total == 0 {
            return RoundRobin.select(height, round, validators);
        }

        let mut slot = (height as u128 + round as u128) % total;
        for validator in &validators.validators {
            let power = validator.power as u128;
            if slot < power {
                return Some(validator);
            }
            slot -= power;
        }

        // Unreachable: slot < total
        validators.validators.last()
    }
}

/// Builds the configured selection policy.
pub fn selection_for(kind: ProposerSelectionKind) -> Box<dyn ProposerSelection> {
    match kind {
        ProposerSelectionKind::RoundRobin => Box::new(RoundRobin),
        ProposerSelectionKind::StakeWeighted => Box::new(StakeWeighted),
    }
}
