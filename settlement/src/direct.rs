//! Direct pairwise readout
//!
//! Answers "what do I owe this one person" straight from the pair balance,
//! ignoring any cancellation through the rest of the group.

use grouptab_ledger_core::ParticipantId;

use crate::{
    types::{PairwiseBalances, SettlementResult},
    Result,
};

/// Read every pair touching `self_id` from its point of view
pub fn direct_readout<B>(balances: &B, self_id: &ParticipantId) -> Result<SettlementResult>
where
    B: PairwiseBalances + ?Sized,
{
    let mut result = SettlementResult::new();

    for (pair, stored) in balances.pairs() {
        let (Some(other), Some(sign)) = (pair.other(self_id), pair.orient(self_id)) else {
            continue;
        };
        let owed = if sign > 0 { stored } else { stored.checked_neg()? };
        result.add(other.clone(), owed)?;
    }

    Ok(result)
}
