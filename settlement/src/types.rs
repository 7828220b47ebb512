//! Core types for settlement

use grouptab_ledger_core::{BalanceSnapshot, Money, PairKey, ParticipantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read access to canonical pairwise balances
///
/// A positive value under `(a, b)` means `a` owes `b`.
pub trait PairwiseBalances {
    /// Stored balance for a pair, zero if the pair never transacted
    fn lookup(&self, pair: &PairKey) -> Money;

    /// Every stored pair with its balance
    fn pairs(&self) -> Box<dyn Iterator<Item = (&PairKey, Money)> + '_>;
}

impl PairwiseBalances for BalanceSnapshot {
    fn lookup(&self, pair: &PairKey) -> Money {
        self.get(pair)
    }

    fn pairs(&self) -> Box<dyn Iterator<Item = (&PairKey, Money)> + '_> {
        Box::new(self.iter())
    }
}

impl PairwiseBalances for BTreeMap<PairKey, Money> {
    fn lookup(&self, pair: &PairKey) -> Money {
        self.get(pair).copied().unwrap_or(Money::ZERO)
    }

    fn pairs(&self) -> Box<dyn Iterator<Item = (&PairKey, Money)> + '_> {
        Box::new(self.iter().map(|(k, v)| (k, *v)))
    }
}

/// Settlement strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pair-level readout, no cross-cancellation
    DirectReadout,
    /// Group-wide netting into at most n - 1 transfers
    #[default]
    Netting,
}

/// What one participant must transfer to each counterparty
///
/// Positive: self pays them. Negative: they pay self. Settled
/// counterparties are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementResult(BTreeMap<ParticipantId, Money>);

impl SettlementResult {
    /// Empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the entry for `counterparty`, dropping it if it nets to zero
    pub(crate) fn add(&mut self, counterparty: ParticipantId, amount: Money) -> crate::Result<()> {
        let current = self.get(&counterparty);
        let next = current.checked_add(amount)?;
        if next.is_zero() {
            self.0.remove(&counterparty);
        } else {
            self.0.insert(counterparty, next);
        }
        Ok(())
    }

    /// Signed amount for one counterparty, zero if settled
    pub fn get(&self, counterparty: &ParticipantId) -> Money {
        self.0.get(counterparty).copied().unwrap_or(Money::ZERO)
    }

    /// Entries in participant order
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Money)> + '_ {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    /// Number of unsettled counterparties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if self is fully settled
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total self has to pay out, saturating
    pub fn owed_by_self(&self) -> Money {
        Money::saturating_sum(self.0.values().copied().filter(|v| v.is_positive()))
    }

    /// Total self is owed, saturating
    pub fn owed_to_self(&self) -> Money {
        let owed: i128 = self
            .0
            .values()
            .filter(|v| v.is_negative())
            .map(|v| -i128::from(v.minor()))
            .sum();
        Money::from_minor(owed.min(i128::from(i64::MAX)) as i64)
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<ParticipantId, Money> {
        &self.0
    }
}

/// One settlement leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Net debtor (pays)
    pub from: ParticipantId,

    /// Net creditor (receives)
    pub to: ParticipantId,

    /// Amount in minor units (positive)
    pub amount: Money,
}

/// Group-wide netting statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NettingStats {
    /// Participants with a nonzero net position
    pub participant_count: usize,

    /// Pairs with a nonzero balance
    pub gross_pair_count: usize,

    /// Legs in the plan
    pub transfer_count: usize,

    /// Sum of absolute pairwise balances
    pub total_gross: Money,

    /// Sum of planned transfer amounts
    pub total_net: Money,

    /// Pairwise debts that need no transfer of their own
    pub transfers_eliminated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    #[test]
    fn test_add_drops_settled_counterparty() {
        let mut result = SettlementResult::new();
        result.add(p("bob"), Money::from_minor(300)).unwrap();
        result.add(p("bob"), Money::from_minor(-300)).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.get(&p("bob")), Money::ZERO);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut result = SettlementResult::new();
        result.add(p("bob"), Money::from_minor(i64::MAX)).unwrap();
        result.add(p("carol"), Money::from_minor(i64::MAX)).unwrap();
        result.add(p("dave"), Money::from_minor(i64::MIN)).unwrap();

        assert_eq!(result.owed_by_self(), Money::from_minor(i64::MAX));
        assert_eq!(result.owed_to_self(), Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_result_serializes_as_map() {
        let mut result = SettlementResult::new();
        result.add(p("bob"), Money::from_minor(-800)).unwrap();
        result.add(p("carol"), Money::from_minor(200)).unwrap();

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"bob":-800,"carol":200}"#);
    }

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(serde_json::to_string(&Strategy::DirectReadout).unwrap(), r#""direct_readout""#);
        assert_eq!(serde_json::from_str::<Strategy>(r#""netting""#).unwrap(), Strategy::Netting);
    }

    #[test]
    fn test_snapshot_lookup_through_trait() {
        let mut snapshot = BalanceSnapshot::new();
        let key = PairKey::new(p("a"), p("b")).unwrap();
        snapshot.set(key.clone(), Money::from_minor(42));

        let balances: &dyn PairwiseBalances = &snapshot;
        assert_eq!(balances.lookup(&key), Money::from_minor(42));
        assert_eq!(balances.pairs().count(), 1);
    }
}
