//! Multilateral netting
//!
//! Reduces a group's pairwise balances to at most `n - 1` transfers for
//! `n` participants with a nonzero net position.
//!
//! # Algorithm
//!
//! 1. Fold every pairwise balance into both endpoints' net positions
//! 2. Check conservation: net positions sum to zero
//! 3. Repeatedly match the largest net creditor with the largest net debtor
//! 4. Each leg clears whichever side is smaller
//!
//! # Example
//!
//! ```text
//! Pairwise balances (positive = first owes second):
//!   (A, B): -500   B owes A $5
//!   (A, C): -500   C owes A $5
//!   (B, C): +300   B owes C $3
//!
//! Net positions:
//!   A: +1000 (net creditor)
//!   B:  -800 (net debtor)
//!   C:  -200 (net debtor)
//!
//! Transfers:
//!   B pays A 800
//!   C pays A 200
//! ```

use grouptab_ledger_core::{Money, ParticipantId};
use std::collections::BTreeMap;

use crate::{
    types::{NettingStats, PairwiseBalances, SettlementResult, Transfer},
    Error, Result,
};

/// Net positions keyed by participant (positive = owed money)
pub type NetPositions = BTreeMap<ParticipantId, Money>;

/// Group-wide settlement plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NettingPlan {
    /// Net positions the plan was computed from
    pub positions: NetPositions,

    /// Legs in the order they were chosen
    pub transfers: Vec<Transfer>,

    /// Pairs with a nonzero balance
    pub gross_pair_count: usize,

    /// Sum of absolute pairwise balances, saturating
    pub total_gross: Money,
}

/// Net position of every participant mentioned by a pair
///
/// The first endpoint of a positive balance is a net debtor, the second a
/// net creditor.
pub fn net_positions<B>(balances: &B) -> Result<NetPositions>
where
    B: PairwiseBalances + ?Sized,
{
    let mut positions = NetPositions::new();

    for (pair, stored) in balances.pairs() {
        let first = positions.entry(pair.first().clone()).or_insert(Money::ZERO);
        *first = first.checked_sub(stored)?;

        let second = positions.entry(pair.second().clone()).or_insert(Money::ZERO);
        *second = second.checked_add(stored)?;
    }

    check_conservation(&positions)?;
    Ok(positions)
}

/// Fail unless net positions sum to exactly zero
pub fn check_conservation(positions: &NetPositions) -> Result<()> {
    let total: i128 = positions.values().map(|m| i128::from(m.minor())).sum();
    if total != 0 {
        tracing::error!(total = %total, participants = positions.len(), "net positions do not sum to zero");
        return Err(Error::ConservationViolation(format!(
            "net positions sum to {} across {} participants",
            total,
            positions.len()
        )));
    }
    Ok(())
}

/// Compute the full netting plan for a group
pub fn plan_netting<B>(balances: &B) -> Result<NettingPlan>
where
    B: PairwiseBalances + ?Sized,
{
    let mut gross_pair_count = 0;
    let mut gross: i128 = 0;
    for (_, stored) in balances.pairs() {
        if !stored.is_zero() {
            gross_pair_count += 1;
            gross += i128::from(stored.minor()).abs();
        }
    }
    let total_gross = Money::from_minor(gross.min(i128::from(i64::MAX)) as i64);

    let positions = net_positions(balances)?;
    let transfers = generate_transfers(&positions)?;

    Ok(NettingPlan {
        positions,
        transfers,
        gross_pair_count,
        total_gross,
    })
}

/// Match creditors with debtors until every position is zero
///
/// Picks the largest remaining creditor and the largest remaining debtor,
/// ties broken by participant order. Fails if positions are not
/// conservative or the loop runs past `n - 1` legs.
pub fn generate_transfers(positions: &NetPositions) -> Result<Vec<Transfer>> {
    check_conservation(positions)?;

    let mut remaining: NetPositions = positions
        .iter()
        .filter(|(_, v)| !v.is_zero())
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let bound = remaining.len().saturating_sub(1);
    let mut transfers = Vec::with_capacity(bound);

    loop {
        let creditor = remaining
            .iter()
            .filter(|(_, v)| v.is_positive())
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(k, v)| (k.clone(), *v));
        let debtor = remaining
            .iter()
            .filter(|(_, v)| v.is_negative())
            .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(k, v)| (k.clone(), *v));

        let ((to, owed), (from, owing)) = match (creditor, debtor) {
            (None, None) => break,
            (Some(c), Some(d)) => (c, d),
            _ => {
                return Err(Error::ConservationViolation(
                    "net position stuck away from zero".to_string(),
                ))
            }
        };

        if transfers.len() >= bound {
            tracing::error!(bound, "netting exceeded iteration bound");
            return Err(Error::IterationBound { bound });
        }

        let amount = owed.min(owing.checked_neg()?);
        tracing::debug!(from = %from, to = %to, amount = amount.minor(), "netting leg");

        settle_leg(&mut remaining, &to, owed.checked_sub(amount)?);
        settle_leg(&mut remaining, &from, owing.checked_add(amount)?);

        transfers.push(Transfer { from, to, amount });
    }

    Ok(transfers)
}

fn settle_leg(remaining: &mut NetPositions, participant: &ParticipantId, next: Money) {
    if next.is_zero() {
        remaining.remove(participant);
    } else {
        remaining.insert(participant.clone(), next);
    }
}

impl NettingPlan {
    /// Project the plan onto one participant
    ///
    /// Legs where `self_id` receives show as negative (they pay self), legs
    /// where `self_id` pays show as positive. Legs between others are dropped.
    pub fn for_participant(&self, self_id: &ParticipantId) -> Result<SettlementResult> {
        let mut result = SettlementResult::new();

        for transfer in &self.transfers {
            if &transfer.to == self_id {
                result.add(transfer.from.clone(), transfer.amount.checked_neg()?)?;
            } else if &transfer.from == self_id {
                result.add(transfer.to.clone(), transfer.amount)?;
            }
        }

        Ok(result)
    }

    /// Net positions after executing every leg
    pub fn apply(&self, positions: &NetPositions) -> Result<NetPositions> {
        let mut after = positions.clone();

        for transfer in &self.transfers {
            let from = after.entry(transfer.from.clone()).or_insert(Money::ZERO);
            *from = from.checked_add(transfer.amount)?;

            let to = after.entry(transfer.to.clone()).or_insert(Money::ZERO);
            *to = to.checked_sub(transfer.amount)?;
        }

        Ok(after)
    }

    /// Summary statistics
    pub fn stats(&self) -> NettingStats {
        let total_net = Money::saturating_sum(self.transfers.iter().map(|t| t.amount));

        NettingStats {
            participant_count: self.positions.values().filter(|v| !v.is_zero()).count(),
            gross_pair_count: self.gross_pair_count,
            transfer_count: self.transfers.len(),
            total_gross: self.total_gross,
            total_net,
            transfers_eliminated: self.gross_pair_count.saturating_sub(self.transfers.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grouptab_ledger_core::PairKey;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn balances(entries: &[(&str, &str, i64)]) -> BTreeMap<PairKey, Money> {
        entries
            .iter()
            .map(|(a, b, v)| (PairKey::new(p(a), p(b)).unwrap(), Money::from_minor(*v)))
            .collect()
    }

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn test_net_positions_fold() {
        let b = balances(&[("A", "B", -500), ("A", "C", -500), ("B", "C", 300)]);
        let positions = net_positions(&b).unwrap();

        assert_eq!(positions[&p("A")], m(1000));
        assert_eq!(positions[&p("B")], m(-800));
        assert_eq!(positions[&p("C")], m(-200));
    }

    #[test]
    fn test_example_plan() {
        let b = balances(&[("A", "B", -500), ("A", "C", -500), ("B", "C", 300)]);
        let plan = plan_netting(&b).unwrap();

        assert_eq!(
            plan.transfers,
            vec![
                Transfer { from: p("B"), to: p("A"), amount: m(800) },
                Transfer { from: p("C"), to: p("A"), amount: m(200) },
            ]
        );

        let for_a = plan.for_participant(&p("A")).unwrap();
        assert_eq!(for_a.get(&p("B")), m(-800));
        assert_eq!(for_a.get(&p("C")), m(-200));
        assert_eq!(for_a.owed_to_self(), m(1000));

        let for_b = plan.for_participant(&p("B")).unwrap();
        assert_eq!(for_b.get(&p("A")), m(800));
        assert_eq!(for_b.len(), 1);
    }

    #[test]
    fn test_cycle_cancels_completely() {
        // A owes B, B owes C, C owes A, all 100
        let b = balances(&[("A", "B", 100), ("B", "C", 100), ("A", "C", -100)]);
        let plan = plan_netting(&b).unwrap();

        assert!(plan.transfers.is_empty());
        let stats = plan.stats();
        assert_eq!(stats.gross_pair_count, 3);
        assert_eq!(stats.transfers_eliminated, 3);
        assert_eq!(stats.total_gross, m(300));
        assert_eq!(stats.total_net, Money::ZERO);
    }

    #[test]
    fn test_chain_collapses_to_one_transfer() {
        // A owes B 100, B owes C 100 -> A pays C
        let b = balances(&[("A", "B", 100), ("B", "C", 100)]);
        let plan = plan_netting(&b).unwrap();

        assert_eq!(plan.transfers, vec![Transfer { from: p("A"), to: p("C"), amount: m(100) }]);
        assert!(plan.for_participant(&p("B")).unwrap().is_empty());
    }

    #[test]
    fn test_equal_positions_tie_break_by_id() {
        let mut positions = NetPositions::new();
        positions.insert(p("A"), m(100));
        positions.insert(p("B"), m(100));
        positions.insert(p("C"), m(-100));
        positions.insert(p("D"), m(-100));

        let transfers = generate_transfers(&positions).unwrap();
        assert_eq!(transfers[0], Transfer { from: p("C"), to: p("A"), amount: m(100) });
        assert_eq!(transfers[1], Transfer { from: p("D"), to: p("B"), amount: m(100) });
    }

    #[test]
    fn test_idempotence_zeroes_positions() {
        let b = balances(&[
            ("A", "B", 250),
            ("A", "C", -75),
            ("B", "D", 1000),
            ("C", "D", -40),
            ("A", "D", 5),
        ]);
        let plan = plan_netting(&b).unwrap();
        let after = plan.apply(&plan.positions).unwrap();

        assert!(after.values().all(|v| v.is_zero()));
        assert!(plan.transfers.len() <= plan.stats().participant_count - 1);
    }

    #[test]
    fn test_non_conservative_positions_rejected() {
        let mut positions = NetPositions::new();
        positions.insert(p("A"), m(100));
        positions.insert(p("B"), m(-90));

        let err = generate_transfers(&positions).unwrap_err();
        assert!(matches!(err, Error::ConservationViolation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_balances() {
        let plan = plan_netting(&BTreeMap::<PairKey, Money>::new()).unwrap();
        assert!(plan.transfers.is_empty());
        assert_eq!(plan.stats(), NettingStats::default());
    }

    #[test]
    fn test_gross_total_saturates_without_failing() {
        let b = balances(&[("A", "B", i64::MAX), ("C", "D", i64::MAX), ("A", "D", 0)]);
        let plan = plan_netting(&b).unwrap();
        let stats = plan.stats();

        assert_eq!(plan.transfers.len(), 2);
        assert_eq!(stats.gross_pair_count, 2);
        assert_eq!(stats.total_gross, m(i64::MAX));
        assert_eq!(stats.total_net, m(i64::MAX));
        assert!(plan.apply(&plan.positions).unwrap().values().all(|v| v.is_zero()));
    }

    #[test]
    fn test_overflowing_positions_reported() {
        let b = balances(&[("A", "B", i64::MAX), ("A", "C", i64::MAX)]);
        let err = net_positions(&b).unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));
        assert!(!err.is_fatal());
    }
}
