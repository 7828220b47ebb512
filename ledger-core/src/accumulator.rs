//! Balance accumulation for outgoing records
//!
//! A record carries the full pairwise snapshot as known by its writer.
//! The snapshot is the writer's previous valid snapshot with the new
//! record's allocations folded in.

use chrono::{DateTime, Utc};

use crate::{
    types::{Allocation, BalanceSnapshot, Money, PairKey, ParticipantId, Record, RecordId, WriterKey},
    Result,
};

/// Fold `allocations` into a copy of `prior`
///
/// For each debtor share the pair `(debtor, creditor)` is canonicalized to
/// `(a, b)`. If the creditor is `a` the balance decreases by the amount,
/// otherwise it increases. Self-allocations are skipped.
pub fn build_snapshot(
    prior: &BalanceSnapshot,
    creditor: &ParticipantId,
    allocations: &[Allocation],
) -> Result<BalanceSnapshot> {
    let mut snapshot = prior.clone();

    for allocation in allocations {
        let Some(pair) = PairKey::new(allocation.debtor.clone(), creditor.clone()) else {
            continue;
        };

        let delta = if pair.first() == creditor {
            allocation.amount.checked_neg()?
        } else {
            allocation.amount
        };
        snapshot.apply(pair, delta)?;
    }

    Ok(snapshot)
}

/// Outgoing record before it is chained onto its writer's history
#[derive(Debug, Clone)]
pub struct RecordDraft {
    /// Authoring session
    pub writer_key: WriterKey,
    /// Participant who paid
    pub creditor: ParticipantId,
    /// Debtor shares
    pub allocations: Vec<Allocation>,
    /// Authoring timestamp
    pub timestamp: DateTime<Utc>,
}

impl RecordDraft {
    /// New draft timestamped now
    pub fn new(writer_key: WriterKey, creditor: ParticipantId, allocations: Vec<Allocation>) -> Self {
        Self {
            writer_key,
            creditor,
            allocations,
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the record on top of `prior` (the writer's newest valid record)
    pub fn build(self, prior: Option<&Record>) -> Result<Record> {
        let empty = BalanceSnapshot::new();
        let prior_snapshot = prior.map(|r| &r.balance_snapshot).unwrap_or(&empty);
        let balance_snapshot = build_snapshot(prior_snapshot, &self.creditor, &self.allocations)?;

        Ok(Record {
            record_id: RecordId::generate(),
            writer_key: self.writer_key,
            prior_record_id: prior.map(|r| r.record_id.clone()),
            creditor: self.creditor,
            allocations: self.allocations,
            balance_snapshot,
            timestamp: self.timestamp,
        })
    }
}

/// Shorthand for a validated allocation in minor units
pub fn allocation(debtor: &str, minor: i64) -> Result<Allocation> {
    Allocation::new(ParticipantId::new(debtor), Money::from_minor(minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn pair(x: &str, y: &str) -> PairKey {
        PairKey::new(p(x), p(y)).unwrap()
    }

    #[test]
    fn test_creditor_first_decreases() {
        // A paid for B and C: both owe A
        let allocations = vec![allocation("B", 500).unwrap(), allocation("C", 500).unwrap()];
        let snapshot = build_snapshot(&BalanceSnapshot::new(), &p("A"), &allocations).unwrap();

        assert_eq!(snapshot.get(&pair("A", "B")), Money::from_minor(-500));
        assert_eq!(snapshot.get(&pair("A", "C")), Money::from_minor(-500));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_creditor_second_increases() {
        let allocations = vec![allocation("A", 300).unwrap()];
        let snapshot = build_snapshot(&BalanceSnapshot::new(), &p("B"), &allocations).unwrap();

        // A owes B and sorts first, so (A, B) is stored as +300
        assert_eq!(snapshot.get(&pair("A", "B")), Money::from_minor(300));
    }

    #[test]
    fn test_creditor_first_of_later_pair() {
        let allocations = vec![allocation("C", 300).unwrap()];
        let snapshot = build_snapshot(&BalanceSnapshot::new(), &p("B"), &allocations).unwrap();

        assert_eq!(snapshot.get(&pair("B", "C")), Money::from_minor(-300));
    }

    #[test]
    fn test_self_allocation_skipped() {
        let allocations = vec![allocation("A", 1000).unwrap(), allocation("B", 250).unwrap()];
        let snapshot = build_snapshot(&BalanceSnapshot::new(), &p("A"), &allocations).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&pair("A", "B")), Money::from_minor(-250));
    }

    #[test]
    fn test_prior_snapshot_untouched() {
        let prior = build_snapshot(&BalanceSnapshot::new(), &p("A"), &[allocation("B", 100).unwrap()])
            .unwrap();
        let next = build_snapshot(&prior, &p("B"), &[allocation("A", 40).unwrap()]).unwrap();

        assert_eq!(prior.get(&pair("A", "B")), Money::from_minor(-100));
        assert_eq!(next.get(&pair("A", "B")), Money::from_minor(-60));
    }

    #[test]
    fn test_balance_returning_to_zero_is_kept() {
        let prior = build_snapshot(&BalanceSnapshot::new(), &p("A"), &[allocation("B", 100).unwrap()])
            .unwrap();
        let next = build_snapshot(&prior, &p("B"), &[allocation("A", 100).unwrap()]).unwrap();

        assert!(next.contains(&pair("A", "B")));
        assert_eq!(next.get(&pair("A", "B")), Money::ZERO);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut prior = BalanceSnapshot::new();
        prior.set(pair("A", "B"), Money::from_minor(i64::MAX));
        let result = build_snapshot(&prior, &p("B"), &[allocation("A", 1).unwrap()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_draft_chains_onto_prior() {
        let first = RecordDraft::new(WriterKey::new("wA"), p("A"), vec![allocation("B", 500).unwrap()])
            .build(None)
            .unwrap();
        assert!(first.prior_record_id.is_none());

        let second = RecordDraft::new(WriterKey::new("wA"), p("B"), vec![allocation("A", 200).unwrap()])
            .build(Some(&first))
            .unwrap();
        assert_eq!(second.prior_record_id.as_ref(), Some(&first.record_id));
        assert_ne!(second.record_id, first.record_id);
        assert_eq!(second.balance_snapshot.get(&pair("A", "B")), Money::from_minor(-300));
    }
}
