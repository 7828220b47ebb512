//! Settlement dispatch
//!
//! Both strategies read the same pairwise balances; the caller picks one.

use grouptab_ledger_core::{GroupLedger, ParticipantId};

use crate::{
    config::Config,
    direct::direct_readout,
    netting::plan_netting,
    types::{PairwiseBalances, SettlementResult, Strategy},
    Result,
};

/// Settle `self_id` against everyone else using `strategy`
pub fn settle<B>(balances: &B, self_id: &ParticipantId, strategy: Strategy) -> Result<SettlementResult>
where
    B: PairwiseBalances + ?Sized,
{
    match strategy {
        Strategy::DirectReadout => direct_readout(balances, self_id),
        Strategy::Netting => plan_netting(balances)?.for_participant(self_id),
    }
}

/// Settlement engine
#[derive(Debug, Clone, Default)]
pub struct SettlementEngine {
    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Strategy used by `settle`
    pub fn default_strategy(&self) -> Strategy {
        self.config.default_strategy
    }

    /// Empty group ledger using the configured validation settings
    pub fn new_ledger(&self) -> GroupLedger {
        GroupLedger::with_config(&self.config.ledger)
    }

    /// Settle with the configured default strategy
    pub fn settle<B>(&self, balances: &B, self_id: &ParticipantId) -> Result<SettlementResult>
    where
        B: PairwiseBalances + ?Sized,
    {
        self.settle_with(balances, self_id, self.config.default_strategy)
    }

    /// Settle with an explicit strategy
    pub fn settle_with<B>(
        &self,
        balances: &B,
        self_id: &ParticipantId,
        strategy: Strategy,
    ) -> Result<SettlementResult>
    where
        B: PairwiseBalances + ?Sized,
    {
        match settle(balances, self_id, strategy) {
            Ok(result) => {
                tracing::info!(
                    participant = %self_id,
                    ?strategy,
                    counterparties = result.len(),
                    "settlement computed"
                );
                Ok(result)
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(participant = %self_id, ?strategy, error = %e, "balances inconsistent, no settlement");
                }
                Err(e)
            }
        }
    }

    /// Settle against a group's current valid balances
    pub fn settle_group(&self, ledger: &GroupLedger, self_id: &ParticipantId) -> Result<SettlementResult> {
        self.settle(&ledger.balances(), self_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grouptab_ledger_core::{accumulator::allocation, Money, RecordDraft, WriterKey};

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn example_ledger() -> GroupLedger {
        let mut ledger = GroupLedger::new();
        ledger
            .author(RecordDraft::new(
                WriterKey::new("wA"),
                p("A"),
                vec![allocation("B", 500).unwrap(), allocation("C", 500).unwrap()],
            ))
            .unwrap();
        ledger
            .author(RecordDraft::new(
                WriterKey::new("wB"),
                p("B"),
                vec![allocation("C", 300).unwrap()],
            ))
            .unwrap();
        ledger
    }

    #[test]
    fn test_direct_readout_for_a() {
        let engine = SettlementEngine::default();
        let result = engine
            .settle_with(&example_ledger().balances(), &p("A"), Strategy::DirectReadout)
            .unwrap();

        assert_eq!(result.get(&p("B")), Money::from_minor(-500));
        assert_eq!(result.get(&p("C")), Money::from_minor(-500));
    }

    #[test]
    fn test_netting_for_a() {
        let engine = SettlementEngine::default();
        assert_eq!(engine.default_strategy(), Strategy::Netting);

        let ledger = example_ledger();
        let result = engine.settle_group(&ledger, &p("A")).unwrap();

        // B paid 300 for C: B nets -200, C nets -800
        assert_eq!(result.get(&p("B")), Money::from_minor(-200));
        assert_eq!(result.get(&p("C")), Money::from_minor(-800));
        assert_eq!(result.owed_to_self(), Money::from_minor(1000));
    }

    #[test]
    fn test_netting_for_c_pays_a_only() {
        let result = settle(&example_ledger().balances(), &p("C"), Strategy::Netting).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.get(&p("A")), Money::from_minor(800));
    }

    #[test]
    fn test_new_ledger_uses_configured_validation() {
        use grouptab_ledger_core::ValidationMode;

        let mut config = Config::default();
        config.ledger.validation.default_mode = ValidationMode::Full;
        let engine = SettlementEngine::new(config);

        let mut ledger = engine.new_ledger();
        let first = RecordDraft::new(WriterKey::new("wA"), p("A"), vec![allocation("B", 500).unwrap()])
            .build(None)
            .unwrap();
        let second = RecordDraft::new(WriterKey::new("wA"), p("B"), vec![allocation("C", 300).unwrap()])
            .build(Some(&first))
            .unwrap();
        ledger.ingest_and_validate(first);
        let report = ledger.ingest_and_validate(second);

        // An incremental pass would stop at the already valid predecessor
        assert_eq!(report.examined, 2);
        assert!(!report.short_circuited);

        let result = engine.settle_group(&ledger, &p("B")).unwrap();
        assert_eq!(result.get(&p("A")), Money::from_minor(200));
        assert_eq!(result.get(&p("C")), Money::ZERO);
    }

    #[test]
    fn test_configured_strategy_used() {
        let engine = SettlementEngine::new(Config {
            default_strategy: Strategy::DirectReadout,
            ..Config::default()
        });
        let result = engine.settle_group(&example_ledger(), &p("C")).unwrap();

        assert_eq!(result.get(&p("A")), Money::from_minor(500));
        assert_eq!(result.get(&p("B")), Money::from_minor(300));
    }
}
