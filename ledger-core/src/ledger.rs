//! Per-group ledger cache
//!
//! Holds every delivered record for one group, newest-first, along with the
//! validity flags from the last validation pass. The cache is disposable:
//! rebuilding it from the delivered records and running a full pass yields
//! the same state.
//!
//! # Example
//!
//! ```
//! use grouptab_ledger_core::{accumulator::allocation, GroupLedger, ParticipantId, RecordDraft, WriterKey};
//!
//! # fn main() -> grouptab_ledger_core::Result<()> {
//! let mut ledger = GroupLedger::new();
//! let draft = RecordDraft::new(
//!     WriterKey::new("alice-phone"),
//!     ParticipantId::new("alice"),
//!     vec![allocation("bob", 1200)?],
//! );
//! ledger.author(draft)?;
//!
//! assert_eq!(ledger.balances().len(), 1);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::{
    accumulator::RecordDraft,
    metrics::Metrics,
    types::{BalanceSnapshot, Money, PairKey, Record, RecordId, Validity, WriterKey},
    validator::{validate, TrackedRecord, ValidationMode, ValidationReport},
    Config, Result,
};

/// Records and validity flags for one group
#[derive(Debug, Default)]
pub struct GroupLedger {
    /// Newest-first, in delivery order
    records: VecDeque<TrackedRecord>,

    /// Ids already delivered
    seen: HashSet<RecordId>,

    /// Mode used by `ingest_and_validate`
    default_mode: ValidationMode,

    /// Optional counters
    metrics: Option<Metrics>,
}

impl GroupLedger {
    /// Empty ledger with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty ledger configured from `config`
    pub fn with_config(config: &Config) -> Self {
        Self {
            default_mode: config.validation.default_mode,
            ..Self::default()
        }
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rebuild from records in delivery order (oldest first) and validate fully
    pub fn from_delivered(records: impl IntoIterator<Item = Record>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.ingest(record);
        }
        ledger.revalidate(ValidationMode::Full);
        ledger
    }

    /// Add a delivered record as the newest entry
    ///
    /// Returns `false` if a record with the same id was already delivered.
    pub fn ingest(&mut self, record: Record) -> bool {
        if !self.seen.insert(record.record_id.clone()) {
            tracing::warn!(record_id = %record.record_id, "duplicate record delivery ignored");
            if let Some(metrics) = &self.metrics {
                metrics.record_duplicate();
            }
            return false;
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_ingest();
        }
        self.records.push_front(TrackedRecord::new(record));
        true
    }

    /// Ingest, then validate with the configured default mode
    pub fn ingest_and_validate(&mut self, record: Record) -> ValidationReport {
        self.ingest(record);
        self.revalidate(self.default_mode)
    }

    /// Run the chain validator over the cache
    pub fn revalidate(&mut self, mode: ValidationMode) -> ValidationReport {
        let report = validate(self.records.make_contiguous(), mode);
        if let Some(metrics) = &self.metrics {
            metrics.record_validation(&report);
        }
        report
    }

    /// Build a record on the writer's current head, append it and revalidate
    ///
    /// Records ingested without validation are flagged first so the head
    /// reflects everything delivered so far.
    pub fn author(&mut self, draft: RecordDraft) -> Result<Record> {
        if self.records.iter().any(|t| t.validity == Validity::Unvalidated) {
            self.revalidate(ValidationMode::Incremental);
        }
        let head = self.writer_head(&draft.writer_key);
        let record = draft.build(head)?;
        self.ingest(record.clone());
        self.revalidate(ValidationMode::Incremental);
        Ok(record)
    }

    /// All records with their flags, newest-first
    pub fn records(&self) -> impl Iterator<Item = &TrackedRecord> + '_ {
        self.records.iter()
    }

    /// Valid records, newest-first
    pub fn valid_records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records
            .iter()
            .filter(|t| t.validity.is_valid())
            .map(|t| &t.record)
    }

    /// Validity of one record, `None` if never delivered
    pub fn validity(&self, record_id: &RecordId) -> Option<Validity> {
        self.records
            .iter()
            .find(|t| &t.record.record_id == record_id)
            .map(|t| t.validity)
    }

    /// Newest valid record of `writer`
    pub fn writer_head(&self, writer: &WriterKey) -> Option<&Record> {
        self.valid_records().find(|r| &r.writer_key == writer)
    }

    /// Newest valid record of every writer, newest-delivered first
    pub fn chain_heads(&self) -> Vec<&Record> {
        let mut writers = HashSet::new();
        self.valid_records()
            .filter(|r| writers.insert(&r.writer_key))
            .collect()
    }

    /// Current pairwise balances across all writer chains
    pub fn balances(&self) -> BalanceSnapshot {
        merge_chain_heads(self.chain_heads())
    }

    /// Number of delivered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was delivered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Merge the snapshots of several writer chain heads into one view
///
/// Each pair takes its balance from the head with the latest timestamp whose
/// snapshot contains that pair. Snapshots are never summed across writers,
/// so of two concurrent writes to the same pair only the later one shows.
/// `heads` must be ordered newest-delivered first; on equal timestamps the
/// earlier entry wins.
pub fn merge_chain_heads<'a>(heads: impl IntoIterator<Item = &'a Record>) -> BalanceSnapshot {
    let mut chosen: BTreeMap<&PairKey, (DateTime<Utc>, Money)> = BTreeMap::new();

    for head in heads {
        for (pair, amount) in head.balance_snapshot.iter() {
            match chosen.get(pair) {
                Some((timestamp, _)) if *timestamp >= head.timestamp => {}
                _ => {
                    chosen.insert(pair, (head.timestamp, amount));
                }
            }
        }
    }

    chosen
        .into_iter()
        .map(|(pair, (_, amount))| (pair.clone(), amount))
        .collect()
}
