//! Per-writer chain validation
//!
//! Records arrive from the transport newest-first. Each writer's valid
//! history is the unbroken backward chain hanging off its newest record;
//! anything that declares a different predecessor than the chain expects
//! is a fork and gets marked invalid.
//!
//! # Example
//!
//! ```text
//! newest  r3 (w1, prior r2)   valid, expect r2
//!         r2' (w1, prior r1)  expected r2: fork
//!         r2 (w1, prior r1)   valid, expect r1
//! oldest  r1 (w1, no prior)   valid, expect nothing
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{Record, RecordId, Validity, WriterKey};

/// How much history a validation pass re-derives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Stop once every writer with a newly flagged record has reconnected
    /// to a record that was already valid
    #[default]
    Incremental,
    /// Reset every flag and walk the whole history
    Full,
}

/// A record together with its derived validity flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    /// The record as delivered
    pub record: Record,
    /// Flag from the last validation pass that reached it
    #[serde(default)]
    pub validity: Validity,
}

impl TrackedRecord {
    /// Wrap a freshly delivered record
    pub fn new(record: Record) -> Self {
        Self {
            record,
            validity: Validity::Unvalidated,
        }
    }
}

impl From<Record> for TrackedRecord {
    fn from(record: Record) -> Self {
        Self::new(record)
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Records visited by this pass
    pub examined: usize,
    /// Records marked valid by this pass
    pub valid: usize,
    /// Records marked invalid by this pass
    pub forks: usize,
    /// True if the incremental short-circuit ended the pass early
    pub short_circuited: bool,
}

/// Assign validity flags to `records`, ordered newest-first
///
/// Delivery order is authoritative; timestamps are never consulted.
pub fn validate(records: &mut [TrackedRecord], mode: ValidationMode) -> ValidationReport {
    if mode == ValidationMode::Full {
        for tracked in records.iter_mut() {
            tracked.validity = Validity::Unvalidated;
        }
    }

    // Unset entry: no record of this writer seen yet.
    // Some(None): the chain reached its root, nothing older may be valid.
    let mut expected: HashMap<&WriterKey, Option<&RecordId>> = HashMap::new();
    // Writers whose chain diverged from the previous pass and has not
    // rejoined it yet. Older flags of theirs may be stale.
    let mut pending: HashSet<&WriterKey> = HashSet::new();
    let mut report = ValidationReport::default();

    for tracked in records.iter_mut() {
        let record = &tracked.record;
        report.examined += 1;

        let matches = match expected.get(&record.writer_key) {
            None => true,
            Some(next) => *next == Some(&record.record_id),
        };

        if matches {
            let was_valid = tracked.validity.is_valid();
            tracked.validity = Validity::Valid;
            report.valid += 1;
            expected.insert(&record.writer_key, record.prior_record_id.as_ref());

            if was_valid {
                pending.remove(&record.writer_key);
            } else {
                pending.insert(&record.writer_key);
            }

            if mode == ValidationMode::Incremental && was_valid && pending.is_empty() {
                report.short_circuited = true;
                break;
            }
        } else {
            tracing::debug!(
                record_id = %record.record_id,
                writer = %record.writer_key,
                expected = ?expected.get(&record.writer_key).copied().flatten().map(RecordId::as_str),
                declared = ?record.prior_record_id.as_ref().map(RecordId::as_str),
                "fork detected, record superseded"
            );
            tracked.validity = Validity::Invalid;
            report.forks += 1;
        }
    }

    tracing::info!(
        examined = report.examined,
        valid = report.valid,
        forks = report.forks,
        short_circuited = report.short_circuited,
        "ledger validation pass complete"
    );

    report
}
