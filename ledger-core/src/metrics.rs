//! Metrics collection for observability
//!
//! Counters live in a registry owned by the caller, never the process-wide
//! default, so several group ledgers can each carry their own.
//!
//! # Metrics
//!
//! - `grouptab_records_ingested_total` - Records accepted from the transport
//! - `grouptab_duplicate_records_total` - Redelivered records ignored
//! - `grouptab_validation_runs_total` - Validation passes executed
//! - `grouptab_forks_detected_total` - Records marked invalid
//! - `grouptab_validation_short_circuits_total` - Incremental passes ended early

use prometheus::{IntCounter, Registry};
use std::sync::Arc;

use crate::validator::ValidationReport;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Records accepted
    pub records_ingested: IntCounter,

    /// Redelivered records ignored
    pub duplicate_records: IntCounter,

    /// Validation passes
    pub validation_runs: IntCounter,

    /// Records marked invalid
    pub forks_detected: IntCounter,

    /// Incremental passes that stopped early
    pub short_circuits: IntCounter,

    /// Prometheus registry
    registry: Arc<Registry>,
}

impl Metrics {
    /// Create collector with a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create collector registered in `registry`
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let records_ingested = IntCounter::new(
            "grouptab_records_ingested_total",
            "Records accepted from the transport",
        )?;
        registry.register(Box::new(records_ingested.clone()))?;

        let duplicate_records = IntCounter::new(
            "grouptab_duplicate_records_total",
            "Redelivered records ignored",
        )?;
        registry.register(Box::new(duplicate_records.clone()))?;

        let validation_runs = IntCounter::new(
            "grouptab_validation_runs_total",
            "Validation passes executed",
        )?;
        registry.register(Box::new(validation_runs.clone()))?;

        let forks_detected = IntCounter::new(
            "grouptab_forks_detected_total",
            "Records marked invalid by validation",
        )?;
        registry.register(Box::new(forks_detected.clone()))?;

        let short_circuits = IntCounter::new(
            "grouptab_validation_short_circuits_total",
            "Incremental validation passes ended early",
        )?;
        registry.register(Box::new(short_circuits.clone()))?;

        Ok(Self {
            records_ingested,
            duplicate_records,
            validation_runs,
            forks_detected,
            short_circuits,
            registry: Arc::new(registry),
        })
    }

    /// Record an accepted ingest
    pub fn record_ingest(&self) {
        self.records_ingested.inc();
    }

    /// Record an ignored redelivery
    pub fn record_duplicate(&self) {
        self.duplicate_records.inc();
    }

    /// Record the outcome of a validation pass
    pub fn record_validation(&self, report: &ValidationReport) {
        self.validation_runs.inc();
        self.forks_detected.inc_by(report.forks as u64);
        if report.short_circuited {
            self.short_circuits.inc();
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
