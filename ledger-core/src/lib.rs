//! GroupTab Ledger Core
//!
//! Conflict-aware expense ledger for groups whose members write from
//! several devices without a central sequencer.
//!
//! # Architecture
//!
//! - **Per-writer chains**: Every record names the record it was built on
//! - **Full snapshots**: Each record carries the writer's complete pairwise balances
//! - **Fork detection**: One backward chain per writer survives validation
//! - **Pure passes**: Validation and accumulation own no long-lived state
//!
//! # Invariants
//!
//! - Exactly one canonical key per unordered pair of participants
//! - Valid records of a writer form one unbroken backward chain
//! - Exact integer arithmetic on minor currency units
//! - Records are never mutated or deleted, only flagged

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod accumulator;
pub mod validator;
pub mod ledger;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Allocation, BalanceSnapshot, Money, PairKey, ParticipantId, Record, RecordId, Validity,
    WriterKey,
};
pub use accumulator::{build_snapshot, RecordDraft};
pub use validator::{validate, TrackedRecord, ValidationMode, ValidationReport};
pub use ledger::{merge_chain_heads, GroupLedger};
pub use config::Config;
pub use metrics::Metrics;
