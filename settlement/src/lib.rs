//! GroupTab Settlement
//!
//! Turns a group's valid pairwise balances into what one participant has
//! to pay or collect.
//!
//! # Strategies
//!
//! - **Direct readout**: the pair balance between self and each counterparty
//! - **Netting**: the whole group reduced to at most `n - 1` transfers,
//!   projected onto self
//!
//! # Example
//!
//! ```
//! use grouptab_ledger_core::{accumulator::allocation, GroupLedger, ParticipantId, RecordDraft, WriterKey};
//! use grouptab_settlement::{settle, Strategy};
//!
//! # fn main() -> grouptab_settlement::Result<()> {
//! let mut ledger = GroupLedger::new();
//! ledger.author(RecordDraft::new(
//!     WriterKey::new("alice-phone"),
//!     ParticipantId::new("alice"),
//!     vec![allocation("bob", 1500)?, allocation("carol", 1500)?],
//! ))?;
//!
//! let result = settle(&ledger.balances(), &ParticipantId::new("alice"), Strategy::Netting)?;
//! assert_eq!(result.owed_to_self().minor(), 3000);
//! # Ok(())
//! # }
//! ```
//!
//! A fatal error (`Error::is_fatal`) means the balances are inconsistent:
//! show the raw pairwise balances instead of a settlement.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod direct;
pub mod netting;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use direct::direct_readout;
pub use netting::{generate_transfers, net_positions, plan_netting, NetPositions, NettingPlan};
pub use engine::{settle, SettlementEngine};
