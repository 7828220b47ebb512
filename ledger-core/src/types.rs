//! Core types for the group ledger
//!
//! All types are designed for:
//! - Exact arithmetic (integer minor units for money)
//! - Canonical pair keys (one key per unordered pair)
//! - Validation at the deserialization boundary

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use uuid::Uuid;

use crate::{Error, Result};

/// Participant identifier (opaque, totally ordered by its bytes)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create new participant ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one authoring session (device + user)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriterKey(String);

impl WriterKey {
    /// Create new writer key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WriterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque record identifier
///
/// Ids delivered by the transport are kept verbatim. Records authored
/// locally get a UUIDv7 so ids sort roughly by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a locally authored record
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed amount in minor currency units (cents)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from minor units
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Amount in minor units
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// True if exactly zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True if strictly positive
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True if strictly negative
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Money) -> Result<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| Error::Overflow(format!("{} + {}", self.0, other.0)))
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Money) -> Result<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| Error::Overflow(format!("{} - {}", self.0, other.0)))
    }

    /// Checked negation
    pub fn checked_neg(self) -> Result<Money> {
        self.0
            .checked_neg()
            .map(Money)
            .ok_or_else(|| Error::Overflow(format!("-({})", self.0)))
    }

    /// Sum that clamps to the `i64` range instead of failing
    ///
    /// For statistics only; balances use the checked operations.
    pub fn saturating_sum(values: impl IntoIterator<Item = Money>) -> Money {
        let total: i128 = values.into_iter().map(|m| i128::from(m.0)).sum();
        Money(total.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Major-unit decimal for display (scale 2)
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

/// Canonical unordered pair of two distinct participants
///
/// Stored as `(first, second)` with `first < second`. A positive balance
/// under this key means `first` owes `second`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PairKeyRepr", into = "PairKeyRepr")]
pub struct PairKey {
    first: ParticipantId,
    second: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PairKeyRepr {
    a: ParticipantId,
    b: ParticipantId,
}

impl PairKey {
    /// Canonicalize a pair; `None` when both sides are the same participant
    pub fn new(x: ParticipantId, y: ParticipantId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { first: x, second: y }),
            std::cmp::Ordering::Greater => Some(Self { first: y, second: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Build from an already canonical pair, rejecting anything else
    pub fn from_ordered(a: ParticipantId, b: ParticipantId) -> Result<Self> {
        if a < b {
            Ok(Self { first: a, second: b })
        } else {
            Err(Error::InvalidRecord(format!(
                "pair ({}, {}) is not in canonical order",
                a, b
            )))
        }
    }

    /// Alphabetically-first endpoint
    pub fn first(&self) -> &ParticipantId {
        &self.first
    }

    /// Alphabetically-second endpoint
    pub fn second(&self) -> &ParticipantId {
        &self.second
    }

    /// True if `p` is one of the endpoints
    pub fn contains(&self, p: &ParticipantId) -> bool {
        &self.first == p || &self.second == p
    }

    /// The endpoint that is not `p`
    pub fn other(&self, p: &ParticipantId) -> Option<&ParticipantId> {
        if &self.first == p {
            Some(&self.second)
        } else if &self.second == p {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Sign mapping a stored balance to "what `p` owes the other endpoint"
    ///
    /// `+1` for `first`, `-1` for `second`, `None` if `p` is not an endpoint.
    pub fn orient(&self, p: &ParticipantId) -> Option<i8> {
        if &self.first == p {
            Some(1)
        } else if &self.second == p {
            Some(-1)
        } else {
            None
        }
    }
}

impl TryFrom<PairKeyRepr> for PairKey {
    type Error = Error;

    fn try_from(repr: PairKeyRepr) -> Result<Self> {
        PairKey::from_ordered(repr.a, repr.b)
    }
}

impl From<PairKey> for PairKeyRepr {
    fn from(key: PairKey) -> Self {
        PairKeyRepr {
            a: key.first,
            b: key.second,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// One debtor's share of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllocationRepr")]
pub struct Allocation {
    /// Participant who owes the creditor
    pub debtor: ParticipantId,
    /// Share owed (non-negative)
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
struct AllocationRepr {
    debtor: ParticipantId,
    amount: Money,
}

impl Allocation {
    /// Create allocation; negative amounts are rejected
    pub fn new(debtor: ParticipantId, amount: Money) -> Result<Self> {
        if amount.is_negative() {
            return Err(Error::InvalidAllocation(format!(
                "negative amount {} for debtor {}",
                amount.minor(),
                debtor
            )));
        }
        Ok(Self { debtor, amount })
    }
}

impl TryFrom<AllocationRepr> for Allocation {
    type Error = Error;

    fn try_from(repr: AllocationRepr) -> Result<Self> {
        Allocation::new(repr.debtor, repr.amount)
    }
}

/// Full pairwise balance state as known by one writer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SnapshotEntry>", into = "Vec<SnapshotEntry>")]
pub struct BalanceSnapshot {
    balances: BTreeMap<PairKey, Money>,
}

/// Wire form of one snapshot entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// First endpoint (must sort before `b`)
    pub a: ParticipantId,
    /// Second endpoint
    pub b: ParticipantId,
    /// Stored balance; positive means `a` owes `b`
    pub amount: Money,
}

impl BalanceSnapshot {
    /// Empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored balance for a pair, zero if the pair never transacted
    pub fn get(&self, pair: &PairKey) -> Money {
        self.balances.get(pair).copied().unwrap_or(Money::ZERO)
    }

    /// True if the pair has an entry (possibly zero)
    pub fn contains(&self, pair: &PairKey) -> bool {
        self.balances.contains_key(pair)
    }

    /// Overwrite the balance for a pair
    pub fn set(&mut self, pair: PairKey, amount: Money) {
        self.balances.insert(pair, amount);
    }

    /// Add a signed delta to a pair's balance
    pub fn apply(&mut self, pair: PairKey, delta: Money) -> Result<()> {
        let entry = self.balances.entry(pair).or_insert(Money::ZERO);
        *entry = entry.checked_add(delta)?;
        Ok(())
    }

    /// Iterate entries in canonical pair order
    pub fn iter(&self) -> impl Iterator<Item = (&PairKey, Money)> + '_ {
        self.balances.iter().map(|(k, v)| (k, *v))
    }

    /// Number of stored pairs
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// True if no pair is stored
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Every participant mentioned by a stored pair
    pub fn participants(&self) -> BTreeSet<&ParticipantId> {
        self.balances
            .keys()
            .flat_map(|k| [k.first(), k.second()])
            .collect()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<PairKey, Money> {
        &self.balances
    }
}

impl FromIterator<(PairKey, Money)> for BalanceSnapshot {
    fn from_iter<I: IntoIterator<Item = (PairKey, Money)>>(iter: I) -> Self {
        Self {
            balances: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<Vec<SnapshotEntry>> for BalanceSnapshot {
    type Error = Error;

    fn try_from(entries: Vec<SnapshotEntry>) -> Result<Self> {
        let mut balances = BTreeMap::new();
        for entry in entries {
            let key = PairKey::from_ordered(entry.a, entry.b)?;
            if balances.insert(key.clone(), entry.amount).is_some() {
                return Err(Error::InvalidRecord(format!("duplicate snapshot pair {}", key)));
            }
        }
        Ok(Self { balances })
    }
}

impl From<BalanceSnapshot> for Vec<SnapshotEntry> {
    fn from(snapshot: BalanceSnapshot) -> Self {
        snapshot
            .balances
            .into_iter()
            .map(|(key, amount)| SnapshotEntry {
                a: key.first,
                b: key.second,
                amount,
            })
            .collect()
    }
}

/// One ledger entry, immutable once authored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque record id
    pub record_id: RecordId,

    /// Authoring session
    pub writer_key: WriterKey,

    /// Record this one was built on (same writer)
    pub prior_record_id: Option<RecordId>,

    /// Participant who paid
    pub creditor: ParticipantId,

    /// Debtor shares, in authoring order
    #[serde(default)]
    pub allocations: Vec<Allocation>,

    /// Full pairwise balances as known by the writer after this record
    #[serde(default)]
    pub balance_snapshot: BalanceSnapshot,

    /// Authoring timestamp
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Face amount: sum of all allocations, including the creditor's own share
    pub fn face_amount(&self) -> Result<Money> {
        self.allocations
            .iter()
            .try_fold(Money::ZERO, |acc, a| acc.checked_add(a.amount))
    }

    /// Creditor plus every debtor
    pub fn participants(&self) -> BTreeSet<&ParticipantId> {
        std::iter::once(&self.creditor)
            .chain(self.allocations.iter().map(|a| &a.debtor))
            .collect()
    }
}

/// Validity flag assigned by the chain validator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Not reached by any validation pass yet
    #[default]
    Unvalidated,
    /// On its writer's unbroken chain
    Valid,
    /// Forked or orphaned
    Invalid,
}

impl Validity {
    /// True only for `Valid`
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}
