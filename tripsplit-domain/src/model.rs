use std::{
    collections::BTreeMap,
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monetary amount in integer minor units (cents).
///
/// All accumulation happens on the integer representation; decimals exist
/// only at the input/output boundary via [`Money::from_decimal`] and
/// [`Money::to_decimal`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

/// Rounding applied when a decimal amount is quantized to cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round half away from zero (e.g., 0.005 -> 0.01).
    #[default]
    HalfUp,
    /// Round half to nearest even (banker's rounding).
    HalfEven,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MoneyConversionError {
    #[error("amount {0} is not representable in cents")]
    OutOfRange(Decimal),
}

impl Money {
    pub const ZERO: Self = Self(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn signum(self) -> i64 {
        self.0.signum()
    }

    /// Quantizes a decimal amount to cents with half-up rounding.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        Self::from_decimal_with(value, RoundingMode::HalfUp)
    }

    pub fn from_decimal_with(
        value: Decimal,
        mode: RoundingMode,
    ) -> Result<Self, MoneyConversionError> {
        let strategy = match mode {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        };
        let cents = value
            .round_dp_with_strategy(2, strategy)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|units| units.to_i64())
            .ok_or(MoneyConversionError::OutOfRange(value))?;
        Ok(Self(cents))
    }

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
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-member share state on a split.
///
/// `Approved` is terminal; a rejected approval request falls back to
/// `NotPaid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    PendingApproval,
    Approved,
}

/// State of a row in the payment ledger. Only `Approved` rows reduce debt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StatusTransitionError {
    #[error("member share cannot move from {from:?} to {to:?}")]
    InvalidMemberTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("ledger payment cannot move from {from:?} to {to:?}")]
    InvalidPaymentTransition { from: PaymentState, to: PaymentState },
}

/// A priced receipt line item and the members it is assigned to.
///
/// `assigned_to` order is the assignment order; remainder cents go to the
/// earliest assignees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitItem {
    pub name: String,
    pub amount: Money,
    pub assigned_to: Vec<UserId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    Equal,
    Custom,
}

/// One participating user's share of a split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMember {
    pub user_id: UserId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub marked_paid_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl SplitMember {
    pub fn new(user_id: UserId, amount: Money) -> Self {
        Self {
            user_id,
            amount,
            status: PaymentStatus::NotPaid,
            marked_paid_at: None,
            approved_at: None,
        }
    }

    /// `NotPaid -> PendingApproval`.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> Result<(), StatusTransitionError> {
        match self.status {
            PaymentStatus::NotPaid => {
                self.status = PaymentStatus::PendingApproval;
                self.marked_paid_at = Some(at);
                Ok(())
            }
            from => Err(StatusTransitionError::InvalidMemberTransition {
                from,
                to: PaymentStatus::PendingApproval,
            }),
        }
    }

    /// `PendingApproval -> Approved` (terminal).
    pub fn approve(&mut self, at: DateTime<Utc>) -> Result<(), StatusTransitionError> {
        match self.status {
            PaymentStatus::PendingApproval => {
                self.status = PaymentStatus::Approved;
                self.approved_at = Some(at);
                Ok(())
            }
            from => Err(StatusTransitionError::InvalidMemberTransition {
                from,
                to: PaymentStatus::Approved,
            }),
        }
    }

    /// `PendingApproval -> NotPaid`; clears the paid marker.
    pub fn reject(&mut self) -> Result<(), StatusTransitionError> {
        match self.status {
            PaymentStatus::PendingApproval => {
                self.status = PaymentStatus::NotPaid;
                self.marked_paid_at = None;
                Ok(())
            }
            from => Err(StatusTransitionError::InvalidMemberTransition {
                from,
                to: PaymentStatus::NotPaid,
            }),
        }
    }
}

/// A persisted expense split. The creator fronted `total_amount` and is owed
/// each member's share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: SplitId,
    pub trip_id: TripId,
    pub name: String,
    pub total_amount: Money,
    pub bill_amount: Money,
    pub tax_amount: Money,
    pub kind: SplitKind,
    pub creator_id: UserId,
    pub members: Vec<SplitMember>,
    pub items: Option<Vec<SplitItem>>,
    pub created_at: DateTime<Utc>,
}

/// A row in the payment ledger. Several rows may exist per (split, payer)
/// pair for partial payments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub split_id: SplitId,
    pub payer_id: UserId,
    pub amount: Money,
    pub state: PaymentState,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_approved(&self) -> bool {
        self.state == PaymentState::Approved
    }

    /// `Pending -> Approved`.
    pub fn approve(&mut self) -> Result<(), StatusTransitionError> {
        match self.state {
            PaymentState::Pending => {
                self.state = PaymentState::Approved;
                Ok(())
            }
            from => Err(StatusTransitionError::InvalidPaymentTransition {
                from,
                to: PaymentState::Approved,
            }),
        }
    }

    /// `Pending -> Rejected`.
    pub fn reject(&mut self) -> Result<(), StatusTransitionError> {
        match self.state {
            PaymentState::Pending => {
                self.state = PaymentState::Rejected;
                Ok(())
            }
            from => Err(StatusTransitionError::InvalidPaymentTransition {
                from,
                to: PaymentState::Rejected,
            }),
        }
    }
}

/// A suggested transfer: `from` pays `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
}

/// Net position table. Keyed by `UserId` in a `BTreeMap` so iteration order
/// is stable, which downstream tie-breaks rely on.
pub type MemberBalances = BTreeMap<UserId, Money>;

/// Net positions of a trip and the transfers that settle them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub balances: MemberBalances,
    pub transfers: Vec<Balance>,
}

/// Folds splits and the approved payment ledger into per-user net positions.
#[derive(Debug, Default)]
pub struct BalanceAccumulator {
    balances: MemberBalances,
}

impl BalanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_members(members: &[UserId]) -> Self {
        let balances = members
            .iter()
            .copied()
            .map(|member| (member, Money::ZERO))
            .collect();
        Self { balances }
    }

    /// Applies one split against the payment ledger.
    ///
    /// A member whose `status` is `Approved` owes nothing even when the
    /// summed approved ledger rows say otherwise; the status field is a
    /// legacy settlement shortcut and wins over the ledger.
    pub fn apply_split(&mut self, split: &Split, payments: &[Payment]) {
        let mut approved_by_payer: FxHashMap<UserId, Money> = FxHashMap::default();
        for payment in payments {
            if payment.split_id != split.id || !payment.is_approved() {
                continue;
            }
            *approved_by_payer
                .entry(payment.payer_id)
                .or_insert(Money::ZERO) += payment.amount;
        }

        for member in &split.members {
            let amount_owed = if member.status == PaymentStatus::Approved {
                Money::ZERO
            } else {
                member.amount
                    - approved_by_payer
                        .get(&member.user_id)
                        .copied()
                        .unwrap_or(Money::ZERO)
            };

            // When the creator participates in their own split the two
            // adjustments cancel through the same path.
            *self.balances.entry(split.creator_id).or_insert(Money::ZERO) += amount_owed;
            *self.balances.entry(member.user_id).or_insert(Money::ZERO) -= amount_owed;
        }
    }

    pub fn apply_all(&mut self, splits: &[Split], payments: &[Payment]) {
        for split in splits {
            self.apply_split(split, payments);
        }
    }

    pub fn balances(&self) -> &MemberBalances {
        &self.balances
    }

    pub fn into_balances(self) -> MemberBalances {
        self.balances
    }
}
