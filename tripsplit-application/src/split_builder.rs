use chrono::{DateTime, Utc};
use fxhash::FxHashSet;
use tripsplit_domain::{
    ItemAllocator, Money, Split, SplitId, SplitItem, SplitKind, SplitMember, TripId, UserId,
};

use crate::error::SplitBuildError;

/// Largest accepted gap between declared custom shares and the bill amount.
pub const CUSTOM_SHARE_TOLERANCE: Money = Money::from_cents(10);

/// Common fields of a split under construction. One of the completion
/// methods validates the member side and produces the persisted record.
#[derive(Clone, Debug)]
pub struct SplitDraft {
    pub id: SplitId,
    pub trip_id: TripId,
    pub name: String,
    pub creator_id: UserId,
    pub bill_amount: Money,
    pub tax_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl SplitDraft {
    /// Splits `bill + tax` evenly; remainder cents go to the first members
    /// in list order.
    pub fn equal_among(self, member_ids: &[UserId]) -> Result<Split, SplitBuildError> {
        self.validate_amounts()?;
        ensure_members(member_ids)?;

        let total = self.bill_amount + self.tax_amount;
        let count = member_ids.len() as i64;
        let base = total.cents() / count;
        let remainder = (total.cents() % count).unsigned_abs() as usize;

        let members = member_ids
            .iter()
            .enumerate()
            .map(|(idx, user)| {
                let mut share = base;
                if idx < remainder {
                    share += 1;
                }
                SplitMember::new(*user, Money::from_cents(share))
            })
            .collect();

        Ok(self.finish(SplitKind::Equal, total, members, None))
    }

    /// Accepts explicit per-member shares. Rejected when the share sum
    /// strays from the bill by more than [`CUSTOM_SHARE_TOLERANCE`]; inside
    /// the tolerance the split total is the exact share sum.
    pub fn custom_shares(self, shares: &[(UserId, Money)]) -> Result<Split, SplitBuildError> {
        self.validate_amounts()?;
        let ids: Vec<UserId> = shares.iter().map(|(user, _)| *user).collect();
        ensure_members(&ids)?;
        for (_, amount) in shares {
            if amount.cents() < 0 {
                return Err(SplitBuildError::NegativeAmount(*amount));
            }
        }

        let actual: Money = shares.iter().map(|(_, amount)| *amount).sum();
        if (actual - self.bill_amount).abs() > CUSTOM_SHARE_TOLERANCE {
            return Err(SplitBuildError::ShareMismatch {
                expected: self.bill_amount,
                actual,
            });
        }

        let members = shares
            .iter()
            .map(|(user, amount)| SplitMember::new(*user, *amount))
            .collect();

        Ok(self.finish(SplitKind::Custom, actual, members, None))
    }

    /// Allocates receipt line items into member shares. The split total is
    /// the sum of every item, assigned or not; unassigned items stay in the
    /// total but in nobody's share.
    pub fn from_items(self, items: Vec<SplitItem>) -> Result<Split, SplitBuildError> {
        self.validate_amounts()?;
        for item in &items {
            if item.amount.cents() < 0 {
                return Err(SplitBuildError::NegativeAmount(item.amount));
            }
            ensure_unique_assignment(&item.assigned_to)?;
        }

        let allocation = ItemAllocator.allocate(&items);
        if allocation.shares().is_empty() {
            return Err(SplitBuildError::NoMembers);
        }

        let total = allocation.grand_total();
        let members = allocation
            .into_shares()
            .into_iter()
            .map(|(user, amount)| SplitMember::new(user, amount))
            .collect();

        Ok(self.finish(SplitKind::Custom, total, members, Some(items)))
    }

    fn validate_amounts(&self) -> Result<(), SplitBuildError> {
        for amount in [self.bill_amount, self.tax_amount] {
            if amount.cents() < 0 {
                return Err(SplitBuildError::NegativeAmount(amount));
            }
        }
        Ok(())
    }

    fn finish(
        self,
        kind: SplitKind,
        total_amount: Money,
        members: Vec<SplitMember>,
        items: Option<Vec<SplitItem>>,
    ) -> Split {
        Split {
            id: self.id,
            trip_id: self.trip_id,
            name: self.name,
            total_amount,
            bill_amount: self.bill_amount,
            tax_amount: self.tax_amount,
            kind,
            creator_id: self.creator_id,
            members,
            items,
            created_at: self.created_at,
        }
    }
}

fn ensure_members(ids: &[UserId]) -> Result<(), SplitBuildError> {
    if ids.is_empty() {
        return Err(SplitBuildError::NoMembers);
    }
    let mut seen: FxHashSet<UserId> = FxHashSet::default();
    for id in ids {
        if !seen.insert(*id) {
            return Err(SplitBuildError::DuplicateMember(*id));
        }
    }
    Ok(())
}

fn ensure_unique_assignment(assigned_to: &[UserId]) -> Result<(), SplitBuildError> {
    let mut seen: FxHashSet<UserId> = FxHashSet::default();
    for user in assigned_to {
        if !seen.insert(*user) {
            return Err(SplitBuildError::DuplicateMember(*user));
        }
    }
    Ok(())
}
