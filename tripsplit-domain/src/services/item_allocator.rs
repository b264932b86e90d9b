use indexmap::IndexMap;

use crate::model::{Money, SplitItem, UserId};

/// Per-member shares computed from a list of receipt line items.
///
/// `shares` is keyed in first-assignment order. `grand_total` covers every
/// item, including unassigned ones that contribute to no share.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemAllocation {
    shares: IndexMap<UserId, Money>,
    grand_total: Money,
}

impl ItemAllocation {
    pub fn shares(&self) -> &IndexMap<UserId, Money> {
        &self.shares
    }

    pub fn into_shares(self) -> IndexMap<UserId, Money> {
        self.shares
    }

    pub fn share_for(&self, user: UserId) -> Money {
        self.shares.get(&user).copied().unwrap_or(Money::ZERO)
    }

    /// Sum of all item amounts, assigned or not. This is the split total
    /// shown to the group.
    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    /// Sum of the per-member shares; equals the total of assigned items
    /// exactly, to the cent.
    pub fn allocated_total(&self) -> Money {
        self.shares.values().sum()
    }
}

/// Distributes priced line items among their assigned members with exact
/// cent remainders.
pub struct ItemAllocator;

impl ItemAllocator {
    /// Allocate each item's cents across its assignees.
    ///
    /// For an item assigned to k members, everyone gets `cents / k` and the
    /// first `cents % k` assignees get one extra cent, so the per-item sum
    /// always equals the item total. Pure and idempotent.
    pub fn allocate(&self, items: &[SplitItem]) -> ItemAllocation {
        let mut shares: IndexMap<UserId, Money> = IndexMap::new();
        let mut grand_total = Money::ZERO;

        for item in items {
            grand_total += item.amount;

            let assignee_count = item.assigned_to.len() as i64;
            if assignee_count == 0 {
                continue;
            }

            let cents = item.amount.cents();
            let base = cents / assignee_count;
            let remainder = (cents % assignee_count).unsigned_abs() as usize;

            for (idx, user) in item.assigned_to.iter().copied().enumerate() {
                let mut share = base;
                if idx < remainder {
                    share += 1;
                }
                *shares.entry(user).or_insert(Money::ZERO) += Money::from_cents(share);
            }
        }

        ItemAllocation {
            shares,
            grand_total,
        }
    }
}
