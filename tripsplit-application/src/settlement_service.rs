use tripsplit_domain::{Money, SettlementCalculator, SettlementStrategy, TripId, UserId};

use crate::{
    error::SettlementFetchError,
    model::{MemberPosition, PersonBalance, TripSettlement},
    ports::SplitStore,
};

/// Recomputes a trip's settlement from a fresh storage snapshot on every
/// call. Cheap enough that nothing is cached between calls.
#[derive(Clone, Copy)]
pub struct SettlementService<'a> {
    store: &'a dyn SplitStore,
    strategy: &'a dyn SettlementStrategy,
}

impl<'a> SettlementService<'a> {
    pub fn new(store: &'a dyn SplitStore, strategy: &'a dyn SettlementStrategy) -> Self {
        Self { store, strategy }
    }

    /// Net positions and settle-up suggestions for the whole trip.
    pub fn trip_settlement(&self, trip: TripId) -> Result<TripSettlement, SettlementFetchError> {
        let splits = self.store.splits_for_trip(trip)?;
        let payments = self.store.approved_payments_for_trip(trip)?;
        tracing::debug!(
            %trip,
            split_count = splits.len(),
            payment_count = payments.len(),
            "Trip settlement snapshot loaded"
        );

        let settlement = SettlementCalculator::new(self.strategy).settle(&splits, &payments);

        // MemberBalances iterates in id order, so the vector is id-sorted.
        let balances: Vec<PersonBalance> = settlement
            .balances
            .iter()
            .map(|(id, balance)| PersonBalance {
                id: *id,
                balance: *balance,
            })
            .collect();

        Ok(TripSettlement {
            balances,
            transfers: settlement.transfers,
        })
    }

    /// One user's "you owe / owed to you" view of the trip.
    pub fn member_position(
        &self,
        trip: TripId,
        user: UserId,
    ) -> Result<MemberPosition, SettlementFetchError> {
        let settlement = self.trip_settlement(trip)?;

        let net = settlement
            .balances
            .iter()
            .find(|position| position.id == user)
            .map(|position| position.balance)
            .unwrap_or(Money::ZERO);
        let owes = settlement
            .transfers
            .iter()
            .copied()
            .filter(|transfer| transfer.from == user)
            .collect();
        let owed = settlement
            .transfers
            .iter()
            .copied()
            .filter(|transfer| transfer.to == user)
            .collect();

        Ok(MemberPosition {
            user,
            net,
            owes,
            owed,
        })
    }
}
