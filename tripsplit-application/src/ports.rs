use std::collections::HashMap;

use tripsplit_domain::{Payment, Split, TripId, UserId};

use crate::error::StoreError;

/// Snapshot source for a trip's splits and payment ledger.
///
/// Implementations live with the storage layer; the settlement core only
/// reads already-fetched, consistent snapshots through this trait.
pub trait SplitStore: Send + Sync {
    fn splits_for_trip(&self, trip: TripId) -> Result<Vec<Split>, StoreError>;

    /// Approved ledger rows for the trip's splits. Callers may return the
    /// full ledger; non-approved rows are ignored downstream.
    fn approved_payments_for_trip(&self, trip: TripId) -> Result<Vec<Payment>, StoreError>;
}

/// Display-name lookup for the messaging/UI layer.
pub trait MemberDirectory: Send + Sync {
    fn display_name(&self, user: UserId) -> Option<&str>;
}

impl MemberDirectory for HashMap<UserId, String> {
    fn display_name(&self, user: UserId) -> Option<&str> {
        self.get(&user).map(String::as_str)
    }
}
