use thiserror::Error;
use tripsplit_domain::{Money, TripId, UserId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SplitBuildError {
    #[error("a split needs at least one participating member")]
    NoMembers,
    #[error("user {0} appears more than once in the member list")]
    DuplicateMember(UserId),
    #[error("amount {0} is negative")]
    NegativeAmount(Money),
    #[error("custom shares sum to {actual} but the bill is {expected}")]
    ShareMismatch { expected: Money, actual: Money },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("trip {0} not found")]
    TripNotFound(TripId),
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SettlementFetchError {
    #[error("failed to load trip snapshot")]
    Store(#[from] StoreError),
}
