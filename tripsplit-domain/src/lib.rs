#![warn(clippy::uninlined_format_args)]

pub mod model;
pub mod services;

pub use model::{
    Balance, BalanceAccumulator, MemberBalances, Money, MoneyConversionError, Payment, PaymentId,
    PaymentState, PaymentStatus, RoundingMode, Settlement, Split, SplitId, SplitItem, SplitKind,
    SplitMember, StatusTransitionError, TripId, UserId,
};
pub use services::{
    DEFAULT_SETTLED_TOLERANCE, GreedySettlement, ItemAllocation, ItemAllocator,
    SettlementCalculator, SettlementStrategy,
};
