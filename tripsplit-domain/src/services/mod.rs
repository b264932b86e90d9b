pub mod item_allocator;
pub mod settlement_calculator;

pub use item_allocator::{ItemAllocation, ItemAllocator};
pub use settlement_calculator::{
    DEFAULT_SETTLED_TOLERANCE, GreedySettlement, SettlementCalculator, SettlementStrategy,
};
