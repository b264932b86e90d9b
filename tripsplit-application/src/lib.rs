#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod ports;
pub mod settlement_service;
pub mod split_builder;

pub use error::{SettlementFetchError, SplitBuildError, StoreError};
pub use model::{MemberPosition, PersonBalance, TripSettlement};
pub use ports::{MemberDirectory, SplitStore};
pub use settlement_service::SettlementService;
pub use split_builder::{CUSTOM_SHARE_TOLERANCE, SplitDraft};
