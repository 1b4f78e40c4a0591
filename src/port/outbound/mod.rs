//! Outbound ports consumed by the settlement workflow.
//!
//! Production adapters live under [`crate::adapter`]; test doubles under
//! [`crate::testkit`].

pub mod bets;
pub mod chain;
pub mod store;

pub use bets::{BetRepository, DrawOutcome};
pub use chain::{AuctionChain, RandomnessRequestId, TransferReceipt};
pub use store::{RequestRecord, SettlementStore, TransferRecord, TransferStatus};
