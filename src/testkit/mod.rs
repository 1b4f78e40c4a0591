//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`chain`] - Scriptable [`AuctionChain`](crate::port::outbound::AuctionChain) mock.
//! - [`bets`] - In-memory [`BetRepository`](crate::port::outbound::BetRepository).
//! - [`store`] - In-memory [`SettlementStore`](crate::port::outbound::SettlementStore).
//! - [`domain`] - Builders for domain primitives: addresses and bets.

pub mod bets;
pub mod chain;
pub mod domain;
pub mod store;

pub use bets::InMemoryBetRepository;
pub use chain::MockChain;
pub use store::InMemorySettlementStore;
