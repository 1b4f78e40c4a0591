//! HTTP adapter for the backend bet store.

mod bets;

pub use bets::HttpBetRepository;
