//! Core settlement domain: auctions, bets, selection and ranking rules.
//!
//! Everything in this module is pure and deterministic so the selection and
//! ranking logic can be replayed from persisted inputs.

pub mod auction;
pub mod bet;
pub mod error;
pub mod shortlist;
pub mod winners;

pub use auction::{AuctionId, AuctionSettlement, SettlementState};
pub use bet::{Bet, ScorePolicy, MAX_DRAWS_PER_BETTOR};
pub use error::DomainError;
pub use shortlist::{compute_shortlist, shortlist_size};
pub use winners::{select_winners, WINNER_COUNT};
