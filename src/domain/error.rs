//! Domain validation errors.
//!
//! Returned by constructors and transition methods when a domain invariant
//! would be violated.

use thiserror::Error;

use super::auction::{AuctionId, SettlementState};

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Settlement states only move forward; no state is revisited.
    #[error("invalid state transition for auction {auction}: {from:?} -> {to:?}")]
    InvalidTransition {
        auction: AuctionId,
        from: SettlementState,
        to: SettlementState,
    },

    /// The final price must be captured exactly once, while `Pending`.
    #[error("final price already captured for auction {auction}")]
    PriceAlreadyCaptured { auction: AuctionId },

    /// Distance and shortlist computations require a captured final price.
    #[error("final price not captured for auction {auction}")]
    PriceNotCaptured { auction: AuctionId },

    /// A bettor may hold at most [`MAX_DRAWS_PER_BETTOR`](super::MAX_DRAWS_PER_BETTOR) draws.
    #[error("bettor {bettor} has {count} draws, maximum is {max}")]
    TooManyDraws {
        bettor: String,
        count: usize,
        max: usize,
    },

    /// Winner ranking requires every shortlisted bettor to carry a score.
    #[error("bettor {bettor} has no final score")]
    ScoreMissing { bettor: String },

    /// A bettor address from the backend failed to parse.
    #[error("invalid bettor address '{raw}': {reason}")]
    InvalidAddress { raw: String, reason: String },
}
