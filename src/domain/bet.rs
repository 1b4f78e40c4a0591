//! Bets and the score aggregation policy.

use alloy_primitives::Address;
use serde::Deserialize;

use super::error::DomainError;

/// Upper bound on draws per randomness request, enforced on-chain and at the
/// repository boundary.
pub const MAX_DRAWS_PER_BETTOR: u8 = 10;

/// How up to [`MAX_DRAWS_PER_BETTOR`] resolved draws collapse into one
/// `final_score` per bettor.
///
/// The canonical rule is `MaxDraw` (a bettor's peak luck); `SumDraws` is
/// available for deployments that prefer aggregate luck. The policy is
/// config-selected and applied uniformly across an auction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    #[default]
    #[serde(alias = "max_draw")]
    Max,
    #[serde(alias = "sum_draws")]
    Sum,
}

impl ScorePolicy {
    /// Aggregate resolved draws into a score. `None` for an empty slice;
    /// a score is only meaningful once draws exist.
    #[must_use]
    pub fn score(&self, draws: &[u64]) -> Option<u64> {
        if draws.is_empty() {
            return None;
        }
        match self {
            ScorePolicy::Max => draws.iter().copied().max(),
            ScorePolicy::Sum => Some(draws.iter().fold(0u64, |acc, d| acc.saturating_add(*d))),
        }
    }
}

/// One participant's submission, as read from the bet repository.
///
/// `final_score` is owned by the repository: it is populated only once every
/// requested draw for the bettor has resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub bettor: Address,
    pub predicted_price: u128,
    /// Monotone submission index from the backend; breaks ties
    /// deterministically (first submitted wins).
    pub submitted_at: u64,
    pub draws: Vec<u64>,
    pub final_score: Option<u64>,
}

impl Bet {
    /// Validate a bet at the repository boundary.
    pub fn try_new(
        bettor: Address,
        predicted_price: u128,
        submitted_at: u64,
        draws: Vec<u64>,
        final_score: Option<u64>,
    ) -> Result<Self, DomainError> {
        if draws.len() > MAX_DRAWS_PER_BETTOR as usize {
            return Err(DomainError::TooManyDraws {
                bettor: bettor.to_string(),
                count: draws.len(),
                max: MAX_DRAWS_PER_BETTOR as usize,
            });
        }
        Ok(Self {
            bettor,
            predicted_price,
            submitted_at,
            draws,
            final_score,
        })
    }

    /// Proximity to the reference price. Never persisted; always recomputed
    /// from source values so it cannot go stale.
    #[must_use]
    pub fn distance(&self, final_price: u128) -> u128 {
        self.predicted_price.abs_diff(final_price)
    }

    /// Whether every requested draw has resolved.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.final_score.is_some()
    }
}
