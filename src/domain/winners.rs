//! Winner ranking: the top-scoring shortlisted bettors.

use std::cmp::Reverse;

use super::bet::Bet;
use super::error::DomainError;

/// Number of reward recipients per auction.
pub const WINNER_COUNT: usize = 3;

/// Rank the shortlist by descending `final_score` and return the top
/// `min(3, len)` bets, ties broken by earliest submission.
///
/// Every shortlisted bet must carry a score; a missing score means the
/// caller ranked before fulfillment completed.
pub fn select_winners(shortlist: &[Bet]) -> Result<Vec<Bet>, DomainError> {
    let mut ranked = Vec::with_capacity(shortlist.len());
    for bet in shortlist {
        let score = bet.final_score.ok_or_else(|| DomainError::ScoreMissing {
            bettor: bet.bettor.to_string(),
        })?;
        ranked.push((score, bet.clone()));
    }

    ranked.sort_by_key(|(score, bet)| (Reverse(*score), bet.submitted_at));
    Ok(ranked
        .into_iter()
        .take(WINNER_COUNT)
        .map(|(_, bet)| bet)
        .collect())
}
