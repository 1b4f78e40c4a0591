//! Proximity shortlist: the closest `ceil(N/10)` bets advance to the
//! randomness stage.

use super::bet::Bet;

/// Shortlist size for `n` submitted bets.
#[must_use]
pub fn shortlist_size(n: usize) -> usize {
    n.div_ceil(10)
}

/// Select the shortlist: the `ceil(N/10)` bets closest to `final_price`,
/// ties broken by earliest submission.
///
/// Deterministic and replayable: given the same bets and the same cached
/// final price, every invocation produces the same ordered shortlist.
#[must_use]
pub fn compute_shortlist(bets: &[Bet], final_price: u128) -> Vec<Bet> {
    let mut ranked: Vec<Bet> = bets.to_vec();
    ranked.sort_by_key(|b| (b.distance(final_price), b.submitted_at));
    ranked.truncate(shortlist_size(bets.len()));
    ranked
}
