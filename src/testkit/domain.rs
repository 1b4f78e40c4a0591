//! Builders for domain primitives used across tests.

use alloy_primitives::Address;

use crate::domain::Bet;

/// Deterministic bettor address from a byte.
pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// A bet with no draws and no score.
pub fn bet(n: u8, predicted_price: u128, submitted_at: u64) -> Bet {
    Bet::try_new(addr(n), predicted_price, submitted_at, vec![], None).unwrap()
}

/// A bet whose draws have fully resolved into `score`.
pub fn scored_bet(n: u8, predicted_price: u128, submitted_at: u64, score: u64) -> Bet {
    Bet::try_new(
        addr(n),
        predicted_price,
        submitted_at,
        vec![score],
        Some(score),
    )
    .unwrap()
}
