//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gavel::config::SettlementConfig;
use gavel::domain::{AuctionId, Bet, ScorePolicy};
use gavel::testkit::{InMemoryBetRepository, InMemorySettlementStore, MockChain};

/// Settlement tuning with fast timers and token_decimals 0 so transfer
/// amounts equal `reward_per_winner`.
pub fn settlement_config() -> SettlementConfig {
    SettlementConfig {
        reward_per_winner: 100,
        token_decimals: 0,
        draws_per_bettor: 10,
        poll_interval_secs: 1,
        fulfillment_timeout_secs: 5,
        request_concurrency: 4,
        transfer_attempts: 3,
        transfer_backoff_ms: 10,
        run_lock_lease_secs: 60,
        score_policy: ScorePolicy::Max,
    }
}

/// A hundred bets predicting 0..100, submitted in order. With a final
/// price of 50 the shortlist is the ten guesses 45..=54 by proximity and
/// tie-break.
pub fn hundred_bets() -> Vec<Bet> {
    (0..100u8)
        .map(|i| gavel::testkit::domain::bet(i.wrapping_add(1), u128::from(i), u64::from(i)))
        .collect()
}

pub struct Fixture {
    pub chain: Arc<MockChain>,
    pub bets: Arc<InMemoryBetRepository>,
    pub store: Arc<InMemorySettlementStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(MockChain::new()),
            bets: Arc::new(InMemoryBetRepository::new(ScorePolicy::Max)),
            store: Arc::new(InMemorySettlementStore::new()),
        }
    }

    /// Seed a settled auction with the hundred-bet scenario and fulfill
    /// every bettor's draws with score `10 * predicted_price`.
    pub fn seed_settled_hundred(&self, auction: AuctionId, price: u128) {
        self.chain.settle_price(auction, price);
        let bets = hundred_bets();
        self.bets.insert_bets(auction, bets.clone());
        for bet in &bets {
            self.bets
                .fulfill(auction, bet.bettor, vec![10 * bet.predicted_price as u64]);
        }
    }
}
