//! In-memory bet repository.

use std::collections::HashMap;

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{AuctionId, Bet, ScorePolicy};
use crate::error::Result;
use crate::port::outbound::{BetRepository, DrawOutcome};

#[derive(Default)]
struct RepoState {
    bets: HashMap<AuctionId, Vec<Bet>>,
    /// Granted request slots: how many draws each bettor is owed.
    slots: HashMap<(AuctionId, Address), u8>,
}

/// In-memory [`BetRepository`] with the draw-recording gate of the real
/// backend: draws against bettors without a request slot are rejected.
pub struct InMemoryBetRepository {
    policy: ScorePolicy,
    state: Mutex<RepoState>,
}

impl InMemoryBetRepository {
    pub fn new(policy: ScorePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RepoState::default()),
        }
    }

    /// Seed the repository with bets for an auction.
    pub fn insert_bets(&self, auction: AuctionId, bets: Vec<Bet>) {
        self.state.lock().bets.insert(auction, bets);
    }

    /// Register a request slot for a bettor, as the oracle contract would
    /// when a randomness request is issued.
    pub fn grant_slot(&self, auction: AuctionId, bettor: Address, draw_count: u8) {
        self.state.lock().slots.insert((auction, bettor), draw_count);
    }

    /// Shortcut: mark a bettor fully fulfilled with the given draws.
    pub fn fulfill(&self, auction: AuctionId, bettor: Address, draws: Vec<u64>) {
        let mut state = self.state.lock();
        if let Some(bets) = state.bets.get_mut(&auction) {
            if let Some(bet) = bets.iter_mut().find(|b| b.bettor == bettor) {
                bet.final_score = self.policy.score(&draws);
                bet.draws = draws;
            }
        }
    }
}

#[async_trait]
impl BetRepository for InMemoryBetRepository {
    async fn list_bets(&self, auction: AuctionId) -> Result<Vec<Bet>> {
        Ok(self
            .state
            .lock()
            .bets
            .get(&auction)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_draw(
        &self,
        auction: AuctionId,
        bettor: Address,
        draw: u64,
    ) -> Result<DrawOutcome> {
        let mut state = self.state.lock();
        let Some(&granted) = state.slots.get(&(auction, bettor)) else {
            return Ok(DrawOutcome::NotRequested);
        };

        let Some(bet) = state
            .bets
            .get_mut(&auction)
            .and_then(|bets| bets.iter_mut().find(|b| b.bettor == bettor))
        else {
            return Ok(DrawOutcome::NotRequested);
        };

        if bet.draws.len() >= granted as usize {
            return Ok(DrawOutcome::AlreadyRecorded);
        }

        bet.draws.push(draw);
        if bet.draws.len() == granted as usize {
            bet.final_score = self.policy.score(&bet.draws);
        }
        Ok(DrawOutcome::Recorded)
    }
}
