//! The settlement state machine driver.
//!
//! One run per auction holds the run lock and advances the persisted state
//! machine: `Pending -> ShortlistComputed -> RandomnessRequested ->
//! RandomnessFulfilled -> RewardsDisbursed`, with `Failed` reachable from
//! any non-terminal state. Each step persists before the next begins, so a
//! re-triggered run resumes from the last completed step instead of
//! restarting.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::coordinator::{FulfillmentOutcome, RandomnessCoordinator};
use crate::app::ledger::RewardLedger;
use crate::config::SettlementConfig;
use crate::domain::{
    compute_shortlist, select_winners, AuctionId, AuctionSettlement, Bet, SettlementState,
};
use crate::error::{ChainError, Error, Result, SettlementError};
use crate::port::outbound::{AuctionChain, BetRepository, SettlementStore};

/// Summary of one settlement run.
#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub auction: AuctionId,
    pub initial_state: SettlementState,
    pub final_state: SettlementState,
    pub transfers_confirmed: usize,
    pub transfers_failed: usize,
}

/// Drives the end-to-end settlement workflow for one auction.
pub struct SettlementOrchestrator {
    bets: Arc<dyn BetRepository>,
    chain: Arc<dyn AuctionChain>,
    store: Arc<dyn SettlementStore>,
    coordinator: RandomnessCoordinator,
    ledger: RewardLedger,
    config: SettlementConfig,
}

impl SettlementOrchestrator {
    pub fn new(
        bets: Arc<dyn BetRepository>,
        chain: Arc<dyn AuctionChain>,
        store: Arc<dyn SettlementStore>,
        config: SettlementConfig,
    ) -> Self {
        let coordinator = RandomnessCoordinator::new(
            Arc::clone(&chain),
            Arc::clone(&store),
            Arc::clone(&bets),
            config.draws_per_bettor,
            config.request_concurrency,
            config.poll_interval(),
        );
        let ledger = RewardLedger::new(
            Arc::clone(&chain),
            Arc::clone(&store),
            config.transfer_attempts,
            config.transfer_backoff(),
        );
        Self {
            bets,
            chain,
            store,
            coordinator,
            ledger,
            config,
        }
    }

    /// Execute all remaining settlement steps for the auction.
    ///
    /// Exactly one run per auction may be active; concurrent invocations
    /// (e.g. a retried cron trigger) fail fast with a lock error and no
    /// side effects. A lock left behind by a crashed or interrupted run
    /// expires after the configured lease, so the next trigger resumes
    /// instead of being locked out forever.
    pub async fn settle(&self, auction: AuctionId) -> Result<SettlementReport> {
        let holder = uuid::Uuid::new_v4().to_string();
        let lease = self.config.run_lock_lease();
        if !self.store.try_acquire_run_lock(auction, &holder, lease).await? {
            return Err(SettlementError::RunLockHeld { auction }.into());
        }

        let result = self.drive(auction).await;

        if let Err(e) = self.store.release_run_lock(auction, &holder).await {
            error!(auction = %auction, error = %e, "Failed to release run lock");
        }

        result
    }

    async fn drive(&self, auction: AuctionId) -> Result<SettlementReport> {
        let mut settlement = match self.store.load_settlement(auction).await? {
            Some(s) => s,
            None => {
                let fresh = AuctionSettlement::new(auction);
                self.store.save_settlement(&fresh).await?;
                fresh
            }
        };

        let initial_state = settlement.state();
        info!(auction = %auction, state = %initial_state, "Settlement run starting");

        if initial_state == SettlementState::Failed {
            return Err(SettlementError::Precondition {
                auction,
                reason: "settlement previously failed; terminal".into(),
            }
            .into());
        }

        let mut transfers_confirmed = 0;
        let mut transfers_failed = 0;

        while !settlement.state().is_terminal() {
            match settlement.state() {
                SettlementState::Pending => {
                    self.capture_price(&mut settlement).await?;
                }
                SettlementState::ShortlistComputed => {
                    self.issue_requests(&mut settlement).await?;
                }
                SettlementState::RandomnessRequested => {
                    self.wait_for_fulfillment(&mut settlement).await?;
                }
                SettlementState::RandomnessFulfilled => {
                    let (confirmed, failed) = self.disburse_rewards(&mut settlement).await?;
                    transfers_confirmed = confirmed;
                    transfers_failed = failed;
                }
                SettlementState::RewardsDisbursed | SettlementState::Failed => unreachable!(),
            }
        }

        let final_state = settlement.state();
        info!(auction = %auction, state = %final_state, "Settlement run complete");

        Ok(SettlementReport {
            auction,
            initial_state,
            final_state,
            transfers_confirmed,
            transfers_failed,
        })
    }

    /// `Pending -> ShortlistComputed`: capture the reference price exactly
    /// once and verify bets exist.
    async fn capture_price(&self, settlement: &mut AuctionSettlement) -> Result<()> {
        let auction = settlement.auction_id;

        let price = match self.chain.final_price(auction).await {
            Ok(p) => p,
            Err(Error::Chain(ChainError::NotSettled { .. })) => {
                // Retriable: the auction will settle later. State stays
                // Pending for the next trigger.
                return Err(SettlementError::Precondition {
                    auction,
                    reason: "auction not yet settled on-chain".into(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        let bets = self.bets.list_bets(auction).await?;
        if bets.is_empty() {
            // Nothing will ever change here; terminal.
            warn!(auction = %auction, "No bets submitted, failing settlement");
            settlement.advance(SettlementState::Failed)?;
            self.store.save_settlement(settlement).await?;
            return Err(SettlementError::Precondition {
                auction,
                reason: "no bets submitted".into(),
            }
            .into());
        }

        settlement.capture_price(price)?;
        settlement.advance(SettlementState::ShortlistComputed)?;
        self.store.save_settlement(settlement).await?;
        info!(auction = %auction, price, bets = bets.len(), "Final price captured");
        Ok(())
    }

    /// `ShortlistComputed -> RandomnessRequested`: issue one bounded
    /// request per shortlisted bettor.
    async fn issue_requests(&self, settlement: &mut AuctionSettlement) -> Result<()> {
        let auction = settlement.auction_id;
        let shortlist = self.current_shortlist(settlement).await?;

        let request_ids = self.coordinator.request_draws(auction, &shortlist).await?;
        info!(auction = %auction, requests = request_ids.len(), "Randomness requests issued");

        settlement.advance(SettlementState::RandomnessRequested)?;
        self.store.save_settlement(settlement).await?;
        Ok(())
    }

    /// `RandomnessRequested -> RandomnessFulfilled | Failed`: wait for
    /// every shortlisted bettor's draws to resolve.
    async fn wait_for_fulfillment(&self, settlement: &mut AuctionSettlement) -> Result<()> {
        let auction = settlement.auction_id;

        if self.store.requests(auction).await?.is_empty() {
            return Err(SettlementError::InconsistentState {
                auction,
                detail: "state is randomness_requested but the request log is empty".into(),
            }
            .into());
        }

        let shortlist = self.current_shortlist(settlement).await?;
        let outcome = self
            .coordinator
            .await_fulfillment(auction, &shortlist, self.config.fulfillment_timeout())
            .await?;

        match outcome {
            FulfillmentOutcome::Fulfilled => {
                settlement.advance(SettlementState::RandomnessFulfilled)?;
                self.store.save_settlement(settlement).await?;
                Ok(())
            }
            FulfillmentOutcome::TimedOut { pending } => {
                // Partial fairness is disallowed: abort the settlement.
                settlement.advance(SettlementState::Failed)?;
                self.store.save_settlement(settlement).await?;
                Err(SettlementError::FulfillmentTimeout {
                    auction,
                    pending: pending.len(),
                }
                .into())
            }
        }
    }

    /// `RandomnessFulfilled -> RewardsDisbursed | Failed`: rank winners
    /// from a fresh repository snapshot and pay them.
    async fn disburse_rewards(
        &self,
        settlement: &mut AuctionSettlement,
    ) -> Result<(usize, usize)> {
        let auction = settlement.auction_id;

        // Re-pull bets so ranking uses resolved scores, not a stale
        // in-memory copy.
        let shortlist = self.current_shortlist(settlement).await?;
        let winners = select_winners(&shortlist).map_err(|e| SettlementError::InconsistentState {
            auction,
            detail: format!("state is randomness_fulfilled but {e}"),
        })?;

        info!(auction = %auction, winners = winners.len(), "Winner set computed");

        let report = self
            .ledger
            .disburse(auction, &winners, self.config.reward_amount())
            .await?;

        if report.confirmed_total() == 0 && !winners.is_empty() {
            settlement.advance(SettlementState::Failed)?;
            self.store.save_settlement(settlement).await?;
            return Err(SettlementError::TransfersExhausted {
                auction,
                winners: winners.len(),
            }
            .into());
        }

        settlement.advance(SettlementState::RewardsDisbursed)?;
        self.store.save_settlement(settlement).await?;
        Ok((report.confirmed_total(), report.failed.len()))
    }

    /// Recompute the shortlist from the cached price and a fresh bet
    /// snapshot. Deterministic, so every step of a run (and every resumed
    /// run) sees the same selection.
    async fn current_shortlist(&self, settlement: &AuctionSettlement) -> Result<Vec<Bet>> {
        let auction = settlement.auction_id;
        let final_price = settlement.final_price()?;
        let bets = self.bets.list_bets(auction).await?;
        let shortlist = compute_shortlist(&bets, final_price);
        if shortlist.is_empty() {
            return Err(SettlementError::InconsistentState {
                auction,
                detail: "bet repository returned no bets after price capture".into(),
            }
            .into());
        }
        Ok(shortlist)
    }
}
