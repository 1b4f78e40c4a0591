//! Randomness coordination: bounded request issuance and fulfillment
//! detection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use futures_util::{stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{AuctionId, Bet};
use crate::error::{ChainError, Error, Result};
use crate::port::outbound::{
    AuctionChain, BetRepository, RandomnessRequestId, RequestRecord, SettlementStore,
};

/// Result of waiting for draw fulfillment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Every shortlisted bettor has a final score.
    Fulfilled,
    /// The timeout elapsed with these bettors still unresolved.
    TimedOut { pending: Vec<Address> },
}

/// Issues bounded randomness requests for a shortlist and detects when all
/// of them have resolved.
///
/// Idempotent by `(auction, bettor)`: a bettor with a confirmed request in
/// the durable log is never issued a second one, regardless of how many
/// times a run is retried.
pub struct RandomnessCoordinator {
    chain: Arc<dyn AuctionChain>,
    store: Arc<dyn SettlementStore>,
    bets: Arc<dyn BetRepository>,
    draws_per_bettor: u8,
    request_concurrency: usize,
    poll_interval: Duration,
}

impl RandomnessCoordinator {
    pub fn new(
        chain: Arc<dyn AuctionChain>,
        store: Arc<dyn SettlementStore>,
        bets: Arc<dyn BetRepository>,
        draws_per_bettor: u8,
        request_concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            bets,
            draws_per_bettor,
            request_concurrency,
            poll_interval,
        }
    }

    /// Issue exactly one randomness request per shortlisted bettor.
    ///
    /// Requests are recorded in the store before the on-chain call so a
    /// crash cannot lose track of an issued one; unconfirmed records are
    /// retried, with the contract's duplicate rejection treated as success.
    /// Independent requests run concurrently with bounded parallelism.
    pub async fn request_draws(
        &self,
        auction: AuctionId,
        shortlist: &[Bet],
    ) -> Result<Vec<RandomnessRequestId>> {
        let existing: HashMap<Address, RequestRecord> = self
            .store
            .requests(auction)
            .await?
            .into_iter()
            .map(|r| (r.bettor, r))
            .collect();

        let mut confirmed: Vec<RandomnessRequestId> = Vec::new();
        let mut to_issue: Vec<Address> = Vec::new();

        for bet in shortlist {
            match existing.get(&bet.bettor) {
                Some(record) if record.is_confirmed() => {
                    debug!(
                        auction = %auction,
                        bettor = %bet.bettor,
                        "request already confirmed, skipping"
                    );
                    if let Some(id) = &record.request_id {
                        confirmed.push(id.clone());
                    }
                }
                Some(_) => {
                    // Recorded but never confirmed: the send may or may not
                    // have landed. Retry; the contract rejects duplicates.
                    to_issue.push(bet.bettor);
                }
                None => {
                    let record = RequestRecord::issued(auction, bet.bettor, self.draws_per_bettor);
                    self.store.record_request(&record).await?;
                    to_issue.push(bet.bettor);
                }
            }
        }

        info!(
            auction = %auction,
            shortlisted = shortlist.len(),
            issuing = to_issue.len(),
            draws_per_bettor = self.draws_per_bettor,
            "Issuing randomness requests"
        );

        let results: Vec<Result<RandomnessRequestId>> = stream::iter(to_issue)
            .map(|bettor| {
                let chain = Arc::clone(&self.chain);
                let store = Arc::clone(&self.store);
                let count = self.draws_per_bettor;
                async move {
                    let request_id = match chain.request_randoms(auction, bettor, count).await {
                        Ok(id) => id,
                        Err(Error::Chain(ChainError::DuplicateRequest { .. })) => {
                            // Benign: a previous run's send landed. Confirm
                            // with a marker id so resume skips this bettor.
                            debug!(auction = %auction, bettor = %bettor, "duplicate request, treating as issued");
                            RandomnessRequestId::new(format!("pre-existing:{bettor}"))
                        }
                        Err(e) => return Err(e),
                    };
                    store.confirm_request(auction, bettor, &request_id).await?;
                    Ok(request_id)
                }
            })
            .buffer_unordered(self.request_concurrency)
            .collect()
            .await;

        for result in results {
            confirmed.push(result?);
        }

        Ok(confirmed)
    }

    /// Wait until every shortlisted bettor has a final score, polling the
    /// repository at the configured interval, or give up after `timeout`.
    ///
    /// Never blocks a thread: the loop yields between polls. On timeout the
    /// caller decides the settlement's fate (policy: abort; partial
    /// fairness is disallowed).
    pub async fn await_fulfillment(
        &self,
        auction: AuctionId,
        shortlist: &[Bet],
        timeout: Duration,
    ) -> Result<FulfillmentOutcome> {
        let deadline = Instant::now() + timeout;

        loop {
            let snapshot: HashMap<Address, Bet> = self
                .bets
                .list_bets(auction)
                .await?
                .into_iter()
                .map(|b| (b.bettor, b))
                .collect();

            let pending: Vec<Address> = shortlist
                .iter()
                .filter(|bet| {
                    snapshot
                        .get(&bet.bettor)
                        .map_or(true, |b| !b.is_fulfilled())
                })
                .map(|bet| bet.bettor)
                .collect();

            if pending.is_empty() {
                info!(auction = %auction, bettors = shortlist.len(), "All draws fulfilled");
                return Ok(FulfillmentOutcome::Fulfilled);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    auction = %auction,
                    pending = pending.len(),
                    "Fulfillment timed out"
                );
                return Ok(FulfillmentOutcome::TimedOut { pending });
            }

            debug!(
                auction = %auction,
                pending = pending.len(),
                "Draws still pending, sleeping"
            );
            let remaining = deadline - now;
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}
