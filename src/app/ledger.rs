//! Reward disbursement with a durable transfer log.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{AuctionId, Bet};
use crate::error::Result;
use crate::port::outbound::{
    AuctionChain, SettlementStore, TransferReceipt, TransferRecord, TransferStatus,
};

/// Outcome of one disbursement pass over a winner set.
#[derive(Debug, Clone, Default)]
pub struct DisbursementReport {
    /// Transfers confirmed during this pass.
    pub receipts: Vec<TransferReceipt>,
    /// Winners already confirmed by a prior pass and skipped here.
    pub already_confirmed: Vec<Address>,
    /// Winners whose transfer exhausted its retry budget.
    pub failed: Vec<Address>,
}

impl DisbursementReport {
    /// Total winners with a confirmed transfer after this pass.
    #[must_use]
    pub fn confirmed_total(&self) -> usize {
        self.receipts.len() + self.already_confirmed.len()
    }
}

/// Pays winners at most once per `(auction, bettor)`.
///
/// The durable transfer log survives process restarts: a re-invocation
/// after a partial disbursement skips confirmed transfers and retries only
/// the missing ones.
pub struct RewardLedger {
    chain: Arc<dyn AuctionChain>,
    store: Arc<dyn SettlementStore>,
    max_attempts: u32,
    backoff: Duration,
}

impl RewardLedger {
    pub fn new(
        chain: Arc<dyn AuctionChain>,
        store: Arc<dyn SettlementStore>,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            max_attempts,
            backoff,
        }
    }

    /// Transfer `amount` to each winner not yet confirmed in the log.
    ///
    /// Individual failures are retried with exponential backoff and, after
    /// exhaustion, marked `Failed` without blocking the other winners.
    pub async fn disburse(
        &self,
        auction: AuctionId,
        winners: &[Bet],
        amount: U256,
    ) -> Result<DisbursementReport> {
        let existing: HashMap<Address, TransferRecord> = self
            .store
            .transfers(auction)
            .await?
            .into_iter()
            .map(|t| (t.bettor, t))
            .collect();

        let mut report = DisbursementReport::default();

        for winner in winners {
            let prior = existing.get(&winner.bettor);
            if prior.is_some_and(|t| t.status == TransferStatus::Confirmed) {
                info!(
                    auction = %auction,
                    bettor = %winner.bettor,
                    "transfer already confirmed, skipping"
                );
                report.already_confirmed.push(winner.bettor);
                continue;
            }

            let prior_attempts = prior.map_or(0, |t| t.attempts);
            match self
                .transfer_with_backoff(auction, winner.bettor, amount, prior_attempts)
                .await?
            {
                Some(receipt) => report.receipts.push(receipt),
                None => report.failed.push(winner.bettor),
            }
        }

        info!(
            auction = %auction,
            confirmed = report.receipts.len(),
            skipped = report.already_confirmed.len(),
            failed = report.failed.len(),
            "Disbursement pass complete"
        );

        Ok(report)
    }

    /// Attempt one winner's transfer up to `max_attempts` times. Returns
    /// `None` once the budget is exhausted and the log shows `Failed`.
    async fn transfer_with_backoff(
        &self,
        auction: AuctionId,
        bettor: Address,
        amount: U256,
        prior_attempts: u32,
    ) -> Result<Option<TransferReceipt>> {
        let mut attempts = prior_attempts;

        for attempt in 1..=self.max_attempts {
            attempts += 1;
            match self.chain.distribute(auction, bettor, amount).await {
                Ok(receipt) => {
                    self.store
                        .record_transfer(&TransferRecord {
                            auction_id: auction,
                            bettor,
                            amount,
                            status: TransferStatus::Confirmed,
                            tx_hash: Some(receipt.tx_hash.clone()),
                            attempts,
                            updated_at: Utc::now(),
                        })
                        .await?;
                    info!(
                        auction = %auction,
                        bettor = %bettor,
                        tx_hash = %receipt.tx_hash,
                        "Reward transfer confirmed"
                    );
                    return Ok(Some(receipt));
                }
                Err(e) => {
                    warn!(
                        auction = %auction,
                        bettor = %bettor,
                        attempt,
                        error = %e,
                        "Reward transfer attempt failed"
                    );
                    let exhausted = attempt == self.max_attempts;
                    self.store
                        .record_transfer(&TransferRecord {
                            auction_id: auction,
                            bettor,
                            amount,
                            status: if exhausted {
                                TransferStatus::Failed
                            } else {
                                TransferStatus::Pending
                            },
                            tx_hash: None,
                            attempts,
                            updated_at: Utc::now(),
                        })
                        .await?;
                    if !exhausted {
                        let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(None)
    }
}
