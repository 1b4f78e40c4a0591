//! Durable settlement store port.
//!
//! Holds everything a crashed or re-triggered run needs to resume safely:
//! the settlement state machine, the randomness request log, the transfer
//! log, and the per-auction run lock.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::chain::RandomnessRequestId;
use crate::domain::{AuctionId, AuctionSettlement};
use crate::error::Result;

/// One issued (or about-to-be-issued) randomness request.
///
/// A record is written before the on-chain call and confirmed after it, so
/// the log over-approximates what is on chain: a record without
/// `request_id` may or may not have landed and is retried, relying on the
/// contract rejecting duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub auction_id: AuctionId,
    pub bettor: Address,
    pub draw_count: u8,
    pub request_id: Option<RandomnessRequestId>,
    pub issued_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    #[must_use]
    pub fn issued(auction_id: AuctionId, bettor: Address, draw_count: u8) -> Self {
        Self {
            auction_id,
            bettor,
            draw_count,
            request_id: None,
            issued_at: Utc::now(),
            confirmed_at: None,
        }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Outcome of one winner's transfer in the durable log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Attempted but neither confirmed nor exhausted.
    Pending,
    /// On-chain transfer confirmed; never retried again.
    Confirmed,
    /// Retry budget exhausted; surfaced to the operator.
    Failed,
}

impl TransferStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "confirmed" => Ok(TransferStatus::Confirmed),
            "failed" => Ok(TransferStatus::Failed),
            other => Err(format!("unknown transfer status '{other}'")),
        }
    }
}

/// One winner's transfer, keyed by `(auction_id, bettor)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub auction_id: AuctionId,
    pub bettor: Address,
    pub amount: U256,
    pub status: TransferStatus,
    pub tx_hash: Option<String>,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

/// Durable state the settlement workflow persists between invocations.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn load_settlement(&self, auction: AuctionId) -> Result<Option<AuctionSettlement>>;

    /// Upsert the settlement row.
    async fn save_settlement(&self, settlement: &AuctionSettlement) -> Result<()>;

    /// Insert a request record unless one exists for `(auction, bettor)`.
    /// Returns `false` when a record was already present.
    async fn record_request(&self, record: &RequestRecord) -> Result<bool>;

    /// Mark a recorded request as confirmed on-chain.
    async fn confirm_request(
        &self,
        auction: AuctionId,
        bettor: Address,
        request_id: &RandomnessRequestId,
    ) -> Result<()>;

    async fn requests(&self, auction: AuctionId) -> Result<Vec<RequestRecord>>;

    /// Upsert a transfer record.
    async fn record_transfer(&self, record: &TransferRecord) -> Result<()>;

    async fn transfers(&self, auction: AuctionId) -> Result<Vec<TransferRecord>>;

    /// Acquire the per-auction run lock. Returns `false` when another
    /// holder owns it and its lease has not yet expired.
    ///
    /// The lock is a lease, not a permanent claim: a holder that crashed
    /// or was interrupted never releases, so a lock older than `lease` is
    /// stale and may be taken over by the next run.
    async fn try_acquire_run_lock(
        &self,
        auction: AuctionId,
        holder: &str,
        lease: Duration,
    ) -> Result<bool>;

    /// Release the run lock if held by `holder`.
    async fn release_run_lock(&self, auction: AuctionId, holder: &str) -> Result<()>;
}
