//! Bet repository port.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::domain::{AuctionId, Bet};
use crate::error::Result;

/// Outcome of recording a resolved draw against a bettor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The draw was persisted.
    Recorded,
    /// The draw was previously persisted; benign on retry.
    AlreadyRecorded,
    /// The bettor holds no request slot for this auction. Rejected as a
    /// defense against spoofed fulfillment events.
    NotRequested,
}

/// Read access to submitted bets plus the oracle-callback write path.
///
/// Bets are owned by the repository; the orchestrator only reads snapshots.
/// Recording the last pending draw for a bettor materializes `final_score`.
#[async_trait]
pub trait BetRepository: Send + Sync {
    /// All bets submitted for the auction, with any resolved draws and
    /// scores.
    async fn list_bets(&self, auction: AuctionId) -> Result<Vec<Bet>>;

    /// Persist one resolved draw for a bettor.
    async fn record_draw(
        &self,
        auction: AuctionId,
        bettor: Address,
        draw: u64,
    ) -> Result<DrawOutcome>;
}
