//! On-chain facade port: price oracle, randomness requests, token transfers.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::domain::AuctionId;
use crate::error::Result;

/// Opaque identifier for one issued randomness request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomnessRequestId(pub String);

impl RandomnessRequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RandomnessRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmation of one reward transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub to: Address,
    pub amount: U256,
}

/// Contract calls the settlement workflow depends on.
///
/// Signing and broadcasting are the adapter's concern; callers see a
/// submit-and-confirm interface.
#[async_trait]
pub trait AuctionChain: Send + Sync {
    /// The settled reference price for the auction.
    ///
    /// Fails with [`ChainError::NotSettled`](crate::error::ChainError::NotSettled)
    /// until the auction has closed on-chain.
    async fn final_price(&self, auction: AuctionId) -> Result<u128>;

    /// Issue one randomness request covering `count` draws for a bettor.
    ///
    /// Fails with [`ChainError::DuplicateRequest`](crate::error::ChainError::DuplicateRequest)
    /// when the contract already holds a request for this `(auction, bettor)`.
    async fn request_randoms(
        &self,
        auction: AuctionId,
        bettor: Address,
        count: u8,
    ) -> Result<RandomnessRequestId>;

    /// Transfer the reward token to a winner and wait for confirmation.
    async fn distribute(
        &self,
        auction: AuctionId,
        to: Address,
        amount: U256,
    ) -> Result<TransferReceipt>;
}
