//! Scriptable mock of the on-chain facade.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::AuctionId;
use crate::error::{ChainError, Result};
use crate::port::outbound::{AuctionChain, RandomnessRequestId, TransferReceipt};

#[derive(Default)]
struct ChainState {
    final_prices: HashMap<AuctionId, u128>,
    issued: Vec<(AuctionId, Address, u8)>,
    duplicate_bettors: Vec<Address>,
    /// Remaining transfer failures per bettor before a success.
    transfer_failures: HashMap<Address, u32>,
    always_fail_transfers: Vec<Address>,
    transfers: Vec<TransferReceipt>,
    next_id: u64,
}

/// In-memory [`AuctionChain`] with scriptable prices, duplicate rejections,
/// and transfer failures.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle an auction at `price`; unsettled auctions return `NotSettled`.
    pub fn settle_price(&self, auction: AuctionId, price: u128) {
        self.state.lock().final_prices.insert(auction, price);
    }

    /// Make the contract reject requests for this bettor as duplicates.
    pub fn reject_as_duplicate(&self, bettor: Address) {
        self.state.lock().duplicate_bettors.push(bettor);
    }

    /// Fail this bettor's next `count` transfer attempts, then succeed.
    pub fn fail_transfers(&self, bettor: Address, count: u32) {
        self.state.lock().transfer_failures.insert(bettor, count);
    }

    /// Fail every transfer attempt for this bettor.
    pub fn always_fail_transfers(&self, bettor: Address) {
        self.state.lock().always_fail_transfers.push(bettor);
    }

    /// All randomness requests issued so far.
    pub fn issued_requests(&self) -> Vec<(AuctionId, Address, u8)> {
        self.state.lock().issued.clone()
    }

    /// All confirmed transfers so far.
    pub fn confirmed_transfers(&self) -> Vec<TransferReceipt> {
        self.state.lock().transfers.clone()
    }
}

#[async_trait]
impl AuctionChain for MockChain {
    async fn final_price(&self, auction: AuctionId) -> Result<u128> {
        self.state
            .lock()
            .final_prices
            .get(&auction)
            .copied()
            .ok_or_else(|| ChainError::NotSettled { auction }.into())
    }

    async fn request_randoms(
        &self,
        auction: AuctionId,
        bettor: Address,
        count: u8,
    ) -> Result<RandomnessRequestId> {
        let mut state = self.state.lock();
        if state.duplicate_bettors.contains(&bettor) {
            return Err(ChainError::DuplicateRequest { auction, bettor }.into());
        }
        state.issued.push((auction, bettor, count));
        state.next_id += 1;
        Ok(RandomnessRequestId::new(format!("req-{}", state.next_id)))
    }

    async fn distribute(
        &self,
        auction: AuctionId,
        to: Address,
        amount: U256,
    ) -> Result<TransferReceipt> {
        let mut state = self.state.lock();
        if state.always_fail_transfers.contains(&to) {
            return Err(ChainError::Rpc(format!("transfer to {to} rejected")).into());
        }
        if let Some(remaining) = state.transfer_failures.get_mut(&to) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ChainError::Rpc(format!("transient failure for {to}")).into());
            }
        }
        state.next_id += 1;
        let receipt = TransferReceipt {
            tx_hash: format!("0xtx{:064x}", state.next_id),
            to,
            amount,
        };
        state.transfers.push(receipt.clone());
        let _ = auction;
        Ok(receipt)
    }
}
