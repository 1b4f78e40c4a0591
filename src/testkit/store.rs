//! In-memory settlement store.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{AuctionId, AuctionSettlement};
use crate::error::Result;
use crate::port::outbound::{
    RandomnessRequestId, RequestRecord, SettlementStore, TransferRecord,
};

#[derive(Default)]
struct StoreState {
    settlements: HashMap<AuctionId, AuctionSettlement>,
    requests: HashMap<(AuctionId, Address), RequestRecord>,
    transfers: HashMap<(AuctionId, Address), TransferRecord>,
    locks: HashMap<AuctionId, (String, DateTime<Utc>)>,
}

/// In-memory [`SettlementStore`] with the same idempotency semantics as the
/// SQLite adapter.
#[derive(Default)]
pub struct InMemorySettlementStore {
    state: Mutex<StoreState>,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lock holder, if any.
    pub fn lock_holder(&self, auction: AuctionId) -> Option<String> {
        self.state
            .lock()
            .locks
            .get(&auction)
            .map(|(holder, _)| holder.clone())
    }

    /// Age an existing lock, as if its holder acquired it `age` ago and
    /// then crashed without releasing.
    pub fn backdate_lock(&self, auction: AuctionId, age: chrono::Duration) {
        if let Some((_, acquired_at)) = self.state.lock().locks.get_mut(&auction) {
            *acquired_at -= age;
        }
    }
}

#[async_trait]
impl SettlementStore for InMemorySettlementStore {
    async fn load_settlement(&self, auction: AuctionId) -> Result<Option<AuctionSettlement>> {
        Ok(self.state.lock().settlements.get(&auction).cloned())
    }

    async fn save_settlement(&self, settlement: &AuctionSettlement) -> Result<()> {
        self.state
            .lock()
            .settlements
            .insert(settlement.auction_id, settlement.clone());
        Ok(())
    }

    async fn record_request(&self, record: &RequestRecord) -> Result<bool> {
        let mut state = self.state.lock();
        let key = (record.auction_id, record.bettor);
        if state.requests.contains_key(&key) {
            return Ok(false);
        }
        state.requests.insert(key, record.clone());
        Ok(true)
    }

    async fn confirm_request(
        &self,
        auction: AuctionId,
        bettor: Address,
        request_id: &RandomnessRequestId,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(record) = state.requests.get_mut(&(auction, bettor)) {
            record.request_id = Some(request_id.clone());
            record.confirmed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn requests(&self, auction: AuctionId) -> Result<Vec<RequestRecord>> {
        Ok(self
            .state
            .lock()
            .requests
            .values()
            .filter(|r| r.auction_id == auction)
            .cloned()
            .collect())
    }

    async fn record_transfer(&self, record: &TransferRecord) -> Result<()> {
        self.state
            .lock()
            .transfers
            .insert((record.auction_id, record.bettor), record.clone());
        Ok(())
    }

    async fn transfers(&self, auction: AuctionId) -> Result<Vec<TransferRecord>> {
        Ok(self
            .state
            .lock()
            .transfers
            .values()
            .filter(|t| t.auction_id == auction)
            .cloned()
            .collect())
    }

    async fn try_acquire_run_lock(
        &self,
        auction: AuctionId,
        holder: &str,
        lease: Duration,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        if let Some((_, acquired_at)) = state.locks.get(&auction) {
            let lease = chrono::Duration::from_std(lease)
                .unwrap_or_else(|_| chrono::Duration::max_value());
            if Utc::now() - *acquired_at < lease {
                return Ok(false);
            }
        }
        state.locks.insert(auction, (holder.to_string(), Utc::now()));
        Ok(true)
    }

    async fn release_run_lock(&self, auction: AuctionId, holder: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state
            .locks
            .get(&auction)
            .is_some_and(|(h, _)| h == holder)
        {
            state.locks.remove(&auction);
        }
        Ok(())
    }
}
