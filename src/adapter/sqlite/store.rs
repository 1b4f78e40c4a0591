//! SQLite settlement store implementation.
//!
//! Persists the settlement state machine, the randomness request log, the
//! transfer log, and the per-auction run lock. This is the source of truth
//! a resumed run reconciles against.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::warn;

use super::database::connection::DbPool;
use super::database::model::{RequestRow, RunLockRow, SettlementRow, TransferRow};
use super::database::schema::{randomness_requests, run_locks, settlements, transfers};
use crate::domain::{AuctionId, AuctionSettlement, SettlementState};
use crate::error::{Error, Result};
use crate::port::outbound::{
    RandomnessRequestId, RequestRecord, SettlementStore, TransferRecord, TransferStatus,
};

/// SQLite-backed [`SettlementStore`].
pub struct SqliteSettlementStore {
    pool: DbPool,
}

type PooledConn =
    diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>;

impl SqliteSettlementStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConn> {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    fn settlement_to_row(settlement: &AuctionSettlement) -> SettlementRow {
        SettlementRow {
            auction_id: settlement.auction_id.as_u64() as i64,
            final_price: settlement.raw_final_price().map(|p| p.to_string()),
            state: settlement.state().as_str().to_string(),
            created_at: settlement.created_at.to_rfc3339(),
            updated_at: settlement.updated_at.to_rfc3339(),
        }
    }

    fn settlement_from_row(row: SettlementRow) -> Result<AuctionSettlement> {
        let final_price = row
            .final_price
            .map(|p| p.parse::<u128>().map_err(|e| Error::Parse(e.to_string())))
            .transpose()?;
        let state = SettlementState::from_str(&row.state).map_err(Error::Parse)?;
        Ok(AuctionSettlement::restore(
            AuctionId::new(row.auction_id as u64),
            final_price,
            state,
            parse_timestamp(&row.created_at)?,
            parse_timestamp(&row.updated_at)?,
        ))
    }

    fn request_to_row(record: &RequestRecord) -> RequestRow {
        RequestRow {
            auction_id: record.auction_id.as_u64() as i64,
            bettor: record.bettor.to_string(),
            draw_count: i32::from(record.draw_count),
            request_id: record.request_id.as_ref().map(|id| id.0.clone()),
            issued_at: record.issued_at.to_rfc3339(),
            confirmed_at: record.confirmed_at.map(|t| t.to_rfc3339()),
        }
    }

    fn request_from_row(row: RequestRow) -> Result<RequestRecord> {
        Ok(RequestRecord {
            auction_id: AuctionId::new(row.auction_id as u64),
            bettor: parse_address(&row.bettor)?,
            draw_count: u8::try_from(row.draw_count)
                .map_err(|e| Error::Parse(e.to_string()))?,
            request_id: row.request_id.map(RandomnessRequestId::new),
            issued_at: parse_timestamp(&row.issued_at)?,
            confirmed_at: row.confirmed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn transfer_to_row(record: &TransferRecord) -> TransferRow {
        TransferRow {
            auction_id: record.auction_id.as_u64() as i64,
            bettor: record.bettor.to_string(),
            amount: record.amount.to_string(),
            status: record.status.as_str().to_string(),
            tx_hash: record.tx_hash.clone(),
            attempts: record.attempts as i32,
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    fn transfer_from_row(row: TransferRow) -> Result<TransferRecord> {
        Ok(TransferRecord {
            auction_id: AuctionId::new(row.auction_id as u64),
            bettor: parse_address(&row.bettor)?,
            amount: U256::from_str(&row.amount).map_err(|e| Error::Parse(e.to_string()))?,
            status: TransferStatus::from_str(&row.status).map_err(Error::Parse)?,
            tx_hash: row.tx_hash,
            attempts: row.attempts as u32,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| Error::Parse(e.to_string()))
}

#[async_trait]
impl SettlementStore for SqliteSettlementStore {
    async fn load_settlement(&self, auction: AuctionId) -> Result<Option<AuctionSettlement>> {
        let mut conn = self.conn()?;

        let row: Option<SettlementRow> = settlements::table
            .find(auction.as_u64() as i64)
            .first(&mut *conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::settlement_from_row).transpose()
    }

    async fn save_settlement(&self, settlement: &AuctionSettlement) -> Result<()> {
        let row = Self::settlement_to_row(settlement);
        let mut conn = self.conn()?;

        diesel::replace_into(settlements::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn record_request(&self, record: &RequestRecord) -> Result<bool> {
        let row = Self::request_to_row(record);
        let mut conn = self.conn()?;

        let inserted = diesel::insert_or_ignore_into(randomness_requests::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    async fn confirm_request(
        &self,
        auction: AuctionId,
        bettor: Address,
        request_id: &RandomnessRequestId,
    ) -> Result<()> {
        let mut conn = self.conn()?;

        diesel::update(
            randomness_requests::table
                .filter(randomness_requests::auction_id.eq(auction.as_u64() as i64))
                .filter(randomness_requests::bettor.eq(bettor.to_string())),
        )
        .set((
            randomness_requests::request_id.eq(Some(request_id.0.clone())),
            randomness_requests::confirmed_at.eq(Some(Utc::now().to_rfc3339())),
        ))
        .execute(&mut *conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn requests(&self, auction: AuctionId) -> Result<Vec<RequestRecord>> {
        let mut conn = self.conn()?;

        let rows: Vec<RequestRow> = randomness_requests::table
            .filter(randomness_requests::auction_id.eq(auction.as_u64() as i64))
            .load(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::request_from_row).collect()
    }

    async fn record_transfer(&self, record: &TransferRecord) -> Result<()> {
        let row = Self::transfer_to_row(record);
        let mut conn = self.conn()?;

        diesel::replace_into(transfers::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn transfers(&self, auction: AuctionId) -> Result<Vec<TransferRecord>> {
        let mut conn = self.conn()?;

        let rows: Vec<TransferRow> = transfers::table
            .filter(transfers::auction_id.eq(auction.as_u64() as i64))
            .load(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::transfer_from_row).collect()
    }

    async fn try_acquire_run_lock(
        &self,
        auction: AuctionId,
        holder: &str,
        lease: Duration,
    ) -> Result<bool> {
        let mut conn = self.conn()?;

        let existing: Option<RunLockRow> = run_locks::table
            .find(auction.as_u64() as i64)
            .first(&mut *conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        if let Some(row) = existing {
            let acquired_at = parse_timestamp(&row.acquired_at)?;
            let lease = chrono::Duration::from_std(lease)
                .unwrap_or_else(|_| chrono::Duration::max_value());
            if Utc::now() - acquired_at < lease {
                return Ok(false);
            }
            // The holder crashed or was interrupted and never released;
            // its lease is over, take the lock.
            warn!(
                auction = %auction,
                stale_holder = %row.holder,
                acquired_at = %row.acquired_at,
                "Taking over expired run lock"
            );
            diesel::delete(
                run_locks::table
                    .filter(run_locks::auction_id.eq(auction.as_u64() as i64))
                    .filter(run_locks::holder.eq(row.holder)),
            )
            .execute(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        let row = RunLockRow {
            auction_id: auction.as_u64() as i64,
            holder: holder.to_string(),
            acquired_at: Utc::now().to_rfc3339(),
        };
        let inserted = diesel::insert_or_ignore_into(run_locks::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    async fn release_run_lock(&self, auction: AuctionId, holder: &str) -> Result<()> {
        let mut conn = self.conn()?;

        diesel::delete(
            run_locks::table
                .filter(run_locks::auction_id.eq(auction.as_u64() as i64))
                .filter(run_locks::holder.eq(holder)),
        )
        .execute(&mut *conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::sqlite::database::connection::{create_pool, run_migrations};

    fn store() -> (SqliteSettlementStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("gavel-test.db");
        let pool = create_pool(db_path.to_str().unwrap()).unwrap();
        run_migrations(&pool).unwrap();
        (SqliteSettlementStore::new(pool), dir)
    }

    fn bettor(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[tokio::test]
    async fn settlement_round_trips() {
        let (store, _dir) = store();
        let auction = AuctionId::new(7);

        let mut settlement = AuctionSettlement::new(auction);
        settlement.capture_price(4200).unwrap();
        settlement.advance(SettlementState::ShortlistComputed).unwrap();
        store.save_settlement(&settlement).await.unwrap();

        let loaded = store.load_settlement(auction).await.unwrap().unwrap();
        assert_eq!(loaded.state(), SettlementState::ShortlistComputed);
        assert_eq!(loaded.final_price().unwrap(), 4200);

        assert!(store.load_settlement(AuctionId::new(8)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn request_records_insert_once() {
        let (store, _dir) = store();
        let auction = AuctionId::new(1);
        let record = RequestRecord::issued(auction, bettor(1), 10);

        assert!(store.record_request(&record).await.unwrap());
        assert!(!store.record_request(&record).await.unwrap());

        let id = RandomnessRequestId::new("req-1");
        store.confirm_request(auction, bettor(1), &id).await.unwrap();

        let requests = store.requests(auction).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_id, Some(id));
        assert!(requests[0].is_confirmed());
    }

    #[tokio::test]
    async fn transfer_log_upserts_by_key() {
        let (store, _dir) = store();
        let auction = AuctionId::new(2);

        let mut record = TransferRecord {
            auction_id: auction,
            bettor: bettor(3),
            amount: U256::from(100u64),
            status: TransferStatus::Pending,
            tx_hash: None,
            attempts: 1,
            updated_at: Utc::now(),
        };
        store.record_transfer(&record).await.unwrap();

        record.status = TransferStatus::Confirmed;
        record.tx_hash = Some("0xabc".into());
        record.attempts = 2;
        store.record_transfer(&record).await.unwrap();

        let transfers = store.transfers(auction).await.unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].status, TransferStatus::Confirmed);
        assert_eq!(transfers[0].tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(transfers[0].attempts, 2);
    }

    const LEASE: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn run_lock_is_exclusive_per_auction() {
        let (store, _dir) = store();
        let auction = AuctionId::new(3);

        assert!(store.try_acquire_run_lock(auction, "holder-a", LEASE).await.unwrap());
        assert!(!store.try_acquire_run_lock(auction, "holder-b", LEASE).await.unwrap());
        // A different auction is independent
        assert!(store
            .try_acquire_run_lock(AuctionId::new(4), "holder-b", LEASE)
            .await
            .unwrap());

        // Only the holder can release
        store.release_run_lock(auction, "holder-b").await.unwrap();
        assert!(!store.try_acquire_run_lock(auction, "holder-b", LEASE).await.unwrap());
        store.release_run_lock(auction, "holder-a").await.unwrap();
        assert!(store.try_acquire_run_lock(auction, "holder-b", LEASE).await.unwrap());
    }

    #[tokio::test]
    async fn expired_run_lock_is_taken_over() {
        let (store, _dir) = store();
        let auction = AuctionId::new(5);

        // A holder that crashed never releases; once its lease is over the
        // next run takes the lock instead of being locked out.
        assert!(store.try_acquire_run_lock(auction, "crashed", LEASE).await.unwrap());
        assert!(!store
            .try_acquire_run_lock(auction, "next-run", LEASE)
            .await
            .unwrap());
        assert!(store
            .try_acquire_run_lock(auction, "next-run", Duration::ZERO)
            .await
            .unwrap());

        // The takeover replaced the holder, so the old one cannot release.
        store.release_run_lock(auction, "crashed").await.unwrap();
        assert!(!store.try_acquire_run_lock(auction, "another", LEASE).await.unwrap());
    }
}
