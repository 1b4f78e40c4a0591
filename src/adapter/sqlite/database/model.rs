//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{randomness_requests, run_locks, settlements, transfers};

/// Database row for a settlement.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = settlements)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SettlementRow {
    pub auction_id: i64,
    pub final_price: Option<String>,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for a randomness request.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = randomness_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RequestRow {
    pub auction_id: i64,
    pub bettor: String,
    pub draw_count: i32,
    pub request_id: Option<String>,
    pub issued_at: String,
    pub confirmed_at: Option<String>,
}

/// Database row for a reward transfer.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = transfers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransferRow {
    pub auction_id: i64,
    pub bettor: String,
    pub amount: String,
    pub status: String,
    pub tx_hash: Option<String>,
    pub attempts: i32,
    pub updated_at: String,
}

/// Database row for a run lock.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = run_locks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunLockRow {
    pub auction_id: i64,
    pub holder: String,
    pub acquired_at: String,
}
