//! SQLite adapter for the durable settlement store.

pub mod database;
mod store;

pub use store::SqliteSettlementStore;
