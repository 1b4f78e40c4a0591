//! Handler for the `status` command.

use crate::adapter::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::sqlite::SqliteSettlementStore;
use crate::config::Config;
use crate::domain::AuctionId;
use crate::error::Result;
use crate::port::outbound::{SettlementStore, TransferStatus};

/// Report the persisted settlement state for one auction.
pub async fn execute(config: &Config, auction: AuctionId) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!("gavel v{version}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Auction:     {auction}");

    if !config.database.path.exists() {
        println!("State:       no settlement run recorded");
        println!();
        println!("Database not found ({:?}).", config.database.path);
        println!("Run 'gavel run --auction {auction}' to start a settlement.");
        println!();
        return Ok(());
    }

    let pool = create_pool(&config.database.path.to_string_lossy())?;
    run_migrations(&pool)?;
    let store = SqliteSettlementStore::new(pool);

    match store.load_settlement(auction).await? {
        Some(settlement) => {
            println!("State:       {}", settlement.state());
            match settlement.raw_final_price() {
                Some(price) => println!("Final price: {price}"),
                None => println!("Final price: not captured"),
            }

            let requests = store.requests(auction).await?;
            let confirmed_requests = requests.iter().filter(|r| r.is_confirmed()).count();
            println!(
                "Requests:    {confirmed_requests} confirmed / {} recorded",
                requests.len()
            );

            let transfers = store.transfers(auction).await?;
            let confirmed = transfers
                .iter()
                .filter(|t| t.status == TransferStatus::Confirmed)
                .count();
            let failed = transfers
                .iter()
                .filter(|t| t.status == TransferStatus::Failed)
                .count();
            println!("Transfers:   {confirmed} confirmed, {failed} failed");
            println!("Updated:     {}", settlement.updated_at.to_rfc3339());
        }
        None => {
            println!("State:       no settlement run recorded");
        }
    }

    println!();
    Ok(())
}
