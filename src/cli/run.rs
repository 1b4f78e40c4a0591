//! Handler for the `run` command.

use std::sync::Arc;

use tracing::info;

use crate::adapter::chain::AlloyAuctionChain;
use crate::adapter::http::HttpBetRepository;
use crate::adapter::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::sqlite::SqliteSettlementStore;
use crate::app::{SettlementOrchestrator, SettlementReport};
use crate::config::Config;
use crate::domain::AuctionId;
use crate::error::Result;

/// Wire the production adapters and drive the settlement run.
pub async fn execute(config: &Config, auction: AuctionId) -> Result<SettlementReport> {
    let pool = create_pool(&config.database.path.to_string_lossy())?;
    run_migrations(&pool)?;

    let store = Arc::new(SqliteSettlementStore::new(pool));
    let bets = Arc::new(HttpBetRepository::new(
        &config.backend,
        config.settlement.score_policy,
        config.settlement.draws_per_bettor,
    )?);
    let chain = Arc::new(AlloyAuctionChain::new(config)?);

    info!(
        auction = %auction,
        admin = %chain.admin_address(),
        contract = %config.chain.contract_address,
        "Settlement run configured"
    );

    let orchestrator =
        SettlementOrchestrator::new(bets, chain, store, config.settlement.clone());

    let report = orchestrator.settle(auction).await?;
    info!(
        auction = %auction,
        from = %report.initial_state,
        to = %report.final_state,
        transfers_confirmed = report.transfers_confirmed,
        transfers_failed = report.transfers_failed,
        "Settlement run finished"
    );
    Ok(report)
}
