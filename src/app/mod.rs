//! Settlement workflow: randomness coordination, reward disbursement, and
//! the orchestrator that drives them.

mod coordinator;
mod ledger;
mod orchestrator;

pub use coordinator::{FulfillmentOutcome, RandomnessCoordinator};
pub use ledger::{DisbursementReport, RewardLedger};
pub use orchestrator::{SettlementOrchestrator, SettlementReport};
