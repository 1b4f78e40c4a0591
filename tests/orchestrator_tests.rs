//! End-to-end settlement runs against in-memory adapters.

mod support;

use alloy_primitives::U256;
use gavel::app::SettlementOrchestrator;
use gavel::domain::{AuctionId, AuctionSettlement, SettlementState};
use gavel::error::{Error, SettlementError};
use gavel::port::outbound::{SettlementStore, TransferStatus};
use gavel::testkit::domain::addr;

use support::{settlement_config, Fixture};

fn orchestrator(fixture: &Fixture) -> SettlementOrchestrator {
    SettlementOrchestrator::new(
        fixture.bets.clone(),
        fixture.chain.clone(),
        fixture.store.clone(),
        settlement_config(),
    )
}

#[tokio::test]
async fn full_run_pays_top_three_of_shortlist() {
    let auction = AuctionId::new(7);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    let report = orchestrator(&fixture).settle(auction).await.unwrap();

    assert_eq!(report.initial_state, SettlementState::Pending);
    assert_eq!(report.final_state, SettlementState::RewardsDisbursed);
    assert_eq!(report.transfers_confirmed, 3);
    assert_eq!(report.transfers_failed, 0);

    // ceil(100 / 10) = 10 shortlisted bettors, one bounded request each.
    let issued = fixture.chain.issued_requests();
    assert_eq!(issued.len(), 10);
    assert!(issued.iter().all(|(a, _, count)| *a == auction && *count == 10));

    // Scores are 10 * predicted_price, so the three highest guesses inside
    // the shortlist (54, 53, 52) win. Bettor n guessed n - 1.
    let transfers = fixture.chain.confirmed_transfers();
    assert_eq!(transfers.len(), 3);
    let recipients: Vec<_> = transfers.iter().map(|t| t.to).collect();
    assert!(recipients.contains(&addr(55)));
    assert!(recipients.contains(&addr(54)));
    assert!(recipients.contains(&addr(53)));
    assert!(transfers.iter().all(|t| t.amount == U256::from(100)));

    let settlement = fixture.store.load_settlement(auction).await.unwrap().unwrap();
    assert_eq!(settlement.state(), SettlementState::RewardsDisbursed);
    assert_eq!(settlement.raw_final_price(), Some(50));

    // The run lock is released once the run completes.
    assert!(fixture.store.lock_holder(auction).is_none());
}

#[tokio::test(start_paused = true)]
async fn fulfillment_timeout_fails_settlement_without_transfers() {
    let auction = AuctionId::new(8);
    let fixture = Fixture::new();
    fixture.chain.settle_price(auction, 50);
    let bets = support::hundred_bets();
    fixture.bets.insert_bets(auction, bets.clone());

    // Two of the ten shortlisted bettors (guesses 45 and 46) never resolve.
    for bet in &bets {
        if bet.predicted_price == 45 || bet.predicted_price == 46 {
            continue;
        }
        fixture
            .bets
            .fulfill(auction, bet.bettor, vec![10 * bet.predicted_price as u64]);
    }

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::FulfillmentTimeout { pending: 2, .. })
    ));
    assert_eq!(err.exit_code(), 2);

    let settlement = fixture.store.load_settlement(auction).await.unwrap().unwrap();
    assert_eq!(settlement.state(), SettlementState::Failed);
    assert!(fixture.chain.confirmed_transfers().is_empty());
    assert!(fixture.store.lock_holder(auction).is_none());
}

#[tokio::test]
async fn resumes_from_persisted_state_without_redoing_steps() {
    let auction = AuctionId::new(9);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    // Simulate a prior run that crashed right after fulfillment was
    // observed: price captured, state persisted, draws resolved.
    let mut settlement = AuctionSettlement::new(auction);
    settlement.capture_price(50).unwrap();
    settlement.advance(SettlementState::ShortlistComputed).unwrap();
    settlement.advance(SettlementState::RandomnessRequested).unwrap();
    settlement.advance(SettlementState::RandomnessFulfilled).unwrap();
    fixture.store.save_settlement(&settlement).await.unwrap();

    let report = orchestrator(&fixture).settle(auction).await.unwrap();

    assert_eq!(report.initial_state, SettlementState::RandomnessFulfilled);
    assert_eq!(report.final_state, SettlementState::RewardsDisbursed);
    // Earlier steps are not replayed: no randomness requests were issued.
    assert!(fixture.chain.issued_requests().is_empty());
    assert_eq!(fixture.chain.confirmed_transfers().len(), 3);
}

#[tokio::test]
async fn rerun_after_disbursement_is_a_noop() {
    let auction = AuctionId::new(10);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    let orchestrator = orchestrator(&fixture);
    orchestrator.settle(auction).await.unwrap();
    let report = orchestrator.settle(auction).await.unwrap();

    assert_eq!(report.initial_state, SettlementState::RewardsDisbursed);
    assert_eq!(report.final_state, SettlementState::RewardsDisbursed);
    // Still only the original three transfers.
    assert_eq!(fixture.chain.confirmed_transfers().len(), 3);
}

#[tokio::test]
async fn previously_failed_settlement_is_terminal() {
    let auction = AuctionId::new(11);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    let mut settlement = AuctionSettlement::new(auction);
    settlement.advance(SettlementState::Failed).unwrap();
    fixture.store.save_settlement(&settlement).await.unwrap();

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::Precondition { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(fixture.chain.issued_requests().is_empty());
}

#[tokio::test]
async fn concurrent_run_is_rejected_by_the_lock() {
    let auction = AuctionId::new(12);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    assert!(fixture
        .store
        .try_acquire_run_lock(auction, "other-run", std::time::Duration::from_secs(60))
        .await
        .unwrap());

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::RunLockHeld { .. })
    ));

    // No side effects, and the competing holder keeps the lock.
    assert!(fixture.chain.issued_requests().is_empty());
    assert_eq!(
        fixture.store.lock_holder(auction).as_deref(),
        Some("other-run")
    );
}

#[tokio::test]
async fn expired_lock_from_interrupted_run_does_not_block_resume() {
    let auction = AuctionId::new(17);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);

    // A prior run was interrupted mid-settlement (crash or Ctrl-C) and
    // never released its lock. Once the lease is over, the next trigger
    // must take over and finish the settlement.
    assert!(fixture
        .store
        .try_acquire_run_lock(auction, "interrupted-run", std::time::Duration::from_secs(60))
        .await
        .unwrap());
    fixture.store.backdate_lock(auction, chrono::Duration::hours(2));

    let report = orchestrator(&fixture).settle(auction).await.unwrap();
    assert_eq!(report.final_state, SettlementState::RewardsDisbursed);
    assert_eq!(fixture.chain.confirmed_transfers().len(), 3);
    assert!(fixture.store.lock_holder(auction).is_none());
}

#[tokio::test]
async fn unsettled_auction_leaves_state_pending() {
    let auction = AuctionId::new(13);
    let fixture = Fixture::new();
    fixture.bets.insert_bets(auction, support::hundred_bets());

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::Precondition { .. })
    ));

    // Retriable: a later trigger picks up from Pending.
    let settlement = fixture.store.load_settlement(auction).await.unwrap().unwrap();
    assert_eq!(settlement.state(), SettlementState::Pending);
    assert_eq!(settlement.raw_final_price(), None);
}

#[tokio::test]
async fn settled_auction_without_bets_fails_terminally() {
    let auction = AuctionId::new(14);
    let fixture = Fixture::new();
    fixture.chain.settle_price(auction, 50);

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::Precondition { .. })
    ));

    let settlement = fixture.store.load_settlement(auction).await.unwrap().unwrap();
    assert_eq!(settlement.state(), SettlementState::Failed);
}

#[tokio::test(start_paused = true)]
async fn all_transfers_failing_fails_the_settlement() {
    let auction = AuctionId::new(15);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);
    for n in [55, 54, 53] {
        fixture.chain.always_fail_transfers(addr(n));
    }

    let err = orchestrator(&fixture).settle(auction).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Settlement(SettlementError::TransfersExhausted { winners: 3, .. })
    ));

    let settlement = fixture.store.load_settlement(auction).await.unwrap().unwrap();
    assert_eq!(settlement.state(), SettlementState::Failed);
    assert!(fixture.chain.confirmed_transfers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn single_exhausted_transfer_does_not_block_the_others() {
    let auction = AuctionId::new(16);
    let fixture = Fixture::new();
    fixture.seed_settled_hundred(auction, 50);
    fixture.chain.always_fail_transfers(addr(54));

    let report = orchestrator(&fixture).settle(auction).await.unwrap();

    assert_eq!(report.final_state, SettlementState::RewardsDisbursed);
    assert_eq!(report.transfers_confirmed, 2);
    assert_eq!(report.transfers_failed, 1);

    let transfers = fixture.store.transfers(auction).await.unwrap();
    let failed: Vec<_> = transfers
        .iter()
        .filter(|t| t.status == TransferStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].bettor, addr(54));
}
