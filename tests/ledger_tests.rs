//! Reward disbursement idempotency and retry behavior.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use chrono::Utc;
use gavel::app::RewardLedger;
use gavel::domain::{AuctionId, Bet};
use gavel::port::outbound::{SettlementStore, TransferRecord, TransferStatus};
use gavel::testkit::domain::{addr, scored_bet};
use gavel::testkit::{InMemorySettlementStore, MockChain};

struct Harness {
    chain: Arc<MockChain>,
    store: Arc<InMemorySettlementStore>,
    ledger: RewardLedger,
}

fn harness(max_attempts: u32) -> Harness {
    let chain = Arc::new(MockChain::new());
    let store = Arc::new(InMemorySettlementStore::new());
    let ledger = RewardLedger::new(
        chain.clone(),
        store.clone(),
        max_attempts,
        Duration::from_millis(10),
    );
    Harness {
        chain,
        store,
        ledger,
    }
}

fn winners() -> Vec<Bet> {
    vec![
        scored_bet(1, 100, 1, 900),
        scored_bet(2, 101, 2, 800),
        scored_bet(3, 102, 3, 700),
    ]
}

const AMOUNT: U256 = U256::from_limbs([100, 0, 0, 0]);

#[tokio::test]
async fn pays_each_winner_exactly_once() {
    let auction = AuctionId::new(1);
    let h = harness(3);
    let winners = winners();

    let first = h.ledger.disburse(auction, &winners, AMOUNT).await.unwrap();
    assert_eq!(first.receipts.len(), 3);
    assert!(first.failed.is_empty());

    let second = h.ledger.disburse(auction, &winners, AMOUNT).await.unwrap();
    assert!(second.receipts.is_empty());
    assert_eq!(second.already_confirmed.len(), 3);
    assert_eq!(second.confirmed_total(), 3);

    assert_eq!(h.chain.confirmed_transfers().len(), 3);
}

#[tokio::test]
async fn resumes_a_partial_disbursement() {
    let auction = AuctionId::new(2);
    let h = harness(3);

    // A prior pass already paid the first winner.
    h.store
        .record_transfer(&TransferRecord {
            auction_id: auction,
            bettor: addr(1),
            amount: AMOUNT,
            status: TransferStatus::Confirmed,
            tx_hash: Some("0xprior".into()),
            attempts: 1,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let report = h.ledger.disburse(auction, &winners(), AMOUNT).await.unwrap();

    assert_eq!(report.already_confirmed, vec![addr(1)]);
    assert_eq!(report.receipts.len(), 2);
    let sent: Vec<_> = h.chain.confirmed_transfers().iter().map(|t| t.to).collect();
    assert_eq!(sent.len(), 2);
    assert!(!sent.contains(&addr(1)));
}

#[tokio::test(start_paused = true)]
async fn retries_transient_failures_with_backoff() {
    let auction = AuctionId::new(3);
    let h = harness(3);
    h.chain.fail_transfers(addr(2), 2);

    let report = h.ledger.disburse(auction, &winners(), AMOUNT).await.unwrap();

    assert_eq!(report.receipts.len(), 3);
    assert!(report.failed.is_empty());

    let transfers = h.store.transfers(auction).await.unwrap();
    let retried = transfers.iter().find(|t| t.bettor == addr(2)).unwrap();
    assert_eq!(retried.status, TransferStatus::Confirmed);
    assert_eq!(retried.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_winner_is_marked_failed_without_blocking_others() {
    let auction = AuctionId::new(4);
    let h = harness(3);
    h.chain.always_fail_transfers(addr(2));

    let report = h.ledger.disburse(auction, &winners(), AMOUNT).await.unwrap();

    assert_eq!(report.receipts.len(), 2);
    assert_eq!(report.failed, vec![addr(2)]);

    let transfers = h.store.transfers(auction).await.unwrap();
    let failed = transfers.iter().find(|t| t.bettor == addr(2)).unwrap();
    assert_eq!(failed.status, TransferStatus::Failed);
    assert_eq!(failed.attempts, 3);
    assert!(failed.tx_hash.is_none());
}
