//! Auction settlement entity and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Opaque identifier for one auction instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuctionId(pub u64);

impl AuctionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AuctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AuctionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Lifecycle of one settlement run, persisted between invocations.
///
/// Transitions are strictly forward; `Failed` and `RewardsDisbursed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Pending,
    ShortlistComputed,
    RandomnessRequested,
    RandomnessFulfilled,
    RewardsDisbursed,
    Failed,
}

impl SettlementState {
    /// Position in the forward progression; `Failed` sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            SettlementState::Pending => Some(0),
            SettlementState::ShortlistComputed => Some(1),
            SettlementState::RandomnessRequested => Some(2),
            SettlementState::RandomnessFulfilled => Some(3),
            SettlementState::RewardsDisbursed => Some(4),
            SettlementState::Failed => None,
        }
    }

    /// Whether `next` is a legal transition from this state.
    #[must_use]
    pub fn can_advance_to(self, next: SettlementState) -> bool {
        match (self.rank(), next.rank()) {
            // Forward by exactly one step
            (Some(from), Some(to)) => to == from + 1,
            // Any non-terminal state may fail
            (Some(from), None) => from < 4,
            (None, _) => false,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SettlementState::RewardsDisbursed | SettlementState::Failed
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SettlementState::Pending => "pending",
            SettlementState::ShortlistComputed => "shortlist_computed",
            SettlementState::RandomnessRequested => "randomness_requested",
            SettlementState::RandomnessFulfilled => "randomness_fulfilled",
            SettlementState::RewardsDisbursed => "rewards_disbursed",
            SettlementState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SettlementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SettlementState::Pending),
            "shortlist_computed" => Ok(SettlementState::ShortlistComputed),
            "randomness_requested" => Ok(SettlementState::RandomnessRequested),
            "randomness_fulfilled" => Ok(SettlementState::RandomnessFulfilled),
            "rewards_disbursed" => Ok(SettlementState::RewardsDisbursed),
            "failed" => Ok(SettlementState::Failed),
            other => Err(format!("unknown settlement state '{other}'")),
        }
    }
}

impl std::fmt::Display for SettlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One settlement per auction: the cached reference price and the current
/// position in the state machine.
///
/// The orchestrator is the only writer of `state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSettlement {
    pub auction_id: AuctionId,
    final_price: Option<u128>,
    state: SettlementState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuctionSettlement {
    /// Start a fresh settlement in `Pending`.
    #[must_use]
    pub fn new(auction_id: AuctionId) -> Self {
        let now = Utc::now();
        Self {
            auction_id,
            final_price: None,
            state: SettlementState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a settlement from persisted fields.
    #[must_use]
    pub fn restore(
        auction_id: AuctionId,
        final_price: Option<u128>,
        state: SettlementState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            auction_id,
            final_price,
            state,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn state(&self) -> SettlementState {
        self.state
    }

    #[must_use]
    pub fn raw_final_price(&self) -> Option<u128> {
        self.final_price
    }

    /// The cached reference price. Every distance computation downstream of
    /// `ShortlistComputed` must use this value, never a fresh chain read.
    pub fn final_price(&self) -> Result<u128, DomainError> {
        self.final_price.ok_or(DomainError::PriceNotCaptured {
            auction: self.auction_id,
        })
    }

    /// Capture the final price, exactly once, while `Pending`.
    pub fn capture_price(&mut self, price: u128) -> Result<(), DomainError> {
        if self.final_price.is_some() {
            return Err(DomainError::PriceAlreadyCaptured {
                auction: self.auction_id,
            });
        }
        if self.state != SettlementState::Pending {
            return Err(DomainError::InvalidTransition {
                auction: self.auction_id,
                from: self.state,
                to: self.state,
            });
        }
        self.final_price = Some(price);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Advance to the next state, rejecting anything but a single forward
    /// step (or a failure from a non-terminal state).
    pub fn advance(&mut self, next: SettlementState) -> Result<(), DomainError> {
        if !self.state.can_advance_to(next) {
            return Err(DomainError::InvalidTransition {
                auction: self.auction_id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
