use thiserror::Error;

use alloy_primitives::Address;

use crate::domain::error::DomainError;
use crate::domain::AuctionId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors from the on-chain facade (price oracle, randomness, token transfers).
#[derive(Error, Debug)]
pub enum ChainError {
    /// The auction has not closed on-chain yet; no final price exists.
    #[error("auction {auction} is not settled on-chain")]
    NotSettled { auction: AuctionId },

    /// The contract already holds a randomness request for this bettor.
    /// Benign under the idempotency key; callers treat it as success.
    #[error("randomness already requested for {bettor} in auction {auction}")]
    DuplicateRequest { auction: AuctionId, bettor: Address },

    #[error("contract call failed: {0}")]
    Rpc(String),

    #[error("transaction receipt unavailable: {0}")]
    Receipt(String),
}

/// Errors raised while driving a settlement run.
#[derive(Error, Debug)]
pub enum SettlementError {
    /// A precondition for the current step does not hold (e.g. empty bet
    /// list). The run aborts; state stays at the last completed step.
    #[error("precondition failed for auction {auction}: {reason}")]
    Precondition { auction: AuctionId, reason: String },

    /// Not every shortlisted bettor resolved within the configured window.
    /// The settlement is aborted; partial fairness is disallowed.
    #[error("fulfillment timed out for auction {auction}: {pending} bettors still pending")]
    FulfillmentTimeout { auction: AuctionId, pending: usize },

    /// Every winner's transfer exhausted its retry budget.
    #[error("all {winners} reward transfers failed for auction {auction}")]
    TransfersExhausted { auction: AuctionId, winners: usize },

    /// Persisted state contradicts on-chain or repository observations.
    /// Fatal; requires manual reconciliation.
    #[error("inconsistent state for auction {auction}: {detail}")]
    InconsistentState { auction: AuctionId, detail: String },

    /// Another run currently holds the per-auction lock.
    #[error("another settlement run is active for auction {auction}")]
    RunLockHeld { auction: AuctionId },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code per the operational contract: 2 for a fulfillment
    /// timeout (the trigger layer may retry), 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Settlement(SettlementError::FulfillmentTimeout { .. }) => 2,
            _ => 1,
        }
    }
}
