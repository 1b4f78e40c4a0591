//! Gavel - off-chain settlement orchestration for prediction-style auctions.
//!
//! Participants guess an auction's final price before it closes. Once the
//! price is known on-chain, this crate drives the settlement workflow:
//!
//! 1. shortlist the closest `ceil(N/10)` bettors by proximity,
//! 2. issue each of them one bounded verifiable-randomness request,
//! 3. wait for every draw to resolve,
//! 4. rank the shortlist by score and pay the top 3 from the reward token
//!    contract.
//!
//! The workflow is idempotent and resumable: every completed step is
//! persisted, requests and transfers are deduplicated by
//! `(auction, bettor)`, and a re-triggered run continues from the last
//! completed state.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files with env overrides
//! - [`domain`] - Settlement entities: auctions, bets, shortlist, winners
//! - [`error`] - Error types for the crate
//! - [`port`] - Trait seams for the chain, the bet backend, and the store
//! - [`adapter`] - Production adapters: alloy contract, HTTP backend, SQLite
//! - [`app`] - Coordinator, ledger, and the settlement orchestrator
//! - [`cli`] - Command-line interface (`run`, `status`)

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
