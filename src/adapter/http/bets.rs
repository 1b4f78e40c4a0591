//! Backend bet store client.
//!
//! Reads bets from `GET /bets?auctionId=...` and records oracle draws via
//! `POST /draws`. Payloads are validated at this boundary before they become
//! domain [`Bet`]s.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;
use crate::domain::{AuctionId, Bet, DomainError, ScorePolicy};
use crate::error::{Error, Result};
use crate::port::outbound::{BetRepository, DrawOutcome};

/// Wire format of one bet from the backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetDto {
    address: String,
    predicted_price: u128,
    submitted_at: u64,
    #[serde(default)]
    randomness_draws: Vec<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawDto {
    auction_id: u64,
    address: String,
    draw: u64,
}

/// [`BetRepository`] backed by the bet submission backend.
pub struct HttpBetRepository {
    client: reqwest::Client,
    base_url: url::Url,
    policy: ScorePolicy,
    draws_per_bettor: u8,
}

impl HttpBetRepository {
    pub fn new(config: &BackendConfig, policy: ScorePolicy, draws_per_bettor: u8) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: url::Url::parse(&config.base_url)?,
            policy,
            draws_per_bettor,
        })
    }

    fn to_bet(&self, dto: BetDto) -> Result<Bet> {
        let bettor = Address::from_str(&dto.address).map_err(|e| DomainError::InvalidAddress {
            raw: dto.address.clone(),
            reason: e.to_string(),
        })?;
        // The score materializes only once every requested draw resolved.
        let final_score = if dto.randomness_draws.len() >= self.draws_per_bettor as usize {
            self.policy.score(&dto.randomness_draws)
        } else {
            None
        };
        Bet::try_new(
            bettor,
            dto.predicted_price,
            dto.submitted_at,
            dto.randomness_draws,
            final_score,
        )
        .map_err(Error::from)
    }
}

/// Maps a draw recording status to its outcome. Success statuses the
/// backend does not produce (a bare 204, say) map to `None` so the
/// caller can reject them instead of guessing.
fn draw_outcome(status: StatusCode) -> Option<DrawOutcome> {
    match status {
        StatusCode::OK | StatusCode::CREATED => Some(DrawOutcome::Recorded),
        StatusCode::CONFLICT => Some(DrawOutcome::AlreadyRecorded),
        StatusCode::NOT_FOUND => Some(DrawOutcome::NotRequested),
        _ => None,
    }
}

#[async_trait]
impl BetRepository for HttpBetRepository {
    async fn list_bets(&self, auction: AuctionId) -> Result<Vec<Bet>> {
        let url = self.base_url.join("bets")?;
        let dtos: Vec<BetDto> = self
            .client
            .get(url)
            .query(&[("auctionId", auction.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(auction = %auction, count = dtos.len(), "Fetched bets from backend");
        dtos.into_iter().map(|dto| self.to_bet(dto)).collect()
    }

    async fn record_draw(
        &self,
        auction: AuctionId,
        bettor: Address,
        draw: u64,
    ) -> Result<DrawOutcome> {
        let url = self.base_url.join("draws")?;
        let response = self
            .client
            .post(url)
            .json(&DrawDto {
                auction_id: auction.as_u64(),
                address: bettor.to_string(),
                draw,
            })
            .send()
            .await?;

        let status = response.status();
        match draw_outcome(status) {
            Some(outcome) => Ok(outcome),
            None => {
                response.error_for_status()?;
                Err(Error::Parse(format!(
                    "unexpected status {status} recording draw"
                )))
            }
        }
    }
}
