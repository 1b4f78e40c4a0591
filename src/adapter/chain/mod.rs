//! Alloy adapter for the auction contract.
//!
//! Wraps the three contract entry points the settlement workflow uses:
//! the final price read, per-bettor randomness requests, and reward token
//! transfers. Signing uses the admin key from the environment; transactions
//! are submitted and awaited to receipt.

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use alloy_provider::network::EthereumWallet;
use alloy_provider::ProviderBuilder;
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::AuctionId;
use crate::error::{ChainError, ConfigError, Result};
use crate::port::outbound::{AuctionChain, RandomnessRequestId, TransferReceipt};

sol! {
    #[sol(rpc)]
    contract AuctionBetting {
        function getAuctionFinalPrice(uint64 auctionId) external view returns (uint256);
        function requestRandomsForUser(uint64 auctionId, address user, uint8 count) external returns (uint256);
        function distributeAuctionToken(uint64 auctionId, address to, uint256 amount) external returns (bool);
    }
}

/// [`AuctionChain`] backed by the deployed auction contract.
#[derive(Debug)]
pub struct AlloyAuctionChain {
    signer: PrivateKeySigner,
    contract_address: Address,
    rpc_url: url::Url,
}

impl AlloyAuctionChain {
    /// Build the chain facade from config; requires `GAVEL_PRIVATE_KEY`.
    pub fn new(config: &Config) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(config.private_key()?)
            .map_err(|e| ConfigError::InvalidValue {
                field: "GAVEL_PRIVATE_KEY",
                reason: e.to_string(),
            })?
            .with_chain_id(Some(config.chain.chain_id));

        Ok(Self {
            signer,
            contract_address: config.contract_address()?,
            rpc_url: url::Url::parse(&config.chain.rpc_url)?,
        })
    }

    /// Admin wallet address used for all settlement transactions.
    #[must_use]
    pub fn admin_address(&self) -> Address {
        self.signer.address()
    }

}

#[async_trait]
impl AuctionChain for AlloyAuctionChain {
    async fn final_price(&self, auction: AuctionId) -> Result<u128> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let contract = AuctionBetting::new(self.contract_address, &provider);

        let price: U256 = contract
            .getAuctionFinalPrice(auction.as_u64())
            .call()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("not settled") {
                    crate::error::Error::from(ChainError::NotSettled { auction })
                } else {
                    ChainError::Rpc(msg).into()
                }
            })?;

        // The contract reports zero until the auction closes.
        if price.is_zero() {
            return Err(ChainError::NotSettled { auction }.into());
        }

        let price = u128::try_from(price)
            .map_err(|_| ChainError::Rpc(format!("final price {price} exceeds u128")))?;
        debug!(auction = %auction, price, "Read final auction price");
        Ok(price)
    }

    async fn request_randoms(
        &self,
        auction: AuctionId,
        bettor: Address,
        count: u8,
    ) -> Result<RandomnessRequestId> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone());
        let contract = AuctionBetting::new(self.contract_address, &provider);

        let pending_tx = contract
            .requestRandomsForUser(auction.as_u64(), bettor, count)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("already requested") {
                    crate::error::Error::from(ChainError::DuplicateRequest { auction, bettor })
                } else {
                    ChainError::Rpc(msg).into()
                }
            })?;

        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| ChainError::Receipt(e.to_string()))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        info!(
            auction = %auction,
            bettor = %bettor,
            count,
            tx_hash = %tx_hash,
            "Randomness request confirmed"
        );
        Ok(RandomnessRequestId::new(tx_hash))
    }

    async fn distribute(
        &self,
        auction: AuctionId,
        to: Address,
        amount: U256,
    ) -> Result<TransferReceipt> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone());
        let contract = AuctionBetting::new(self.contract_address, &provider);

        let pending_tx = contract
            .distributeAuctionToken(auction.as_u64(), to, amount)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| ChainError::Receipt(e.to_string()))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        info!(auction = %auction, to = %to, tx_hash = %tx_hash, "Reward transfer confirmed");

        Ok(TransferReceipt {
            tx_hash,
            to,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> Config {
        let toml_str = concat!(
            "[chain]\n",
            "rpc_url = \"http://localhost:8545\"\n",
            "contract_address = \"0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E\"\n",
            "chain_id = 31337\n",
            "\n",
            "[backend]\n",
            "base_url = \"http://localhost:3000\"\n",
            "\n",
            "[settlement]\n",
            "reward_per_winner = 100\n",
        );
        let mut config: Config = toml::from_str(toml_str).unwrap();
        config.chain.private_key = key.map(str::to_string);
        config
    }

    #[test]
    fn derives_admin_address_from_signer_key() {
        // Well-known local devnet key
        let config = config_with_key(Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        ));
        let chain = AlloyAuctionChain::new(&config).unwrap();
        assert_eq!(
            chain.admin_address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn missing_signer_key_is_reported_by_name() {
        let config = config_with_key(None);
        let err = AlloyAuctionChain::new(&config).unwrap_err();
        assert!(err.to_string().contains("GAVEL_PRIVATE_KEY"));
    }
}
