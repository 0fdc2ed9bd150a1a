//! Lending Pool Client
//!
//! Builds ready-to-sign transactions for a lending pool and its periphery
//! (native-asset gateway, collateral swap and repay adapters, flash
//! liquidations) and reads governance proposals together with their IPFS
//! metadata.
//!
//! Builders never sign or send anything. Each operation validates its request,
//! performs the chain reads it needs and returns an ordered list of
//! [`TransactionIntent`]s: any token approval first, then the action itself.
//! Every intent can populate its own transaction request and gas estimate.
//!
//! # Features
//!
//! - **Pool actions**: deposit, supply, withdraw, borrow, repay (plain, with
//!   permit or with aTokens), rate mode switch, collateral toggle, e-mode
//! - **Liquidations**: direct liquidation calls and flash-loan liquidations
//! - **Adapters**: collateral swaps and repay-with-collateral, with or without
//!   flash loans
//! - **Governance**: votes, proposal listing with cached IPFS metadata, voting
//!   power reads
//! - **Transport**: JSON-RPC client with exponential backoff for transient
//!   network errors
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lendpool_client::{ClientConfig, LendingClient, ProtocolAddresses, SupplyRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     lendpool_client::init_tracing();
//!
//!     let addresses = ProtocolAddresses::default()
//!         .with_pool("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2".parse()?);
//!     let client = LendingClient::new(ClientConfig::mainnet().with_addresses(addresses))?;
//!
//!     let intents = client
//!         .pool()
//!         .supply(SupplyRequest {
//!             user: "0x0000000000000000000000000000000000000001".to_string(),
//!             reserve: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
//!             amount: "100".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     for intent in &intents {
//!         println!("{} -> {:?}", intent.kind, intent.to);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod abi;
pub mod adapters;
pub mod amount;
pub mod config;
pub mod debt_token;
pub mod erc20;
pub mod error;
pub mod funds;
pub mod gateway;
pub mod governance;
pub mod metadata;
pub mod pool;
pub mod proposal;
pub mod provider;
pub mod requests;
pub mod retry;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, Network, ProtocolAddresses};
pub use error::{ClientError, Result};
pub use funds::{FundsValidator, SynthetixFundsValidator};
pub use governance::{GovernanceService, TokenPower, Vote};
pub use metadata::{MetadataCache, MetadataFetcher, ProposalMetadata};
pub use pool::Pool;
pub use proposal::{parse_proposal, ProposalRecord, ProposalState, RawProposal};
pub use provider::ChainProvider;
pub use requests::*;
pub use retry::RetryStrategy;
pub use rpc::RpcClient;
pub use transaction::{SubmitOptions, TransactionManager};
pub use types::{
    GasEstimate, InterestRate, PermitSignature, ProtocolAction, TransactionIntent,
    TransactionKind, NATIVE_ASSET_ADDRESS,
};

use std::sync::Arc;
use tracing::info;

/// Install a `tracing` subscriber honouring `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Pool builder, governance service and submitter wired from one configuration
#[derive(Clone)]
pub struct LendingClient {
    rpc: Arc<RpcClient>,
    pool: Pool,
    governance: GovernanceService,
    transaction_manager: TransactionManager,
    config: Arc<ClientConfig>,
}

impl LendingClient {
    /// Create a client over JSON-RPC
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing lending client for network {:?} (chain {})",
            config.network, config.chain_id
        );

        let rpc = Arc::new(RpcClient::new(&config)?);
        let provider: Arc<dyn ChainProvider> = rpc.clone();
        let metadata = MetadataFetcher::new(&config.ipfs_gateway_url, config.request_timeout)?;

        Ok(Self {
            pool: Pool::new(provider.clone(), config.addresses.clone()),
            governance: GovernanceService::new(provider.clone(), &config.addresses, metadata),
            transaction_manager: TransactionManager::new(provider),
            rpc,
            config: Arc::new(config),
        })
    }

    /// Pool transaction builder
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Governance service
    pub fn governance(&self) -> &GovernanceService {
        &self.governance
    }

    /// Transaction submitter
    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transaction_manager
    }

    /// JSON-RPC client
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Send a batch of intents in order
    pub async fn submit(&self, intents: &[TransactionIntent]) -> Result<Vec<ethers::types::H256>> {
        self.transaction_manager
            .submit_intents(intents, &SubmitOptions::default())
            .await
    }

    /// Check that the node answers and serves the configured chain
    pub async fn health_check(&self) -> Result<bool> {
        self.rpc.health_check(self.config.chain_id).await
    }

    /// Get configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lending_client_creation() {
        let config = ClientConfig::sepolia().with_request_timeout(Duration::from_secs(10));
        let client = LendingClient::new(config).unwrap();
        assert_eq!(client.config().chain_id, 11_155_111);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ClientConfig::mainnet();
        config.rpc_url = String::new();

        assert!(LendingClient::new(config).is_err());
    }

    #[test]
    fn test_zero_protocol_address_is_rejected() {
        let config = ClientConfig::mainnet()
            .with_addresses(ProtocolAddresses::default().with_pool(ethers::types::Address::zero()));

        assert!(matches!(
            LendingClient::new(config),
            Err(ClientError::Config(_))
        ));
    }
}
