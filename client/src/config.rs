//! Network and protocol configuration.
//!
//! This module provides configuration for connecting to an EVM JSON-RPC node,
//! the IPFS gateway used for proposal metadata, and the set of protocol
//! contract addresses the transaction builders target.

use crate::error::{ClientError, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default IPFS gateway for proposal metadata
pub const DEFAULT_IPFS_GATEWAY: &str = "https://cloudflare-ipfs.com/ipfs";

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Ethereum mainnet
    Mainnet,
    /// Sepolia testnet
    Sepolia,
    /// Polygon PoS
    Polygon,
    /// Custom network with user-defined endpoints
    Custom,
}

impl Network {
    /// Get the chain id for this network
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11_155_111,
            Network::Polygon => 137,
            Network::Custom => 0,
        }
    }

    /// Get the default public JSON-RPC URL for this network
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://eth.llamarpc.com",
            Network::Sepolia => "https://rpc.sepolia.org",
            Network::Polygon => "https://polygon-rpc.com",
            Network::Custom => "",
        }
    }
}

/// Addresses of the protocol contracts targeted by the builders.
///
/// Every key is optional; services that need a missing address refuse the
/// operation instead of encoding a call to the zero address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProtocolAddresses {
    /// Lending pool
    pub pool: Option<Address>,
    /// Flash-liquidation adapter
    pub flash_liquidation_adapter: Option<Address>,
    /// Collateral swap adapter
    pub swap_collateral_adapter: Option<Address>,
    /// Repay-with-collateral adapter
    pub repay_with_collateral_adapter: Option<Address>,
    /// Wrapped native asset gateway
    pub weth_gateway: Option<Address>,
    /// Governance contract
    pub governance: Option<Address>,
    /// Governance read helper
    pub governance_helper: Option<Address>,
}

impl ProtocolAddresses {
    /// Set the pool address
    pub fn with_pool(mut self, pool: Address) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Set the native gateway address
    pub fn with_weth_gateway(mut self, gateway: Address) -> Self {
        self.weth_gateway = Some(gateway);
        self
    }

    /// Set the adapter addresses
    pub fn with_adapters(
        mut self,
        flash_liquidation: Option<Address>,
        swap_collateral: Option<Address>,
        repay_with_collateral: Option<Address>,
    ) -> Self {
        self.flash_liquidation_adapter = flash_liquidation;
        self.swap_collateral_adapter = swap_collateral;
        self.repay_with_collateral_adapter = repay_with_collateral;
        self
    }

    /// Set the governance addresses
    pub fn with_governance(mut self, governance: Address, helper: Option<Address>) -> Self {
        self.governance = Some(governance);
        self.governance_helper = helper;
        self
    }

    /// Reject configured addresses that are the zero address
    pub fn validate(&self) -> Result<()> {
        let entries = [
            ("POOL", self.pool),
            ("FLASH_LIQUIDATION_ADAPTER", self.flash_liquidation_adapter),
            ("SWAP_COLLATERAL_ADAPTER", self.swap_collateral_adapter),
            (
                "REPAY_WITH_COLLATERAL_ADAPTER",
                self.repay_with_collateral_adapter,
            ),
            ("WETH_GATEWAY", self.weth_gateway),
            ("GOVERNANCE", self.governance),
            ("GOVERNANCE_HELPER", self.governance_helper),
        ];

        for (key, address) in entries {
            if address == Some(Address::zero()) {
                return Err(ClientError::Config(format!(
                    "{} cannot be the zero address",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Network to connect to
    pub network: Network,

    /// JSON-RPC endpoint URL
    pub rpc_url: String,

    /// Chain id expected from the node
    pub chain_id: u64,

    /// IPFS gateway base URL for proposal metadata
    pub ipfs_gateway_url: String,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Maximum number of transport retries for failed RPC requests
    pub max_retries: usize,

    /// Initial retry delay (in milliseconds)
    pub retry_initial_delay_ms: u64,

    /// Maximum retry delay (in milliseconds)
    pub retry_max_delay_ms: u64,

    /// Retry backoff multiplier
    pub retry_multiplier: f64,

    /// Protocol contract addresses
    pub addresses: ProtocolAddresses,
}

impl ClientConfig {
    /// Create a new configuration for the specified network
    pub fn new(network: Network) -> Self {
        Self {
            network,
            rpc_url: network.default_rpc_url().to_string(),
            chain_id: network.chain_id(),
            ipfs_gateway_url: DEFAULT_IPFS_GATEWAY.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 5000,
            retry_multiplier: 2.0,
            addresses: ProtocolAddresses::default(),
        }
    }

    /// Create configuration for Ethereum mainnet
    pub fn mainnet() -> Self {
        Self::new(Network::Mainnet)
    }

    /// Create configuration for Sepolia
    pub fn sepolia() -> Self {
        Self::new(Network::Sepolia)
    }

    /// Create configuration for Polygon
    pub fn polygon() -> Self {
        Self::new(Network::Polygon)
    }

    /// Create a custom configuration
    pub fn custom(rpc_url: String, chain_id: u64) -> Result<Self> {
        if rpc_url.is_empty() {
            return Err(ClientError::Config("RPC URL cannot be empty".to_string()));
        }
        if chain_id == 0 {
            return Err(ClientError::Config(
                "Chain id must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            rpc_url,
            chain_id,
            ..Self::new(Network::Custom)
        })
    }

    /// Set protocol addresses
    pub fn with_addresses(mut self, addresses: ProtocolAddresses) -> Self {
        self.addresses = addresses;
        self
    }

    /// Set the IPFS gateway base URL
    pub fn with_ipfs_gateway(mut self, url: impl Into<String>) -> Self {
        self.ipfs_gateway_url = url.into();
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set retry delays
    pub fn with_retry_config(
        mut self,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    ) -> Self {
        self.retry_initial_delay_ms = initial_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self.retry_multiplier = multiplier;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(ClientError::Config("RPC URL cannot be empty".to_string()));
        }
        Url::parse(&self.rpc_url)?;
        Url::parse(&self.ipfs_gateway_url)?;
        if self.chain_id == 0 {
            return Err(ClientError::Config(
                "Chain id must be greater than 0".to_string(),
            ));
        }
        if self.retry_initial_delay_ms == 0 {
            return Err(ClientError::Config(
                "Retry initial delay must be greater than 0".to_string(),
            ));
        }
        if self.retry_multiplier <= 1.0 {
            return Err(ClientError::Config(
                "Retry multiplier must be greater than 1.0".to_string(),
            ));
        }
        self.addresses.validate()?;

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
