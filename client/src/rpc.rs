//! JSON-RPC access to an EVM node.
//!
//! [`RpcClient`] wraps an `ethers` HTTP provider and implements
//! [`ChainProvider`] on top of it. Every node request goes through the
//! configured [`RetryStrategy`].

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::provider::ChainProvider;
use crate::retry::RetryStrategy;
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// JSON-RPC client
#[derive(Clone, Debug)]
pub struct RpcClient {
    provider: Arc<Provider<Http>>,
    retry_strategy: RetryStrategy,
}

impl RpcClient {
    /// Create a client for the configured node
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Network)?;
        let url = Url::parse(&config.rpc_url)?;

        Ok(Self {
            provider: Arc::new(Provider::new(Http::new_with_client(url, client))),
            retry_strategy: RetryStrategy::from_config(config),
        })
    }

    /// Underlying `ethers` provider
    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    async fn request<T, F, Fut>(&self, method: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        debug!("RPC request: {}", method);
        self.retry_strategy
            .retry(|| async {
                operation().await.map_err(|e| {
                    let error = ClientError::from(e);
                    debug!("RPC {} failed: {}", method, error);
                    error
                })
            })
            .await
    }

    /// Get the latest block number
    pub async fn block_number(&self) -> Result<u64> {
        let number = self
            .request("eth_blockNumber", || self.provider.get_block_number())
            .await?;
        Ok(number.as_u64())
    }

    /// Health check - verify the node answers and serves the expected chain
    pub async fn health_check(&self, expected_chain_id: u64) -> Result<bool> {
        debug!("Performing RPC health check");

        match self.chain_id().await {
            Ok(chain_id) if chain_id == expected_chain_id => {
                info!("RPC health check passed (chain id {})", chain_id);
                Ok(true)
            }
            Ok(chain_id) => {
                error!(
                    "RPC health check failed: expected chain id {}, node reports {}",
                    expected_chain_id, chain_id
                );
                Err(ClientError::Config(format!(
                    "node serves chain id {}, expected {}",
                    chain_id, expected_chain_id
                )))
            }
            Err(e) => {
                error!("RPC health check failed: {:?}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ChainProvider for RpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.request("eth_call", || self.provider.call(&tx, None))
            .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        let tx: TypedTransaction = tx.clone().into();
        self.request("eth_estimateGas", || self.provider.estimate_gas(&tx, None))
            .await
    }

    async fn gas_price(&self) -> Result<U256> {
        self.request("eth_gasPrice", || self.provider.get_gas_price())
            .await
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id = self
            .request("eth_chainId", || self.provider.get_chainid())
            .await?;
        if chain_id > U256::from(u64::MAX) {
            return Err(ClientError::InvalidResponse(format!(
                "chain id {} does not fit in 64 bits",
                chain_id
            )));
        }
        Ok(chain_id.as_u64())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        info!("Sending transaction via RPC");

        // sent as given: gas and price stay unset unless the caller filled them
        let hash: H256 = self
            .request("eth_sendTransaction", || {
                self.provider.request("eth_sendTransaction", [tx])
            })
            .await?;

        info!("Transaction sent: {:?}", hash);
        Ok(hash)
    }
}
