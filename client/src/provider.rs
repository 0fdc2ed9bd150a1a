//! The chain provider boundary.
//!
//! Builders never talk to the node directly; every read and write goes through
//! [`ChainProvider`] so the transport can be swapped or faked in tests.

use crate::abi;
use crate::error::Result;
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};

/// Opaque request/response access to an EVM node
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Execute a read-only call (`eth_call`) against `to`
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Estimate gas for a populated transaction
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;

    /// Current gas price
    async fn gas_price(&self) -> Result<U256>;

    /// Chain id reported by the node
    async fn chain_id(&self) -> Result<u64>;

    /// Submit a transaction for the node to sign and broadcast
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256>;
}

/// Call `signature` on `to` and decode the return data as `outputs`
pub async fn call_decoded(
    provider: &dyn ChainProvider,
    to: Address,
    signature: &str,
    args: &[Token],
    outputs: &[ParamType],
) -> Result<Vec<Token>> {
    let data = abi::encode_call(signature, args);
    let raw = provider.call(to, data).await?;
    Ok(ethers::abi::decode(outputs, &raw)?)
}
