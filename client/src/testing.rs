//! In-memory chain provider for unit tests.

use crate::abi;
use crate::error::{ClientError, Result};
use crate::provider::ChainProvider;
use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Canned-response provider keyed by target contract and selector
pub struct MockProvider {
    responses: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    calls: Mutex<Vec<(Address, Bytes)>>,
    sent: Mutex<Vec<TransactionRequest>>,
    gas_estimate: U256,
    gas_price: U256,
    chain_id: u64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            gas_estimate: U256::from(100_000u64),
            gas_price: U256::from(1_000_000_000u64),
            chain_id: 1,
        }
    }

    pub fn with_gas_estimate(mut self, gas: U256) -> Self {
        self.gas_estimate = gas;
        self
    }

    pub fn with_gas_price(mut self, price: U256) -> Self {
        self.gas_price = price;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Answer calls of `signature` on `to` with the encoded `output`
    pub fn with_call(self, to: Address, signature: &str, output: Vec<Token>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((to, abi::selector(signature)), Bytes::from(ethers::abi::encode(&output)));
        self
    }

    /// Number of calls made to `signature` on `to`
    pub fn call_count(&self, to: Address, signature: &str) -> usize {
        let selector = abi::selector(signature);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, data)| *target == to && data.len() >= 4 && data[..4] == selector)
            .count()
    }

    /// Transactions passed to `send_transaction`
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.calls.lock().unwrap().push((to, data.clone()));

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        self.responses
            .lock()
            .unwrap()
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| ClientError::Rpc("execution reverted (code: 3)".to_string()))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        Ok(self.gas_estimate)
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(self.gas_price)
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.clone());
        Ok(H256::from_low_u64_be(sent.len() as u64))
    }
}
