//! Transaction submission.
//!
//! Intents are populated and sent strictly in batch order, so approvals reach
//! the node before the actions that depend on them.

use crate::error::Result;
use crate::provider::ChainProvider;
use crate::types::TransactionIntent;
use ethers::types::H256;
use std::sync::Arc;
use tracing::{debug, info};

/// Sends intent batches through the provider
#[derive(Clone)]
pub struct TransactionManager {
    provider: Arc<dyn ChainProvider>,
}

/// Transaction submission options
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Fill gas limit and price before sending instead of leaving it to the node
    pub estimate_first: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            estimate_first: true,
        }
    }
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// Submit one intent
    pub async fn submit_intent(
        &self,
        intent: &TransactionIntent,
        options: &SubmitOptions,
    ) -> Result<H256> {
        let mut request = intent.request()?;

        if options.estimate_first {
            let gas = intent.gas(false).await?;
            debug!(
                "Gas for {} intent: limit {}, price {}",
                intent.kind, gas.gas_limit, gas.gas_price
            );
            request = request.gas(gas.gas_limit).gas_price(gas.gas_price);
        }

        self.provider.send_transaction(&request).await
    }

    /// Submit a batch in order, stopping at the first failure
    pub async fn submit_intents(
        &self,
        intents: &[TransactionIntent],
        options: &SubmitOptions,
    ) -> Result<Vec<H256>> {
        info!("Submitting {} transactions", intents.len());

        let mut hashes = Vec::with_capacity(intents.len());
        for (index, intent) in intents.iter().enumerate() {
            let hash = self.submit_intent(intent, options).await?;
            info!(
                "Sent {} transaction {}/{} to {:?}: {:?}",
                intent.kind,
                index + 1,
                intents.len(),
                intent.to,
                hash
            );
            hashes.push(hash);
        }

        Ok(hashes)
    }
}
