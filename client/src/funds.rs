//! Pre-flight funds checks for actions that move value into the pool.

use crate::abi;
use crate::error::Result;
use crate::provider::{call_decoded, ChainProvider};
use crate::validation::require_address;
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Synthetix proxy whose balance may be partly locked as collateral
const SYNTHETIX_PROXIES: &[(u64, &str)] = &[(1, "0xC011a73ee8576Fb46F5E1c5751cA3B9Fe0af2a6F")];

/// Decides whether `user` can move `amount` base units of `reserve`
#[async_trait]
pub trait FundsValidator: Send + Sync {
    /// `Ok(false)` means the operation must be refused
    async fn has_sufficient_funds(&self, user: Address, reserve: Address, amount: U256)
        -> Result<bool>;
}

/// Checks the transferable SNX balance; every other reserve passes
#[derive(Clone)]
pub struct SynthetixFundsValidator {
    provider: Arc<dyn ChainProvider>,
}

impl SynthetixFundsValidator {
    /// Create a new validator
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// Synthetix proxy address on `chain_id`, if there is one
    pub fn proxy_for_chain(chain_id: u64) -> Option<Address> {
        SYNTHETIX_PROXIES
            .iter()
            .find(|(id, _)| *id == chain_id)
            .and_then(|(_, address)| require_address("synthetix", address).ok())
    }

    /// SNX `user` can transfer right now
    pub async fn transferable_synthetix(&self, proxy: Address, user: Address) -> Result<U256> {
        let output = call_decoded(
            self.provider.as_ref(),
            proxy,
            "transferableSynthetix(address)",
            &[Token::Address(user)],
            &[ParamType::Uint(256)],
        )
        .await?;
        abi::as_uint(abi::single(output)?)
    }
}

#[async_trait]
impl FundsValidator for SynthetixFundsValidator {
    async fn has_sufficient_funds(
        &self,
        user: Address,
        reserve: Address,
        amount: U256,
    ) -> Result<bool> {
        let chain_id = self.provider.chain_id().await?;

        match Self::proxy_for_chain(chain_id) {
            Some(proxy) if proxy == reserve => {
                let transferable = self.transferable_synthetix(proxy, user).await?;
                debug!("Transferable SNX for {:?}: {}", user, transferable);
                Ok(transferable >= amount)
            }
            _ => Ok(true),
        }
    }
}
