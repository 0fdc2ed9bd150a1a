//! ERC-20 reads and approval intents.

use crate::abi;
use crate::amount::{is_max_sentinel, to_base_units};
use crate::error::{ClientError, Result};
use crate::provider::{call_decoded, ChainProvider};
use crate::types::{is_native_asset, ProtocolAction, TransactionIntent, TransactionKind};
use dashmap::DashMap;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Allowance treated as "approved for everything" when checking a "-1" amount
pub const SUPER_BIG_ALLOWANCE_NUMBER: &str =
    "11579208923731619542357098500868790785326998466564056403945758400791";

/// Decimals of the native asset
pub const NATIVE_DECIMALS: u8 = 18;

/// Name, symbol and decimals of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token address
    pub address: Address,
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal precision
    pub decimals: u8,
}

/// ERC-20 token service.
///
/// Decimals are memoized per token for the lifetime of the service; clones
/// share the memo.
#[derive(Clone)]
pub struct Erc20Service {
    provider: Arc<dyn ChainProvider>,
    decimals: Arc<DashMap<Address, u8>>,
}

impl Erc20Service {
    /// Create a new service
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self {
            provider,
            decimals: Arc::new(DashMap::new()),
        }
    }

    /// Decimal precision of `token`
    pub async fn decimals_of(&self, token: Address) -> Result<u8> {
        if is_native_asset(&token) {
            return Ok(NATIVE_DECIMALS);
        }
        if let Some(decimals) = self.decimals.get(&token) {
            return Ok(*decimals);
        }

        let output = call_decoded(
            self.provider.as_ref(),
            token,
            "decimals()",
            &[],
            &[ParamType::Uint(8)],
        )
        .await?;
        let value = abi::as_uint(abi::single(output)?)?;
        if value > U256::from(u8::MAX) {
            return Err(ClientError::InvalidResponse(format!(
                "decimals {} out of range",
                value
            )));
        }
        let decimals = value.low_u32() as u8;

        debug!("Decimals of {:?}: {}", token, decimals);
        Ok(*self.decimals.entry(token).or_insert(decimals))
    }

    /// Allowance `owner` granted to `spender`
    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let output = call_decoded(
            self.provider.as_ref(),
            token,
            "allowance(address,address)",
            &[Token::Address(owner), Token::Address(spender)],
            &[ParamType::Uint(256)],
        )
        .await?;
        abi::as_uint(abi::single(output)?)
    }

    /// Token balance of `owner`
    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let output = call_decoded(
            self.provider.as_ref(),
            token,
            "balanceOf(address)",
            &[Token::Address(owner)],
            &[ParamType::Uint(256)],
        )
        .await?;
        abi::as_uint(abi::single(output)?)
    }

    /// EIP-2612 permit nonce of `owner`
    pub async fn nonces(&self, token: Address, owner: Address) -> Result<U256> {
        let output = call_decoded(
            self.provider.as_ref(),
            token,
            "nonces(address)",
            &[Token::Address(owner)],
            &[ParamType::Uint(256)],
        )
        .await?;
        abi::as_uint(abi::single(output)?)
    }

    /// Whether `user` already allows `spender` to move `amount` of `token`.
    ///
    /// `amount` is a decimal string; "-1" checks for an effectively unlimited
    /// allowance. The native asset needs no approval.
    pub async fn is_approved(
        &self,
        token: Address,
        user: Address,
        spender: Address,
        amount: &str,
    ) -> Result<bool> {
        if is_native_asset(&token) {
            return Ok(true);
        }

        let decimals = self.decimals_of(token).await?;
        let allowance = self.allowance(token, user, spender).await?;

        let required = if is_max_sentinel(amount) {
            U256::from_dec_str(SUPER_BIG_ALLOWANCE_NUMBER)
                .map_err(|e| ClientError::InvalidAmount(e.to_string()))?
        } else {
            to_base_units(amount, decimals)?
        };

        Ok(allowance >= required)
    }

    /// Intent approving `spender` to move `amount` of `token`
    pub fn approve(
        &self,
        user: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> TransactionIntent {
        TransactionIntent::call(
            self.provider.clone(),
            user,
            token,
            TransactionKind::Erc20Approval,
            ProtocolAction::Approval,
            "approve(address,uint256)",
            vec![Token::Address(spender), Token::Uint(amount)],
        )
    }

    /// Name, symbol and decimals of `token`
    pub async fn token_data(&self, token: Address) -> Result<TokenMetadata> {
        if is_native_asset(&token) {
            return Ok(TokenMetadata {
                address: token,
                name: "Ethereum".to_string(),
                symbol: "ETH".to_string(),
                decimals: NATIVE_DECIMALS,
            });
        }

        let name = call_decoded(
            self.provider.as_ref(),
            token,
            "name()",
            &[],
            &[ParamType::String],
        )
        .await?;
        let symbol = call_decoded(
            self.provider.as_ref(),
            token,
            "symbol()",
            &[],
            &[ParamType::String],
        )
        .await?;

        Ok(TokenMetadata {
            address: token,
            name: abi::as_string(abi::single(name)?)?,
            symbol: abi::as_string(abi::single(symbol)?)?,
            decimals: self.decimals_of(token).await?,
        })
    }
}
