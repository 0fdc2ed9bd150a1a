//! Native asset actions through the wrapped-native gateway.
//!
//! The gateway wraps and unwraps the native asset around the regular pool
//! calls, so deposits and repayments attach value instead of needing an
//! allowance, while withdrawals and borrows need the gateway to be allowed
//! to pull aTokens or borrow on the user's behalf.

use crate::abi;
use crate::amount::{convert_amount, is_max_sentinel, to_base_units, MAX_UINT_AMOUNT};
use crate::debt_token::DebtTokenService;
use crate::erc20::{Erc20Service, NATIVE_DECIMALS};
use crate::error::{ClientError, Result};
use crate::provider::ChainProvider;
use crate::types::{InterestRate, ProtocolAction, TransactionIntent, TransactionKind};
use ethers::abi::Token;
use ethers::types::Address;
use std::sync::Arc;
use tracing::info;

/// Wrapped-native gateway service
#[derive(Clone)]
pub struct WethGatewayService {
    provider: Arc<dyn ChainProvider>,
    gateway: Option<Address>,
    erc20: Erc20Service,
    debt_token: DebtTokenService,
}

impl WethGatewayService {
    /// Create a new service; `gateway` may be unset when native flows are unused
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        gateway: Option<Address>,
        erc20: Erc20Service,
        debt_token: DebtTokenService,
    ) -> Self {
        Self {
            provider,
            gateway,
            erc20,
            debt_token,
        }
    }

    fn gateway(&self) -> Result<Address> {
        self.gateway.ok_or_else(|| {
            ClientError::UnsupportedOperation("native gateway address is not configured".into())
        })
    }

    /// Deposit the native asset
    pub async fn deposit_eth(
        &self,
        pool: Address,
        user: Address,
        amount: &str,
        on_behalf_of: Address,
        referral_code: u16,
    ) -> Result<Vec<TransactionIntent>> {
        let gateway = self.gateway()?;
        let value = to_base_units(amount, NATIVE_DECIMALS)?;
        info!("Building native deposit of {} for {:?}", amount, user);

        let intent = TransactionIntent::call(
            self.provider.clone(),
            user,
            gateway,
            TransactionKind::PoolAction,
            ProtocolAction::Supply,
            "depositETH(address,address,uint16)",
            vec![
                Token::Address(pool),
                Token::Address(on_behalf_of),
                abi::uint(referral_code),
            ],
        )
        .with_value(Some(value));

        Ok(vec![intent])
    }

    /// Withdraw the native asset, approving the gateway to pull aTokens first
    pub async fn withdraw_eth(
        &self,
        pool: Address,
        user: Address,
        amount: &str,
        on_behalf_of: Address,
        a_token: Address,
    ) -> Result<Vec<TransactionIntent>> {
        let gateway = self.gateway()?;
        let converted = convert_amount(amount, NATIVE_DECIMALS)?;
        info!("Building native withdrawal of {} for {:?}", amount, user);

        let mut intents = Vec::new();
        if !self.erc20.is_approved(a_token, user, gateway, amount).await? {
            intents.push(self.erc20.approve(user, a_token, gateway, MAX_UINT_AMOUNT));
        }

        let intent = TransactionIntent::call(
            self.provider.clone(),
            user,
            gateway,
            TransactionKind::PoolAction,
            ProtocolAction::WithdrawEth,
            "withdrawETH(address,uint256,address)",
            vec![
                Token::Address(pool),
                Token::Uint(converted),
                Token::Address(on_behalf_of),
            ],
        )
        .after(&intents);
        intents.push(intent);

        Ok(intents)
    }

    /// Repay native-asset debt, attaching the amount as value
    pub async fn repay_eth(
        &self,
        pool: Address,
        user: Address,
        amount: &str,
        rate_mode: InterestRate,
        on_behalf_of: Address,
    ) -> Result<Vec<TransactionIntent>> {
        let gateway = self.gateway()?;
        if is_max_sentinel(amount) {
            return Err(ClientError::UnsupportedOperation(
                "repaying the native asset needs an explicit amount".into(),
            ));
        }
        let value = to_base_units(amount, NATIVE_DECIMALS)?;
        info!("Building native repayment of {} for {:?}", amount, user);

        let intent = TransactionIntent::call(
            self.provider.clone(),
            user,
            gateway,
            TransactionKind::PoolAction,
            ProtocolAction::Repay,
            "repayETH(address,uint256,uint256,address)",
            vec![
                Token::Address(pool),
                Token::Uint(value),
                rate_mode.token(),
                Token::Address(on_behalf_of),
            ],
        )
        .with_value(Some(value));

        Ok(vec![intent])
    }

    /// Borrow the native asset, delegating credit to the gateway first
    pub async fn borrow_eth(
        &self,
        pool: Address,
        user: Address,
        amount: &str,
        debt_token: Address,
        rate_mode: InterestRate,
        referral_code: u16,
    ) -> Result<Vec<TransactionIntent>> {
        let gateway = self.gateway()?;
        let converted = to_base_units(amount, NATIVE_DECIMALS)?;
        info!("Building native borrow of {} for {:?}", amount, user);

        let mut intents = Vec::new();
        if !self
            .debt_token
            .is_delegation_approved(debt_token, user, gateway, converted)
            .await?
        {
            intents.push(self.debt_token.approve_delegation(
                user,
                debt_token,
                gateway,
                MAX_UINT_AMOUNT,
            ));
        }

        let intent = TransactionIntent::call(
            self.provider.clone(),
            user,
            gateway,
            TransactionKind::PoolAction,
            ProtocolAction::BorrowEth,
            "borrowETH(address,uint256,uint256,uint16)",
            vec![
                Token::Address(pool),
                Token::Uint(converted),
                rate_mode.token(),
                abi::uint(referral_code),
            ],
        )
        .after(&intents);
        intents.push(intent);

        Ok(intents)
    }
}
