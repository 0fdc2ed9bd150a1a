//! Credit delegation on variable and stable debt tokens.

use crate::abi;
use crate::error::Result;
use crate::provider::{call_decoded, ChainProvider};
use crate::types::{ProtocolAction, TransactionIntent, TransactionKind};
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};
use std::sync::Arc;

/// Debt token service
#[derive(Clone)]
pub struct DebtTokenService {
    provider: Arc<dyn ChainProvider>,
}

impl DebtTokenService {
    /// Create a new service
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// Borrowing power `from` delegated to `to`
    pub async fn borrow_allowance(
        &self,
        debt_token: Address,
        from: Address,
        to: Address,
    ) -> Result<U256> {
        let output = call_decoded(
            self.provider.as_ref(),
            debt_token,
            "borrowAllowance(address,address)",
            &[Token::Address(from), Token::Address(to)],
            &[ParamType::Uint(256)],
        )
        .await?;
        abi::as_uint(abi::single(output)?)
    }

    /// Whether `giver` delegated at least `amount` (base units) to `receiver`
    pub async fn is_delegation_approved(
        &self,
        debt_token: Address,
        giver: Address,
        receiver: Address,
        amount: U256,
    ) -> Result<bool> {
        Ok(self.borrow_allowance(debt_token, giver, receiver).await? >= amount)
    }

    /// Intent delegating `amount` of borrowing power to `delegatee`
    pub fn approve_delegation(
        &self,
        user: Address,
        debt_token: Address,
        delegatee: Address,
        amount: U256,
    ) -> TransactionIntent {
        TransactionIntent::call(
            self.provider.clone(),
            user,
            debt_token,
            TransactionKind::Erc20Approval,
            ProtocolAction::Approval,
            "approveDelegation(address,uint256)",
            vec![Token::Address(delegatee), Token::Uint(amount)],
        )
    }
}
