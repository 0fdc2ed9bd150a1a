//! Collateral swap and repay-with-collateral adapters.
//!
//! Both adapters can be reached two ways: through a pool flash loan, where the
//! adapter receives an ABI-encoded parameter payload, or by calling the
//! adapter directly. This module builds the payloads and the direct-call
//! intents.

use crate::error::{ClientError, Result};
use crate::provider::ChainProvider;
use crate::types::{
    InterestRate, PermitSignature, ProtocolAction, TransactionIntent, TransactionKind,
};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use tracing::debug;

/// Byte offset of the source amount inside a ParaSwap Augustus call.
///
/// The adapter overwrites the amount at this offset with the full aToken
/// balance when swapping everything.
pub fn augustus_from_amount_offset(calldata: &[u8]) -> Result<u64> {
    if calldata.len() < 4 {
        return Err(ClientError::UnsupportedOperation(
            "swap calldata is shorter than a selector".into(),
        ));
    }

    let offset = match calldata[..4] {
        [0xda, 0x85, 0x67, 0xc8] => 100,
        [0x58, 0xb9, 0xd1, 0x79] => 4,
        [0x08, 0x63, 0xb7, 0xac] => 68,
        [0x8f, 0x00, 0xec, 0xcb] => 68,
        [0xec, 0x1d, 0x21, 0xdd] => 68,
        [0x54, 0x84, 0x0d, 0x1a] => 4,
        [0xf5, 0x66, 0x10, 0x34] => 68,
        [0x0b, 0x86, 0xa4, 0xc1] => 36,
        [0x64, 0x46, 0x68, 0x05] => 68,
        [0x81, 0x03, 0x31, 0x20] => 68,
        [0xa9, 0x4e, 0x78, 0xef] => 68,
        [0x46, 0xc6, 0x7b, 0x6d] => 68,
        _ => {
            return Err(ClientError::UnsupportedOperation(format!(
                "unrecognized Augustus function 0x{}",
                hex::encode(&calldata[..4])
            )))
        }
    };
    Ok(offset)
}

/// Flash-loan payload for the collateral swap adapter
pub fn swap_collateral_params(
    asset_to_swap_to: Address,
    min_amount_to_receive: U256,
    swap_all_balance_offset: u64,
    swap_calldata: &Bytes,
    augustus: Address,
    permit: &PermitSignature,
) -> Bytes {
    Bytes::from(ethers::abi::encode(&[
        Token::Address(asset_to_swap_to),
        Token::Uint(min_amount_to_receive),
        Token::Uint(U256::from(swap_all_balance_offset)),
        Token::Bytes(swap_calldata.to_vec()),
        Token::Address(augustus),
        permit.to_token(),
    ]))
}

/// Flash-loan payload for the repay-with-collateral adapter
pub fn repay_with_collateral_params(
    collateral_asset: Address,
    collateral_amount: U256,
    rate_mode: InterestRate,
    permit: &PermitSignature,
    use_eth_path: bool,
) -> Bytes {
    let mut tokens = vec![
        Token::Address(collateral_asset),
        Token::Uint(collateral_amount),
        rate_mode.token(),
    ];
    tokens.extend(permit.fields());
    tokens.push(Token::Bool(use_eth_path));
    Bytes::from(ethers::abi::encode(&tokens))
}

/// Flash-loan payload for the flash-liquidation adapter
pub fn flash_liquidation_params(
    collateral_asset: Address,
    borrowed_asset: Address,
    user: Address,
    debt_to_cover: U256,
    use_eth_path: bool,
) -> Bytes {
    Bytes::from(ethers::abi::encode(&[
        Token::Address(collateral_asset),
        Token::Address(borrowed_asset),
        Token::Address(user),
        Token::Uint(debt_to_cover),
        Token::Bool(use_eth_path),
    ]))
}

/// Direct `swapAndDeposit` parameters, amounts in base units
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct SwapAndDepositParams {
    pub user: Address,
    pub asset_to_swap_from: Address,
    pub asset_to_swap_to: Address,
    pub amount_to_swap: U256,
    pub min_amount_to_receive: U256,
    pub swap_all: bool,
    pub swap_calldata: Bytes,
    pub augustus: Address,
    pub permit: PermitSignature,
}

/// ParaSwap liquidity swap adapter
#[derive(Clone)]
pub struct LiquiditySwapAdapterService {
    provider: Arc<dyn ChainProvider>,
    adapter: Option<Address>,
}

impl LiquiditySwapAdapterService {
    /// Create a new service
    pub fn new(provider: Arc<dyn ChainProvider>, adapter: Option<Address>) -> Self {
        Self { provider, adapter }
    }

    /// Adapter address
    pub fn address(&self) -> Result<Address> {
        self.adapter.ok_or_else(|| {
            ClientError::UnsupportedOperation(
                "swap collateral adapter address is not configured".into(),
            )
        })
    }

    /// Intent swapping collateral and depositing the proceeds
    pub fn swap_and_deposit(
        &self,
        params: SwapAndDepositParams,
        queued: &[TransactionIntent],
    ) -> Result<TransactionIntent> {
        let adapter = self.address()?;
        let offset = if params.swap_all {
            augustus_from_amount_offset(&params.swap_calldata)?
        } else {
            0
        };
        debug!("swapAndDeposit with balance offset {}", offset);

        Ok(TransactionIntent::call(
            self.provider.clone(),
            params.user,
            adapter,
            TransactionKind::PoolAction,
            ProtocolAction::SwapCollateral,
            "swapAndDeposit(address,address,uint256,uint256,uint256,bytes,address,(uint256,uint256,uint8,bytes32,bytes32))",
            vec![
                Token::Address(params.asset_to_swap_from),
                Token::Address(params.asset_to_swap_to),
                Token::Uint(params.amount_to_swap),
                Token::Uint(params.min_amount_to_receive),
                Token::Uint(U256::from(offset)),
                Token::Bytes(params.swap_calldata.to_vec()),
                Token::Address(params.augustus),
                params.permit.to_token(),
            ],
        )
        .after(queued))
    }
}

/// Direct `swapAndRepay` parameters, amounts in base units
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct SwapAndRepayParams {
    pub user: Address,
    pub collateral_asset: Address,
    pub debt_asset: Address,
    pub collateral_amount: U256,
    pub debt_repay_amount: U256,
    pub debt_rate_mode: InterestRate,
    pub permit: PermitSignature,
    pub use_eth_path: bool,
}

/// Repay-with-collateral adapter
#[derive(Clone)]
pub struct RepayWithCollateralAdapterService {
    provider: Arc<dyn ChainProvider>,
    adapter: Option<Address>,
}

impl RepayWithCollateralAdapterService {
    /// Create a new service
    pub fn new(provider: Arc<dyn ChainProvider>, adapter: Option<Address>) -> Self {
        Self { provider, adapter }
    }

    /// Adapter address
    pub fn address(&self) -> Result<Address> {
        self.adapter.ok_or_else(|| {
            ClientError::UnsupportedOperation(
                "repay with collateral adapter address is not configured".into(),
            )
        })
    }

    /// Intent swapping collateral and repaying debt with the proceeds
    pub fn swap_and_repay(
        &self,
        params: SwapAndRepayParams,
        queued: &[TransactionIntent],
    ) -> Result<TransactionIntent> {
        let adapter = self.address()?;

        Ok(TransactionIntent::call(
            self.provider.clone(),
            params.user,
            adapter,
            TransactionKind::PoolAction,
            ProtocolAction::RepayCollateral,
            "swapAndRepay(address,address,uint256,uint256,uint256,(uint256,uint256,uint8,bytes32,bytes32),bool)",
            vec![
                Token::Address(params.collateral_asset),
                Token::Address(params.debt_asset),
                Token::Uint(params.collateral_amount),
                Token::Uint(params.debt_repay_amount),
                params.debt_rate_mode.token(),
                params.permit.to_token(),
                Token::Bool(params.use_eth_path),
            ],
        )
        .after(queued))
    }
}
