//! Request parameters for the builder operations.
//!
//! Addresses and amounts arrive as strings and are checked by the operation
//! that receives them, before any network read.

#![allow(missing_docs)]

use crate::types::{InterestRate, PermitSignature};
use ethers::types::Bytes;
use serde::{Deserialize, Serialize};

/// Parameters of `deposit` and `supply`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyRequest {
    pub user: String,
    pub reserve: String,
    /// Decimal amount
    pub amount: String,
    pub on_behalf_of: Option<String>,
    pub referral_code: Option<u16>,
}

/// Parameters of `sign_erc20_approval`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignApprovalRequest {
    pub user: String,
    pub reserve: String,
    pub amount: String,
}

/// Parameters of `supply_with_permit`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyWithPermitRequest {
    pub user: String,
    pub reserve: String,
    pub amount: String,
    pub on_behalf_of: Option<String>,
    pub referral_code: Option<u16>,
    /// 65-byte hex signature over the permit typed data
    pub signature: String,
}

/// Parameters of `withdraw`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub user: String,
    pub reserve: String,
    /// Decimal amount or "-1" for the whole balance
    pub amount: String,
    pub on_behalf_of: Option<String>,
    /// Required when withdrawing the native asset
    pub a_token_address: Option<String>,
}

/// Parameters of `borrow`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub user: String,
    pub reserve: String,
    pub amount: String,
    pub interest_rate_mode: InterestRate,
    /// Required when borrowing the native asset
    pub debt_token_address: Option<String>,
    pub on_behalf_of: Option<String>,
    pub referral_code: Option<u16>,
}

/// Parameters of `repay`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayRequest {
    pub user: String,
    pub reserve: String,
    /// Decimal amount or "-1" for the whole debt
    pub amount: String,
    pub interest_rate_mode: InterestRate,
    pub on_behalf_of: Option<String>,
}

/// Parameters of `repay_with_permit`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayWithPermitRequest {
    pub user: String,
    pub reserve: String,
    pub amount: String,
    pub interest_rate_mode: InterestRate,
    pub on_behalf_of: Option<String>,
    pub signature: String,
}

/// Parameters of `repay_with_a_tokens`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayWithATokensRequest {
    pub user: String,
    pub reserve: String,
    pub amount: String,
    pub rate_mode: InterestRate,
}

/// Parameters of `swap_borrow_rate_mode`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapBorrowRateModeRequest {
    pub user: String,
    pub reserve: String,
    /// Rate mode the debt currently has
    pub interest_rate_mode: InterestRate,
}

/// Parameters of `set_usage_as_collateral`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUsageAsCollateralRequest {
    pub user: String,
    pub reserve: String,
    pub usage_as_collateral: bool,
}

/// Parameters of `liquidation_call`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationCallRequest {
    pub liquidator: String,
    pub liquidated_user: String,
    pub debt_reserve: String,
    pub collateral_reserve: String,
    pub purchase_amount: String,
    /// Receive aTokens instead of the underlying collateral
    pub get_a_token: bool,
    /// Cover the whole debt
    pub liquidate_all: bool,
}

/// Parameters of `swap_collateral`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCollateralRequest {
    pub user: String,
    /// Go through a flash loan instead of calling the adapter directly
    pub flash: bool,
    pub from_asset: String,
    pub from_a_token: String,
    pub to_asset: String,
    pub from_amount: String,
    pub min_to_amount: String,
    pub permit_signature: Option<PermitSignature>,
    /// Swap the whole aToken balance
    pub swap_all: bool,
    pub on_behalf_of: Option<String>,
    pub referral_code: Option<u16>,
    /// ParaSwap Augustus router
    pub augustus: String,
    /// Calldata for the Augustus router
    pub swap_call_data: Bytes,
}

/// Parameters of `repay_with_collateral`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayWithCollateralRequest {
    pub user: String,
    pub from_asset: String,
    pub from_a_token: String,
    pub asset_to_repay: String,
    pub repay_with_amount: String,
    pub repay_amount: String,
    pub permit_signature: Option<PermitSignature>,
    pub repay_all_debt: bool,
    pub rate_mode: InterestRate,
    pub on_behalf_of: Option<String>,
    pub referral_code: Option<u16>,
    pub flash: bool,
    pub use_eth_path: bool,
}

/// Parameters of `flash_liquidation`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashLiquidationRequest {
    pub user: String,
    pub collateral_asset: String,
    pub borrowed_asset: String,
    pub debt_token_cover: String,
    pub liquidate_all: bool,
    /// Account starting the flash loan
    pub initiator: String,
    pub use_eth_path: bool,
}

/// Parameters of `set_user_e_mode`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserEModeRequest {
    pub user: String,
    /// Efficiency-mode category, 0 leaves e-mode
    pub category_id: u8,
}

/// Parameters of `submit_vote`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub user: String,
    pub proposal_id: u64,
    pub support: bool,
}
