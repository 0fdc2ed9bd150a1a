//! Lending pool transaction builder.
//!
//! Every operation validates its request before touching the network, routes
//! native-asset reserves through the gateway, performs the reads it needs
//! (decimals, allowance, funds) and returns the ordered intents to send.
//! Provider errors propagate unchanged and nothing is retried here.

use crate::abi;
use crate::adapters::{
    augustus_from_amount_offset, flash_liquidation_params, repay_with_collateral_params,
    swap_collateral_params, LiquiditySwapAdapterService, RepayWithCollateralAdapterService,
    SwapAndDepositParams, SwapAndRepayParams,
};
use crate::amount::{convert_amount, is_max_sentinel, to_base_units, with_surplus, MAX_UINT_AMOUNT};
use crate::config::ProtocolAddresses;
use crate::debt_token::DebtTokenService;
use crate::erc20::Erc20Service;
use crate::error::{ClientError, Result};
use crate::funds::{FundsValidator, SynthetixFundsValidator};
use crate::gateway::WethGatewayService;
use crate::provider::ChainProvider;
use crate::requests::{
    BorrowRequest, FlashLiquidationRequest, LiquidationCallRequest, RepayRequest,
    RepayWithATokensRequest, RepayWithCollateralRequest, RepayWithPermitRequest,
    SetUsageAsCollateralRequest, SetUserEModeRequest, SignApprovalRequest,
    SupplyRequest, SupplyWithPermitRequest, SwapBorrowRateModeRequest, SwapCollateralRequest,
    WithdrawRequest,
};
use crate::types::{
    is_native_asset, ProtocolAction, SplitSignature, TransactionIntent, TransactionKind,
};
use crate::validation::{
    optional_address, require_address, require_positive_amount, require_positive_or_max,
};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const FLASH_LOAN: &str =
    "flashLoan(address,address[],uint256[],uint256[],address,bytes,uint16)";

/// Builds transaction intents for the lending pool
#[derive(Clone)]
pub struct Pool {
    provider: Arc<dyn ChainProvider>,
    addresses: ProtocolAddresses,
    erc20: Erc20Service,
    funds: Arc<dyn FundsValidator>,
    gateway: WethGatewayService,
    swap_adapter: LiquiditySwapAdapterService,
    repay_adapter: RepayWithCollateralAdapterService,
}

impl Pool {
    /// Create a pool builder with the default collaborators
    pub fn new(provider: Arc<dyn ChainProvider>, addresses: ProtocolAddresses) -> Self {
        let erc20 = Erc20Service::new(provider.clone());
        Self::with_erc20(provider, addresses, erc20)
    }

    /// Create a pool builder sharing an existing token service
    pub fn with_erc20(
        provider: Arc<dyn ChainProvider>,
        addresses: ProtocolAddresses,
        erc20: Erc20Service,
    ) -> Self {
        let gateway = WethGatewayService::new(
            provider.clone(),
            addresses.weth_gateway,
            erc20.clone(),
            DebtTokenService::new(provider.clone()),
        );
        let swap_adapter =
            LiquiditySwapAdapterService::new(provider.clone(), addresses.swap_collateral_adapter);
        let repay_adapter = RepayWithCollateralAdapterService::new(
            provider.clone(),
            addresses.repay_with_collateral_adapter,
        );

        Self {
            funds: Arc::new(SynthetixFundsValidator::new(provider.clone())),
            provider,
            addresses,
            erc20,
            gateway,
            swap_adapter,
            repay_adapter,
        }
    }

    /// Replace the funds-sufficiency check
    pub fn with_funds_validator(mut self, funds: Arc<dyn FundsValidator>) -> Self {
        self.funds = funds;
        self
    }

    /// Token service used for decimals and approvals
    pub fn erc20(&self) -> &Erc20Service {
        &self.erc20
    }

    fn pool_address(&self) -> Result<Address> {
        self.addresses.pool.ok_or_else(|| {
            ClientError::UnsupportedOperation("pool address is not configured".into())
        })
    }

    fn flash_liquidation_address(&self) -> Result<Address> {
        self.addresses.flash_liquidation_adapter.ok_or_else(|| {
            ClientError::UnsupportedOperation(
                "flash liquidation adapter address is not configured".into(),
            )
        })
    }

    fn pool_call(
        &self,
        from: Address,
        action: ProtocolAction,
        signature: &'static str,
        args: Vec<Token>,
    ) -> Result<TransactionIntent> {
        Ok(TransactionIntent::call(
            self.provider.clone(),
            from,
            self.pool_address()?,
            TransactionKind::PoolAction,
            action,
            signature,
            args,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn flash_loan(
        &self,
        from: Address,
        action: ProtocolAction,
        receiver: Address,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
        params: Bytes,
        referral_code: u16,
    ) -> Result<TransactionIntent> {
        self.pool_call(
            from,
            action,
            FLASH_LOAN,
            vec![
                Token::Address(receiver),
                abi::address_array(&[asset]),
                abi::uint_array(&[amount]),
                // no debt is opened for the flash-borrowed amount
                abi::uint_array(&[U256::zero()]),
                Token::Address(on_behalf_of),
                Token::Bytes(params.to_vec()),
                abi::uint(referral_code),
            ],
        )
    }

    async fn ensure_funds(&self, user: Address, reserve: Address, amount: U256) -> Result<()> {
        if self.funds.has_sufficient_funds(user, reserve, amount).await? {
            Ok(())
        } else {
            Err(ClientError::InsufficientFunds)
        }
    }

    /// Queue a max approval of `spender` unless `amount` is already allowed
    async fn approve_if_needed(
        &self,
        intents: &mut Vec<TransactionIntent>,
        token: Address,
        user: Address,
        spender: Address,
        amount: &str,
    ) -> Result<()> {
        if !self.erc20.is_approved(token, user, spender, amount).await? {
            debug!("Queueing approval of {:?} on {:?}", spender, token);
            intents.push(self.erc20.approve(user, token, spender, MAX_UINT_AMOUNT));
        }
        Ok(())
    }

    /// Deposit into the pool through the legacy `deposit` entry point
    pub async fn deposit(&self, request: SupplyRequest) -> Result<Vec<TransactionIntent>> {
        self.supply_with(request, "deposit(address,uint256,address,uint16)")
            .await
    }

    /// Supply into the pool
    pub async fn supply(&self, request: SupplyRequest) -> Result<Vec<TransactionIntent>> {
        self.supply_with(request, "supply(address,uint256,address,uint16)")
            .await
    }

    async fn supply_with(
        &self,
        request: SupplyRequest,
        signature: &'static str,
    ) -> Result<Vec<TransactionIntent>> {
        let pool = self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_amount("amount", &request.amount)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        let referral_code = request.referral_code.unwrap_or(0);

        info!("Building supply of {} {:?} for {:?}", request.amount, reserve, user);

        if is_native_asset(&reserve) {
            return self
                .gateway
                .deposit_eth(pool, user, &request.amount, on_behalf_of, referral_code)
                .await;
        }

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = to_base_units(&request.amount, decimals)?;
        self.ensure_funds(user, reserve, amount).await?;

        let mut intents = Vec::new();
        self.approve_if_needed(&mut intents, reserve, user, pool, &request.amount)
            .await?;

        let intent = self
            .pool_call(
                user,
                ProtocolAction::Supply,
                signature,
                vec![
                    Token::Address(reserve),
                    Token::Uint(amount),
                    Token::Address(on_behalf_of),
                    abi::uint(referral_code),
                ],
            )?
            .after(&intents);
        intents.push(intent);

        Ok(intents)
    }

    /// EIP-712 typed data the user signs to permit the pool to pull `amount`.
    ///
    /// Returned as a JSON string ready for `eth_signTypedData_v4`.
    pub async fn sign_erc20_approval(&self, request: SignApprovalRequest) -> Result<String> {
        let pool = self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_amount("amount", &request.amount)?;

        let token = self.erc20.token_data(reserve).await?;
        let amount = to_base_units(&request.amount, token.decimals)?;
        let chain_id = self.provider.chain_id().await?;
        let nonce = self.erc20.nonces(reserve, user).await?;

        let typed_data = json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Permit": [
                    { "name": "owner", "type": "address" },
                    { "name": "spender", "type": "address" },
                    { "name": "value", "type": "uint256" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "deadline", "type": "uint256" }
                ]
            },
            "primaryType": "Permit",
            "domain": {
                "name": token.name,
                "version": "1",
                "chainId": chain_id,
                "verifyingContract": reserve
            },
            "message": {
                "owner": user,
                "spender": pool,
                "value": amount.to_string(),
                "nonce": nonce.to_string(),
                "deadline": MAX_UINT_AMOUNT.to_string()
            }
        });

        Ok(serde_json::to_string(&typed_data)?)
    }

    /// Supply using a signed permit instead of an approval transaction
    pub async fn supply_with_permit(
        &self,
        request: SupplyWithPermitRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        require_positive_amount("amount", &request.amount)?;
        let signature = SplitSignature::parse("signature", &request.signature)?;
        let referral_code = request.referral_code.unwrap_or(0);

        if is_native_asset(&reserve) {
            return Err(ClientError::UnsupportedOperation(
                "the native asset has no permit; use supply".into(),
            ));
        }

        info!("Building permit supply of {} {:?} for {:?}", request.amount, reserve, user);

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = to_base_units(&request.amount, decimals)?;
        self.ensure_funds(user, reserve, amount).await?;

        let mut args = vec![
            Token::Address(reserve),
            Token::Uint(amount),
            Token::Address(on_behalf_of),
            abi::uint(referral_code),
            Token::Uint(MAX_UINT_AMOUNT),
        ];
        args.extend(signature.tokens());

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Supply,
            "supplyWithPermit(address,uint256,address,uint16,uint256,uint8,bytes32,bytes32)",
            args,
        )?])
    }

    /// Withdraw from the pool; "-1" withdraws the whole balance
    pub async fn withdraw(&self, request: WithdrawRequest) -> Result<Vec<TransactionIntent>> {
        let pool = self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_or_max("amount", &request.amount)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        let a_token = request
            .a_token_address
            .as_deref()
            .map(|value| require_address("aTokenAddress", value))
            .transpose()?;

        info!("Building withdrawal of {} {:?} for {:?}", request.amount, reserve, user);

        if is_native_asset(&reserve) {
            let a_token = a_token.ok_or_else(|| {
                ClientError::UnsupportedOperation(
                    "withdrawing the native asset requires the aToken address".into(),
                )
            })?;
            return self
                .gateway
                .withdraw_eth(pool, user, &request.amount, on_behalf_of, a_token)
                .await;
        }

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = convert_amount(&request.amount, decimals)?;

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Withdraw,
            "withdraw(address,uint256,address)",
            vec![
                Token::Address(reserve),
                Token::Uint(amount),
                Token::Address(on_behalf_of),
            ],
        )?])
    }

    /// Borrow from the pool
    pub async fn borrow(&self, request: BorrowRequest) -> Result<Vec<TransactionIntent>> {
        let pool = self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_amount("amount", &request.amount)?;
        let debt_token = request
            .debt_token_address
            .as_deref()
            .map(|value| require_address("debtTokenAddress", value))
            .transpose()?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        let referral_code = request.referral_code.unwrap_or(0);

        info!("Building borrow of {} {:?} for {:?}", request.amount, reserve, user);

        if is_native_asset(&reserve) {
            let debt_token = debt_token.ok_or_else(|| {
                ClientError::UnsupportedOperation(
                    "borrowing the native asset requires the debt token address matching the rate mode"
                        .into(),
                )
            })?;
            return self
                .gateway
                .borrow_eth(
                    pool,
                    user,
                    &request.amount,
                    debt_token,
                    request.interest_rate_mode,
                    referral_code,
                )
                .await;
        }

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = to_base_units(&request.amount, decimals)?;

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Default,
            "borrow(address,uint256,uint256,uint16,address)",
            vec![
                Token::Address(reserve),
                Token::Uint(amount),
                request.interest_rate_mode.token(),
                abi::uint(referral_code),
                Token::Address(on_behalf_of),
            ],
        )?])
    }

    /// Repay debt; "-1" repays everything and skips the funds check
    pub async fn repay(&self, request: RepayRequest) -> Result<Vec<TransactionIntent>> {
        let pool = self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_or_max("amount", &request.amount)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;

        info!("Building repayment of {} {:?} for {:?}", request.amount, reserve, user);

        if is_native_asset(&reserve) {
            return self
                .gateway
                .repay_eth(
                    pool,
                    user,
                    &request.amount,
                    request.interest_rate_mode,
                    on_behalf_of,
                )
                .await;
        }

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = convert_amount(&request.amount, decimals)?;
        if !is_max_sentinel(&request.amount) {
            self.ensure_funds(user, reserve, amount).await?;
        }

        let mut intents = Vec::new();
        self.approve_if_needed(&mut intents, reserve, user, pool, &request.amount)
            .await?;

        let intent = self
            .pool_call(
                user,
                ProtocolAction::Repay,
                "repay(address,uint256,uint256,address)",
                vec![
                    Token::Address(reserve),
                    Token::Uint(amount),
                    request.interest_rate_mode.token(),
                    Token::Address(on_behalf_of),
                ],
            )?
            .after(&intents);
        intents.push(intent);

        Ok(intents)
    }

    /// Repay debt using a signed permit
    pub async fn repay_with_permit(
        &self,
        request: RepayWithPermitRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_or_max("amount", &request.amount)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        let signature = SplitSignature::parse("signature", &request.signature)?;

        if is_native_asset(&reserve) {
            return Err(ClientError::UnsupportedOperation(
                "the native asset has no permit; use repay".into(),
            ));
        }

        info!("Building permit repayment of {} {:?} for {:?}", request.amount, reserve, user);

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = convert_amount(&request.amount, decimals)?;
        if !is_max_sentinel(&request.amount) {
            self.ensure_funds(user, reserve, amount).await?;
        }

        let mut args = vec![
            Token::Address(reserve),
            Token::Uint(amount),
            request.interest_rate_mode.token(),
            Token::Address(on_behalf_of),
            Token::Uint(MAX_UINT_AMOUNT),
        ];
        args.extend(signature.tokens());

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Repay,
            "repayWithPermit(address,uint256,uint256,address,uint256,uint8,bytes32,bytes32)",
            args,
        )?])
    }

    /// Repay debt by burning aTokens of the same reserve
    pub async fn repay_with_a_tokens(
        &self,
        request: RepayWithATokensRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;
        require_positive_or_max("amount", &request.amount)?;

        if is_native_asset(&reserve) {
            return Err(ClientError::UnsupportedOperation(
                "cannot repay with aTokens of the native asset; use the wrapped asset".into(),
            ));
        }

        info!("Building aToken repayment of {} {:?} for {:?}", request.amount, reserve, user);

        let decimals = self.erc20.decimals_of(reserve).await?;
        let amount = convert_amount(&request.amount, decimals)?;
        if !is_max_sentinel(&request.amount) {
            self.ensure_funds(user, reserve, amount).await?;
        }

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Repay,
            "repayWithATokens(address,uint256,uint256)",
            vec![
                Token::Address(reserve),
                Token::Uint(amount),
                request.rate_mode.token(),
            ],
        )?])
    }

    /// Switch a debt position between stable and variable rate
    pub fn swap_borrow_rate_mode(
        &self,
        request: SwapBorrowRateModeRequest,
    ) -> Result<Vec<TransactionIntent>> {
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Default,
            "swapBorrowRateMode(address,uint256)",
            vec![Token::Address(reserve), request.interest_rate_mode.token()],
        )?])
    }

    /// Enable or disable a supplied reserve as collateral
    pub fn set_usage_as_collateral(
        &self,
        request: SetUsageAsCollateralRequest,
    ) -> Result<Vec<TransactionIntent>> {
        let user = require_address("user", &request.user)?;
        let reserve = require_address("reserve", &request.reserve)?;

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Default,
            "setUserUseReserveAsCollateral(address,bool)",
            vec![
                Token::Address(reserve),
                Token::Bool(request.usage_as_collateral),
            ],
        )?])
    }

    /// Liquidate an unhealthy position directly through the pool
    pub async fn liquidation_call(
        &self,
        request: LiquidationCallRequest,
    ) -> Result<Vec<TransactionIntent>> {
        let pool = self.pool_address()?;
        let liquidator = require_address("liquidator", &request.liquidator)?;
        let liquidated_user = require_address("liquidatedUser", &request.liquidated_user)?;
        let debt_reserve = require_address("debtReserve", &request.debt_reserve)?;
        let collateral_reserve = require_address("collateralReserve", &request.collateral_reserve)?;
        require_positive_amount("purchaseAmount", &request.purchase_amount)?;

        if is_native_asset(&debt_reserve) && request.liquidate_all {
            return Err(ClientError::UnsupportedOperation(
                "liquidating all native-asset debt needs an explicit amount".into(),
            ));
        }

        info!(
            "Building liquidation of {:?} by {:?}",
            liquidated_user, liquidator
        );

        let mut intents = Vec::new();
        self.approve_if_needed(
            &mut intents,
            debt_reserve,
            liquidator,
            pool,
            &request.purchase_amount,
        )
        .await?;

        let amount = if request.liquidate_all {
            MAX_UINT_AMOUNT
        } else {
            let decimals = self.erc20.decimals_of(debt_reserve).await?;
            to_base_units(&request.purchase_amount, decimals)?
        };
        let value = is_native_asset(&debt_reserve).then_some(amount);

        let intent = self
            .pool_call(
                liquidator,
                ProtocolAction::LiquidationCall,
                "liquidationCall(address,address,address,uint256,bool)",
                vec![
                    Token::Address(collateral_reserve),
                    Token::Address(debt_reserve),
                    Token::Address(liquidated_user),
                    Token::Uint(amount),
                    Token::Bool(request.get_a_token),
                ],
            )?
            .with_value(value)
            .after(&intents);
        intents.push(intent);

        Ok(intents)
    }

    /// Swap one collateral for another, via flash loan or a direct adapter call
    pub async fn swap_collateral(
        &self,
        request: SwapCollateralRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let adapter = self.swap_adapter.address()?;
        let user = require_address("user", &request.user)?;
        let from_asset = require_address("fromAsset", &request.from_asset)?;
        let from_a_token = require_address("fromAToken", &request.from_a_token)?;
        let to_asset = require_address("toAsset", &request.to_asset)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        let augustus = require_address("augustus", &request.augustus)?;
        require_positive_amount("fromAmount", &request.from_amount)?;
        require_positive_amount("minToAmount", &request.min_to_amount)?;
        let permit = request.permit_signature.clone().unwrap_or_default();
        let referral_code = request.referral_code.unwrap_or(0);

        info!(
            "Building collateral swap of {} {:?} to {:?} (flash: {})",
            request.from_amount, from_asset, to_asset, request.flash
        );

        let mut intents = Vec::new();
        self.approve_if_needed(
            &mut intents,
            from_a_token,
            user,
            adapter,
            &request.from_amount,
        )
        .await?;

        let from_decimals = self.erc20.decimals_of(from_asset).await?;
        let amount = to_base_units(&request.from_amount, from_decimals)?;
        let to_decimals = self.erc20.decimals_of(to_asset).await?;
        let min_to_amount = to_base_units(&request.min_to_amount, to_decimals)?;

        if request.flash {
            let offset = if request.swap_all {
                augustus_from_amount_offset(&request.swap_call_data)?
            } else {
                0
            };
            let params = swap_collateral_params(
                to_asset,
                min_to_amount,
                offset,
                &request.swap_call_data,
                augustus,
                &permit,
            );
            let flash_amount = if request.swap_all {
                with_surplus(amount)
            } else {
                amount
            };

            let intent = self
                .flash_loan(
                    user,
                    ProtocolAction::SwapCollateral,
                    adapter,
                    from_asset,
                    flash_amount,
                    on_behalf_of,
                    params,
                    referral_code,
                )?
                .after(&intents);
            intents.push(intent);
            return Ok(intents);
        }

        let intent = self.swap_adapter.swap_and_deposit(
            SwapAndDepositParams {
                user,
                asset_to_swap_from: from_asset,
                asset_to_swap_to: to_asset,
                amount_to_swap: amount,
                min_amount_to_receive: min_to_amount,
                swap_all: request.swap_all,
                swap_calldata: request.swap_call_data,
                augustus,
                permit,
            },
            &intents,
        )?;
        intents.push(intent);

        Ok(intents)
    }

    /// Repay debt with collateral, via flash loan or a direct adapter call
    pub async fn repay_with_collateral(
        &self,
        request: RepayWithCollateralRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let adapter = self.repay_adapter.address()?;
        let user = require_address("user", &request.user)?;
        let from_asset = require_address("fromAsset", &request.from_asset)?;
        let from_a_token = require_address("fromAToken", &request.from_a_token)?;
        let asset_to_repay = require_address("assetToRepay", &request.asset_to_repay)?;
        let on_behalf_of = optional_address("onBehalfOf", request.on_behalf_of.as_deref(), user)?;
        require_positive_amount("repayWithAmount", &request.repay_with_amount)?;
        require_positive_amount("repayAmount", &request.repay_amount)?;
        let permit = request.permit_signature.clone().unwrap_or_default();
        let referral_code = request.referral_code.unwrap_or(0);

        info!(
            "Building repayment of {} {:?} with {} {:?} collateral (flash: {})",
            request.repay_amount,
            asset_to_repay,
            request.repay_with_amount,
            from_asset,
            request.flash
        );

        let mut intents = Vec::new();
        self.approve_if_needed(
            &mut intents,
            from_a_token,
            user,
            adapter,
            &request.repay_with_amount,
        )
        .await?;

        let from_decimals = self.erc20.decimals_of(from_asset).await?;
        let collateral_amount = to_base_units(&request.repay_with_amount, from_decimals)?;
        let repay_decimals = self.erc20.decimals_of(asset_to_repay).await?;
        let repay_amount = to_base_units(&request.repay_amount, repay_decimals)?;
        let repay_amount = if request.repay_all_debt {
            with_surplus(repay_amount)
        } else {
            repay_amount
        };

        if request.flash {
            let params = repay_with_collateral_params(
                from_asset,
                collateral_amount,
                request.rate_mode,
                &permit,
                request.use_eth_path,
            );

            let intent = self
                .flash_loan(
                    user,
                    ProtocolAction::RepayCollateral,
                    adapter,
                    asset_to_repay,
                    repay_amount,
                    on_behalf_of,
                    params,
                    referral_code,
                )?
                .after(&intents);
            intents.push(intent);
            return Ok(intents);
        }

        let intent = self.repay_adapter.swap_and_repay(
            SwapAndRepayParams {
                user,
                collateral_asset: from_asset,
                debt_asset: asset_to_repay,
                collateral_amount,
                debt_repay_amount: repay_amount,
                debt_rate_mode: request.rate_mode,
                permit,
                use_eth_path: request.use_eth_path,
            },
            &intents,
        )?;
        intents.push(intent);

        Ok(intents)
    }

    /// Liquidate a position with flash-borrowed funds
    pub async fn flash_liquidation(
        &self,
        request: FlashLiquidationRequest,
    ) -> Result<Vec<TransactionIntent>> {
        self.pool_address()?;
        let adapter = self.flash_liquidation_address()?;
        let user = require_address("user", &request.user)?;
        let collateral_asset = require_address("collateralAsset", &request.collateral_asset)?;
        let borrowed_asset = require_address("borrowedAsset", &request.borrowed_asset)?;
        require_positive_amount("debtTokenCover", &request.debt_token_cover)?;
        let initiator = require_address("initiator", &request.initiator)?;

        info!("Building flash liquidation of {:?} by {:?}", user, initiator);

        let decimals = self.erc20.decimals_of(borrowed_asset).await?;
        let debt = to_base_units(&request.debt_token_cover, decimals)?;
        let (debt_to_cover, flash_amount) = if request.liquidate_all {
            (MAX_UINT_AMOUNT, with_surplus(debt))
        } else {
            (debt, debt)
        };

        let params = flash_liquidation_params(
            collateral_asset,
            borrowed_asset,
            user,
            debt_to_cover,
            request.use_eth_path,
        );

        Ok(vec![self.flash_loan(
            initiator,
            ProtocolAction::LiquidationFlash,
            adapter,
            borrowed_asset,
            flash_amount,
            initiator,
            params,
            0,
        )?])
    }

    /// Enter or leave an efficiency-mode category
    pub fn set_user_e_mode(&self, request: SetUserEModeRequest) -> Result<Vec<TransactionIntent>> {
        let user = require_address("user", &request.user)?;

        Ok(vec![self.pool_call(
            user,
            ProtocolAction::Default,
            "setUserEMode(uint8)",
            vec![abi::uint(request.category_id)],
        )?])
    }
}
