//! Transaction intents and the types shared by the builders.
//!
//! A [`TransactionIntent`] is one on-chain transaction a caller still has to
//! sign and send. Builders return them as an ordered `Vec`; approvals always
//! come before the call that spends the allowance.

use crate::abi;
use crate::error::{ClientError, Result};
use crate::provider::ChainProvider;
use ethers::abi::Token;
use ethers::types::{Address, Bytes, Signature, TransactionRequest, H160, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Address standing in for the chain's native asset in reserve parameters
pub const NATIVE_ASSET_ADDRESS: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// [`NATIVE_ASSET_ADDRESS`] as an address
pub const NATIVE_ASSET: Address = H160([0xee; 20]);

/// Estimated gas is padded by this percentage before submission
pub const GAS_SURPLUS_PERCENT: u64 = 30;

/// Whether `reserve` is the native-asset sentinel
pub fn is_native_asset(reserve: &Address) -> bool {
    *reserve == NATIVE_ASSET
}

/// Deferred calldata encoder
pub type CalldataProducer = Arc<dyn Fn() -> Result<Bytes> + Send + Sync>;

/// Transaction kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// ERC-20 allowance approval
    Erc20Approval,
    /// Lending pool action
    PoolAction,
    /// Governance action
    GovernanceAction,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Erc20Approval => write!(f, "ERC20_APPROVAL"),
            TransactionKind::PoolAction => write!(f, "POOL_ACTION"),
            TransactionKind::GovernanceAction => write!(f, "GOVERNANCE_ACTION"),
        }
    }
}

/// Protocol action, used to pick gas recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolAction {
    /// Anything without a dedicated recommendation
    Default,
    /// Supply / deposit
    Supply,
    /// Withdraw
    Withdraw,
    /// Repay
    Repay,
    /// Direct liquidation
    LiquidationCall,
    /// Flash-loan liquidation
    LiquidationFlash,
    /// Collateral swap
    SwapCollateral,
    /// Repay with collateral
    RepayCollateral,
    /// Native asset withdrawal through the gateway
    WithdrawEth,
    /// Native asset borrow through the gateway
    BorrowEth,
    /// Governance vote
    Vote,
    /// ERC-20 approval
    Approval,
}

/// Gas limit recommendation for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasRecommendation {
    /// Estimates at or below this are raised to `recommended`
    pub limit: u64,
    /// Gas limit used when no estimate is available or the estimate is low
    pub recommended: u64,
}

impl ProtocolAction {
    /// Gas recommendation for this action
    pub fn gas_recommendation(&self) -> GasRecommendation {
        let (limit, recommended) = match self {
            ProtocolAction::Default => (210_000, 210_000),
            ProtocolAction::Supply => (300_000, 300_000),
            ProtocolAction::Withdraw => (230_000, 300_000),
            ProtocolAction::LiquidationCall => (700_000, 700_000),
            ProtocolAction::LiquidationFlash => (995_000, 995_000),
            ProtocolAction::Repay => (300_000, 300_000),
            ProtocolAction::BorrowEth => (450_000, 450_000),
            ProtocolAction::WithdrawEth => (640_000, 640_000),
            ProtocolAction::SwapCollateral => (1_000_000, 1_000_000),
            ProtocolAction::RepayCollateral => (700_000, 700_000),
            ProtocolAction::Vote => (125_000, 125_000),
            ProtocolAction::Approval => (65_000, 65_000),
        };
        GasRecommendation { limit, recommended }
    }
}

/// Borrow interest rate mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestRate {
    /// Stable rate
    Stable,
    /// Variable rate
    Variable,
}

impl InterestRate {
    /// Numeric rate mode expected by the pool
    pub fn code(&self) -> u8 {
        match self {
            InterestRate::Stable => 1,
            InterestRate::Variable => 2,
        }
    }

    /// Rate mode as an ABI token
    pub fn token(&self) -> Token {
        abi::uint(self.code())
    }
}

/// EIP-2612 permit parameters passed to the swap adapters.
///
/// `Default` is the zero-filled permit the adapters treat as "no permit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    /// Permitted amount in base units
    pub amount: U256,
    /// Permit deadline
    pub deadline: U256,
    /// Recovery id
    pub v: u8,
    /// Signature r
    pub r: H256,
    /// Signature s
    pub s: H256,
}

impl PermitSignature {
    /// `(uint256,uint256,uint8,bytes32,bytes32)` tuple token
    pub fn to_token(&self) -> Token {
        Token::Tuple(self.fields())
    }

    /// The five permit fields as flat tokens
    pub fn fields(&self) -> Vec<Token> {
        vec![
            Token::Uint(self.amount),
            Token::Uint(self.deadline),
            abi::uint(self.v),
            abi::bytes32(self.r),
            abi::bytes32(self.s),
        ]
    }
}

/// `v`, `r` and `s` of a 65-byte hex signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSignature {
    /// Recovery id
    pub v: u8,
    /// Signature r
    pub r: H256,
    /// Signature s
    pub s: H256,
}

impl SplitSignature {
    /// Split a `0x`-prefixed 65-byte signature
    pub fn parse(field: &str, signature: &str) -> Result<Self> {
        let parsed = Signature::from_str(signature)
            .map_err(|e| ClientError::validation(field, format!("invalid signature: {}", e)))?;

        // Accept both 0/1 and 27/28 recovery ids
        let v = match parsed.v {
            0 | 1 => parsed.v + 27,
            27 | 28 => parsed.v,
            other => {
                return Err(ClientError::validation(
                    field,
                    format!("invalid recovery id {}", other),
                ))
            }
        };

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        parsed.r.to_big_endian(&mut r);
        parsed.s.to_big_endian(&mut s);

        Ok(Self {
            v: v as u8,
            r: H256::from(r),
            s: H256::from(s),
        })
    }

    /// `v`, `r`, `s` as flat tokens
    pub fn tokens(&self) -> Vec<Token> {
        vec![abi::uint(self.v), abi::bytes32(self.r), abi::bytes32(self.s)]
    }
}

/// Gas limit and price for an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    /// Gas limit
    pub gas_limit: U256,
    /// Gas price
    pub gas_price: U256,
}

/// One transaction the caller still has to sign and send
#[derive(Clone)]
pub struct TransactionIntent {
    /// Target contract
    pub to: Address,
    /// Sender
    pub from: Address,
    /// Kind tag
    pub kind: TransactionKind,
    /// Action used for gas recommendations
    pub action: ProtocolAction,
    /// Native value attached to the call
    pub value: Option<U256>,
    calldata: CalldataProducer,
    provider: Arc<dyn ChainProvider>,
    has_pending_approval: bool,
}

impl fmt::Debug for TransactionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionIntent")
            .field("to", &self.to)
            .field("from", &self.from)
            .field("kind", &self.kind)
            .field("action", &self.action)
            .field("value", &self.value)
            .field("has_pending_approval", &self.has_pending_approval)
            .finish()
    }
}

impl TransactionIntent {
    /// Create an intent whose calldata is produced on demand
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        from: Address,
        to: Address,
        kind: TransactionKind,
        action: ProtocolAction,
        calldata: CalldataProducer,
    ) -> Self {
        Self {
            to,
            from,
            kind,
            action,
            value: None,
            calldata,
            provider,
            has_pending_approval: false,
        }
    }

    /// Create an intent calling `signature` with `args` on `to`
    pub fn call(
        provider: Arc<dyn ChainProvider>,
        from: Address,
        to: Address,
        kind: TransactionKind,
        action: ProtocolAction,
        signature: &'static str,
        args: Vec<Token>,
    ) -> Self {
        let calldata: CalldataProducer = Arc::new(move || Ok(abi::encode_call(signature, &args)));
        Self::new(provider, from, to, kind, action, calldata)
    }

    /// Attach native value
    pub fn with_value(mut self, value: Option<U256>) -> Self {
        self.value = value;
        self
    }

    /// Record the intents queued before this one in the same batch
    pub fn after(mut self, queued: &[TransactionIntent]) -> Self {
        self.has_pending_approval = queued
            .iter()
            .any(|intent| intent.kind == TransactionKind::Erc20Approval);
        self
    }

    /// Whether an approval precedes this intent in its batch
    pub fn has_pending_approval(&self) -> bool {
        self.has_pending_approval
    }

    /// Native value, zero when none is attached
    pub fn value_or_zero(&self) -> U256 {
        self.value.unwrap_or_default()
    }

    /// Encode the calldata
    pub fn calldata(&self) -> Result<Bytes> {
        (self.calldata)()
    }

    /// Transaction request without gas fields
    pub fn request(&self) -> Result<TransactionRequest> {
        Ok(TransactionRequest::new()
            .from(self.from)
            .to(self.to)
            .data(self.calldata()?)
            .value(self.value_or_zero()))
    }

    /// Padded gas limit for this intent
    async fn estimate_gas_limit(&self, request: &TransactionRequest) -> Result<U256> {
        let estimated = self.provider.estimate_gas(request).await?;
        let padded = estimated.saturating_mul(U256::from(100 + GAS_SURPLUS_PERCENT)) / 100;

        let recommendation = self.action.gas_recommendation();
        if padded <= U256::from(recommendation.limit) {
            return Ok(U256::from(recommendation.recommended));
        }
        Ok(padded)
    }

    /// Populate the transaction request, including a padded gas limit
    pub async fn tx(&self) -> Result<TransactionRequest> {
        let request = self.request()?;
        let gas = self.estimate_gas_limit(&request).await?;
        debug!("Populated {} intent to {:?} with gas {}", self.kind, self.to, gas);
        Ok(request.gas(gas))
    }

    /// Gas limit and price for this intent.
    ///
    /// When an approval is still pending in the same batch the node cannot
    /// simulate the call, so the action's recommended gas is returned unless
    /// `force` is set.
    pub async fn gas(&self, force: bool) -> Result<GasEstimate> {
        let gas_price = self.provider.gas_price().await?;

        if self.has_pending_approval && !force {
            return Ok(GasEstimate {
                gas_limit: U256::from(self.action.gas_recommendation().recommended),
                gas_price,
            });
        }

        let request = self.request()?;
        let gas_limit = self.estimate_gas_limit(&request).await?;
        Ok(GasEstimate {
            gas_limit,
            gas_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    fn intent(provider: Arc<MockProvider>, kind: TransactionKind) -> TransactionIntent {
        TransactionIntent::call(
            provider,
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            kind,
            ProtocolAction::Supply,
            "setUserEMode(uint8)",
            vec![abi::uint(1u8)],
        )
    }

    #[test]
    fn test_native_asset_detection() {
        let parsed = crate::validation::require_address("reserve", NATIVE_ASSET_ADDRESS).unwrap();
        assert_eq!(parsed, NATIVE_ASSET);
        assert!(is_native_asset(&parsed));
        assert!(!is_native_asset(&Address::from_low_u64_be(1)));
    }

    #[test]
    fn test_transaction_kind_display() {
        assert_eq!(TransactionKind::Erc20Approval.to_string(), "ERC20_APPROVAL");
        assert_eq!(TransactionKind::PoolAction.to_string(), "POOL_ACTION");
        assert_eq!(
            serde_json::to_string(&TransactionKind::GovernanceAction).unwrap(),
            "\"GOVERNANCE_ACTION\""
        );
    }

    #[test]
    fn test_gas_recommendations() {
        let withdraw = ProtocolAction::Withdraw.gas_recommendation();
        assert_eq!(withdraw.limit, 230_000);
        assert_eq!(withdraw.recommended, 300_000);
        assert_eq!(ProtocolAction::Vote.gas_recommendation().recommended, 125_000);
        assert_eq!(
            ProtocolAction::SwapCollateral.gas_recommendation().limit,
            1_000_000
        );
    }

    #[test]
    fn test_interest_rate_codes() {
        assert_eq!(InterestRate::Stable.code(), 1);
        assert_eq!(InterestRate::Variable.code(), 2);
    }

    #[test]
    fn test_default_permit_is_zero_filled() {
        let permit = PermitSignature::default();
        let encoded = ethers::abi::encode(&[permit.to_token()]);
        assert_eq!(encoded, vec![0u8; 32 * 5]);
    }

    #[test]
    fn test_split_signature() {
        let r = "11".repeat(32);
        let s = "22".repeat(32);
        let split = SplitSignature::parse("signature", &format!("0x{}{}1b", r, s)).unwrap();
        assert_eq!(split.v, 27);
        assert_eq!(split.r, H256::repeat_byte(0x11));
        assert_eq!(split.s, H256::repeat_byte(0x22));

        let normalized = SplitSignature::parse("signature", &format!("0x{}{}01", r, s)).unwrap();
        assert_eq!(normalized.v, 28);

        assert!(SplitSignature::parse("signature", "0x1234").is_err());
    }

    #[tokio::test]
    async fn test_tx_pads_gas_estimate() {
        let provider = Arc::new(MockProvider::new().with_gas_estimate(U256::from(400_000u64)));
        let tx = intent(provider, TransactionKind::PoolAction).tx().await.unwrap();

        assert_eq!(tx.gas, Some(U256::from(520_000u64)));
        assert_eq!(tx.value, Some(U256::zero()));
    }

    #[tokio::test]
    async fn test_tx_raises_low_estimate_to_recommendation() {
        let provider = Arc::new(MockProvider::new().with_gas_estimate(U256::from(100_000u64)));
        let tx = intent(provider, TransactionKind::PoolAction).tx().await.unwrap();

        assert_eq!(tx.gas, Some(U256::from(300_000u64)));
    }

    #[tokio::test]
    async fn test_gas_uses_recommendation_behind_pending_approval() {
        let provider = Arc::new(
            MockProvider::new()
                .with_gas_estimate(U256::from(400_000u64))
                .with_gas_price(U256::from(7u64)),
        );
        let approval = intent(provider.clone(), TransactionKind::Erc20Approval);
        let action = intent(provider, TransactionKind::PoolAction).after(&[approval]);

        let recommended = action.gas(false).await.unwrap();
        assert_eq!(recommended.gas_limit, U256::from(300_000u64));
        assert_eq!(recommended.gas_price, U256::from(7u64));

        let forced = action.gas(true).await.unwrap();
        assert_eq!(forced.gas_limit, U256::from(520_000u64));
    }
}
