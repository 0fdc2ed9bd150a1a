//! Governance voting and proposal reads.

use crate::abi;
use crate::amount::format_base_units;
use crate::config::ProtocolAddresses;
use crate::erc20::NATIVE_DECIMALS;
use crate::error::{ClientError, Result};
use crate::metadata::MetadataFetcher;
use crate::proposal::{parse_proposal, ProposalRecord, RawProposal};
use crate::provider::{call_decoded, ChainProvider};
use crate::requests::SubmitVoteRequest;
use crate::types::{ProtocolAction, TransactionIntent, TransactionKind};
use crate::validation::{require_address, require_addresses};
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Voting and proposition power of a user for one governance token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPower {
    /// Voting power
    pub voting_power: U256,
    /// Delegatee of the voting power
    pub delegated_address_voting_power: Address,
    /// Proposition power
    pub proposition_power: U256,
    /// Delegatee of the proposition power
    pub delegated_address_proposition_power: Address,
}

/// Vote cast on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// In favour
    pub support: bool,
    /// Voting power used
    pub voting_power: U256,
}

fn format_ether(value: U256) -> String {
    let formatted = format_base_units(value, NATIVE_DECIMALS);
    if formatted.contains('.') {
        formatted
    } else {
        format!("{}.0", formatted)
    }
}

/// Governance service
#[derive(Clone)]
pub struct GovernanceService {
    provider: Arc<dyn ChainProvider>,
    governance: Option<Address>,
    helper: Option<Address>,
    metadata: MetadataFetcher,
}

impl GovernanceService {
    /// Create a new service
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        addresses: &ProtocolAddresses,
        metadata: MetadataFetcher,
    ) -> Self {
        Self {
            provider,
            governance: addresses.governance,
            helper: addresses.governance_helper,
            metadata,
        }
    }

    fn governance(&self) -> Result<Address> {
        self.governance.ok_or_else(|| {
            ClientError::UnsupportedOperation("governance address is not configured".into())
        })
    }

    fn helper(&self) -> Result<Address> {
        self.helper.ok_or_else(|| {
            ClientError::UnsupportedOperation(
                "governance helper address is not configured".into(),
            )
        })
    }

    /// Vote for or against a proposal
    pub fn submit_vote(&self, request: SubmitVoteRequest) -> Result<Vec<TransactionIntent>> {
        let governance = self.governance()?;
        let user = require_address("user", &request.user)?;

        info!(
            "Building vote on proposal {} by {:?} (support: {})",
            request.proposal_id, user, request.support
        );

        Ok(vec![TransactionIntent::call(
            self.provider.clone(),
            user,
            governance,
            TransactionKind::GovernanceAction,
            ProtocolAction::Vote,
            "submitVote(uint256,bool)",
            vec![abi::uint(request.proposal_id), Token::Bool(request.support)],
        )])
    }

    /// Page of proposals with their metadata
    pub async fn get_proposals(&self, skip: u64, limit: u64) -> Result<Vec<ProposalRecord>> {
        let governance = self.governance()?;
        let helper = self.helper()?;

        let output = call_decoded(
            self.provider.as_ref(),
            helper,
            "getProposals(uint256,uint256,address)",
            &[abi::uint(skip), abi::uint(limit), Token::Address(governance)],
            &[ParamType::Array(Box::new(RawProposal::param_type()))],
        )
        .await?;

        let raw = abi::as_array(abi::single(output)?)?
            .into_iter()
            .map(RawProposal::from_token)
            .collect::<Result<Vec<_>>>()?;
        debug!("Helper returned {} proposals", raw.len());

        try_join_all(
            raw.into_iter()
                .map(|proposal| parse_proposal(proposal, &self.metadata)),
        )
        .await
    }

    /// Voting power of `user` at `block` under `strategy`, in whole tokens
    /// with at least one fractional digit (`"2.0"`, `"1.5"`)
    pub async fn get_voting_power_at(
        &self,
        user: &str,
        block: u64,
        strategy: &str,
    ) -> Result<String> {
        self.governance()?;
        let user = require_address("user", user)?;
        let strategy = require_address("strategy", strategy)?;

        let output = call_decoded(
            self.provider.as_ref(),
            strategy,
            "getVotingPowerAt(address,uint256)",
            &[Token::Address(user), abi::uint(block)],
            &[ParamType::Uint(256)],
        )
        .await?;

        let power = abi::as_uint(abi::single(output)?)?;
        Ok(format_ether(power))
    }

    /// Voting and proposition power of `user` for each of `tokens`
    pub async fn get_tokens_power(&self, user: &str, tokens: &[String]) -> Result<Vec<TokenPower>> {
        let helper = self.helper()?;
        let user = require_address("user", user)?;
        let tokens = require_addresses("tokens", tokens)?;

        let power = ParamType::Tuple(vec![
            ParamType::Uint(256),
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Address,
        ]);
        let output = call_decoded(
            self.provider.as_ref(),
            helper,
            "getTokensPower(address,address[])",
            &[Token::Address(user), abi::address_array(&tokens)],
            &[ParamType::Array(Box::new(power))],
        )
        .await?;

        abi::as_array(abi::single(output)?)?
            .into_iter()
            .map(|entry| {
                let mut fields = abi::as_tuple(entry)?.into_iter();
                match (fields.next(), fields.next(), fields.next(), fields.next()) {
                    (Some(voting), Some(voting_delegate), Some(proposition), Some(proposition_delegate)) => {
                        Ok(TokenPower {
                            voting_power: abi::as_uint(voting)?,
                            delegated_address_voting_power: abi::as_address(voting_delegate)?,
                            proposition_power: abi::as_uint(proposition)?,
                            delegated_address_proposition_power: abi::as_address(
                                proposition_delegate,
                            )?,
                        })
                    }
                    _ => Err(ClientError::InvalidResponse(
                        "power tuple is too short".into(),
                    )),
                }
            })
            .collect()
    }

    /// Vote `user` cast on a proposal; zero power means no vote
    pub async fn get_vote_on_proposal(&self, proposal_id: u64, user: &str) -> Result<Vote> {
        let governance = self.governance()?;
        let user = require_address("user", user)?;

        let output = call_decoded(
            self.provider.as_ref(),
            governance,
            "getVoteOnProposal(uint256,address)",
            &[abi::uint(proposal_id), Token::Address(user)],
            &[ParamType::Tuple(vec![ParamType::Bool, ParamType::Uint(248)])],
        )
        .await?;

        let mut fields = abi::as_tuple(abi::single(output)?)?.into_iter();
        match (fields.next(), fields.next()) {
            (Some(support), Some(voting_power)) => Ok(Vote {
                support: abi::as_bool(support)?,
                voting_power: abi::as_uint(voting_power)?,
            }),
            _ => Err(ClientError::InvalidResponse("vote tuple is too short".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataCache;
    use crate::proposal::tests::proposal_token;
    use crate::proposal::ProposalState;
    use crate::testing::MockProvider;
    use assert_matches::assert_matches;
    use std::time::Duration;

    const USER: &str = "0x00000000000000000000000000000000000000a1";

    fn governance() -> Address {
        Address::from_low_u64_be(0x60)
    }

    fn helper() -> Address {
        Address::from_low_u64_be(0x61)
    }

    fn service(provider: MockProvider, with_helper: bool) -> GovernanceService {
        let addresses = ProtocolAddresses::default()
            .with_governance(governance(), with_helper.then(helper));
        let fetcher = MetadataFetcher::with_cache(
            "http://127.0.0.1:1/ipfs",
            Duration::from_millis(200),
            MetadataCache::new(),
        )
        .unwrap();
        GovernanceService::new(Arc::new(provider), &addresses, fetcher)
    }

    #[test]
    fn test_submit_vote_intent() {
        let intents = service(MockProvider::new(), false)
            .submit_vote(SubmitVoteRequest {
                user: USER.to_string(),
                proposal_id: 12,
                support: true,
            })
            .unwrap();

        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].to, governance());
        assert_eq!(intents[0].kind, TransactionKind::GovernanceAction);
        assert_eq!(intents[0].action, ProtocolAction::Vote);

        let calldata = intents[0].calldata().unwrap();
        assert_eq!(&calldata[..4], &abi::selector("submitVote(uint256,bool)"));
        let args =
            ethers::abi::decode(&[ParamType::Uint(256), ParamType::Bool], &calldata[4..]).unwrap();
        assert_eq!(args, vec![abi::uint(12u64), Token::Bool(true)]);
    }

    #[tokio::test]
    async fn test_get_proposals_parses_each_entry() {
        let provider = MockProvider::new().with_call(
            helper(),
            "getProposals(uint256,uint256,address)",
            vec![Token::Array(vec![proposal_token(1, 7), proposal_token(2, 2)])],
        );

        let proposals = service(provider, true).get_proposals(0, 10).await.unwrap();

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].id, 1);
        assert_eq!(proposals[0].state, ProposalState::Executed);
        assert_eq!(proposals[1].state, ProposalState::Active);
    }

    #[tokio::test]
    async fn test_get_proposals_rejects_unknown_state() {
        let provider = MockProvider::new().with_call(
            helper(),
            "getProposals(uint256,uint256,address)",
            vec![Token::Array(vec![proposal_token(1, 12)])],
        );

        assert_matches!(
            service(provider, true).get_proposals(0, 10).await,
            Err(ClientError::InvalidState(12))
        );
    }

    #[tokio::test]
    async fn test_helper_reads_need_helper_address() {
        let service = service(MockProvider::new(), false);

        assert_matches!(
            service.get_proposals(0, 10).await,
            Err(ClientError::UnsupportedOperation(_))
        );
        assert_matches!(
            service.get_tokens_power(USER, &[]).await,
            Err(ClientError::UnsupportedOperation(_))
        );
    }

    #[tokio::test]
    async fn test_voting_power_is_formatted_in_ether() {
        let strategy = Address::from_low_u64_be(0x57);
        let provider = MockProvider::new().with_call(
            strategy,
            "getVotingPowerAt(address,uint256)",
            vec![Token::Uint(U256::from(1_500_000_000_000_000_000u64))],
        );

        let power = service(provider, false)
            .get_voting_power_at(USER, 15_000_000, &format!("{:?}", strategy))
            .await
            .unwrap();
        assert_eq!(power, "1.5");
    }

    #[test]
    fn test_whole_voting_power_keeps_a_fraction_digit() {
        assert_eq!(format_ether(U256::exp10(18) * 2), "2.0");
        assert_eq!(format_ether(U256::zero()), "0.0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[tokio::test]
    async fn test_tokens_power() {
        let token = Address::from_low_u64_be(0x70);
        let delegate = Address::from_low_u64_be(0xde);
        let provider = MockProvider::new().with_call(
            helper(),
            "getTokensPower(address,address[])",
            vec![Token::Array(vec![Token::Tuple(vec![
                abi::uint(10u64),
                Token::Address(delegate),
                abi::uint(20u64),
                Token::Address(Address::zero()),
            ])])],
        );

        let power = service(provider, true)
            .get_tokens_power(USER, &[format!("{:?}", token)])
            .await
            .unwrap();

        assert_eq!(
            power,
            vec![TokenPower {
                voting_power: U256::from(10u64),
                delegated_address_voting_power: delegate,
                proposition_power: U256::from(20u64),
                delegated_address_proposition_power: Address::zero(),
            }]
        );
    }

    #[tokio::test]
    async fn test_vote_on_proposal() {
        let provider = MockProvider::new().with_call(
            governance(),
            "getVoteOnProposal(uint256,address)",
            vec![Token::Tuple(vec![Token::Bool(false), abi::uint(42u64)])],
        );

        let vote = service(provider, false)
            .get_vote_on_proposal(3, USER)
            .await
            .unwrap();
        assert_eq!(
            vote,
            Vote {
                support: false,
                voting_power: U256::from(42u64),
            }
        );
    }
}
