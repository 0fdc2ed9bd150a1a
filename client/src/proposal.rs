//! Governance proposal records.

use crate::abi;
use crate::error::{ClientError, Result};
use crate::metadata::{MetadataFetcher, ProposalMetadata};
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a proposal, in on-chain code order
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Canceled,
    Active,
    Failed,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl ProposalState {
    const ORDERED: [ProposalState; 8] = [
        ProposalState::Pending,
        ProposalState::Canceled,
        ProposalState::Active,
        ProposalState::Failed,
        ProposalState::Succeeded,
        ProposalState::Queued,
        ProposalState::Expired,
        ProposalState::Executed,
    ];

    /// State for an on-chain state code
    pub fn from_code(code: u64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ORDERED.get(index).copied())
            .ok_or(ClientError::InvalidState(code))
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Proposal as returned by the governance helper
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProposal {
    pub total_voting_supply: U256,
    pub minimum_quorum: U256,
    pub minimum_diff: U256,
    pub execution_time_with_grace_period: U256,
    pub proposal_created: U256,
    pub id: U256,
    pub creator: Address,
    pub executor: Address,
    pub targets: Vec<Address>,
    pub values: Vec<U256>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<Bytes>,
    pub with_delegatecalls: Vec<bool>,
    pub start_block: U256,
    pub end_block: U256,
    pub execution_time: U256,
    pub for_votes: U256,
    pub against_votes: U256,
    pub executed: bool,
    pub canceled: bool,
    pub strategy: Address,
    pub ipfs_hash: H256,
    pub proposal_state: u64,
}

impl RawProposal {
    /// ABI type of one `ProposalStats` tuple
    pub fn param_type() -> ParamType {
        let uint = || ParamType::Uint(256);
        let array = |inner: ParamType| ParamType::Array(Box::new(inner));

        ParamType::Tuple(vec![
            uint(),
            uint(),
            uint(),
            uint(),
            uint(),
            uint(),
            ParamType::Address,
            ParamType::Address,
            array(ParamType::Address),
            array(uint()),
            array(ParamType::String),
            array(ParamType::Bytes),
            array(ParamType::Bool),
            uint(),
            uint(),
            uint(),
            uint(),
            uint(),
            ParamType::Bool,
            ParamType::Bool,
            ParamType::Address,
            ParamType::FixedBytes(32),
            ParamType::Uint(8),
        ])
    }

    /// Decode a `ProposalStats` tuple
    pub fn from_token(token: Token) -> Result<Self> {
        let mut fields = abi::as_tuple(token)?.into_iter();
        let mut next = || {
            fields
                .next()
                .ok_or_else(|| ClientError::InvalidResponse("proposal tuple is too short".into()))
        };

        Ok(Self {
            total_voting_supply: abi::as_uint(next()?)?,
            minimum_quorum: abi::as_uint(next()?)?,
            minimum_diff: abi::as_uint(next()?)?,
            execution_time_with_grace_period: abi::as_uint(next()?)?,
            proposal_created: abi::as_uint(next()?)?,
            id: abi::as_uint(next()?)?,
            creator: abi::as_address(next()?)?,
            executor: abi::as_address(next()?)?,
            targets: decode_array(next()?, abi::as_address)?,
            values: decode_array(next()?, abi::as_uint)?,
            signatures: decode_array(next()?, abi::as_string)?,
            calldatas: decode_array(next()?, abi::as_bytes)?,
            with_delegatecalls: decode_array(next()?, abi::as_bool)?,
            start_block: abi::as_uint(next()?)?,
            end_block: abi::as_uint(next()?)?,
            execution_time: abi::as_uint(next()?)?,
            for_votes: abi::as_uint(next()?)?,
            against_votes: abi::as_uint(next()?)?,
            executed: abi::as_bool(next()?)?,
            canceled: abi::as_bool(next()?)?,
            strategy: abi::as_address(next()?)?,
            ipfs_hash: abi::as_bytes32(next()?)?,
            proposal_state: to_u64("proposalState", abi::as_uint(next()?)?)?,
        })
    }
}

fn decode_array<T>(token: Token, decode: fn(Token) -> Result<T>) -> Result<Vec<T>> {
    abi::as_array(token)?.into_iter().map(decode).collect()
}

fn to_u64(field: &str, value: U256) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(ClientError::InvalidResponse(format!(
            "{} {} does not fit in 64 bits",
            field, value
        )));
    }
    Ok(value.as_u64())
}

/// Proposal with on-chain data and its off-chain description
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub id: u64,
    pub creator: Address,
    pub executor: Address,
    pub targets: Vec<Address>,
    pub values: Vec<String>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<Bytes>,
    pub with_delegatecalls: Vec<bool>,
    pub start_block: u64,
    pub end_block: u64,
    pub execution_time: String,
    pub for_votes: String,
    pub against_votes: String,
    pub executed: bool,
    pub canceled: bool,
    pub strategy: Address,
    pub state: ProposalState,
    pub minimum_quorum: String,
    pub minimum_diff: String,
    pub execution_time_with_grace_period: String,
    pub proposal_created: u64,
    pub total_voting_supply: String,
    #[serde(flatten)]
    pub metadata: ProposalMetadata,
}

/// Normalize a raw proposal and attach its metadata.
///
/// Identifiers, block numbers and the creation timestamp become `u64`; vote
/// tallies and other large quantities become decimal strings. Metadata that
/// cannot be fetched is replaced by a placeholder.
pub async fn parse_proposal(raw: RawProposal, fetcher: &MetadataFetcher) -> Result<ProposalRecord> {
    let state = ProposalState::from_code(raw.proposal_state)?;
    let id = to_u64("id", raw.id)?;
    let start_block = to_u64("startBlock", raw.start_block)?;
    let end_block = to_u64("endBlock", raw.end_block)?;
    let proposal_created = to_u64("proposalCreated", raw.proposal_created)?;

    let metadata = fetcher.fetch(raw.ipfs_hash).await;

    Ok(ProposalRecord {
        id,
        creator: raw.creator,
        executor: raw.executor,
        targets: raw.targets,
        values: raw.values.iter().map(U256::to_string).collect(),
        signatures: raw.signatures,
        calldatas: raw.calldatas,
        with_delegatecalls: raw.with_delegatecalls,
        start_block,
        end_block,
        execution_time: raw.execution_time.to_string(),
        for_votes: raw.for_votes.to_string(),
        against_votes: raw.against_votes.to_string(),
        executed: raw.executed,
        canceled: raw.canceled,
        strategy: raw.strategy,
        state,
        minimum_quorum: raw.minimum_quorum.to_string(),
        minimum_diff: raw.minimum_diff.to_string(),
        execution_time_with_grace_period: raw.execution_time_with_grace_period.to_string(),
        proposal_created,
        total_voting_supply: raw.total_voting_supply.to_string(),
        metadata,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::metadata::{ipfs_locator, MetadataCache, UNAVAILABLE_METADATA};
    use assert_matches::assert_matches;
    use std::time::Duration;
    use test_case::test_case;

    /// Encoded helper tuple for proposal `id` in `state`
    pub(crate) fn proposal_token(id: u64, state: u8) -> Token {
        let uint = |value: u64| Token::Uint(U256::from(value));

        Token::Tuple(vec![
            Token::Uint(U256::exp10(24)),
            uint(200),
            uint(50),
            uint(1_700_864_000),
            uint(1_700_000_000),
            uint(id),
            Token::Address(Address::from_low_u64_be(0xc1)),
            Token::Address(Address::from_low_u64_be(0xe1)),
            Token::Array(vec![Token::Address(Address::from_low_u64_be(0x71))]),
            Token::Array(vec![uint(0)]),
            Token::Array(vec![Token::String("execute()".into())]),
            Token::Array(vec![Token::Bytes(vec![0x01, 0x02])]),
            Token::Array(vec![Token::Bool(true)]),
            uint(15_000_000),
            uint(15_019_200),
            uint(0),
            Token::Uint(U256::exp10(21)),
            uint(0),
            Token::Bool(false),
            Token::Bool(false),
            Token::Address(Address::from_low_u64_be(0x57)),
            Token::FixedBytes(vec![0xab; 32]),
            uint(state as u64),
        ])
    }

    fn unreachable_fetcher() -> MetadataFetcher {
        MetadataFetcher::with_cache(
            "http://127.0.0.1:1/ipfs",
            Duration::from_millis(200),
            MetadataCache::new(),
        )
        .unwrap()
    }

    #[test_case(0 => ProposalState::Pending)]
    #[test_case(2 => ProposalState::Active)]
    #[test_case(7 => ProposalState::Executed)]
    fn state_codes(code: u64) -> ProposalState {
        ProposalState::from_code(code).unwrap()
    }

    #[test]
    fn out_of_range_state() {
        assert_matches!(ProposalState::from_code(8), Err(ClientError::InvalidState(8)));
        assert_matches!(
            ProposalState::from_code(u64::MAX),
            Err(ClientError::InvalidState(u64::MAX))
        );
    }

    #[test]
    fn decode_helper_tuple() {
        let token = proposal_token(7, 2);
        let encoded = ethers::abi::encode(&[token.clone()]);
        let decoded = ethers::abi::decode(&[RawProposal::param_type()], &encoded).unwrap();
        assert_eq!(decoded, vec![token.clone()]);

        let raw = RawProposal::from_token(token).unwrap();
        assert_eq!(raw.id, U256::from(7u64));
        assert_eq!(raw.signatures, vec!["execute()".to_string()]);
        assert_eq!(raw.ipfs_hash, H256::repeat_byte(0xab));
        assert_eq!(raw.proposal_state, 2);
    }

    #[test]
    fn short_tuple_is_rejected() {
        assert_matches!(
            RawProposal::from_token(Token::Tuple(vec![Token::Uint(U256::one())])),
            Err(ClientError::InvalidResponse(_))
        );
    }

    #[tokio::test]
    async fn parse_with_unavailable_metadata() {
        let raw = RawProposal::from_token(proposal_token(7, 2)).unwrap();
        let record = parse_proposal(raw, &unreachable_fetcher()).await.unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.state, ProposalState::Active);
        assert_eq!(record.for_votes, "1000000000000000000000");
        assert_eq!(record.total_voting_supply, "1000000000000000000000000");
        assert_eq!(record.start_block, 15_000_000);
        assert_eq!(record.metadata.ipfs_hash, ipfs_locator(H256::repeat_byte(0xab)));
        assert_eq!(record.metadata.description, UNAVAILABLE_METADATA);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "Active");
        assert_eq!(json["shortDescription"], UNAVAILABLE_METADATA);
        assert!(json.get("metadata").is_none());
    }

    #[tokio::test]
    async fn invalid_state_fails_before_fetching() {
        let raw = RawProposal::from_token(proposal_token(1, 9)).unwrap();
        assert_matches!(
            parse_proposal(raw, &unreachable_fetcher()).await,
            Err(ClientError::InvalidState(9))
        );
    }

    #[tokio::test]
    async fn oversized_id_is_rejected() {
        let mut raw = RawProposal::from_token(proposal_token(1, 0)).unwrap();
        raw.id = U256::from(u64::MAX) + 1;
        assert_matches!(
            parse_proposal(raw, &unreachable_fetcher()).await,
            Err(ClientError::InvalidResponse(_))
        );
    }
}
