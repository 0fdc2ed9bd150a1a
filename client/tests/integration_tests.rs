//! Integration tests for the lending pool client
//!
//! These tests use mock servers to simulate the JSON-RPC node and the IPFS
//! gateway.

use assert_matches::assert_matches;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use lendpool_client::metadata::{ipfs_locator, UNAVAILABLE_METADATA};
use lendpool_client::{
    abi, ChainProvider, ClientConfig, ClientError, LendingClient, MetadataCache, MetadataFetcher,
    ProposalState, ProtocolAddresses, RpcClient, SupplyRequest, TransactionKind,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

const USER: &str = "0x00000000000000000000000000000000000000a1";
const RESERVE: &str = "0x00000000000000000000000000000000000000d1";

fn pool() -> Address {
    Address::from_low_u64_be(0x50)
}

fn reserve() -> Address {
    Address::from_low_u64_be(0xd1)
}

/// Minimal EVM node answering canned `eth_call` results by target and selector
#[derive(Clone, Default)]
struct FakeNode {
    calls: HashMap<(Address, [u8; 4]), Bytes>,
}

impl FakeNode {
    fn with_call(mut self, to: Address, signature: &str, output: Vec<Token>) -> Self {
        self.calls.insert(
            (to, abi::selector(signature)),
            Bytes::from(ethers::abi::encode(&output)),
        );
        self
    }

    fn eth_call(&self, params: &Value) -> std::result::Result<Value, Value> {
        let to: Address = serde_json::from_value(params[0]["to"].clone()).unwrap();
        let data: Bytes = serde_json::from_value(params[0]["data"].clone()).unwrap();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);

        self.calls
            .get(&(to, selector))
            .map(|output| json!(output))
            .ok_or_else(|| json!({ "code": 3, "message": "execution reverted" }))
    }
}

impl Respond for FakeNode {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let result = match body["method"].as_str().unwrap() {
            "eth_chainId" => Ok(json!("0x1")),
            "eth_blockNumber" => Ok(json!("0x10")),
            "eth_gasPrice" => Ok(json!("0x3b9aca00")),
            "eth_estimateGas" => Ok(json!("0x186a0")),
            "eth_sendTransaction" => Ok(json!(format!("0x{:064x}", 0xbeefu64))),
            "eth_call" => self.eth_call(&body["params"]),
            other => panic!("unexpected RPC method {}", other),
        };

        let envelope = match result {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }),
            Err(error) => json!({ "jsonrpc": "2.0", "id": body["id"], "error": error }),
        };
        ResponseTemplate::new(200).set_body_json(envelope)
    }
}

/// Helper to create test config pointing at the mock servers
fn create_test_config(rpc_url: String, ipfs_url: String) -> ClientConfig {
    ClientConfig::custom(rpc_url, 1)
        .unwrap()
        .with_ipfs_gateway(ipfs_url)
        .with_request_timeout(Duration::from_secs(5))
        .with_max_retries(3)
        .with_retry_config(10, 50, 2.0)
        .with_addresses(
            ProtocolAddresses::default()
                .with_pool(pool())
                .with_governance(Address::from_low_u64_be(0x60), Some(Address::from_low_u64_be(0x61))),
        )
}

fn metadata_fetcher(server: &MockServer) -> MetadataFetcher {
    MetadataFetcher::with_cache(
        format!("{}/ipfs", server.uri()),
        Duration::from_secs(5),
        MetadataCache::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_deposit_end_to_end() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            FakeNode::default()
                .with_call(reserve(), "decimals()", vec![abi::uint(6u8)])
                .with_call(reserve(), "allowance(address,address)", vec![abi::uint(0u8)]),
        )
        .mount(&node)
        .await;

    let client = LendingClient::new(create_test_config(node.uri(), node.uri())).unwrap();
    let intents = client
        .pool()
        .deposit(SupplyRequest {
            user: USER.to_string(),
            reserve: RESERVE.to_string(),
            amount: "100".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(intents.len(), 2);
    assert_eq!(intents[0].kind, TransactionKind::Erc20Approval);
    assert_eq!(intents[1].kind, TransactionKind::PoolAction);

    let deposit = intents[1].calldata().unwrap();
    assert_eq!(
        &deposit[..4],
        &abi::selector("deposit(address,uint256,address,uint16)")
    );
    let args = ethers::abi::decode(
        &[
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Address,
            ParamType::Uint(16),
        ],
        &deposit[4..],
    )
    .unwrap();
    assert_eq!(args[1], Token::Uint(U256::from(100_000_000u64)));

    let gas = intents[1].gas(false).await.unwrap();
    assert_eq!(gas.gas_limit, U256::from(300_000u64));
    assert_eq!(gas.gas_price, U256::from(1_000_000_000u64));

    let hashes = client.submit(&intents).await.unwrap();
    assert_eq!(hashes, vec![H256::from_low_u64_be(0xbeef); 2]);

    let sent = node
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["method"] == "eth_sendTransaction"
        })
        .count();
    assert_eq!(sent, 2);
}

#[tokio::test]
async fn test_health_check() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(FakeNode::default())
        .mount(&node)
        .await;

    let client = LendingClient::new(create_test_config(node.uri(), node.uri())).unwrap();
    assert!(client.health_check().await.unwrap());
    assert_eq!(client.rpc().block_number().await.unwrap(), 16);

    let mut config = create_test_config(node.uri(), node.uri());
    config.chain_id = 137;
    let wrong_chain = LendingClient::new(config).unwrap();
    assert_matches!(wrong_chain.health_check().await, Err(ClientError::Config(_)));
}

#[tokio::test]
async fn test_transport_retries_on_503() {
    let node = MockServer::start().await;

    // First request fails, the retry succeeds
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .mount(&node)
        .await;
    Mock::given(method("POST"))
        .respond_with(FakeNode::default())
        .mount(&node)
        .await;

    let rpc = RpcClient::new(&create_test_config(node.uri(), node.uri())).unwrap();
    assert_eq!(rpc.chain_id().await.unwrap(), 1);
}

#[tokio::test]
async fn test_transport_gives_up_on_persistent_503() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(4)
        .mount(&node)
        .await;

    let rpc = RpcClient::new(&create_test_config(node.uri(), node.uri())).unwrap();
    assert_matches!(rpc.gas_price().await, Err(ClientError::MaxRetriesExceeded(3)));
}

#[tokio::test]
async fn test_rpc_errors_are_not_retried() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(FakeNode::default())
        .expect(1)
        .mount(&node)
        .await;

    let rpc = RpcClient::new(&create_test_config(node.uri(), node.uri())).unwrap();
    let result = rpc
        .call(reserve(), abi::encode_call("decimals()", &[]))
        .await;

    assert_matches!(result, Err(ClientError::Rpc(message)) if message.contains("execution reverted"));
}

#[tokio::test]
async fn test_metadata_is_fetched_once() {
    let gateway = MockServer::start().await;
    let hash = H256::repeat_byte(0x11);
    let locator = ipfs_locator(hash);

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", locator)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Onboard rETH",
            "description": "Full text",
            "shortDescription": "Adds rETH as collateral",
            "aip": 150,
            "author": "Risk team"
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    let fetcher = metadata_fetcher(&gateway);
    let first = fetcher.fetch(hash).await;
    let second = fetcher.fetch(hash).await;

    assert_eq!(first, second);
    assert_eq!(first.title, "Onboard rETH");
    assert_eq!(first.aip, Some(json!(150)));
    assert_eq!(first.ipfs_hash, locator);
    assert_eq!(first.discussions, None);
    assert_eq!(fetcher.cache().len(), 1);
}

#[tokio::test]
async fn test_metadata_document_passes_through() {
    let gateway = MockServer::start().await;
    let hash = H256::repeat_byte(0x44);
    let locator = ipfs_locator(hash);
    let document = json!({
        "title": "Freeze stETH",
        "description": "Full text",
        "shortDescription": "Freezes the reserve",
        "aip": "AIP-12",
        "author": {"name": "Risk team", "handle": "@risk"},
        "discussions": "https://forum.example/t/12",
        "created": "2022-03-01",
        "preview": false
    });

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", locator)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document.clone()))
        .mount(&gateway)
        .await;

    let fetcher = metadata_fetcher(&gateway);
    let metadata = fetcher.fetch(hash).await;

    assert_eq!(metadata.title, "Freeze stETH");
    assert_eq!(metadata.aip, Some(json!("AIP-12")));
    assert_eq!(metadata.author, Some(json!({"name": "Risk team", "handle": "@risk"})));
    assert_eq!(metadata.discussions, Some(json!("https://forum.example/t/12")));

    let mut expected = document;
    expected["ipfsHash"] = json!(locator);
    assert_eq!(serde_json::to_value(&metadata).unwrap(), expected);
    assert_eq!(fetcher.cache().len(), 1);
}

#[tokio::test]
async fn test_metadata_missing_field_yields_placeholder() {
    let gateway = MockServer::start().await;
    let hash = H256::repeat_byte(0x22);
    let locator = ipfs_locator(hash);

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", locator)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "No summary",
            "description": "Full text"
        })))
        .mount(&gateway)
        .await;

    let fetcher = metadata_fetcher(&gateway);
    let metadata = fetcher
        .fetch_hex(&format!("0x{}", "22".repeat(32)))
        .await
        .unwrap();

    assert_eq!(metadata.title, format!("Proposal - {}", locator));
    assert_eq!(metadata.short_description, UNAVAILABLE_METADATA);
    assert_eq!(metadata.aip, Some(json!(0)));
    assert!(fetcher.cache().is_empty());
}

#[tokio::test]
async fn test_gateway_failures_are_not_cached() {
    let gateway = MockServer::start().await;
    let hash = H256::repeat_byte(0x33);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&gateway)
        .await;

    let fetcher = metadata_fetcher(&gateway);
    for _ in 0..2 {
        let metadata = fetcher.fetch(hash).await;
        assert_eq!(metadata.description, UNAVAILABLE_METADATA);
    }
}

#[tokio::test]
async fn test_list_proposals_with_metadata() {
    let node = MockServer::start().await;
    let gateway = MockServer::start().await;
    let hash = H256::repeat_byte(0x44);

    let proposal = Token::Tuple(vec![
        abi::uint(1_000_000u64),
        abi::uint(200u64),
        abi::uint(50u64),
        abi::uint(0u64),
        abi::uint(1_700_000_000u64),
        abi::uint(42u64),
        Token::Address(Address::from_low_u64_be(0xc1)),
        Token::Address(Address::from_low_u64_be(0xe1)),
        Token::Array(vec![]),
        Token::Array(vec![]),
        Token::Array(vec![]),
        Token::Array(vec![]),
        Token::Array(vec![]),
        abi::uint(100u64),
        abi::uint(200u64),
        abi::uint(0u64),
        abi::uint(7_000u64),
        abi::uint(10u64),
        Token::Bool(false),
        Token::Bool(false),
        Token::Address(Address::from_low_u64_be(0x57)),
        abi::bytes32(hash),
        abi::uint(2u8),
    ]);

    Mock::given(method("POST"))
        .respond_with(FakeNode::default().with_call(
            Address::from_low_u64_be(0x61),
            "getProposals(uint256,uint256,address)",
            vec![Token::Array(vec![proposal])],
        ))
        .mount(&node)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", ipfs_locator(hash))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Raise caps",
            "description": "Full text",
            "shortDescription": "Raises supply caps"
        })))
        .mount(&gateway)
        .await;

    let client = LendingClient::new(create_test_config(
        node.uri(),
        format!("{}/ipfs", gateway.uri()),
    ))
    .unwrap();
    let proposals = client.governance().get_proposals(0, 10).await.unwrap();

    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].id, 42);
    assert_eq!(proposals[0].state, ProposalState::Active);
    assert_eq!(proposals[0].for_votes, "7000");
    assert_eq!(proposals[0].metadata.title, "Raise caps");

    let json = serde_json::to_value(&proposals[0]).unwrap();
    assert_eq!(json["shortDescription"], "Raises supply caps");
    assert_eq!(json["proposalCreated"], 1_700_000_000u64);
}

#[tokio::test]
async fn test_concurrent_builds() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            FakeNode::default()
                .with_call(reserve(), "decimals()", vec![abi::uint(6u8)])
                .with_call(reserve(), "allowance(address,address)", vec![Token::Uint(U256::MAX)]),
        )
        .mount(&node)
        .await;

    let client = std::sync::Arc::new(
        LendingClient::new(create_test_config(node.uri(), node.uri())).unwrap(),
    );

    let mut handles = vec![];
    for amount in 1..=10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .pool()
                .supply(SupplyRequest {
                    user: USER.to_string(),
                    reserve: RESERVE.to_string(),
                    amount: amount.to_string(),
                    ..Default::default()
                })
                .await
        }));
    }

    for handle in handles {
        let intents = handle.await.unwrap().unwrap();
        assert_eq!(intents.len(), 1);
    }
}
