//! Proposal metadata stored on IPFS.
//!
//! Proposals reference their off-chain description by a 32-byte sha256
//! digest. The digest is turned into a CIDv0 locator, fetched once from the
//! configured gateway and kept in a process-wide cache. Content addressed
//! documents never change, so cache entries are never evicted or replaced.
//!
//! Fetching never fails from the caller's point of view: any problem yields a
//! placeholder record and a `warn!` log line, and nothing is cached so a later
//! call can try again.

use crate::error::{ClientError, Result};
use dashmap::DashMap;
use ethers::types::H256;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Text used for every field of the placeholder record
pub const UNAVAILABLE_METADATA: &str =
    "Proposal with invalid metadata format or IPFS gateway is down";

// sha2-256 multihash prefix: function code 0x12, digest length 32
const MULTIHASH_SHA256_PREFIX: [u8; 2] = [0x12, 0x20];

/// Off-chain description of a governance proposal.
///
/// Only the three text fields are checked. Everything else in the document is
/// kept as the gateway returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalMetadata {
    /// Proposal title
    pub title: String,
    /// Full description (markdown)
    pub description: String,
    /// One-paragraph summary
    pub short_description: String,
    /// CIDv0 locator of the document
    pub ipfs_hash: String,
    /// Improvement proposal number, usually numeric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aip: Option<Value>,
    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    /// Discussion link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussions: Option<Value>,
    /// Remaining document fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProposalMetadata {
    /// Placeholder returned when the document cannot be used
    pub fn placeholder(locator: &str) -> Self {
        Self {
            title: format!("Proposal - {}", locator),
            description: UNAVAILABLE_METADATA.to_string(),
            short_description: UNAVAILABLE_METADATA.to_string(),
            ipfs_hash: locator.to_string(),
            aip: Some(Value::from(0)),
            author: Some(Value::from(UNAVAILABLE_METADATA)),
            discussions: Some(Value::from(UNAVAILABLE_METADATA)),
            extra: Map::new(),
        }
    }

    /// Check the required fields of a gateway document and attach its locator
    pub fn from_document(document: &Value, locator: &str) -> Result<Self> {
        let mut fields = document
            .as_object()
            .cloned()
            .ok_or_else(|| ClientError::InvalidMetadata("document is not an object".to_string()))?;

        let title = take_required(&mut fields, "title")?;
        let description = take_required(&mut fields, "description")?;
        let short_description = take_required(&mut fields, "shortDescription")?;
        // the locator always wins over whatever the document claims
        fields.remove("ipfsHash");

        Ok(Self {
            title,
            description,
            short_description,
            ipfs_hash: locator.to_string(),
            aip: fields.remove("aip"),
            author: fields.remove("author"),
            discussions: fields.remove("discussions"),
            extra: fields,
        })
    }
}

fn take_required(fields: &mut Map<String, Value>, key: &str) -> Result<String> {
    match fields.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        _ => Err(ClientError::InvalidMetadata(format!(
            "missing or empty field {}",
            key
        ))),
    }
}

/// CIDv0 locator for a sha256 digest
pub fn ipfs_locator(hash: H256) -> String {
    let mut multihash = Vec::with_capacity(34);
    multihash.extend_from_slice(&MULTIHASH_SHA256_PREFIX);
    multihash.extend_from_slice(hash.as_bytes());
    bs58::encode(multihash).into_string()
}

/// Parse a `0x`-prefixed 32-byte hash reference
pub fn parse_hash(value: &str) -> Result<H256> {
    if !value.starts_with("0x") {
        return Err(ClientError::validation("ipfsHash", "hash must start with 0x"));
    }
    H256::from_str(value).map_err(|e| {
        ClientError::validation("ipfsHash", format!("invalid hash {:?}: {}", value, e))
    })
}

/// Process-scoped metadata cache keyed by locator.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    entries: Arc<DashMap<String, ProposalMetadata>>,
}

impl MetadataCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every fetcher built without an explicit one
    pub fn global() -> Self {
        static GLOBAL: OnceLock<MetadataCache> = OnceLock::new();
        GLOBAL.get_or_init(MetadataCache::new).clone()
    }

    /// Cached metadata for `locator`
    pub fn get(&self, locator: &str) -> Option<ProposalMetadata> {
        self.entries.get(locator).map(|entry| entry.value().clone())
    }

    /// Store `metadata` unless an entry exists; returns the stored entry
    pub fn insert_if_absent(&self, locator: &str, metadata: ProposalMetadata) -> ProposalMetadata {
        self.entries
            .entry(locator.to_string())
            .or_insert(metadata)
            .value()
            .clone()
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches proposal metadata through an IPFS HTTP gateway
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    gateway_url: String,
    cache: MetadataCache,
}

impl MetadataFetcher {
    /// Create a fetcher using the process-wide cache
    pub fn new(gateway_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_cache(gateway_url, timeout, MetadataCache::global())
    }

    /// Create a fetcher with its own cache
    pub fn with_cache(
        gateway_url: impl Into<String>,
        timeout: Duration,
        cache: MetadataCache,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            client,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Cache used by this fetcher
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Gateway link for a locator
    pub fn link(&self, locator: &str) -> String {
        format!("{}/{}", self.gateway_url, locator)
    }

    /// Metadata for a proposal hash, or the placeholder if it is unavailable
    pub async fn fetch(&self, hash: H256) -> ProposalMetadata {
        let locator = ipfs_locator(hash);

        if let Some(cached) = self.cache.get(&locator) {
            debug!("Metadata cache hit for {}", locator);
            return cached;
        }

        match self.fetch_document(&locator).await {
            Ok(metadata) => self.cache.insert_if_absent(&locator, metadata),
            Err(e) => {
                warn!("Failed to fetch proposal metadata {}: {}", locator, e);
                ProposalMetadata::placeholder(&locator)
            }
        }
    }

    /// Same as [`fetch`](Self::fetch) for a hex hash reference
    pub async fn fetch_hex(&self, hash: &str) -> Result<ProposalMetadata> {
        Ok(self.fetch(parse_hash(hash)?).await)
    }

    async fn fetch_document(&self, locator: &str) -> Result<ProposalMetadata> {
        let link = self.link(locator);
        debug!("GET {}", link);

        let response = self
            .client
            .get(&link)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::InvalidMetadata(format!(
                "gateway returned HTTP {}",
                status
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidMetadata(format!("invalid JSON: {}", e)))?;

        ProposalMetadata::from_document(&document, locator)
    }
}
