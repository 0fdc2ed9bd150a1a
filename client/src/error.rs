//! Error types for the lending pool client.
//!
//! This module defines all error types that can occur while building
//! transaction intents, reading chain state, or talking to the JSON-RPC node.

use ethers::providers::{ProviderError, RpcError};
use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// A request parameter failed its precondition check
    #[error("Validation failed for field {field}: {message}")]
    Validation {
        /// Name of the offending request field
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Amount could not be converted to base units
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Pre-flight funds check failed
    #[error("Not enough funds to execute operation")]
    InsufficientFunds,

    /// Operation is not supported for the given parameters
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Proposal metadata document is unusable
    #[error("Invalid proposal metadata: {0}")]
    InvalidMetadata(String),

    /// Proposal state code outside the known state list
    #[error("Invalid proposal state code: {0}")]
    InvalidState(u64),

    /// Error reported by the JSON-RPC node
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The node answered with something other than a JSON-RPC response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// ABI encoding or decoding failed
    #[error("ABI error: {0}")]
    Abi(#[from] ethers::abi::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Max retries exceeded
    #[error("Max retries ({0}) exceeded")]
    MaxRetriesExceeded(usize),
}

impl ClientError {
    /// Build a validation error for `field`
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<ProviderError> for ClientError {
    fn from(error: ProviderError) -> Self {
        if let Some(response) = error.as_error_response() {
            return ClientError::Rpc(format!("{} (code: {})", response.message, response.code));
        }
        if error.as_serde_error().is_some() {
            return ClientError::Transport(error.to_string());
        }
        match error {
            ProviderError::HTTPError(err) => ClientError::Network(err),
            other => ClientError::Rpc(other.to_string()),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error context for retryable operations
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// Number of attempts made
    pub attempts: usize,
    /// Last error encountered
    pub last_error: String,
    /// Total time spent waiting between attempts (in milliseconds)
    pub total_time_ms: u64,
}

impl RetryContext {
    /// Create a new retry context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt
    pub fn record_attempt(&mut self, error: &str, duration_ms: u64) {
        self.attempts += 1;
        self.last_error = error.to_string();
        self.total_time_ms += duration_ms;
    }
}
