//! Calldata encoding and return-value helpers on top of the `ethers` ABI codec.

use crate::error::{ClientError, Result};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, H256, U256};

/// Encode a call: 4-byte selector of `signature` followed by the encoded args
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = ethers::utils::id(signature).to_vec();
    data.extend(ethers::abi::encode(args));
    Bytes::from(data)
}

/// Selector of a canonical function signature
pub fn selector(signature: &str) -> [u8; 4] {
    ethers::utils::id(signature)
}

/// `bytes32` token from a hash
pub fn bytes32(value: H256) -> Token {
    Token::FixedBytes(value.as_bytes().to_vec())
}

/// `uint` token from anything convertible into `U256`
pub fn uint(value: impl Into<U256>) -> Token {
    Token::Uint(value.into())
}

/// `address[]` token
pub fn address_array(values: &[Address]) -> Token {
    Token::Array(values.iter().copied().map(Token::Address).collect())
}

/// `uint256[]` token
pub fn uint_array(values: &[U256]) -> Token {
    Token::Array(values.iter().copied().map(Token::Uint).collect())
}

fn unexpected(expected: &str, token: &Token) -> ClientError {
    ClientError::InvalidResponse(format!("expected {}, got {:?}", expected, token))
}

/// Take a `uint` out of a decoded token
pub fn as_uint(token: Token) -> Result<U256> {
    match token {
        Token::Uint(value) => Ok(value),
        other => Err(unexpected("uint", &other)),
    }
}

/// Take an `address` out of a decoded token
pub fn as_address(token: Token) -> Result<Address> {
    match token {
        Token::Address(value) => Ok(value),
        other => Err(unexpected("address", &other)),
    }
}

/// Take a `bool` out of a decoded token
pub fn as_bool(token: Token) -> Result<bool> {
    match token {
        Token::Bool(value) => Ok(value),
        other => Err(unexpected("bool", &other)),
    }
}

/// Take a `string` out of a decoded token
pub fn as_string(token: Token) -> Result<String> {
    match token {
        Token::String(value) => Ok(value),
        other => Err(unexpected("string", &other)),
    }
}

/// Take `bytes` out of a decoded token
pub fn as_bytes(token: Token) -> Result<Bytes> {
    match token {
        Token::Bytes(value) => Ok(Bytes::from(value)),
        other => Err(unexpected("bytes", &other)),
    }
}

/// Take a `bytes32` out of a decoded token
pub fn as_bytes32(token: Token) -> Result<H256> {
    match token {
        Token::FixedBytes(value) if value.len() == 32 => Ok(H256::from_slice(&value)),
        other => Err(unexpected("bytes32", &other)),
    }
}

/// Take the elements out of a dynamic or fixed array token
pub fn as_array(token: Token) -> Result<Vec<Token>> {
    match token {
        Token::Array(values) | Token::FixedArray(values) => Ok(values),
        other => Err(unexpected("array", &other)),
    }
}

/// Take the fields out of a tuple token
pub fn as_tuple(token: Token) -> Result<Vec<Token>> {
    match token {
        Token::Tuple(values) => Ok(values),
        other => Err(unexpected("tuple", &other)),
    }
}

/// Pop the single value of a one-output call
pub fn single(mut tokens: Vec<Token>) -> Result<Token> {
    match (tokens.pop(), tokens.is_empty()) {
        (Some(token), true) => Ok(token),
        _ => Err(ClientError::InvalidResponse(
            "expected exactly one return value".to_string(),
        )),
    }
}
