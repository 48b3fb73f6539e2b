// Copyright (c) 2024 The Botho Foundation

//! Ethereum account address validation and normalization.
//!
//! Addresses are 40 hex digits with an optional `0x` prefix. Input written
//! entirely in lower or upper case is accepted as-is; mixed case input must
//! carry a valid EIP-55 checksum. Accepted addresses are normalized to the
//! `0x`-prefixed lowercase form, which is the identity used for storage.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::{fmt, str::FromStr};

/// Number of hex digits in an address.
const ADDRESS_HEX_LEN: usize = 40;

/// Reasons an address string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("expected 40 hex digits, found {0} characters")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidHex,

    #[error("bad address checksum")]
    BadChecksum,
}

/// A validated account address in normalized (`0x` + lowercase hex) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validate `input` and return its normalized form.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let digits = input.strip_prefix("0x").unwrap_or(input);

        if digits.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength(digits.len()));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex);
        }

        let lower = digits.to_ascii_lowercase();

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && checksum_digits(&lower) != digits {
            return Err(AddressError::BadChecksum);
        }

        Ok(Self(format!("0x{}", lower)))
    }

    /// The normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// EIP-55 checksum encoding of this address.
    pub fn to_checksum(&self) -> String {
        format!("0x{}", checksum_digits(&self.0[2..]))
    }
}

/// Apply EIP-55 casing to 40 lowercase hex digits.
fn checksum_digits(lower_hex: &str) -> String {
    let hash = Keccak256::digest(lower_hex.as_bytes());

    lower_hex
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if c.is_ascii_digit() {
                return c;
            }
            let hash_byte = hash[i / 2];
            let hash_nibble = if i % 2 == 0 {
                hash_byte >> 4
            } else {
                hash_byte & 0x0f
            };
            if hash_nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// Returns true iff `input` is an acceptable account address.
pub fn is_valid_address(input: &str) -> bool {
    Address::parse(input).is_ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
