//! Canonical account-address keys
//!
//! Every cache binding is keyed on the checksummed string form of a 20-byte
//! account address. Parsing accepts any hex casing; two inputs that differ
//! only in case or `0x` prefix produce the same key.

use std::fmt;

use crate::crypto::keccak256;
use crate::error::GatewayError;

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

/// A canonical, checksummed account address.
///
/// Equality and hashing are defined over the raw 20 bytes, so lookups are
/// insensitive to the casing of the original input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressKey {
    bytes: [u8; ADDRESS_LEN],
}

impl AddressKey {
    /// Parse an address from its hex string form (`0x`-prefixed or bare).
    pub fn parse(input: &str) -> Result<Self, GatewayError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        if stripped.len() != ADDRESS_LEN * 2 {
            return Err(GatewayError::Validation(format!(
                "address must be {} hex chars, got {}",
                ADDRESS_LEN * 2,
                stripped.len()
            )));
        }
        let decoded = hex::decode(stripped)
            .map_err(|e| GatewayError::Validation(format!("invalid address hex: {e}")))?;
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Raw address bytes, used when computing the issuance digest
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.bytes
    }

    /// Checksummed string form, the canonical cache key
    pub fn checksummed(&self) -> String {
        let lower = hex::encode(self.bytes);
        let hash = keccak256(&[lower.as_bytes()]);

        let mut out = String::with_capacity(2 + ADDRESS_LEN * 2);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            // nibble i of the hash decides the case of hex char i
            let nibble = (hash[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}
