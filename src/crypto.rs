//! Keccak-256 hashing and secp256k1 signature recovery

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::error::GatewayError;

/// Length of a recoverable signature: r (32) || s (32) || v (1)
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Keccak-256 over the concatenation of the given chunks
pub fn keccak256(chunks: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// Decode a hex string, tolerating an optional `0x` prefix
pub fn decode_hex(input: &str) -> Result<Vec<u8>, GatewayError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(stripped).map_err(|e| GatewayError::Validation(format!("invalid hex: {e}")))
}

/// Recover the signer's public key from a 65-byte r||s||v signature over
/// a 32-byte digest.
///
/// Accepts both raw (0/1) and legacy (27/28) recovery ids.
pub fn recover_signer(digest: &[u8; 32], signature: &[u8]) -> Result<VerifyingKey, GatewayError> {
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(GatewayError::SignatureVerification(format!(
            "signature must be {RECOVERABLE_SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| GatewayError::SignatureVerification(format!("malformed signature: {e}")))?;

    let v = signature[64];
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
        GatewayError::SignatureVerification(format!("invalid recovery id: {v}"))
    })?;

    VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| GatewayError::SignatureVerification(format!("recovery failed: {e}")))
}

/// Parse an allow-listed backend public key from its hex SEC1 encoding
/// (compressed or uncompressed, `0x`-prefixed or bare).
pub fn parse_public_key(input: &str) -> Result<VerifyingKey, GatewayError> {
    let bytes = decode_hex(input)?;
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|e| GatewayError::Config(format!("invalid public key: {e}")))
}
