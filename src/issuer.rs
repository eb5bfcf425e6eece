//! Token issuance
//!
//! Binds capability tokens to addresses after verifying a signature from an
//! allow-listed backend key. Tokens are opaque bearer secrets: this API
//! writes and overwrites them but never returns one.

use std::sync::Arc;
use std::time::Duration;

use k256::ecdsa::VerifyingKey;
use tokio::time::Instant;

use crate::address::AddressKey;
use crate::cache::TokenCache;
use crate::config::BackendKey;
use crate::crypto::{decode_hex, keccak256, parse_public_key, recover_signer};
use crate::error::{GatewayError, GatewayResult};

/// Result payload returned on successful issuance
pub const SET_TOKEN_OK: &str = "Set token successfully";

/// Issues and refreshes address -> token bindings.
pub struct TokenIssuer {
    cache: Arc<dyn TokenCache>,
    allowed_keys: Vec<VerifyingKey>,
    /// Lifetime applied to each written binding
    issue_ttl: Option<Duration>,
    /// Deadline applied to each cache write
    op_timeout: Duration,
}

impl TokenIssuer {
    /// Build an issuer over `cache`, accepting signatures from `backends`.
    ///
    /// Backend entries whose public key fails to parse are skipped with a
    /// warning; an empty resulting allow-list rejects every issuance.
    pub fn new(
        cache: Arc<dyn TokenCache>,
        backends: &[BackendKey],
        issue_ttl: Option<Duration>,
        op_timeout: Duration,
    ) -> Self {
        let mut allowed_keys = Vec::with_capacity(backends.len());
        for backend in backends {
            match parse_public_key(&backend.pub_key) {
                Ok(key) => allowed_keys.push(key),
                Err(e) => {
                    tracing::warn!(backend = %backend.name, error = %e, "skipping backend key");
                }
            }
        }
        Self {
            cache,
            allowed_keys,
            issue_ttl,
            op_timeout,
        }
    }

    /// Bind `token` to every address in `addresses`.
    ///
    /// Writes are sequential per address with no cross-address atomicity:
    /// the first failing write aborts the call and earlier writes stay in
    /// place. Re-issuing the same tuple is idempotent.
    pub async fn issue_token(
        &self,
        token: &str,
        addresses: &[String],
        signature: &str,
    ) -> GatewayResult<&'static str> {
        self.issue(token, addresses, signature).await
    }

    /// Refresh an existing binding set. Same contract as [`issue_token`];
    /// a previously used signature may be presented again.
    ///
    /// [`issue_token`]: TokenIssuer::issue_token
    pub async fn update_token(
        &self,
        token: &str,
        addresses: &[String],
        signature: &str,
    ) -> GatewayResult<&'static str> {
        self.issue(token, addresses, signature).await
    }

    /// Deliberately unsupported: bound tokens are only ever compared by the
    /// interceptor, never disclosed back over this channel.
    pub async fn get_token(&self) -> GatewayResult<&'static str> {
        Err(GatewayError::MethodNotAllowed(
            "tokens are never returned; use setToken or updateToken".to_string(),
        ))
    }

    /// Backend liveness, as seen by the issuance preflight probe
    pub async fn health(&self) -> bool {
        self.cache.health_check().await
    }

    async fn issue(
        &self,
        token: &str,
        addresses: &[String],
        signature: &str,
    ) -> GatewayResult<&'static str> {
        // probe before any validation or mutation
        if !self.cache.health_check().await {
            return Err(GatewayError::ServiceUnavailable(
                "capability cache is not healthy".to_string(),
            ));
        }

        if token.is_empty() || addresses.is_empty() {
            return Err(GatewayError::Validation(
                "token or address list is empty".to_string(),
            ));
        }
        let keys = canonicalize_addresses(addresses)?;

        let digest = issuance_digest(token, &keys);
        let recovered = recover_signer(&digest, &decode_signature(signature)?)?;
        if !self.allowed_keys.contains(&recovered) {
            return Err(GatewayError::SignatureVerification(
                "recovered key is not allow-listed".to_string(),
            ));
        }

        for key in &keys {
            let deadline = Instant::now() + self.op_timeout;
            self.cache
                .set(key, token, self.issue_ttl, deadline)
                .await
                .map_err(|e| GatewayError::SetTokenFailed(format!("{key}: {e}")))?;
        }

        Ok(SET_TOKEN_OK)
    }
}

/// Canonical message digest for an issuance:
/// Keccak-256(token bytes || address bytes, in order).
pub fn issuance_digest(token: &str, keys: &[AddressKey]) -> [u8; 32] {
    let mut chunks: Vec<&[u8]> = Vec::with_capacity(1 + keys.len());
    chunks.push(token.as_bytes());
    for key in keys {
        chunks.push(key.as_bytes());
    }
    keccak256(&chunks)
}

fn canonicalize_addresses(addresses: &[String]) -> GatewayResult<Vec<AddressKey>> {
    addresses
        .iter()
        .map(|addr| {
            if addr.is_empty() {
                return Err(GatewayError::Validation("address is empty".to_string()));
            }
            AddressKey::parse(addr)
        })
        .collect()
}

fn decode_signature(signature: &str) -> GatewayResult<Vec<u8>> {
    decode_hex(signature)
        .map_err(|_| GatewayError::SignatureVerification("signature is not valid hex".to_string()))
}
