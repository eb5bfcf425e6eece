//! Test fixtures: gateway routers over canned upstream handlers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use k256::ecdsa::SigningKey;
use tokio::time::Instant;
use tower::ServiceExt;

use privacy_gateway::address::AddressKey;
use privacy_gateway::api::handlers;
use privacy_gateway::api::middleware::{response_interceptor, PRIVACY_TOKEN_HEADER};
use privacy_gateway::api::AppState;
use privacy_gateway::cache::{MemoryTokenCache, TokenCache};
use privacy_gateway::config::{BackendKey, MemoryCacheConfig};
use privacy_gateway::issuer::{issuance_digest, TokenIssuer};

pub const ADDR_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ADDR_B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

/// Deterministic allow-listed signing key and its backend record
pub fn backend_key() -> (SigningKey, BackendKey) {
    let signing = SigningKey::from_slice(&[0x42u8; 32]).expect("valid scalar");
    let sec1 = signing.verifying_key().to_encoded_point(false);
    let backend = BackendKey {
        name: "test-backend".to_string(),
        pub_key: format!("0x{}", hex::encode(sec1.as_bytes())),
    };
    (signing, backend)
}

/// Sign an issuance the way an allow-listed backend would
pub fn sign_issuance(signing: &SigningKey, token: &str, addresses: &[&str]) -> String {
    let keys: Vec<AddressKey> = addresses
        .iter()
        .map(|a| AddressKey::parse(a).expect("valid address"))
        .collect();
    let digest = issuance_digest(token, &keys);
    let (sig, recid) = signing.sign_prehash_recoverable(&digest).expect("sign");
    let mut wire = sig.to_bytes().to_vec();
    wire.push(recid.to_byte());
    format!("0x{}", hex::encode(wire))
}

/// Gateway state over a fresh in-process cache.
///
/// Returns the concrete cache too so tests can seed bindings directly.
pub fn test_state(enabled: bool, backends: &[BackendKey]) -> (Arc<AppState>, Arc<MemoryTokenCache>) {
    let cache = Arc::new(MemoryTokenCache::new(MemoryCacheConfig::default()));
    let dyn_cache: Arc<dyn TokenCache> = cache.clone();
    let state = Arc::new(AppState {
        enabled,
        cache: dyn_cache.clone(),
        issuer: TokenIssuer::new(dyn_cache, backends, None, Duration::from_millis(500)),
        op_timeout: Duration::from_millis(500),
        backend_label: "memory",
    });
    (state, cache)
}

/// Seed a binding directly into the cache
pub async fn seed(cache: &MemoryTokenCache, address: &str, token: &str) {
    let key = AddressKey::parse(address).expect("valid address");
    cache
        .set(&key, token, None, Instant::now() + Duration::from_secs(5))
        .await
        .expect("seed binding");
}

/// A gateway router whose wrapped handler always answers with `body`
pub fn gateway_over_canned(state: Arc<AppState>, body: String) -> Router {
    let upstream = move || {
        let body = body.clone();
        async move { ([(header::CONTENT_TYPE, "application/json")], body) }
    };
    Router::new()
        .route("/", post(upstream))
        .layer(middleware::from_fn_with_state(state, response_interceptor))
}

/// The full gateway router (issuer endpoint + health), as built in main
pub fn gateway_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::rpc_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            response_interceptor,
        ))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// A gateway whose wrapped handler records whether it saw a gzip
/// Accept-Encoding header, then answers with `body`
pub fn gateway_probing_encoding(
    state: Arc<AppState>,
    body: String,
    saw_gzip: Arc<std::sync::atomic::AtomicBool>,
) -> Router {
    let upstream = move |headers: HeaderMap| {
        let body = body.clone();
        let saw_gzip = saw_gzip.clone();
        async move {
            let negotiated = headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("gzip"))
                .unwrap_or(false);
            saw_gzip.store(negotiated, std::sync::atomic::Ordering::SeqCst);
            ([(header::CONTENT_TYPE, "application/json")], body)
        }
    };
    Router::new()
        .route("/", post(upstream))
        .layer(middleware::from_fn_with_state(state, response_interceptor))
}

/// Drive one request through the router
pub async fn call(
    router: Router,
    body: &str,
    caller_token: Option<&str>,
    accept_gzip: bool,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = caller_token {
        builder = builder.header(PRIVACY_TOKEN_HEADER, token);
    }
    if accept_gzip {
        builder = builder.header(header::ACCEPT_ENCODING, "gzip");
    }
    let request = builder.body(Body::from(body.to_string())).expect("request");

    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, headers, bytes)
}

/// GET helper for /health
pub async fn call_health(router: Router) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes)
}

/// Assert a response passed through byte-identical
pub fn assert_passthrough(actual: &Bytes, upstream: &str) {
    assert_eq!(
        std::str::from_utf8(actual).expect("utf8"),
        upstream,
        "expected byte-identical pass-through"
    );
}
