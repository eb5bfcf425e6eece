//! Response interceptor
//!
//! Wraps the underlying RPC handler: buffers the request so it can be
//! replayed, captures the handler's output instead of streaming it to the
//! client, applies the redaction policy, and writes the final bytes once.
//! Parse failures on either envelope degrade to pass-through; the
//! interceptor never fails a request because a body was not the JSON it
//! expected.

use std::io::Write;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, response, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use flate2::{write::GzEncoder, Compression};
use tokio::time::Instant;

use crate::api::state::AppState;
use crate::error::CacheError;
use crate::policy::{self, RedactionDecision, RpcMethod, TokenBindings};
use crate::rpc::JsonrpcMessage;

/// Header carrying the caller's capability token, out-of-band of the
/// JSON envelope
pub const PRIVACY_TOKEN_HEADER: &str = "x-privacy-token";

/// Bound on a buffered request or response body
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// The middleware entry point.
///
/// When the privacy feature is disabled this is a passthrough with no
/// buffering overhead.
pub async fn response_interceptor(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(req).await;
    }

    let started = std::time::Instant::now();
    let (mut parts, body) = req.into_parts();

    let req_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("failed to read request body: {e}"),
            )
                .into_response();
        }
    };

    let caller_token = parts
        .headers
        .get(PRIVACY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    // strip gzip negotiation so the wrapped handler emits bytes we can
    // parse; re-applied when writing out
    let gzip_negotiated = accepts_gzip(&parts.headers);
    if gzip_negotiated {
        parts.headers.remove(header::ACCEPT_ENCODING);
    }

    // the request must be replayable: the wrapped handler consumes one
    // copy, the policy parses the other
    let replayed = Request::from_parts(parts, Body::from(req_bytes.clone()));
    let upstream = next.run(replayed).await;

    let (resp_parts, resp_body) = upstream.into_parts();
    let resp_bytes = match to_bytes(resp_body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer upstream response body");
            Bytes::new()
        }
    };

    let (final_bytes, method) =
        apply_policy(&state, &req_bytes, resp_bytes, caller_token.as_deref()).await;

    tracing::info!(
        method = %method,
        elapsed = ?started.elapsed(),
        "privacy gateway serve"
    );

    finalize(resp_parts, final_bytes, gzip_negotiated)
}

fn accepts_gzip(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("gzip"))
        .unwrap_or(false)
}

/// Parse both envelopes, fetch the bindings the rule needs, and
/// materialize the decision into final body bytes.
///
/// Returns the bytes to emit plus the method name for the serve log.
async fn apply_policy(
    state: &AppState,
    req_bytes: &[u8],
    resp_bytes: Bytes,
    caller_token: Option<&str>,
) -> (Bytes, String) {
    let Some(req_env) = JsonrpcMessage::from_bytes(req_bytes) else {
        return (resp_bytes, String::from("unparsed"));
    };
    let method_name = req_env.method.clone().unwrap_or_default();

    let Some(method) = RpcMethod::parse(&method_name) else {
        // no redaction rule: never blocked or altered
        return (resp_bytes, method_name);
    };
    let Some(resp_env) = JsonrpcMessage::from_bytes(&resp_bytes) else {
        return (resp_bytes, method_name);
    };

    let bindings = match fetch_bindings(state, method, &req_env, &resp_env).await {
        Ok(bindings) => bindings,
        Err(CacheError::Cancelled) => {
            // deadline elapsed mid-lookup: abort cleanly with a service
            // error rather than leak the in-flight operation
            let envelope = JsonrpcMessage::error(
                req_env.id.clone(),
                req_env.version.clone(),
                -32801,
                "timed out consulting the capability cache",
            );
            return (Bytes::from(envelope.to_bytes()), method_name);
        }
        Err(_) => TokenBindings::new(),
    };

    match policy::decide(method, &req_env, &resp_env, caller_token, &bindings) {
        RedactionDecision::Pass => (resp_bytes, method_name),
        RedactionDecision::Error { code, message } => {
            let envelope =
                JsonrpcMessage::error(req_env.id.clone(), req_env.version.clone(), code, &message);
            (Bytes::from(envelope.to_bytes()), method_name)
        }
        RedactionDecision::Rewrite(payload) => {
            let id = resp_env.id.clone().or(req_env.id.clone());
            let version = resp_env.version.clone().or(req_env.version.clone());
            let envelope = JsonrpcMessage::success(id, version, payload);
            (Bytes::from(envelope.to_bytes()), method_name)
        }
    }
}

/// Fetch the token bound to every address the rule will consult.
///
/// Missing bindings and backend failures leave the address absent from the
/// map (fail-closed); only `Cancelled` aborts the request.
async fn fetch_bindings(
    state: &AppState,
    method: RpcMethod,
    req_env: &JsonrpcMessage,
    resp_env: &JsonrpcMessage,
) -> Result<TokenBindings, CacheError> {
    let mut bindings = TokenBindings::new();
    let deadline = Instant::now() + state.op_timeout;

    for key in policy::addresses_of_interest(method, req_env, resp_env) {
        if bindings.contains_key(&key) {
            continue;
        }
        match state.cache.get(&key, deadline).await {
            Ok(token) => {
                tracing::trace!(address = %key, "binding found");
                bindings.insert(key, token);
            }
            Err(CacheError::Cancelled) => return Err(CacheError::Cancelled),
            Err(e) => {
                tracing::trace!(address = %key, error = %e, "no usable binding");
            }
        }
    }
    Ok(bindings)
}

/// Write-once: rebuild the client response from the captured parts and the
/// final bytes, re-applying gzip when it was negotiated.
fn finalize(mut parts: response::Parts, bytes: Bytes, gzip_negotiated: bool) -> Response {
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_ENCODING);

    if gzip_negotiated {
        match gzip_compress(&bytes) {
            Ok(compressed) => {
                parts
                    .headers
                    .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                return Response::from_parts(parts, Body::from(compressed));
            }
            Err(e) => {
                tracing::warn!(error = %e, "gzip encoding failed, sending identity");
            }
        }
    }
    Response::from_parts(parts, Body::from(bytes))
}

fn gzip_compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    // finish() finalizes the stream; no partial gzip ever leaves here
    encoder.finish()
}
