//! Issuer JSON-RPC endpoint
//!
//! Serves the `privacy_*` namespace. Every outcome, success or failure, is
//! an ordinary JSON-RPC envelope over a 200 response; transport-level
//! status codes are reserved for bodies that are not JSON-RPC at all.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use serde_json::json;

use crate::api::state::AppState;
use crate::error::GatewayError;
use crate::rpc::JsonrpcMessage;

/// Standard JSON-RPC parse-error code
const ERR_PARSE: i64 = -32700;
/// Standard JSON-RPC invalid-request code
const ERR_INVALID_REQUEST: i64 = -32600;
/// Standard JSON-RPC method-not-found code
const ERR_METHOD_NOT_FOUND: i64 = -32601;
/// Standard JSON-RPC invalid-params code
const ERR_INVALID_PARAMS: i64 = -32602;

/// POST / - JSON-RPC endpoint for the privacy namespace
pub async fn rpc_endpoint(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Json<JsonrpcMessage> {
    let Some(request) = JsonrpcMessage::from_bytes(&body) else {
        return Json(JsonrpcMessage::error(None, None, ERR_PARSE, "parse error"));
    };

    let id = request.id.clone();
    let version = request.version.clone();

    let Some(method) = request.method.as_deref() else {
        return Json(JsonrpcMessage::error(
            id,
            version,
            ERR_INVALID_REQUEST,
            "invalid request",
        ));
    };

    let outcome = dispatch(&state, method, &request).await;
    Json(match outcome {
        Ok(result) => JsonrpcMessage::success(id, version, json!(result)),
        Err(Dispatch::UnknownMethod) => {
            JsonrpcMessage::error(id, version, ERR_METHOD_NOT_FOUND, "method not found")
        }
        Err(Dispatch::InvalidParams) => {
            JsonrpcMessage::error(id, version, ERR_INVALID_PARAMS, "invalid params")
        }
        Err(Dispatch::Gateway(e)) => {
            JsonrpcMessage::error(id, version, e.rpc_error_code(), &e.to_string())
        }
    })
}

enum Dispatch {
    UnknownMethod,
    InvalidParams,
    Gateway(GatewayError),
}

impl From<GatewayError> for Dispatch {
    fn from(e: GatewayError) -> Self {
        Dispatch::Gateway(e)
    }
}

async fn dispatch(
    state: &AppState,
    method: &str,
    request: &JsonrpcMessage,
) -> Result<&'static str, Dispatch> {
    match method {
        "privacy_setToken" => {
            let (token, addresses, signature) = issuance_params(request)?;
            Ok(state.issuer.issue_token(&token, &addresses, &signature).await?)
        }
        "privacy_updateToken" => {
            let (token, addresses, signature) = issuance_params(request)?;
            Ok(state
                .issuer
                .update_token(&token, &addresses, &signature)
                .await?)
        }
        "privacy_getToken" => Ok(state.issuer.get_token().await?),
        _ => Err(Dispatch::UnknownMethod),
    }
}

fn issuance_params(request: &JsonrpcMessage) -> Result<(String, Vec<String>, String), Dispatch> {
    let params = request.params.clone().ok_or(Dispatch::InvalidParams)?;
    serde_json::from_value(params).map_err(|_| Dispatch::InvalidParams)
}
