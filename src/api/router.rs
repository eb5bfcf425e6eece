//! Router setup and configuration

use std::sync::Arc;

use axum::{middleware, routing::get, routing::post, Router};

use crate::api::handlers;
use crate::api::middleware::response_interceptor;
use crate::api::state::AppState;

/// Create the gateway router.
///
/// The issuer endpoint sits behind the response interceptor exactly like
/// any other wrapped handler; `privacy_*` methods have no redaction rule
/// and pass through it untouched. `/health` is outside the interceptor.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::rpc_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            response_interceptor,
        ))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
