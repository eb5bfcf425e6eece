//! Application state shared across handlers and the interceptor

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TokenCache;
use crate::issuer::TokenIssuer;

/// Application state shared across handlers.
///
/// Explicitly constructed and injected at startup; there is no ambient
/// global instance.
pub struct AppState {
    /// Master switch: when false the interceptor is a pure passthrough
    pub enabled: bool,

    /// Capability cache, shared with the issuer
    pub cache: Arc<dyn TokenCache>,

    /// Token issuance API
    pub issuer: TokenIssuer,

    /// Deadline applied to each cache lookup made on the request path
    pub op_timeout: Duration,

    /// Backend label for logs and the health response
    pub backend_label: &'static str,
}
