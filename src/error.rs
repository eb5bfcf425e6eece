//! Gateway error types

use axum::http::StatusCode;
use thiserror::Error;

/// Default code for the gateway's reserved JSON-RPC error band.
pub const DEFAULT_PRIVACY_ERROR_CODE: i64 = -32800;

/// Main gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    // ========== Validation Errors ==========
    /// Bad caller input (empty token, empty address list, malformed address)
    #[error("invalid argument: {0}")]
    Validation(String),

    /// Issuance signature does not recover to an allow-listed key
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    // ========== Issuance Errors ==========
    /// Cache write failed while binding a token to an address
    #[error("set token failed: {0}")]
    SetTokenFailed(String),

    /// Disallowed API surface (tokens are compared, never returned)
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    // ========== Availability Errors ==========
    /// Backend liveness probe failed; no cache mutation was attempted
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Deadline or cancellation observed mid-operation
    #[error("operation cancelled")]
    Cancelled,

    // ========== Cache Error Wrapper ==========
    /// Wrapped capability-cache error
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    // ========== Server Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Capability-cache errors
///
/// `NotFound` is an ordinary outcome (no binding yet), never a failure of
/// the backend itself.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No live binding for the key (absent or expired)
    #[error("token not found")]
    NotFound,

    /// Backend unreachable or refused the operation
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// Caller-supplied deadline elapsed before the operation completed
    #[error("cache operation cancelled")]
    Cancelled,
}

/// Gateway result type alias
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// JSON-RPC error code for the issuer API's reserved band.
    ///
    /// Distinct from the redaction-policy codes (-32802/-32803), which are
    /// produced by the interceptor, not by this mapping.
    pub fn rpc_error_code(&self) -> i64 {
        match self {
            GatewayError::ServiceUnavailable(_)
            | GatewayError::Cancelled
            | GatewayError::Cache(CacheError::Unavailable(_))
            | GatewayError::Cache(CacheError::Cancelled) => -32801,
            GatewayError::Validation(_) => -32804,
            GatewayError::SignatureVerification(_) => -32805,
            GatewayError::SetTokenFailed(_) => -32806,
            GatewayError::MethodNotAllowed(_) => -32807,
            GatewayError::Cache(CacheError::NotFound) | GatewayError::Config(_) => {
                DEFAULT_PRIVACY_ERROR_CODE
            }
        }
    }

    /// HTTP status code for this error when surfaced outside an envelope
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::SignatureVerification(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::ServiceUnavailable(_)
            | GatewayError::Cancelled
            | GatewayError::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::SetTokenFailed(_) | GatewayError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if error is recoverable (client can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GatewayError::ServiceUnavailable(_)
                | GatewayError::Cancelled
                | GatewayError::SetTokenFailed(_)
                | GatewayError::Cache(CacheError::Unavailable(_))
                | GatewayError::Cache(CacheError::Cancelled)
        )
    }
}
