//! privacy-gateway library exports (for testing)

pub mod address;
pub mod api;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod issuer;
pub mod policy;
pub mod rpc;

// Re-exports
pub use address::AddressKey;
pub use cache::{MemoryTokenCache, RedisTokenCache, TokenCache};
pub use config::GatewayConfig;
pub use error::{CacheError, GatewayError, GatewayResult};
pub use issuer::TokenIssuer;
pub use policy::{RedactionDecision, RpcMethod};
pub use rpc::JsonrpcMessage;
