//! HTTP request handlers

mod health;
mod rpc;

pub use health::health_check;
pub use rpc::rpc_endpoint;
