//! Request-path middleware

mod privacy;

pub use privacy::{response_interceptor, PRIVACY_TOKEN_HEADER};
