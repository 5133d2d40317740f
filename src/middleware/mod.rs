//! Server middleware
//!
//! Provides logging, security, and rate limiting middleware.

pub mod logging;
pub mod rate_limit;
pub mod security;

pub use logging::log_requests;
pub use rate_limit::{RateLimiter, rate_limit};
pub use security::require_bearer;
