//! Authentication system
//!
//! Handles bearer token validation and capability-based authorization.

pub mod authorizer;
pub mod credentials;
pub mod validator;

pub use authorizer::{Action, Authorizer, CapabilityAuthorizer, authorize};
pub use credentials::{Actor, CredentialStore};
pub use validator::{authenticate, parse_bearer};
