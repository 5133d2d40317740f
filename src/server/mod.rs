//! Server core functionality
//!
//! This module contains the HTTP server, its route table and the state
//! shared between handlers.

pub mod core;
pub mod router;
pub mod state;

pub use self::core::Server;
pub use router::build_router;
pub use state::AppState;
