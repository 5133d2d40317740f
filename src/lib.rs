pub mod auth;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod policy;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod templates;
pub mod utils;

pub use server::{AppState, Server, build_router};
