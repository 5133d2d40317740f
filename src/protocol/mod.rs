//! HTTP protocol surface
//!
//! Request and response bodies plus the axum handlers for every route.

pub mod handlers;
pub mod requests;
pub mod responses;
