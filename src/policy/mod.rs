//! Content policy
//!
//! Heuristic deny-list scan run over template content before it is written.

pub mod scanner;

pub use scanner::{ContentPolicy, DEFAULT_DANGEROUS_FUNCTIONS, DEFAULT_SCRIPT_MARKERS, Verdict};
