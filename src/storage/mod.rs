//! File system storage management
//!
//! Handles path confinement, permission probes and locked file writes.

pub mod filesystem;
pub mod permissions;
pub mod validation;

// Re-export commonly used validation functions
pub use filesystem::{ContentWriter, LockedFileWriter};
pub use validation::{ConfinedPath, resolve_confined_path, sanitize_relative_path};
