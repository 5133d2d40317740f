//! Theme templates
//!
//! Confined listing, reading and backed-up writing of template files.

pub mod results;
pub mod service;

pub use results::{ReadResult, TemplateFile, TemplateKind, ThemeRoot, UpdateResult, WriteContext};
pub use service::{CacheInvalidator, NoopInvalidator, TemplateService, TemplateSettings};
