//! Error types
//!
//! Defines domain-specific error types for each module of the template server.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Path confinement errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    WrongSuffix(String),
    OutsideRoots(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "Empty path"),
            PathError::WrongSuffix(p) => write!(f, "File type not allowed: {}", p),
            PathError::OutsideRoots(p) => write!(f, "Path outside permitted roots: {}", p),
        }
    }
}

impl std::error::Error for PathError {}

/// Key-value ledger errors
#[derive(Debug)]
pub enum LedgerError {
    IoError(io::Error),
    Serialization(String),
    Contended(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::IoError(e) => write!(f, "Ledger I/O error: {}", e),
            LedgerError::Serialization(e) => write!(f, "Ledger serialization error: {}", e),
            LedgerError::Contended(key) => {
                write!(f, "Ledger key '{}' changed too often to update", key)
            }
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<io::Error> for LedgerError {
    fn from(error: io::Error) -> Self {
        LedgerError::IoError(error)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Serialization(error.to_string())
    }
}

/// Backup store errors
#[derive(Debug)]
pub enum BackupError {
    SourceNotFound(PathBuf),
    BackupNotFound(String),
    BackupFileMissing(PathBuf),
    CopyFailed(PathBuf, io::Error),
    PreRestoreFailed(Box<BackupError>),
    Ledger(LedgerError),
    IoError(io::Error),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::SourceNotFound(p) => write!(f, "File to back up not found: {}", p.display()),
            BackupError::BackupNotFound(id) => write!(f, "Backup not found: {}", id),
            BackupError::BackupFileMissing(p) => {
                write!(f, "Backup file missing on disk: {}", p.display())
            }
            BackupError::CopyFailed(p, e) => write!(f, "Failed to copy {}: {}", p.display(), e),
            BackupError::PreRestoreFailed(e) => write!(f, "Pre-restore backup failed: {}", e),
            BackupError::Ledger(e) => write!(f, "{}", e),
            BackupError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<LedgerError> for BackupError {
    fn from(error: LedgerError) -> Self {
        BackupError::Ledger(error)
    }
}

impl From<io::Error> for BackupError {
    fn from(error: io::Error) -> Self {
        BackupError::IoError(error)
    }
}

/// Template service errors
#[derive(Debug)]
pub enum TemplateError {
    InvalidPath(PathError),
    NotFound(String),
    NotReadable(String),
    NotWritable(String),
    NotUtf8(String),
    TransportRequired,
    DangerousContent(String),
    BackupFailed(BackupError),
    WriteFailed {
        path: String,
        source: io::Error,
        restored: bool,
    },
    IoError(io::Error),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::InvalidPath(e) => write!(f, "Invalid template path: {}", e),
            TemplateError::NotFound(p) => write!(f, "Template not found: {}", p),
            TemplateError::NotReadable(p) => write!(f, "Template is not readable: {}", p),
            TemplateError::NotWritable(p) => write!(f, "Template is not writable: {}", p),
            TemplateError::NotUtf8(p) => write!(f, "Template is not valid UTF-8: {}", p),
            TemplateError::TransportRequired => {
                write!(f, "HTTPS connection required for template updates")
            }
            TemplateError::DangerousContent(name) => {
                write!(f, "Template contains potentially dangerous code: {}", name)
            }
            TemplateError::BackupFailed(e) => write!(f, "Failed to create backup: {}", e),
            TemplateError::WriteFailed {
                path,
                source,
                restored,
            } => write!(
                f,
                "Failed to write template {} (restored: {}): {}",
                path, restored, source
            ),
            TemplateError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<PathError> for TemplateError {
    fn from(error: PathError) -> Self {
        TemplateError::InvalidPath(error)
    }
}

impl From<io::Error> for TemplateError {
    fn from(error: io::Error) -> Self {
        TemplateError::IoError(error)
    }
}

/// Catalog bulk operation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotActive,
    TooManyItems { count: usize, max: usize },
    InvalidOperation(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotActive => write!(f, "Catalog is not active"),
            CatalogError::TooManyItems { count, max } => {
                write!(f, "Maximum {} items per bulk operation (got {})", max, count)
            }
            CatalogError::InvalidOperation(op) => write!(f, "Invalid bulk operation: {}", op),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken,
    Forbidden { actor: String, action: String },
    RateLimited(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "You must be authenticated to use this endpoint")
            }
            AuthError::InvalidToken => write!(f, "Invalid API token"),
            AuthError::Forbidden { actor, action } => {
                write!(f, "Actor {} is not allowed to {}", actor, action)
            }
            AuthError::RateLimited(actor) => {
                write!(f, "Too many requests from {}. Please try again later", actor)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// General API error that encompasses all error types
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Template(TemplateError),
    Backup(BackupError),
    /// Failure of an explicit restore request
    Restore(BackupError),
    Catalog(CatalogError),
    MissingPath,
    MissingParams(String),
    InvalidQuery(String),
    InvalidJson(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth(e) => write!(f, "Authentication error: {}", e),
            ApiError::Template(e) => write!(f, "Template error: {}", e),
            ApiError::Backup(e) => write!(f, "Backup error: {}", e),
            ApiError::Restore(e) => write!(f, "Restore error: {}", e),
            ApiError::Catalog(e) => write!(f, "Catalog error: {}", e),
            ApiError::MissingPath => write!(f, "Template path is required"),
            ApiError::MissingParams(e) => write!(f, "Missing parameters: {}", e),
            ApiError::InvalidQuery(e) => write!(f, "Invalid query string: {}", e),
            ApiError::InvalidJson(e) => write!(f, "Invalid JSON body: {}", e),
            ApiError::PayloadTooLarge(e) => write!(f, "Request body too large: {}", e),
            ApiError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        ApiError::Auth(error)
    }
}

impl From<TemplateError> for ApiError {
    fn from(error: TemplateError) -> Self {
        ApiError::Template(error)
    }
}

impl From<BackupError> for ApiError {
    fn from(error: BackupError) -> Self {
        ApiError::Backup(error)
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        ApiError::Catalog(error)
    }
}

impl From<PathError> for ApiError {
    fn from(error: PathError) -> Self {
        ApiError::Template(TemplateError::InvalidPath(error))
    }
}
