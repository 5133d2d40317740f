//! Error handlers
//!
//! Maps API errors to HTTP status codes, stable kind strings and JSON bodies.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde::Serialize;

use crate::error::types::{ApiError, AuthError, BackupError, CatalogError, TemplateError};

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub status: u16,
}

/// Log an API error at a level matching its severity
pub fn handle_error(err: &ApiError) {
    let (status, kind) = error_to_status(err);
    if status.is_server_error() {
        error!("API error [{}]: {}", kind, err);
    } else {
        warn!("Request rejected [{}]: {}", kind, err);
    }
}

/// Convert error to HTTP status code and machine-readable kind
pub fn error_to_status(err: &ApiError) -> (StatusCode, &'static str) {
    match err {
        ApiError::Auth(e) => match e {
            AuthError::MissingCredentials | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AuthError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
        },
        ApiError::Template(e) => match e {
            TemplateError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "invalid_path"),
            TemplateError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            TemplateError::NotReadable(_) => (StatusCode::FORBIDDEN, "not_readable"),
            TemplateError::NotWritable(_) => (StatusCode::FORBIDDEN, "not_writable"),
            TemplateError::NotUtf8(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_encoding"),
            TemplateError::TransportRequired => (StatusCode::FORBIDDEN, "https_required"),
            TemplateError::DangerousContent(_) => (StatusCode::BAD_REQUEST, "dangerous_code"),
            TemplateError::BackupFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "backup_failed"),
            TemplateError::WriteFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "write_failed")
            }
            TemplateError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        },
        ApiError::Backup(BackupError::BackupNotFound(_))
        | ApiError::Restore(BackupError::BackupNotFound(_)) => {
            (StatusCode::NOT_FOUND, "backup_not_found")
        }
        ApiError::Backup(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        ApiError::Restore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "restore_failed"),
        ApiError::Catalog(e) => match e {
            CatalogError::NotActive => (StatusCode::BAD_REQUEST, "catalog_not_active"),
            CatalogError::TooManyItems { .. } => (StatusCode::BAD_REQUEST, "too_many_items"),
            CatalogError::InvalidOperation(_) => (StatusCode::BAD_REQUEST, "invalid_operation"),
        },
        ApiError::MissingPath => (StatusCode::BAD_REQUEST, "missing_path"),
        ApiError::MissingParams(_) => (StatusCode::BAD_REQUEST, "missing_params"),
        ApiError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
        ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
        ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

/// Human-readable message safe to return to the client.
///
/// Server-side failures carry filesystem paths and OS error text, so only a
/// fixed message is exposed for them.
pub fn public_message(err: &ApiError) -> String {
    match err {
        ApiError::Auth(e) => e.to_string(),
        ApiError::Template(e) => match e {
            TemplateError::InvalidPath(_) => "Invalid template path or file type".to_string(),
            TemplateError::NotFound(_) => "Template not found".to_string(),
            TemplateError::NotReadable(_) => "Template is not readable".to_string(),
            TemplateError::NotWritable(_) => "Template is not writable".to_string(),
            TemplateError::NotUtf8(_) => "Template is not valid UTF-8 text".to_string(),
            TemplateError::BackupFailed(_) => "Failed to create backup".to_string(),
            TemplateError::WriteFailed { .. } => "Failed to write template".to_string(),
            TemplateError::IoError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        },
        ApiError::Backup(BackupError::BackupNotFound(_))
        | ApiError::Restore(BackupError::BackupNotFound(_)) => "Backup not found".to_string(),
        ApiError::Backup(_) => "An internal error occurred".to_string(),
        ApiError::Restore(_) => "Failed to restore backup".to_string(),
        ApiError::Catalog(e) => e.to_string(),
        ApiError::MissingPath => "Template path is required".to_string(),
        ApiError::MissingParams(msg) => msg.clone(),
        ApiError::InvalidQuery(msg) => msg.clone(),
        ApiError::InvalidJson(_) => "Request body is not valid JSON".to_string(),
        ApiError::PayloadTooLarge(_) => "Request body is too large".to_string(),
        ApiError::Internal(_) => "An internal error occurred".to_string(),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Over-limit bodies surface as a failed buffer with status 413
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let (status, code) = error_to_status(&self);
        let body = ErrorBody {
            code,
            message: public_message(&self),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
