//! Route handlers
//!
//! Each handler authorizes the actor, moves filesystem work onto the
//! blocking pool and returns either a JSON result or an [`ApiError`].

use axum::Extension;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::Uri;
use log::{info, warn};
use std::path::PathBuf;

use super::requests::{
    BulkUpdateRequest, CleanupRequest, ReadTemplateRequest, RestoreRequest,
    UpdateTemplateRequest, non_empty,
};
use super::responses::{
    CleanupResponse, RestoreResponse, RuntimeSection, ServerSection, ServiceSection, SystemInfo,
};
use crate::auth::{Action, Actor, authorize};
use crate::backup::{BackupFilter, BackupRecord, BackupStats};
use crate::catalog::{BulkResult, bulk_update};
use crate::error::ApiError;
use crate::server::state::AppState;
use crate::templates::{ReadResult, TemplateFile, UpdateResult, WriteContext};

/// Header set by a TLS-terminating proxy
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Runs `f` on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

fn guard(state: &AppState, actor: &Actor, action: Action) -> Result<(), ApiError> {
    Ok(authorize(state.authorizer.as_ref(), actor, action)?)
}

/// True when the request reached us over HTTPS
fn is_secure(uri: &Uri, headers: &HeaderMap) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

pub async fn list_templates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<TemplateFile>>, ApiError> {
    guard(&state, &actor, Action::EditTemplates)?;
    let templates = state.templates.clone();
    let listed = blocking(move || Ok(templates.list())).await?;
    Ok(Json(listed))
}

pub async fn read_template(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<ReadTemplateRequest>, JsonRejection>,
) -> Result<Json<ReadResult>, ApiError> {
    guard(&state, &actor, Action::EditTemplates)?;
    let Json(request) = body?;
    let path = non_empty(request.path).ok_or(ApiError::MissingPath)?;

    let templates = state.templates.clone();
    let read = blocking(move || Ok(templates.read(&path)?)).await?;
    Ok(Json(read))
}

/// Replaces a template after backing it up.
///
/// # Arguments
///
/// * `body` - `{path, content}`; an empty `content` is a valid update.
///
/// # Returns
///
/// * `UpdateResult` naming the backup taken before the write.
pub async fn update_template(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<UpdateTemplateRequest>, JsonRejection>,
) -> Result<Json<UpdateResult>, ApiError> {
    guard(&state, &actor, Action::EditTemplates)?;
    let Json(request) = body?;

    let (Some(path), Some(content)) = (non_empty(request.path), request.content) else {
        return Err(ApiError::MissingParams(
            "Path and content are required".to_string(),
        ));
    };

    let ctx = WriteContext {
        actor_id: actor.id.clone(),
        secure_transport: is_secure(&uri, &headers),
        debug_mode: state.runtime.read().await.debug_mode,
    };

    let templates = state.templates.clone();
    let updated = blocking(move || Ok(templates.update(&path, &content, &ctx)?)).await?;
    Ok(Json(updated))
}

pub async fn system_info(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<SystemInfo>, ApiError> {
    guard(&state, &actor, Action::Administer)?;

    let runtime = state.runtime.read().await.clone();
    let backups = state.backups.clone();
    let backups_by_category = match blocking(move || Ok(backups.stats()?)).await {
        Ok(stats) => stats.count_by_category,
        Err(e) => {
            warn!("System info without backup stats: {}", e);
            Default::default()
        }
    };

    let info = &state.info;
    let now = chrono::Utc::now().timestamp();
    Ok(Json(SystemInfo {
        server: ServerSection {
            name: info.name,
            version: info.version,
            namespace: info.namespace.clone(),
            started_at: info.started_at,
            uptime_secs: (now - info.started_at).max(0),
        },
        runtime: RuntimeSection {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            pid: std::process::id(),
        },
        service: ServiceSection {
            active_theme: info.active_theme.clone(),
            theme_count: info.theme_count,
            rate_limit: runtime.rate_limit,
            backup_retention_days: runtime.backup_retention_days,
            https_required: info.require_secure_transport && !runtime.debug_mode,
            debug_mode: runtime.debug_mode,
            catalog_enabled: state.catalog.is_some(),
            backups_by_category,
        },
    }))
}

pub async fn catalog_bulk_update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<BulkUpdateRequest>, JsonRejection>,
) -> Result<Json<BulkResult>, ApiError> {
    guard(&state, &actor, Action::ManageCatalog)?;
    let Json(request) = body?;

    let catalog = state.catalog.clone();
    let result = blocking(move || {
        Ok(bulk_update(
            catalog.as_deref(),
            &request.operation,
            &request.items,
        )?)
    })
    .await?;

    info!(
        "Actor {} ran bulk {} over {} items",
        actor.id, result.operation, result.processed
    );
    Ok(Json(result))
}

pub async fn list_backups(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    filter: Result<Query<BackupFilter>, QueryRejection>,
) -> Result<Json<Vec<BackupRecord>>, ApiError> {
    guard(&state, &actor, Action::Administer)?;
    let Query(filter) = filter?;

    let backups = state.backups.clone();
    let records = blocking(move || Ok(backups.list(&filter)?)).await?;
    Ok(Json(records))
}

pub async fn backup_stats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<BackupStats>, ApiError> {
    guard(&state, &actor, Action::Administer)?;
    let backups = state.backups.clone();
    let stats = blocking(move || Ok(backups.stats()?)).await?;
    Ok(Json(stats))
}

pub async fn restore_backup(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<RestoreRequest>, JsonRejection>,
) -> Result<Json<RestoreResponse>, ApiError> {
    guard(&state, &actor, Action::Administer)?;
    let Json(request) = body?;
    let backup = non_empty(request.backup)
        .ok_or_else(|| ApiError::MissingParams("Backup is required".to_string()))?;
    let target = non_empty(request.target);

    let templates = state.templates.clone();
    let backups = state.backups.clone();
    let actor_id = actor.id.clone();
    let restored = blocking(move || {
        // Explicit targets are client-supplied paths and must be confined
        let target: Option<PathBuf> = match target {
            Some(raw) => Some(templates.resolve(&raw)?.absolute),
            None => None,
        };
        backups
            .restore(&backup, target.as_deref(), &actor_id)
            .map_err(ApiError::Restore)
    })
    .await?;

    Ok(Json(RestoreResponse {
        success: true,
        restored_to: restored.display().to_string(),
    }))
}

pub async fn cleanup_backups(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CleanupRequest>, JsonRejection>,
) -> Result<Json<CleanupResponse>, ApiError> {
    guard(&state, &actor, Action::Administer)?;
    let Json(request) = body?;

    let retention_days = match request.retention_days {
        Some(days) => days,
        None => state.runtime.read().await.backup_retention_days,
    };
    let category = non_empty(request.category);

    let backups = state.backups.clone();
    let deleted =
        blocking(move || Ok(backups.cleanup(retention_days, category.as_deref())?)).await?;

    info!(
        "Actor {} cleaned up {} backups older than {} days",
        actor.id, deleted, retention_days
    );
    Ok(Json(CleanupResponse { deleted }))
}
