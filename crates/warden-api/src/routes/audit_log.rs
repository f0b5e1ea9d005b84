//! Audit log routes.
//!
//! ## Routes
//!
//! - `GET /zones/{zone_id}/audit-log?limit=&offset=` - Read one page,
//!   newest-first
//!
//! `limit` must lie in `[1, 1000]` (default 100); `offset` must be
//! non-negative (default 0). `hasMore` is true exactly when the returned
//! page is full.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use warden_core::model::AuditLogEntry;
use warden_store::{AUDIT_PAGE_DEFAULT, AUDIT_PAGE_MAX, AuditQuery};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::zones::parse_zone_id;
use crate::server::AppState;

/// Audit log query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogParams {
    /// Page size, `[1, 1000]`, default 100.
    pub limit: Option<i64>,
    /// Entries to skip, default 0.
    pub offset: Option<i64>,
}

/// One audit log entry on the wire.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    /// Entry ID.
    pub id: String,
    /// Acting user, absent for system-triggered changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// What happened: `armed`, `disarmed`, `triggered`, or `acknowledged`.
    pub action: String,
    /// State before the change.
    pub previous_state: String,
    /// State after the change.
    pub new_state: String,
    /// Free-text reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The standardized event that caused the change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Optional structured metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            actor: entry.actor,
            action: entry.action.as_str().to_string(),
            previous_state: entry.previous_state.as_str().to_string(),
            new_state: entry.new_state.as_str().to_string(),
            reason: entry.reason,
            event_id: entry.event_id.map(|id| id.to_string()),
            metadata: entry.metadata,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Audit log page response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    /// The entries in this page, newest first.
    pub entries: Vec<AuditEntryResponse>,
    /// True when the page was full, i.e. another page may exist.
    pub has_more: bool,
}

/// Creates audit log routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/zones/:zone_id/audit-log", get(read_audit_log))
}

fn validated_query(params: &AuditLogParams) -> Result<AuditQuery, ApiError> {
    let limit = match params.limit {
        None => AUDIT_PAGE_DEFAULT,
        Some(limit) if (1..=AUDIT_PAGE_MAX as i64).contains(&limit) => {
            usize::try_from(limit).map_err(|_| ApiError::bad_request("limit out of range"))?
        }
        Some(limit) => {
            return Err(ApiError::bad_request(format!(
                "limit must be between 1 and {AUDIT_PAGE_MAX}, got {limit}"
            )));
        }
    };
    let offset = match params.offset {
        None => 0,
        Some(offset) if offset >= 0 => usize::try_from(offset)
            .map_err(|_| ApiError::bad_request("offset out of range"))?,
        Some(offset) => {
            return Err(ApiError::bad_request(format!(
                "offset must be non-negative, got {offset}"
            )));
        }
    };
    Ok(AuditQuery { limit, offset })
}

/// Read one page of a zone's audit log.
///
/// GET /api/v1/zones/{zone_id}/audit-log
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone_id}/audit-log",
    tag = "audit-log",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
        ("limit" = Option<i64>, Query, description = "Page size, 1-1000, default 100"),
        ("offset" = Option<i64>, Query, description = "Entries to skip, default 0"),
    ),
    responses(
        (status = 200, description = "Audit log page", body = AuditLogResponse),
        (status = 400, description = "Out-of-range pagination", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn read_audit_log(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Query(params): Query<AuditLogParams>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let query = validated_query(&params)?;
    let page = state.repo.audit_log(ctx.org, zone_id, query).await?;
    Ok(Json(AuditLogResponse {
        entries: page.entries.into_iter().map(AuditEntryResponse::from).collect(),
        has_more: page.has_more,
    }))
}
