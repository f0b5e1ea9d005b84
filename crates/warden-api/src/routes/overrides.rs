//! Trigger override routes.
//!
//! ## Routes
//!
//! - `GET    /zones/{zone_id}/trigger-overrides` - List a zone's overrides
//! - `POST   /zones/{zone_id}/trigger-overrides` - Upsert an override
//! - `DELETE /zones/{zone_id}/trigger-overrides/{event_type}` - Remove one
//!
//! Overrides are keyed by `(zone, event type)` with upsert semantics: one
//! row per event type per zone. They only take effect on zones with
//! `CUSTOM` trigger behavior.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use warden_core::model::TriggerOverride;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::zones::parse_zone_id;
use crate::server::AppState;

/// Request to upsert a trigger override.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutOverrideRequest {
    /// The standardized event type the override matches exactly.
    pub event_type: String,
    /// Whether events of this type trigger the zone.
    pub should_trigger: bool,
}

/// Trigger override response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideResponse {
    /// The event type.
    pub event_type: String,
    /// The override value.
    pub should_trigger: bool,
}

impl From<TriggerOverride> for OverrideResponse {
    fn from(value: TriggerOverride) -> Self {
        Self {
            event_type: value.event_type,
            should_trigger: value.should_trigger,
        }
    }
}

/// Override list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListOverridesResponse {
    /// The zone's overrides.
    pub overrides: Vec<OverrideResponse>,
}

/// Creates trigger override routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/zones/:zone_id/trigger-overrides",
            get(list_overrides).post(put_override),
        )
        .route(
            "/zones/:zone_id/trigger-overrides/:event_type",
            delete(remove_override),
        )
}

/// List a zone's trigger overrides.
///
/// GET /api/v1/zones/{zone_id}/trigger-overrides
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone_id}/trigger-overrides",
    tag = "trigger-overrides",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    responses(
        (status = 200, description = "Overrides listed", body = ListOverridesResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list_overrides(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let overrides = state
        .repo
        .list_trigger_overrides(ctx.org, zone_id)
        .await?
        .into_iter()
        .map(OverrideResponse::from)
        .collect();
    Ok(Json(ListOverridesResponse { overrides }))
}

/// Upsert a trigger override.
///
/// POST /api/v1/zones/{zone_id}/trigger-overrides
#[utoipa::path(
    post,
    path = "/api/v1/zones/{zone_id}/trigger-overrides",
    tag = "trigger-overrides",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = PutOverrideRequest,
    responses(
        (status = 200, description = "Override upserted", body = OverrideResponse),
        (status = 400, description = "Malformed override payload", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn put_override(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<PutOverrideRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    if req.event_type.trim().is_empty() {
        return Err(ApiError::bad_request("eventType must not be empty"));
    }
    let value = state
        .repo
        .put_trigger_override(ctx.org, zone_id, &req.event_type, req.should_trigger)
        .await?;
    Ok(Json(OverrideResponse::from(value)))
}

/// Remove a trigger override.
///
/// DELETE /api/v1/zones/{zone_id}/trigger-overrides/{event_type}
#[utoipa::path(
    delete,
    path = "/api/v1/zones/{zone_id}/trigger-overrides/{event_type}",
    tag = "trigger-overrides",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
        ("event_type" = String, Path, description = "Standardized event type"),
    ),
    responses(
        (status = 204, description = "Override removed"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn remove_override(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path((zone_id, event_type)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    state
        .repo
        .remove_trigger_override(ctx.org, zone_id, &event_type)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
