//! Zone CRUD and armed-state routes.
//!
//! ## Routes
//!
//! - `POST   /locations/{location_id}/zones` - Create a zone
//! - `GET    /locations/{location_id}/zones` - List a location's zones
//! - `GET    /zones/{zone_id}` - Get a zone
//! - `PATCH  /zones/{zone_id}` - Update a zone
//! - `DELETE /zones/{zone_id}` - Delete a zone
//! - `PUT    /zones/{zone_id}/armed-state` - Set the armed state
//! - `POST   /zones/{zone_id}/acknowledge` - Acknowledge a triggered zone

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use warden_core::id::{LocationId, ZoneId};
use warden_core::model::{AlarmZone, ArmedState, TriggerBehavior};
use warden_store::{NewZone, ZoneUpdate};

use crate::arming::ChangeRequest;
use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Request to create a zone.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    /// Zone name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// `STANDARD` (default) or `CUSTOM`.
    pub trigger_behavior: Option<String>,
}

/// Partial zone update.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateZoneRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New trigger behavior (`STANDARD` / `CUSTOM`).
    pub trigger_behavior: Option<String>,
}

/// Request to set a zone's armed state.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetArmedStateRequest {
    /// Target state: `DISARMED`, `ARMED`, or `TRIGGERED`.
    pub state: String,
    /// Optional human-readable reason.
    pub reason: Option<String>,
    /// Optional structured metadata recorded in the audit entry.
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

/// Request to acknowledge a triggered zone.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    /// Optional acknowledgement reason.
    pub reason: Option<String>,
    /// Optional structured metadata recorded in the audit entry.
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

/// Zone response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneResponse {
    /// Zone ID.
    pub id: String,
    /// Location ID.
    pub location_id: String,
    /// Zone name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current armed state.
    pub armed_state: String,
    /// Trigger behavior.
    pub trigger_behavior: String,
    /// Reason for the most recent state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change_reason: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last update timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<AlarmZone> for ZoneResponse {
    fn from(zone: AlarmZone) -> Self {
        Self {
            id: zone.id.to_string(),
            location_id: zone.location_id.to_string(),
            name: zone.name,
            description: zone.description,
            armed_state: zone.armed_state.as_str().to_string(),
            trigger_behavior: match zone.trigger_behavior {
                TriggerBehavior::Standard => "STANDARD".to_string(),
                TriggerBehavior::Custom => "CUSTOM".to_string(),
            },
            last_change_reason: zone.last_change_reason,
            created_at: zone.created_at.to_rfc3339(),
            updated_at: zone.updated_at.to_rfc3339(),
        }
    }
}

/// List zones response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListZonesResponse {
    /// The location's zones.
    pub zones: Vec<ZoneResponse>,
}

/// Creates zone routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/locations/:location_id/zones",
            post(create_zone).get(list_zones),
        )
        .route(
            "/zones/:zone_id",
            get(get_zone).patch(update_zone).delete(delete_zone),
        )
        .route("/zones/:zone_id/armed-state", put(set_armed_state))
        .route("/zones/:zone_id/acknowledge", post(acknowledge))
}

pub(crate) fn parse_zone_id(raw: &str) -> Result<ZoneId, ApiError> {
    ZoneId::from_str(raw).map_err(|_| ApiError::bad_request(format!("invalid zone ID '{raw}'")))
}

fn parse_location_id(raw: &str) -> Result<LocationId, ApiError> {
    LocationId::from_str(raw)
        .map_err(|_| ApiError::bad_request(format!("invalid location ID '{raw}'")))
}

fn parse_trigger_behavior(raw: &str) -> Result<TriggerBehavior, ApiError> {
    match raw {
        "STANDARD" => Ok(TriggerBehavior::Standard),
        "CUSTOM" => Ok(TriggerBehavior::Custom),
        other => Err(ApiError::bad_request(format!(
            "unknown trigger behavior '{other}' (expected STANDARD or CUSTOM)"
        ))),
    }
}

/// Create a zone.
///
/// POST /api/v1/locations/{location_id}/zones
#[utoipa::path(
    post,
    path = "/api/v1/locations/{location_id}/zones",
    tag = "zones",
    params(
        ("location_id" = String, Path, description = "Location ID"),
    ),
    request_body = CreateZoneRequest,
    responses(
        (status = 201, description = "Zone created", body = ZoneResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Location not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn create_zone(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<String>,
    Json(req): Json<CreateZoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location_id = parse_location_id(&location_id)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("zone name must not be empty"));
    }
    let trigger_behavior = match req.trigger_behavior.as_deref() {
        Some(raw) => parse_trigger_behavior(raw)?,
        None => TriggerBehavior::Standard,
    };

    tracing::info!(org = %ctx.org, location = %location_id, name = %req.name, "Creating alarm zone");

    let zone = state
        .repo
        .create_zone(
            ctx.org,
            NewZone {
                location_id,
                name: req.name,
                description: req.description,
                trigger_behavior,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ZoneResponse::from(zone))))
}

/// List a location's zones.
///
/// GET /api/v1/locations/{location_id}/zones
#[utoipa::path(
    get,
    path = "/api/v1/locations/{location_id}/zones",
    tag = "zones",
    params(
        ("location_id" = String, Path, description = "Location ID"),
    ),
    responses(
        (status = 200, description = "Zones listed", body = ListZonesResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Location not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list_zones(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let location_id = parse_location_id(&location_id)?;
    let zones = state
        .repo
        .list_zones(ctx.org, location_id)
        .await?
        .into_iter()
        .map(ZoneResponse::from)
        .collect();
    Ok(Json(ListZonesResponse { zones }))
}

/// Get a zone.
///
/// GET /api/v1/zones/{zone_id}
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone_id}",
    tag = "zones",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    responses(
        (status = 200, description = "Zone found", body = ZoneResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn get_zone(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let zone = state.repo.get_zone(ctx.org, zone_id).await?;
    Ok(Json(ZoneResponse::from(zone)))
}

/// Update a zone.
///
/// PATCH /api/v1/zones/{zone_id}
#[utoipa::path(
    patch,
    path = "/api/v1/zones/{zone_id}",
    tag = "zones",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = UpdateZoneRequest,
    responses(
        (status = 200, description = "Zone updated", body = ZoneResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn update_zone(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<UpdateZoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let trigger_behavior = match req.trigger_behavior.as_deref() {
        Some(raw) => Some(parse_trigger_behavior(raw)?),
        None => None,
    };
    let zone = state
        .repo
        .update_zone(
            ctx.org,
            zone_id,
            ZoneUpdate {
                name: req.name,
                description: req.description,
                trigger_behavior,
            },
        )
        .await?;
    Ok(Json(ZoneResponse::from(zone)))
}

/// Delete a zone.
///
/// DELETE /api/v1/zones/{zone_id}
#[utoipa::path(
    delete,
    path = "/api/v1/zones/{zone_id}",
    tag = "zones",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    responses(
        (status = 204, description = "Zone deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn delete_zone(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    tracing::info!(org = %ctx.org, zone = %zone_id, "Deleting alarm zone");
    state.repo.delete_zone(ctx.org, zone_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set a zone's armed state.
///
/// PUT /api/v1/zones/{zone_id}/armed-state
#[utoipa::path(
    put,
    path = "/api/v1/zones/{zone_id}/armed-state",
    tag = "zones",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = SetArmedStateRequest,
    responses(
        (status = 200, description = "Armed state updated", body = ZoneResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn set_armed_state(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<SetArmedStateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let target: ArmedState = req
        .state
        .parse()
        .map_err(|err: warden_core::Error| ApiError::bad_request(err.to_string()))?;

    tracing::info!(
        org = %ctx.org,
        zone = %zone_id,
        target = %target,
        "Setting armed state"
    );

    let request = ChangeRequest {
        actor: ctx.actor(),
        reason: req.reason,
        metadata: req.metadata,
    };
    let zone = match target {
        ArmedState::Armed => state.orchestrator.arm(ctx.org, zone_id, request).await?,
        ArmedState::Disarmed => state.orchestrator.disarm(ctx.org, zone_id, request).await?,
        ArmedState::Triggered => state.orchestrator.trigger(ctx.org, zone_id, request).await?,
    };
    Ok(Json(ZoneResponse::from(zone)))
}

/// Acknowledge a triggered zone.
///
/// POST /api/v1/zones/{zone_id}/acknowledge
#[utoipa::path(
    post,
    path = "/api/v1/zones/{zone_id}/acknowledge",
    tag = "zones",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = AcknowledgeRequest,
    responses(
        (status = 200, description = "Zone acknowledged", body = ZoneResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn acknowledge(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<AcknowledgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let zone = state
        .orchestrator
        .acknowledge(
            ctx.org,
            zone_id,
            ChangeRequest {
                actor: ctx.actor(),
                reason: req.reason,
                metadata: req.metadata,
            },
        )
        .await?;
    Ok(Json(ZoneResponse::from(zone)))
}
