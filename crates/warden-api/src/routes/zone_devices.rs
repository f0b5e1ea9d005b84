//! Zone device membership routes.
//!
//! ## Routes
//!
//! - `GET    /zones/{zone_id}/devices` - List a zone's devices
//! - `POST   /zones/{zone_id}/devices` - Assign a device batch
//! - `DELETE /zones/{zone_id}/devices` - Remove a device batch
//!
//! Assignment validates the whole batch against the supported-kind
//! allowlist and rejects it outright if any device is unsupported or not
//! found; a device moving in from another zone loses its prior membership
//! as one atomic step.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use warden_core::id::DeviceId;
use warden_core::model::Device;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::zones::parse_zone_id;
use crate::server::AppState;

/// Device batch request body.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBatchRequest {
    /// Device IDs to assign or remove.
    pub device_ids: Vec<String>,
}

/// Device response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    /// Device ID.
    pub id: String,
    /// The vendor's identifier for the device.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Standardized kind.
    pub kind: String,
    /// Standardized subtype, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id.to_string(),
            external_id: device.external_id,
            name: device.name,
            kind: device.kind.as_str().to_string(),
            subtype: device.subtype,
        }
    }
}

/// Zone device list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ZoneDevicesResponse {
    /// The zone's devices.
    pub devices: Vec<DeviceResponse>,
}

/// Creates zone device routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/zones/:zone_id/devices",
        get(list_zone_devices)
            .post(assign_devices)
            .delete(remove_devices),
    )
}

fn parse_device_ids(raw: &[String]) -> Result<Vec<DeviceId>, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::bad_request("deviceIds must not be empty"));
    }
    raw.iter()
        .map(|id| {
            DeviceId::from_str(id)
                .map_err(|_| ApiError::bad_request(format!("invalid device ID '{id}'")))
        })
        .collect()
}

/// List a zone's devices.
///
/// GET /api/v1/zones/{zone_id}/devices
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone_id}/devices",
    tag = "zone-devices",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    responses(
        (status = 200, description = "Devices listed", body = ZoneDevicesResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list_zone_devices(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let devices = state
        .repo
        .list_zone_devices(ctx.org, zone_id)
        .await?
        .into_iter()
        .map(DeviceResponse::from)
        .collect();
    Ok(Json(ZoneDevicesResponse { devices }))
}

/// Assign a batch of devices to a zone.
///
/// POST /api/v1/zones/{zone_id}/devices
#[utoipa::path(
    post,
    path = "/api/v1/zones/{zone_id}/devices",
    tag = "zone-devices",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = DeviceBatchRequest,
    responses(
        (status = 200, description = "Devices assigned", body = ZoneDevicesResponse),
        (status = 400, description = "Unsupported device kind or malformed ID", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone or device not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn assign_devices(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<DeviceBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let device_ids = parse_device_ids(&req.device_ids)?;

    tracing::info!(
        org = %ctx.org,
        zone = %zone_id,
        count = device_ids.len(),
        "Assigning devices to zone"
    );

    let devices = state
        .repo
        .assign_devices(ctx.org, zone_id, &device_ids)
        .await?
        .into_iter()
        .map(DeviceResponse::from)
        .collect();
    Ok(Json(ZoneDevicesResponse { devices }))
}

/// Remove a batch of devices from a zone.
///
/// DELETE /api/v1/zones/{zone_id}/devices
#[utoipa::path(
    delete,
    path = "/api/v1/zones/{zone_id}/devices",
    tag = "zone-devices",
    params(
        ("zone_id" = String, Path, description = "Zone ID"),
    ),
    request_body = DeviceBatchRequest,
    responses(
        (status = 204, description = "Devices removed"),
        (status = 400, description = "Malformed device ID", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "Zone not found or not accessible", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn remove_devices(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(req): Json<DeviceBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone_id = parse_zone_id(&zone_id)?;
    let device_ids = parse_device_ids(&req.device_ids)?;
    state
        .repo
        .remove_devices(ctx.org, zone_id, &device_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
