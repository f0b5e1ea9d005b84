//! `OpenAPI` specification generation for the Warden API.
//!
//! The generated document backs client generation and breaking-change
//! detection; it is also served at `/openapi.json`.

use axum::Json;
use axum::response::IntoResponse;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the Warden REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warden API",
        version = "0.1.0",
        description = "Alarm zone management and vendor webhook ingestion"
    ),
    paths(
        crate::routes::webhooks::receive_webhook,
        crate::routes::zones::create_zone,
        crate::routes::zones::list_zones,
        crate::routes::zones::get_zone,
        crate::routes::zones::update_zone,
        crate::routes::zones::delete_zone,
        crate::routes::zones::set_armed_state,
        crate::routes::zones::acknowledge,
        crate::routes::zone_devices::list_zone_devices,
        crate::routes::zone_devices::assign_devices,
        crate::routes::zone_devices::remove_devices,
        crate::routes::overrides::list_overrides,
        crate::routes::overrides::put_override,
        crate::routes::overrides::remove_override,
        crate::routes::audit_log::read_audit_log,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::webhooks::WebhookResponse,
            crate::routes::zones::CreateZoneRequest,
            crate::routes::zones::UpdateZoneRequest,
            crate::routes::zones::SetArmedStateRequest,
            crate::routes::zones::AcknowledgeRequest,
            crate::routes::zones::ZoneResponse,
            crate::routes::zones::ListZonesResponse,
            crate::routes::zone_devices::DeviceBatchRequest,
            crate::routes::zone_devices::DeviceResponse,
            crate::routes::zone_devices::ZoneDevicesResponse,
            crate::routes::overrides::PutOverrideRequest,
            crate::routes::overrides::OverrideResponse,
            crate::routes::overrides::ListOverridesResponse,
            crate::routes::audit_log::AuditEntryResponse,
            crate::routes::audit_log::AuditLogResponse,
        )
    ),
    tags(
        (name = "webhooks", description = "Vendor webhook ingestion"),
        (name = "zones", description = "Alarm zone operations"),
        (name = "zone-devices", description = "Zone device membership"),
        (name = "trigger-overrides", description = "Per-zone trigger overrides"),
        (name = "audit-log", description = "Zone audit log"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Handler serving the generated spec.
pub async fn get_openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_includes_webhook_and_zone_paths() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths.paths;
        assert!(paths.contains_key("/webhooks/{token}"));
        assert!(paths.contains_key("/api/v1/zones/{zone_id}/armed-state"));
        assert!(paths.contains_key("/api/v1/zones/{zone_id}/audit-log"));
    }
}
