//! Gateway end-to-end tests: signature verification, normalization,
//! trigger processing, and connector liveness.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use warden_api::config::Config;
use warden_api::server::{AppState, router};
use warden_core::id::OrgId;
use warden_core::model::Connector;
use warden_core::realtime::{MemoryPublisher, zone_channel};
use warden_core::vendor::VendorKind;
use warden_ingest::sign;
use warden_store::{MemoryRepository, NewConnector, NewZone, ZoneRepository};

struct Harness {
    app: Router,
    repo: Arc<MemoryRepository>,
    publisher: Arc<MemoryPublisher>,
    org: OrgId,
    zone: warden_core::id::ZoneId,
    connector: Connector,
}

async fn harness(vendor: VendorKind, behavior: &str) -> Harness {
    let repo = Arc::new(MemoryRepository::new());
    let publisher = Arc::new(MemoryPublisher::new());
    let state = Arc::new(AppState::new(
        Config::default(),
        Arc::clone(&repo) as Arc<dyn ZoneRepository>,
        Arc::clone(&publisher) as Arc<dyn warden_core::realtime::RealtimePublisher>,
    ));
    let app = router(state);

    let org = repo.create_organization("Acme Security").await.expect("org");
    let location = repo
        .create_location(org.id, "Headquarters")
        .await
        .expect("location");
    let zone = repo
        .create_zone(
            org.id,
            NewZone {
                location_id: location.id,
                name: "Lobby".to_string(),
                description: None,
                trigger_behavior: match behavior {
                    "CUSTOM" => warden_core::model::TriggerBehavior::Custom,
                    _ => warden_core::model::TriggerBehavior::Standard,
                },
            },
        )
        .await
        .expect("zone");
    let connector = repo
        .create_connector(
            org.id,
            NewConnector {
                vendor,
                name: "test connector".to_string(),
                webhook_token: "whk_test".to_string(),
                secret: "signing-secret".to_string(),
            },
        )
        .await
        .expect("connector");

    Harness {
        app,
        repo,
        publisher,
        org: org.id,
        zone: zone.id,
        connector,
    }
}

fn webhook_request(h: &Harness, body: &str, header_value: &str) -> Request<Body> {
    let header = h.connector.vendor.signature_scheme().header;
    Request::builder()
        .method("POST")
        .uri("/webhooks/whk_test")
        .header("content-type", "application/json")
        .header(header, header_value)
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn signed_webhook_request(h: &Harness, body: &str) -> Request<Body> {
    let header_value = sign(
        h.connector.vendor,
        h.connector.secret.as_bytes(),
        body.as_bytes(),
    )
    .expect("sign");
    webhook_request(h, body, &header_value)
}

fn api_request(h: &Harness, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Organization-Id", h.org.to_string())
        .header("X-User-Id", "operator")
        .header("content-type", "application/json");
    match body {
        Some(value) => builder
            .body(Body::from(serde_json::to_vec(&value).expect("encode")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn send(h: &Harness, request: Request<Body>) -> axum::response::Response {
    h.app.clone().oneshot(request).await.expect("response")
}

async fn deliver_inventory(h: &Harness) -> warden_core::id::DeviceId {
    let body = json!({
        "type": "device_inventory",
        "devices": [
            {"deviceId": "d-1", "name": "Front Door", "deviceType": "door"}
        ]
    })
    .to_string();
    let response = send(h, signed_webhook_request(h, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    h.repo
        .find_device(h.connector.id, "d-1")
        .await
        .expect("lookup")
        .expect("device upserted")
        .id
}

async fn arm_zone(h: &Harness) {
    let response = send(
        h,
        api_request(
            h,
            "PUT",
            &format!("/api/v1/zones/{}/armed-state", h.zone),
            Some(json!({"state": "ARMED", "reason": "closing time"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn wire_armed_zone(h: &Harness) {
    let device = deliver_inventory(h).await;
    let response = send(
        h,
        api_request(
            h,
            "POST",
            &format!("/api/v1/zones/{}/devices", h.zone),
            Some(json!({"deviceIds": [device.to_string()]})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    arm_zone(h).await;
}

fn forced_open_body() -> String {
    json!({
        "type": "event",
        "event": {"kind": "door.forced", "deviceId": "d-1"}
    })
    .to_string()
}

#[tokio::test]
async fn end_to_end_armed_zone_triggers_and_broadcasts() {
    let h = harness(VendorKind::Passage, "STANDARD").await;
    wire_armed_zone(&h).await;

    let response = send(&h, signed_webhook_request(&h, &forced_open_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "processed");
    assert!(body["message"].as_str().expect("message").contains("triggered"));

    // Zone transitioned.
    let zone = send(&h, api_request(&h, "GET", &format!("/api/v1/zones/{}", h.zone), None)).await;
    let zone = body_json(zone).await;
    assert_eq!(zone["armedState"], "TRIGGERED");

    // Exactly one triggered audit row, ARMED -> TRIGGERED, with the event
    // reference and no acting user.
    let audit = send(
        &h,
        api_request(
            &h,
            "GET",
            &format!("/api/v1/zones/{}/audit-log", h.zone),
            None,
        ),
    )
    .await;
    let audit = body_json(audit).await;
    let entries = audit["entries"].as_array().expect("entries");
    let triggered: Vec<&Value> = entries
        .iter()
        .filter(|e| e["action"] == "triggered")
        .collect();
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0]["previousState"], "ARMED");
    assert_eq!(triggered[0]["newState"], "TRIGGERED");
    assert!(triggered[0]["actor"].is_null());
    assert!(triggered[0]["eventId"].is_string());

    // One broadcast for the arm, one for the trigger.
    let messages = h.publisher.messages(&zone_channel(h.org));
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["kind"], "arming");
    assert_eq!(messages[1]["change"]["previousState"], "ARMED");
    assert_eq!(messages[1]["change"]["currentState"], "TRIGGERED");

    // Successful processing marks the connector active.
    let connector = h
        .repo
        .connector_by_token("whk_test")
        .await
        .expect("lookup")
        .expect("connector");
    assert!(connector.last_activity_at.is_some());
}

#[tokio::test]
async fn tampered_body_is_rejected_with_uniform_401() {
    let h = harness(VendorKind::Passage, "STANDARD").await;
    wire_armed_zone(&h).await;

    let body = forced_open_body();
    let header_value = sign(VendorKind::Passage, b"signing-secret", body.as_bytes()).expect("sign");
    let mut tampered = body.into_bytes();
    tampered[5] ^= 0x01;
    let tampered = String::from_utf8(tampered).expect("utf8");

    let response = send(&h, webhook_request(&h, &tampered, &header_value)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "unauthorized");

    // No partial processing: the zone is untouched.
    let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
    assert_eq!(zone.armed_state, warden_core::model::ArmedState::Armed);
}

#[tokio::test]
async fn wrong_secret_is_rejected_with_uniform_401() {
    let h = harness(VendorKind::Passage, "STANDARD").await;
    let body = forced_open_body();
    let header_value =
        sign(VendorKind::Passage, b"some-other-secret", body.as_bytes()).expect("sign");

    let response = send(&h, webhook_request(&h, &body, &header_value)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = body_json(response).await;
    assert_eq!(payload["message"], "unauthorized");
}

#[tokio::test]
async fn unknown_token_is_rejected_with_uniform_401() {
    let h = harness(VendorKind::Passage, "STANDARD").await;
    let body = forced_open_body();
    let header_value = sign(
        VendorKind::Passage,
        h.connector.secret.as_bytes(),
        body.as_bytes(),
    )
    .expect("sign");

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/whk_unknown")
        .header("x-passage-signature", header_value)
        .body(Body::from(body))
        .expect("request");
    let response = send(&h, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = body_json(response).await;
    assert_eq!(payload["message"], "unauthorized");
}

#[tokio::test]
async fn malformed_json_after_valid_signature_is_400_and_not_liveness() {
    let h = harness(VendorKind::Passage, "STANDARD").await;

    let body = "{not json";
    let response = send(&h, signed_webhook_request(&h, body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A malformed-but-authenticated payload must not mark the connector
    // active.
    let connector = h
        .repo
        .connector_by_token("whk_test")
        .await
        .expect("lookup")
        .expect("connector");
    assert!(connector.last_activity_at.is_none());
}

#[tokio::test]
async fn unknown_payload_kind_is_accepted_and_counts_as_activity() {
    let h = harness(VendorKind::Passage, "STANDARD").await;

    let body = json!({"type": "heartbeat", "uptime": 42}).to_string();
    let response = send(&h, signed_webhook_request(&h, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["outcome"], "accepted");

    let connector = h
        .repo
        .connector_by_token("whk_test")
        .await
        .expect("lookup")
        .expect("connector");
    assert!(connector.last_activity_at.is_some());
}

#[tokio::test]
async fn unmapped_vendor_event_is_dropped_not_errored() {
    let h = harness(VendorKind::Passage, "STANDARD").await;

    let body = json!({
        "type": "event",
        "event": {"kind": "firmware.updated", "deviceId": "d-1"}
    })
    .to_string();
    let response = send(&h, signed_webhook_request(&h, &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["outcome"], "accepted_unmapped");
}

#[tokio::test]
async fn sha1_vendor_flows_through_its_own_scheme() {
    let h = harness(VendorKind::Lumen, "STANDARD").await;

    // Inventory via the Lumen mapping.
    let inventory = json!({
        "type": "device_inventory",
        "devices": [{"deviceId": "d-1", "name": "Lobby Cam", "deviceType": "cam.indoor"}]
    })
    .to_string();
    let response = send(&h, signed_webhook_request(&h, &inventory)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let device = h
        .repo
        .find_device(h.connector.id, "d-1")
        .await
        .expect("lookup")
        .expect("device");
    assert_eq!(device.kind, warden_core::model::DeviceKind::Camera);

    // Assign + arm, then a glass break analytics event trips the zone.
    let assign = send(
        &h,
        api_request(
            &h,
            "POST",
            &format!("/api/v1/zones/{}/devices", h.zone),
            Some(json!({"deviceIds": [device.id.to_string()]})),
        ),
    )
    .await;
    assert_eq!(assign.status(), StatusCode::OK);
    arm_zone(&h).await;

    let event = json!({
        "type": "event",
        "event": {"kind": "audio.glassbreak", "deviceId": "d-1"}
    })
    .to_string();
    let response = send(&h, signed_webhook_request(&h, &event)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
    assert_eq!(zone.armed_state, warden_core::model::ArmedState::Triggered);
}

#[tokio::test]
async fn override_precedence_end_to_end() {
    let h = harness(VendorKind::Passage, "CUSTOM").await;
    wire_armed_zone(&h).await;

    // Override: door.forced_open must not trigger this zone.
    let response = send(
        &h,
        api_request(
            &h,
            "POST",
            &format!("/api/v1/zones/{}/trigger-overrides", h.zone),
            Some(json!({"eventType": "door.forced_open", "shouldTrigger": false})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&h, signed_webhook_request(&h, &forced_open_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
    assert_eq!(zone.armed_state, warden_core::model::ArmedState::Armed);

    // Removing the override reverts to standard policy.
    let response = send(
        &h,
        api_request(
            &h,
            "DELETE",
            &format!("/api/v1/zones/{}/trigger-overrides/door.forced_open", h.zone),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&h, signed_webhook_request(&h, &forced_open_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
    assert_eq!(zone.armed_state, warden_core::model::ArmedState::Triggered);
}
