//! Normalization of vendor webhook payloads.
//!
//! Behavior is payload-kind-driven over a small closed set of vendor
//! message kinds:
//!
//! - a **device inventory** performs an idempotent upsert of device
//!   records keyed by `(connector, external device id)`;
//! - an **event** is translated into exactly one
//!   [`StandardizedEvent`] and persisted, or dropped when the vendor
//!   event has no mapped meaning — dropping is a valid, non-error outcome;
//! - anything else is accepted but not processed, so vendor payload
//!   evolution never breaks delivery retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use warden_core::error::Result;
use warden_core::id::EventId;
use warden_core::model::{Connector, StandardizedEvent};

use warden_store::{DeviceRecord, ZoneRepository};

use crate::mapping::{map_device_type, map_event_type};

/// A vendor-reported device row inside an inventory payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorDevice {
    /// The vendor's device identifier.
    #[serde(alias = "deviceId", alias = "device_id")]
    pub id: String,
    /// Display name, when the vendor sends one.
    #[serde(default)]
    pub name: Option<String>,
    /// The vendor's raw device type identifier.
    #[serde(default, alias = "deviceType", alias = "device_type", alias = "model")]
    pub raw_type: String,
}

/// A vendor event inside an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorEvent {
    /// The vendor's raw event type identifier.
    #[serde(alias = "eventType", alias = "event_type", alias = "kind")]
    pub raw_type: String,
    /// The vendor's identifier for the originating device.
    #[serde(default, alias = "deviceId", alias = "device_id")]
    pub device_id: Option<String>,
    /// Display state reported alongside the event (e.g. `open`, `active`).
    #[serde(default)]
    pub state: Option<String>,
    /// Vendor event timestamp.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Vendor metadata; may arrive JSON-encoded as a string.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// The closed set of vendor message kinds the normalizer understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookPayload {
    /// A vendor-asserted device inventory.
    #[serde(alias = "inventory", alias = "device_sync")]
    DeviceInventory {
        /// The devices the vendor currently knows about.
        devices: Vec<VendorDevice>,
    },
    /// A single vendor event.
    #[serde(alias = "notification")]
    Event {
        /// The event body.
        event: VendorEvent,
    },
    /// Any other kind: accepted, not processed.
    #[serde(other)]
    Unknown,
}

/// The result of normalizing one webhook delivery.
#[derive(Debug)]
pub enum Outcome {
    /// An event was translated, persisted, and is ready for trigger
    /// processing.
    Processed(StandardizedEvent),
    /// A device inventory was applied.
    InventoryApplied {
        /// How many device rows were upserted.
        upserted: usize,
    },
    /// The vendor event had no mapped meaning and was dropped.
    Dropped,
    /// The payload kind is not one the normalizer processes.
    Ignored,
}

/// Translates vendor payloads into canonical records.
pub struct Normalizer {
    repo: Arc<dyn ZoneRepository>,
}

impl Normalizer {
    /// Creates a normalizer over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn ZoneRepository>) -> Self {
        Self { repo }
    }

    /// Normalizes one parsed webhook body for a resolved connector.
    ///
    /// `raw` must already be valid JSON; signature verification happens
    /// upstream on the exact bytes. A body that is valid JSON but not a
    /// recognizable vendor envelope is treated as [`Outcome::Ignored`].
    ///
    /// # Errors
    ///
    /// Returns an error only for repository failures; unmapped or unknown
    /// vendor content is a success variant, never an error.
    pub async fn apply(&self, connector: &Connector, raw: &Value) -> Result<Outcome> {
        let payload = match serde_json::from_value::<WebhookPayload>(raw.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(
                    connector = %connector.id,
                    vendor = %connector.vendor,
                    error = %err,
                    "unrecognized vendor envelope; accepting without processing"
                );
                return Ok(Outcome::Ignored);
            }
        };

        match payload {
            WebhookPayload::DeviceInventory { devices } => {
                self.apply_inventory(connector, devices).await
            }
            WebhookPayload::Event { event } => self.apply_event(connector, raw, event).await,
            WebhookPayload::Unknown => Ok(Outcome::Ignored),
        }
    }

    async fn apply_inventory(
        &self,
        connector: &Connector,
        devices: Vec<VendorDevice>,
    ) -> Result<Outcome> {
        let mut upserted = 0;
        for device in devices {
            let (kind, subtype) = map_device_type(connector.vendor, &device.raw_type);
            let name = device.name.unwrap_or_else(|| device.id.clone());
            self.repo
                .upsert_device(DeviceRecord {
                    connector_id: connector.id,
                    external_id: device.id,
                    name,
                    kind,
                    subtype: subtype.map(str::to_string),
                })
                .await?;
            upserted += 1;
        }
        tracing::info!(
            connector = %connector.id,
            vendor = %connector.vendor,
            upserted,
            "applied device inventory"
        );
        Ok(Outcome::InventoryApplied { upserted })
    }

    async fn apply_event(
        &self,
        connector: &Connector,
        raw: &Value,
        event: VendorEvent,
    ) -> Result<Outcome> {
        let Some((event_type, subtype)) = map_event_type(connector.vendor, &event.raw_type) else {
            tracing::debug!(
                connector = %connector.id,
                vendor = %connector.vendor,
                raw_type = %event.raw_type,
                "vendor event has no mapped meaning; dropping"
            );
            return Ok(Outcome::Dropped);
        };

        let received_at = Utc::now();
        let standardized = StandardizedEvent {
            id: EventId::generate(),
            connector_id: connector.id,
            event_type: event_type.to_string(),
            subtype: subtype.map(str::to_string),
            display_state: event.state,
            device_external_id: event.device_id,
            payload: normalized_payload(raw, event.metadata.as_ref()),
            occurred_at: event.timestamp.unwrap_or(received_at),
            received_at,
        };
        self.repo.insert_event(&standardized).await?;
        Ok(Outcome::Processed(standardized))
    }
}

/// Clones the raw payload, substituting a once-decoded metadata field.
fn normalized_payload(raw: &Value, metadata: Option<&Value>) -> Value {
    let mut payload = raw.clone();
    if let (Some(meta), Some(event)) = (
        metadata,
        payload.get_mut("event").and_then(Value::as_object_mut),
    ) {
        event.insert("metadata".to_string(), decode_metadata_once(meta));
    }
    payload
}

/// Decodes metadata that arrived JSON-encoded as a string, exactly once.
///
/// Some vendor connectors double-encode metadata. One layer is decoded
/// here; a detected second layer is logged and left as-is rather than
/// assuming arbitrary nesting depth.
#[must_use]
pub fn decode_metadata_once(value: &Value) -> Value {
    let Value::String(encoded) = value else {
        return value.clone();
    };
    match serde_json::from_str::<Value>(encoded) {
        Ok(decoded) => {
            if let Value::String(inner) = &decoded {
                if serde_json::from_str::<Value>(inner).is_ok() {
                    tracing::warn!(
                        "vendor metadata appears JSON-encoded twice; decoding one layer only"
                    );
                }
            }
            decoded
        }
        Err(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::model::DeviceKind;
    use warden_core::vendor::VendorKind;
    use warden_store::{MemoryRepository, NewConnector};

    async fn connector(repo: &Arc<MemoryRepository>, vendor: VendorKind) -> Connector {
        let org = repo.create_organization("Acme").await.expect("org");
        repo.create_connector(
            org.id,
            NewConnector {
                vendor,
                name: "test connector".to_string(),
                webhook_token: "whk".to_string(),
                secret: "s".to_string(),
            },
        )
        .await
        .expect("connector")
    }

    fn normalizer(repo: &Arc<MemoryRepository>) -> Normalizer {
        Normalizer::new(Arc::clone(repo) as Arc<dyn ZoneRepository>)
    }

    #[tokio::test]
    async fn inventory_replay_does_not_duplicate_devices() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Passage).await;
        let normalizer = normalizer(&repo);

        let payload = json!({
            "type": "device_inventory",
            "devices": [
                {"id": "d-1", "name": "Front Door", "raw_type": "door"},
                {"id": "d-2", "name": "Lobby PIR", "raw_type": "motion_pir"}
            ]
        });

        for _ in 0..2 {
            let outcome = normalizer.apply(&connector, &payload).await.expect("apply");
            assert!(matches!(outcome, Outcome::InventoryApplied { upserted: 2 }));
        }

        let d1 = repo
            .find_device(connector.id, "d-1")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(d1.kind, DeviceKind::Door);
        let d2 = repo
            .find_device(connector.id, "d-2")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(d2.kind, DeviceKind::MotionSensor);
        assert_eq!(d2.subtype.as_deref(), Some("pir"));
    }

    #[tokio::test]
    async fn unknown_device_types_upsert_as_unmapped() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Lumen).await;
        let normalizer = normalizer(&repo);

        let payload = json!({
            "type": "device_inventory",
            "devices": [{"id": "x-1", "raw_type": "toaster"}]
        });
        normalizer.apply(&connector, &payload).await.expect("apply");

        let device = repo
            .find_device(connector.id, "x-1")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(device.kind, DeviceKind::Unmapped);
        // A nameless row falls back to its external id.
        assert_eq!(device.name, "x-1");
    }

    #[tokio::test]
    async fn mapped_event_becomes_one_standardized_event() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Passage).await;
        let normalizer = normalizer(&repo);

        let payload = json!({
            "type": "event",
            "event": {
                "raw_type": "door.forced",
                "device_id": "d-1",
                "state": "open"
            }
        });
        let outcome = normalizer.apply(&connector, &payload).await.expect("apply");
        let Outcome::Processed(event) = outcome else {
            panic!("expected processed event");
        };
        assert_eq!(event.event_type, "door.forced_open");
        assert_eq!(event.device_external_id.as_deref(), Some("d-1"));
        assert_eq!(event.display_state.as_deref(), Some("open"));

        let stored = repo.list_events(connector.id).await.expect("events");
        assert_eq!(stored.len(), 1, "event is persisted before trigger handling");
    }

    #[tokio::test]
    async fn unmapped_event_is_dropped_without_error() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Passage).await;
        let normalizer = normalizer(&repo);

        let payload = json!({
            "type": "event",
            "event": {"raw_type": "firmware.updated"}
        });
        let outcome = normalizer.apply(&connector, &payload).await.expect("apply");
        assert!(matches!(outcome, Outcome::Dropped));
        assert!(repo.list_events(connector.id).await.expect("events").is_empty());
    }

    #[tokio::test]
    async fn unknown_payload_kind_is_accepted_but_not_processed() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Lumen).await;
        let normalizer = normalizer(&repo);

        let payload = json!({"type": "heartbeat", "uptime": 12345});
        let outcome = normalizer.apply(&connector, &payload).await.expect("apply");
        assert!(matches!(outcome, Outcome::Ignored));

        // Not even a recognizable envelope: still accepted.
        let garbage = json!({"hello": "world"});
        let outcome = normalizer.apply(&connector, &garbage).await.expect("apply");
        assert!(matches!(outcome, Outcome::Ignored));
    }

    #[tokio::test]
    async fn string_encoded_metadata_is_decoded_exactly_once() {
        let repo = Arc::new(MemoryRepository::new());
        let connector = connector(&repo, VendorKind::Passage).await;
        let normalizer = normalizer(&repo);

        let payload = json!({
            "type": "event",
            "event": {
                "raw_type": "access.denied.repeated",
                "device_id": "d-1",
                "metadata": "{\"badge\":\"B-42\"}"
            }
        });
        let outcome = normalizer.apply(&connector, &payload).await.expect("apply");
        let Outcome::Processed(event) = outcome else {
            panic!("expected processed event");
        };
        assert_eq!(event.payload["event"]["metadata"]["badge"], "B-42");
    }

    #[test]
    fn double_encoded_metadata_is_not_decoded_past_one_layer() {
        let inner = json!({"badge": "B-42"}).to_string();
        let once = Value::String(inner.clone());
        let twice = Value::String(serde_json::to_string(&inner).expect("encode"));

        assert_eq!(decode_metadata_once(&once)["badge"], "B-42");
        // One layer off: the result is still a string holding JSON.
        assert_eq!(decode_metadata_once(&twice), Value::String(inner));
    }
}
