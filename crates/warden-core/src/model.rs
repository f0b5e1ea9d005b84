//! Domain model for alarm zones and their surrounding entities.
//!
//! These are the canonical shapes exchanged between the repository, the
//! ingestion pipeline, and the HTTP layer. Wire forms are camelCase; enums
//! serialize in the casing their consumers already expect (armed states as
//! `SCREAMING_SNAKE_CASE`, audit actions lowercase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::id::{AuditEntryId, ConnectorId, DeviceId, EventId, LocationId, OrgId, ZoneId};
use crate::vendor::VendorKind;

// ============================================================================
// Armed state machine
// ============================================================================

/// The armed state of an alarm zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArmedState {
    /// The zone ignores events.
    Disarmed,
    /// The zone is live: trigger-mapped events move it to `Triggered`.
    Armed,
    /// An event (or manual action) tripped the zone.
    Triggered,
}

impl ArmedState {
    /// Returns the wire form (`DISARMED` / `ARMED` / `TRIGGERED`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "DISARMED",
            Self::Armed => "ARMED",
            Self::Triggered => "TRIGGERED",
        }
    }

    /// Returns the human-readable display name used in broadcasts.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Disarmed => "Disarmed",
            Self::Armed => "Armed",
            Self::Triggered => "Triggered",
        }
    }
}

impl fmt::Display for ArmedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArmedState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISARMED" => Ok(Self::Disarmed),
            "ARMED" => Ok(Self::Armed),
            "TRIGGERED" => Ok(Self::Triggered),
            other => Err(Error::InvalidInput(format!(
                "unknown armed state '{other}' (expected DISARMED, ARMED, or TRIGGERED)"
            ))),
        }
    }
}

/// How a zone decides whether an event triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerBehavior {
    /// Global standard policy only.
    Standard,
    /// Per-zone overrides layered on the standard policy.
    Custom,
}

/// The action recorded by an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// The zone was armed.
    Armed,
    /// The zone was disarmed.
    Disarmed,
    /// The zone was triggered.
    Triggered,
    /// A triggered zone was acknowledged (disarm-with-reason).
    Acknowledged,
}

impl AuditAction {
    /// Returns the wire form of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Armed => "armed",
            Self::Disarmed => "disarmed",
            Self::Triggered => "triggered",
            Self::Acknowledged => "acknowledged",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tenancy entities
// ============================================================================

/// The root tenant boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization ID.
    pub id: OrgId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A physical site belonging to exactly one organization.
///
/// Zones resolve their tenant through their location; every zone-scoped
/// authorization check walks zone → location → organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Location ID.
    pub id: LocationId,
    /// Owning organization.
    pub organization_id: OrgId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Alarm zones
// ============================================================================

/// A named grouping of devices that can be armed, disarmed, or triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmZone {
    /// Zone ID.
    pub id: ZoneId,
    /// The location this zone belongs to.
    pub location_id: LocationId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current armed state.
    pub armed_state: ArmedState,
    /// Trigger decision mode.
    pub trigger_behavior: TriggerBehavior,
    /// Human-readable reason for the most recent state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A per-zone, per-event-type trigger override.
///
/// Present only for zones with [`TriggerBehavior::Custom`]; absence for a
/// given event type means "fall back to standard policy."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOverride {
    /// The zone this override applies to.
    pub zone_id: ZoneId,
    /// The standardized event type the override matches exactly.
    pub event_type: String,
    /// Whether an event of this type triggers the zone.
    pub should_trigger: bool,
}

/// An immutable audit record of a zone state change.
///
/// Append-only by construction: no update or delete API exists for these
/// entries at any layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Entry ID.
    pub id: AuditEntryId,
    /// The zone whose state changed.
    pub zone_id: ZoneId,
    /// Acting user, or `None` for system-triggered changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// What happened.
    pub action: AuditAction,
    /// State before the change.
    pub previous_state: ArmedState,
    /// State after the change.
    pub new_state: ArmedState,
    /// Free-text reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The standardized event that caused the change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Optional structured metadata supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Devices
// ============================================================================

/// Standardized device kind assigned during inventory normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Door position / access point.
    Door,
    /// Motion sensor.
    MotionSensor,
    /// Glass break sensor.
    GlassBreak,
    /// Camera.
    Camera,
    /// Access control panel.
    Panel,
    /// Vendor type with no mapping; never fails normalization.
    Unmapped,
}

impl DeviceKind {
    /// Returns true when devices of this kind may join an alarm zone.
    ///
    /// Panels and unmapped devices are excluded from zone membership.
    #[must_use]
    pub const fn supports_zone_membership(&self) -> bool {
        matches!(
            self,
            Self::Door | Self::MotionSensor | Self::GlassBreak | Self::Camera
        )
    }

    /// Returns the wire form of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Door => "door",
            Self::MotionSensor => "motion_sensor",
            Self::GlassBreak => "glass_break",
            Self::Camera => "camera",
            Self::Panel => "panel",
            Self::Unmapped => "unmapped",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vendor-reported device, upserted from inventory webhooks.
///
/// Identity within a vendor integration is `(connector_id, external_id)`;
/// replays of the same inventory payload update rather than duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device ID.
    pub id: DeviceId,
    /// The connector that reported this device.
    pub connector_id: ConnectorId,
    /// The vendor's identifier for this device.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Standardized kind.
    pub kind: DeviceKind,
    /// Standardized subtype, when the mapping provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Connectors
// ============================================================================

/// A per-tenant vendor integration.
///
/// Holds the opaque webhook token the Gateway resolves and the signing
/// secret the Verifier uses. Connector credential administration is out of
/// scope; these records exist for bootstrap and ingestion.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    /// Connector ID.
    pub id: ConnectorId,
    /// Owning organization.
    pub organization_id: OrgId,
    /// Vendor category.
    pub vendor: VendorKind,
    /// Display name.
    pub name: String,
    /// Opaque token embedded in the webhook URL.
    pub webhook_token: String,
    /// Shared signing secret for webhook verification.
    pub secret: String,
    /// Timestamp of the last successfully processed webhook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("id", &self.id)
            .field("organization_id", &self.organization_id)
            .field("vendor", &self.vendor)
            .field("name", &self.name)
            .field("webhook_token", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("last_activity_at", &self.last_activity_at)
            .finish()
    }
}

// ============================================================================
// Standardized events
// ============================================================================

/// The canonical, vendor-agnostic event shape produced by the Normalizer.
///
/// Produced once per vendor event and persisted before it is handed to the
/// trigger evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedEvent {
    /// Event ID.
    pub id: EventId,
    /// The connector that delivered the vendor event.
    pub connector_id: ConnectorId,
    /// Standardized event type (see [`crate::policy::event_types`]).
    pub event_type: String,
    /// Optional standardized subtype.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Optional display state reported by the vendor (e.g. `open`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_state: Option<String>,
    /// The vendor's identifier for the originating device, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_external_id: Option<String>,
    /// The raw vendor payload, preserved for diagnostics.
    pub payload: serde_json::Value,
    /// When the vendor says the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// When Warden received it.
    pub received_at: DateTime<Utc>,
}
