//! The alarm zone repository contract.
//!
//! All repository implementations must uphold two invariants:
//!
//! - **One zone per device**: assigning a device to a zone replaces any
//!   prior membership as one atomic step. Persistent backends must provide
//!   equivalent atomicity (a uniqueness constraint on the device column
//!   plus an upsert-on-conflict statement); a bare delete-then-insert pair
//!   leaves a window under concurrent reassignment.
//! - **Audit per state write**: every [`ZoneRepository::set_armed_state`]
//!   call appends exactly one audit entry capturing previous and new
//!   state, even when the two are equal. Audit entries are append-only:
//!   this trait exposes no way to update or delete them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::error::Result;
use warden_core::id::{ConnectorId, DeviceId, EventId, LocationId, OrgId, ZoneId};
use warden_core::model::{
    AlarmZone, ArmedState, AuditAction, AuditLogEntry, Connector, Device, DeviceKind, Location,
    Organization, StandardizedEvent, TriggerBehavior, TriggerOverride,
};
use warden_core::vendor::VendorKind;

/// Maximum page size for audit log reads.
pub const AUDIT_PAGE_MAX: usize = 1000;

/// Default page size for audit log reads.
pub const AUDIT_PAGE_DEFAULT: usize = 100;

/// Fields required to register a vendor connector.
#[derive(Debug, Clone)]
pub struct NewConnector {
    /// Vendor category.
    pub vendor: VendorKind,
    /// Display name.
    pub name: String,
    /// Opaque token embedded in the webhook URL.
    pub webhook_token: String,
    /// Shared signing secret.
    pub secret: String,
}

/// A vendor-asserted device row for idempotent upsert.
///
/// Identity is `(connector_id, external_id)`; replaying the same record
/// updates the existing device instead of inserting a duplicate.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// The connector that reported the device.
    pub connector_id: ConnectorId,
    /// The vendor's identifier for the device.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Standardized kind.
    pub kind: DeviceKind,
    /// Standardized subtype, if the mapping provides one.
    pub subtype: Option<String>,
}

/// Fields required to create an alarm zone.
#[derive(Debug, Clone)]
pub struct NewZone {
    /// The location the zone belongs to; must resolve within the caller's
    /// organization.
    pub location_id: LocationId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Trigger decision mode.
    pub trigger_behavior: TriggerBehavior,
}

/// Partial update for an alarm zone. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ZoneUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New trigger decision mode.
    pub trigger_behavior: Option<TriggerBehavior>,
}

/// One armed-state write, with everything the audit entry needs.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// The state to write.
    pub new_state: ArmedState,
    /// The action label recorded in the audit log.
    pub action: AuditAction,
    /// Acting user, or `None` for system-triggered changes.
    pub actor: Option<String>,
    /// Human-readable reason.
    pub reason: Option<String>,
    /// The standardized event that caused the change, if any.
    pub event_id: Option<EventId>,
    /// Optional structured metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Result of an armed-state write.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The state before the write.
    pub previous_state: ArmedState,
    /// The zone after the write.
    pub zone: AlarmZone,
}

/// Pagination parameters for audit log reads.
#[derive(Debug, Clone, Copy)]
pub struct AuditQuery {
    /// Page size; clamped to `[1, AUDIT_PAGE_MAX]`.
    pub limit: usize,
    /// Entries to skip, newest-first.
    pub offset: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: AUDIT_PAGE_DEFAULT,
            offset: 0,
        }
    }
}

/// One page of audit log entries, newest-first.
#[derive(Debug, Clone)]
pub struct AuditPage {
    /// The entries in this page.
    pub entries: Vec<AuditLogEntry>,
    /// True when the page was full, i.e. another page may exist.
    pub has_more: bool,
}

/// The tenant-scoped alarm zone repository.
///
/// Implementations are invoked concurrently across independent requests;
/// they own whatever synchronization their backend needs. Tenant-scoped
/// lookups that miss — whether the entity is absent or owned by another
/// organization — fail with [`warden_core::Error::NotAccessible`].
#[async_trait]
pub trait ZoneRepository: Send + Sync + 'static {
    // ------------------------------------------------------------------
    // Tenancy
    // ------------------------------------------------------------------

    /// Creates an organization.
    async fn create_organization(&self, name: &str) -> Result<Organization>;

    /// Creates a location under an organization.
    async fn create_location(&self, org_id: OrgId, name: &str) -> Result<Location>;

    /// Fetches a location within the caller's organization.
    async fn get_location(&self, org_id: OrgId, location_id: LocationId) -> Result<Location>;

    // ------------------------------------------------------------------
    // Connectors (ingestion)
    // ------------------------------------------------------------------

    /// Registers a vendor connector for an organization.
    async fn create_connector(&self, org_id: OrgId, connector: NewConnector) -> Result<Connector>;

    /// Resolves a connector by its opaque webhook token.
    ///
    /// Returns `None` on miss; the gateway maps that to a uniform
    /// unauthorized response.
    async fn connector_by_token(&self, webhook_token: &str) -> Result<Option<Connector>>;

    /// Records successful ingestion activity for connector liveness.
    async fn record_connector_activity(
        &self,
        connector_id: ConnectorId,
        at: DateTime<Utc>,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    /// Inserts or updates a device keyed by `(connector, external id)`.
    async fn upsert_device(&self, record: DeviceRecord) -> Result<Device>;

    /// Looks up a device by its vendor identity.
    async fn find_device(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<Device>>;

    /// Fetches a batch of devices within the caller's organization.
    ///
    /// Fails if any requested device is missing or foreign — callers use
    /// this to reject whole assignment batches.
    async fn devices_by_ids(&self, org_id: OrgId, device_ids: &[DeviceId]) -> Result<Vec<Device>>;

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    /// Creates a zone; the location must resolve within the organization.
    async fn create_zone(&self, org_id: OrgId, zone: NewZone) -> Result<AlarmZone>;

    /// Fetches a zone within the caller's organization.
    async fn get_zone(&self, org_id: OrgId, zone_id: ZoneId) -> Result<AlarmZone>;

    /// Lists a location's zones.
    async fn list_zones(&self, org_id: OrgId, location_id: LocationId) -> Result<Vec<AlarmZone>>;

    /// Applies a partial update to a zone.
    async fn update_zone(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        update: ZoneUpdate,
    ) -> Result<AlarmZone>;

    /// Deletes a zone, cascading its device memberships and trigger
    /// overrides. Audit entries are retained.
    async fn delete_zone(&self, org_id: OrgId, zone_id: ZoneId) -> Result<()>;

    // ------------------------------------------------------------------
    // Zone-device membership
    // ------------------------------------------------------------------

    /// Assigns devices to a zone, replacing any prior membership of each
    /// device.
    ///
    /// The whole batch is validated first — every device must exist in the
    /// organization and carry a kind that supports zone membership — and
    /// rejected outright if any device fails, leaving memberships
    /// untouched.
    async fn assign_devices(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        device_ids: &[DeviceId],
    ) -> Result<Vec<Device>>;

    /// Removes devices from a zone. Devices not currently in the zone are
    /// ignored.
    async fn remove_devices(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        device_ids: &[DeviceId],
    ) -> Result<()>;

    /// Lists the devices currently assigned to a zone.
    async fn list_zone_devices(&self, org_id: OrgId, zone_id: ZoneId) -> Result<Vec<Device>>;

    /// Returns the zone containing a device, if any.
    ///
    /// At most one zone can contain a device at a time.
    async fn zone_for_device(&self, org_id: OrgId, device_id: DeviceId)
        -> Result<Option<AlarmZone>>;

    // ------------------------------------------------------------------
    // Trigger overrides
    // ------------------------------------------------------------------

    /// Upserts the override for `(zone, event type)`.
    async fn put_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
        should_trigger: bool,
    ) -> Result<TriggerOverride>;

    /// Fetches the override for `(zone, event type)`, if present.
    async fn get_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
    ) -> Result<Option<TriggerOverride>>;

    /// Lists a zone's overrides.
    async fn list_trigger_overrides(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
    ) -> Result<Vec<TriggerOverride>>;

    /// Removes the override for `(zone, event type)`, reverting that type
    /// to standard policy. Removing an absent override is a no-op.
    async fn remove_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Armed state + audit
    // ------------------------------------------------------------------

    /// The sole state-mutating entry point for a zone's armed state.
    ///
    /// Reads the current state, writes the new state plus the
    /// human-readable reason, and unconditionally appends one audit entry
    /// capturing previous and new state — a no-op re-arm still produces an
    /// audit record.
    async fn set_armed_state(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        change: StateChange,
    ) -> Result<StateTransition>;

    /// Reads one page of a zone's audit log, newest-first.
    async fn audit_log(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        query: AuditQuery,
    ) -> Result<AuditPage>;

    // ------------------------------------------------------------------
    // Standardized events
    // ------------------------------------------------------------------

    /// Persists a standardized event.
    async fn insert_event(&self, event: &StandardizedEvent) -> Result<()>;

    /// Lists the standardized events delivered by a connector, oldest
    /// first.
    async fn list_events(&self, connector_id: ConnectorId) -> Result<Vec<StandardizedEvent>>;
}
