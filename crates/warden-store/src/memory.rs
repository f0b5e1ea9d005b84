//! In-memory repository backend.
//!
//! Thread-safe via `RwLock`; the reference implementation used by tests
//! and local development. Both repository invariants hold by construction
//! here: memberships are keyed by device (a uniqueness constraint on the
//! device column), so assignment is an upsert that replaces any prior
//! owner with no delete/insert window, and the audit append happens under
//! the same write lock as the state update it describes.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use warden_core::error::{Error, Result};
use warden_core::id::{
    AuditEntryId, ConnectorId, DeviceId, LocationId, OrgId, ZoneId,
};
use warden_core::model::{
    AlarmZone, AuditLogEntry, Connector, Device, Location, Organization, StandardizedEvent,
    TriggerOverride,
};

use crate::repository::{
    AUDIT_PAGE_MAX, AuditPage, AuditQuery, DeviceRecord, NewConnector, NewZone, StateChange,
    StateTransition, ZoneRepository, ZoneUpdate,
};

#[derive(Debug, Default)]
struct Inner {
    organizations: HashMap<OrgId, Organization>,
    locations: HashMap<LocationId, Location>,
    zones: HashMap<ZoneId, AlarmZone>,
    /// Keyed by device: a device has at most one membership, structurally.
    memberships: HashMap<DeviceId, ZoneId>,
    overrides: HashMap<(ZoneId, String), bool>,
    /// Append-ordered per zone; reads walk it in reverse for newest-first.
    audit: HashMap<ZoneId, Vec<AuditLogEntry>>,
    connectors: HashMap<ConnectorId, Connector>,
    devices: HashMap<DeviceId, Device>,
    device_index: HashMap<(ConnectorId, String), DeviceId>,
    events: Vec<StandardizedEvent>,
}

/// In-memory [`ZoneRepository`] implementation.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| Error::internal("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| Error::internal("lock poisoned"))
    }
}

/// Verifies the zone → location → organization chain.
fn check_zone_access(inner: &Inner, org_id: OrgId, zone_id: ZoneId) -> Result<()> {
    let zone = inner
        .zones
        .get(&zone_id)
        .ok_or_else(|| Error::not_accessible("alarm zone", zone_id))?;
    let location = inner
        .locations
        .get(&zone.location_id)
        .ok_or_else(|| Error::not_accessible("alarm zone", zone_id))?;
    if location.organization_id != org_id {
        return Err(Error::not_accessible("alarm zone", zone_id));
    }
    Ok(())
}

/// Verifies the device → connector → organization chain.
fn check_device_access(inner: &Inner, org_id: OrgId, device_id: DeviceId) -> Result<()> {
    let device = inner
        .devices
        .get(&device_id)
        .ok_or_else(|| Error::not_accessible("device", device_id))?;
    let connector = inner
        .connectors
        .get(&device.connector_id)
        .ok_or_else(|| Error::not_accessible("device", device_id))?;
    if connector.organization_id != org_id {
        return Err(Error::not_accessible("device", device_id));
    }
    Ok(())
}

fn check_location_access(inner: &Inner, org_id: OrgId, location_id: LocationId) -> Result<()> {
    let location = inner
        .locations
        .get(&location_id)
        .ok_or_else(|| Error::not_accessible("location", location_id))?;
    if location.organization_id != org_id {
        return Err(Error::not_accessible("location", location_id));
    }
    Ok(())
}

#[async_trait]
impl ZoneRepository for MemoryRepository {
    async fn create_organization(&self, name: &str) -> Result<Organization> {
        let mut inner = self.write()?;
        let org = Organization {
            id: OrgId::generate(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.organizations.insert(org.id, org.clone());
        Ok(org)
    }

    async fn create_location(&self, org_id: OrgId, name: &str) -> Result<Location> {
        let mut inner = self.write()?;
        if !inner.organizations.contains_key(&org_id) {
            return Err(Error::not_accessible("organization", org_id));
        }
        let location = Location {
            id: LocationId::generate(),
            organization_id: org_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn get_location(&self, org_id: OrgId, location_id: LocationId) -> Result<Location> {
        let inner = self.read()?;
        check_location_access(&inner, org_id, location_id)?;
        inner
            .locations
            .get(&location_id)
            .cloned()
            .ok_or_else(|| Error::not_accessible("location", location_id))
    }

    async fn create_connector(&self, org_id: OrgId, connector: NewConnector) -> Result<Connector> {
        let mut inner = self.write()?;
        if !inner.organizations.contains_key(&org_id) {
            return Err(Error::not_accessible("organization", org_id));
        }
        let record = Connector {
            id: ConnectorId::generate(),
            organization_id: org_id,
            vendor: connector.vendor,
            name: connector.name,
            webhook_token: connector.webhook_token,
            secret: connector.secret,
            last_activity_at: None,
            created_at: Utc::now(),
        };
        inner.connectors.insert(record.id, record.clone());
        Ok(record)
    }

    async fn connector_by_token(&self, webhook_token: &str) -> Result<Option<Connector>> {
        let inner = self.read()?;
        Ok(inner
            .connectors
            .values()
            .find(|c| c.webhook_token == webhook_token)
            .cloned())
    }

    async fn record_connector_activity(
        &self,
        connector_id: ConnectorId,
        at: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let connector = inner
            .connectors
            .get_mut(&connector_id)
            .ok_or_else(|| Error::NotFound(format!("connector not found: {connector_id}")))?;
        connector.last_activity_at = Some(at);
        Ok(())
    }

    async fn upsert_device(&self, record: DeviceRecord) -> Result<Device> {
        let mut inner = self.write()?;
        if !inner.connectors.contains_key(&record.connector_id) {
            return Err(Error::NotFound(format!(
                "connector not found: {}",
                record.connector_id
            )));
        }

        let key = (record.connector_id, record.external_id.clone());
        if let Some(device_id) = inner.device_index.get(&key).copied() {
            let device = inner
                .devices
                .get_mut(&device_id)
                .ok_or_else(|| Error::internal("device index points at missing device"))?;
            device.name = record.name;
            device.kind = record.kind;
            device.subtype = record.subtype;
            device.updated_at = Utc::now();
            return Ok(device.clone());
        }

        let now = Utc::now();
        let device = Device {
            id: DeviceId::generate(),
            connector_id: record.connector_id,
            external_id: record.external_id,
            name: record.name,
            kind: record.kind,
            subtype: record.subtype,
            created_at: now,
            updated_at: now,
        };
        inner.device_index.insert(key, device.id);
        inner.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn find_device(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<Device>> {
        let inner = self.read()?;
        Ok(inner
            .device_index
            .get(&(connector_id, external_id.to_string()))
            .and_then(|id| inner.devices.get(id))
            .cloned())
    }

    async fn devices_by_ids(&self, org_id: OrgId, device_ids: &[DeviceId]) -> Result<Vec<Device>> {
        let inner = self.read()?;
        let mut devices = Vec::with_capacity(device_ids.len());
        for device_id in device_ids {
            check_device_access(&inner, org_id, *device_id)?;
            if let Some(device) = inner.devices.get(device_id) {
                devices.push(device.clone());
            }
        }
        Ok(devices)
    }

    async fn create_zone(&self, org_id: OrgId, zone: NewZone) -> Result<AlarmZone> {
        let mut inner = self.write()?;
        check_location_access(&inner, org_id, zone.location_id)?;
        let now = Utc::now();
        let record = AlarmZone {
            id: ZoneId::generate(),
            location_id: zone.location_id,
            name: zone.name,
            description: zone.description,
            armed_state: warden_core::model::ArmedState::Disarmed,
            trigger_behavior: zone.trigger_behavior,
            last_change_reason: None,
            created_at: now,
            updated_at: now,
        };
        inner.zones.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_zone(&self, org_id: OrgId, zone_id: ZoneId) -> Result<AlarmZone> {
        let inner = self.read()?;
        check_zone_access(&inner, org_id, zone_id)?;
        inner
            .zones
            .get(&zone_id)
            .cloned()
            .ok_or_else(|| Error::not_accessible("alarm zone", zone_id))
    }

    async fn list_zones(&self, org_id: OrgId, location_id: LocationId) -> Result<Vec<AlarmZone>> {
        let inner = self.read()?;
        check_location_access(&inner, org_id, location_id)?;
        let mut zones: Vec<AlarmZone> = inner
            .zones
            .values()
            .filter(|z| z.location_id == location_id)
            .cloned()
            .collect();
        zones.sort_by_key(|z| z.id.as_ulid());
        Ok(zones)
    }

    async fn update_zone(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        update: ZoneUpdate,
    ) -> Result<AlarmZone> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;
        let zone = inner
            .zones
            .get_mut(&zone_id)
            .ok_or_else(|| Error::not_accessible("alarm zone", zone_id))?;
        if let Some(name) = update.name {
            zone.name = name;
        }
        if let Some(description) = update.description {
            zone.description = Some(description);
        }
        if let Some(behavior) = update.trigger_behavior {
            zone.trigger_behavior = behavior;
        }
        zone.updated_at = Utc::now();
        Ok(zone.clone())
    }

    async fn delete_zone(&self, org_id: OrgId, zone_id: ZoneId) -> Result<()> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;
        tracing::debug!(org = %org_id, zone = %zone_id, "deleting alarm zone");
        inner.zones.remove(&zone_id);
        inner.memberships.retain(|_, owner| *owner != zone_id);
        inner.overrides.retain(|(zone, _), _| *zone != zone_id);
        // Audit entries outlive the zone: the ledger is append-only.
        Ok(())
    }

    async fn assign_devices(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        device_ids: &[DeviceId],
    ) -> Result<Vec<Device>> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;

        // Validate the whole batch before touching any membership.
        let mut assigned = Vec::with_capacity(device_ids.len());
        for device_id in device_ids {
            check_device_access(&inner, org_id, *device_id)?;
            let device = inner
                .devices
                .get(device_id)
                .ok_or_else(|| Error::not_accessible("device", device_id))?;
            if !device.kind.supports_zone_membership() {
                return Err(Error::InvalidInput(format!(
                    "device {device_id} has kind '{}' which cannot join an alarm zone",
                    device.kind
                )));
            }
            assigned.push(device.clone());
        }

        // Device-keyed upsert: replaces any prior owner in one step.
        for device_id in device_ids {
            inner.memberships.insert(*device_id, zone_id);
        }
        Ok(assigned)
    }

    async fn remove_devices(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        device_ids: &[DeviceId],
    ) -> Result<()> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;
        for device_id in device_ids {
            check_device_access(&inner, org_id, *device_id)?;
            if inner.memberships.get(device_id) == Some(&zone_id) {
                inner.memberships.remove(device_id);
            }
        }
        Ok(())
    }

    async fn list_zone_devices(&self, org_id: OrgId, zone_id: ZoneId) -> Result<Vec<Device>> {
        let inner = self.read()?;
        check_zone_access(&inner, org_id, zone_id)?;
        let mut devices: Vec<Device> = inner
            .memberships
            .iter()
            .filter(|(_, owner)| **owner == zone_id)
            .filter_map(|(device_id, _)| inner.devices.get(device_id))
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.id.as_ulid());
        Ok(devices)
    }

    async fn zone_for_device(
        &self,
        org_id: OrgId,
        device_id: DeviceId,
    ) -> Result<Option<AlarmZone>> {
        let inner = self.read()?;
        check_device_access(&inner, org_id, device_id)?;
        Ok(inner
            .memberships
            .get(&device_id)
            .and_then(|zone_id| inner.zones.get(zone_id))
            .cloned())
    }

    async fn put_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
        should_trigger: bool,
    ) -> Result<TriggerOverride> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;
        inner
            .overrides
            .insert((zone_id, event_type.to_string()), should_trigger);
        Ok(TriggerOverride {
            zone_id,
            event_type: event_type.to_string(),
            should_trigger,
        })
    }

    async fn get_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
    ) -> Result<Option<TriggerOverride>> {
        let inner = self.read()?;
        check_zone_access(&inner, org_id, zone_id)?;
        Ok(inner
            .overrides
            .get(&(zone_id, event_type.to_string()))
            .map(|should_trigger| TriggerOverride {
                zone_id,
                event_type: event_type.to_string(),
                should_trigger: *should_trigger,
            }))
    }

    async fn list_trigger_overrides(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
    ) -> Result<Vec<TriggerOverride>> {
        let inner = self.read()?;
        check_zone_access(&inner, org_id, zone_id)?;
        let mut overrides: Vec<TriggerOverride> = inner
            .overrides
            .iter()
            .filter(|((zone, _), _)| *zone == zone_id)
            .map(|((_, event_type), should_trigger)| TriggerOverride {
                zone_id,
                event_type: event_type.clone(),
                should_trigger: *should_trigger,
            })
            .collect();
        overrides.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        Ok(overrides)
    }

    async fn remove_trigger_override(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        event_type: &str,
    ) -> Result<()> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;
        inner.overrides.remove(&(zone_id, event_type.to_string()));
        Ok(())
    }

    async fn set_armed_state(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        change: StateChange,
    ) -> Result<StateTransition> {
        let mut inner = self.write()?;
        check_zone_access(&inner, org_id, zone_id)?;

        let zone = inner
            .zones
            .get_mut(&zone_id)
            .ok_or_else(|| Error::not_accessible("alarm zone", zone_id))?;
        let previous_state = zone.armed_state;
        tracing::debug!(
            org = %org_id,
            zone = %zone_id,
            previous = %previous_state,
            new = %change.new_state,
            "writing armed state"
        );
        zone.armed_state = change.new_state;
        zone.last_change_reason = change.reason.clone();
        zone.updated_at = Utc::now();
        let updated = zone.clone();

        // One audit entry per call, even when previous == new.
        let entry = AuditLogEntry {
            id: AuditEntryId::generate(),
            zone_id,
            actor: change.actor,
            action: change.action,
            previous_state,
            new_state: change.new_state,
            reason: change.reason,
            event_id: change.event_id,
            metadata: change.metadata,
            created_at: Utc::now(),
        };
        inner.audit.entry(zone_id).or_default().push(entry);

        Ok(StateTransition {
            previous_state,
            zone: updated,
        })
    }

    async fn audit_log(
        &self,
        org_id: OrgId,
        zone_id: ZoneId,
        query: AuditQuery,
    ) -> Result<AuditPage> {
        let inner = self.read()?;
        check_zone_access(&inner, org_id, zone_id)?;
        let limit = query.limit.clamp(1, AUDIT_PAGE_MAX);
        let entries: Vec<AuditLogEntry> = inner
            .audit
            .get(&zone_id)
            .map(|log| {
                log.iter()
                    .rev()
                    .skip(query.offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let has_more = entries.len() == limit;
        Ok(AuditPage { entries, has_more })
    }

    async fn insert_event(&self, event: &StandardizedEvent) -> Result<()> {
        let mut inner = self.write()?;
        inner.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, connector_id: ConnectorId) -> Result<Vec<StandardizedEvent>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.connector_id == connector_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::model::{ArmedState, AuditAction, DeviceKind, TriggerBehavior};
    use warden_core::vendor::VendorKind;

    async fn fixture(repo: &MemoryRepository) -> (OrgId, LocationId) {
        let org = repo.create_organization("Acme Security").await.expect("org");
        let location = repo
            .create_location(org.id, "Headquarters")
            .await
            .expect("location");
        (org.id, location.id)
    }

    #[tokio::test]
    async fn create_and_get_zone() {
        let repo = MemoryRepository::new();
        let (org, location) = fixture(&repo).await;

        let zone = repo
            .create_zone(
                org,
                NewZone {
                    location_id: location,
                    name: "Lobby".to_string(),
                    description: None,
                    trigger_behavior: TriggerBehavior::Standard,
                },
            )
            .await
            .expect("create");

        assert_eq!(zone.armed_state, ArmedState::Disarmed);
        let fetched = repo.get_zone(org, zone.id).await.expect("get");
        assert_eq!(fetched.name, "Lobby");
    }

    #[tokio::test]
    async fn connector_resolves_by_token_only() {
        let repo = MemoryRepository::new();
        let (org, _) = fixture(&repo).await;
        repo.create_connector(
            org,
            NewConnector {
                vendor: VendorKind::Passage,
                name: "front doors".to_string(),
                webhook_token: "whk_1".to_string(),
                secret: "s3cret".to_string(),
            },
        )
        .await
        .expect("connector");

        let hit = repo.connector_by_token("whk_1").await.expect("lookup");
        assert!(hit.is_some());
        let miss = repo.connector_by_token("whk_2").await.expect("lookup");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn set_armed_state_appends_audit_even_when_state_is_unchanged() {
        let repo = MemoryRepository::new();
        let (org, location) = fixture(&repo).await;
        let zone = repo
            .create_zone(
                org,
                NewZone {
                    location_id: location,
                    name: "Vault".to_string(),
                    description: None,
                    trigger_behavior: TriggerBehavior::Standard,
                },
            )
            .await
            .expect("create");

        for _ in 0..2 {
            repo.set_armed_state(
                org,
                zone.id,
                StateChange {
                    new_state: ArmedState::Armed,
                    action: AuditAction::Armed,
                    actor: Some("user:alice".to_string()),
                    reason: Some("closing time".to_string()),
                    event_id: None,
                    metadata: None,
                },
            )
            .await
            .expect("set state");
        }

        let page = repo
            .audit_log(org, zone.id, AuditQuery::default())
            .await
            .expect("audit");
        assert_eq!(page.entries.len(), 2);
        // The second entry records an ARMED -> ARMED no-op.
        assert_eq!(page.entries[0].previous_state, ArmedState::Armed);
        assert_eq!(page.entries[0].new_state, ArmedState::Armed);
        assert_eq!(page.entries[1].previous_state, ArmedState::Disarmed);
    }

    #[tokio::test]
    async fn device_upsert_is_idempotent() {
        let repo = MemoryRepository::new();
        let (org, _) = fixture(&repo).await;
        let connector = repo
            .create_connector(
                org,
                NewConnector {
                    vendor: VendorKind::Passage,
                    name: "doors".to_string(),
                    webhook_token: "whk".to_string(),
                    secret: "s".to_string(),
                },
            )
            .await
            .expect("connector");

        let first = repo
            .upsert_device(DeviceRecord {
                connector_id: connector.id,
                external_id: "ext-1".to_string(),
                name: "Front Door".to_string(),
                kind: DeviceKind::Door,
                subtype: None,
            })
            .await
            .expect("upsert");
        let second = repo
            .upsert_device(DeviceRecord {
                connector_id: connector.id,
                external_id: "ext-1".to_string(),
                name: "Front Door (renamed)".to_string(),
                kind: DeviceKind::Door,
                subtype: Some("exterior".to_string()),
            })
            .await
            .expect("upsert");

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Front Door (renamed)");
        assert_eq!(second.created_at, first.created_at);
    }
}
