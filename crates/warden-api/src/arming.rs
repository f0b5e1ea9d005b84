//! The arming orchestrator.
//!
//! The only caller of the repository's state-mutating operation. Every
//! transition — arm, disarm, acknowledge, or event-driven trigger — funnels
//! through one internal state-setter so the audit semantics are uniform
//! regardless of the caller's intent label.
//!
//! Two side effects are layered on each transition:
//!
//! 1. the audit-log write, delegated to the repository and never skipped;
//! 2. a best-effort realtime broadcast. Broadcast failures are logged and
//!    swallowed — observability never blocks the operational effect.

use std::sync::Arc;

use warden_core::error::Result;
use warden_core::id::{OrgId, ZoneId};
use warden_core::model::{
    AlarmZone, ArmedState, AuditAction, Connector, StandardizedEvent, TriggerBehavior,
};
use warden_core::policy;
use warden_core::realtime::{
    RealtimePublisher, ZoneStateBroadcast, ZoneStateChange, zone_channel, zone_detail_channel,
};
use warden_store::{StateChange, StateTransition, ZoneRepository};

use crate::metrics;

/// Caller-supplied fields for a manual state change.
#[derive(Debug, Clone, Default)]
pub struct ChangeRequest {
    /// Acting user label, or `None` for system-driven changes.
    pub actor: Option<String>,
    /// Human-readable reason.
    pub reason: Option<String>,
    /// Optional structured metadata for the audit entry.
    pub metadata: Option<serde_json::Value>,
}

/// Wraps armed-state writes with audit logging and realtime broadcast.
pub struct ArmingOrchestrator {
    repo: Arc<dyn ZoneRepository>,
    publisher: Arc<dyn RealtimePublisher>,
}

impl ArmingOrchestrator {
    /// Creates an orchestrator over the given repository and publisher.
    #[must_use]
    pub fn new(repo: Arc<dyn ZoneRepository>, publisher: Arc<dyn RealtimePublisher>) -> Self {
        Self { repo, publisher }
    }

    /// Arms a zone.
    ///
    /// # Errors
    ///
    /// Returns an error when the zone is not accessible or the write fails.
    pub async fn arm(
        &self,
        org: OrgId,
        zone_id: ZoneId,
        request: ChangeRequest,
    ) -> Result<AlarmZone> {
        self.set_state(org, zone_id, ArmedState::Armed, AuditAction::Armed, request, None)
            .await
    }

    /// Disarms a zone.
    ///
    /// # Errors
    ///
    /// Returns an error when the zone is not accessible or the write fails.
    pub async fn disarm(
        &self,
        org: OrgId,
        zone_id: ZoneId,
        request: ChangeRequest,
    ) -> Result<AlarmZone> {
        self.set_state(
            org,
            zone_id,
            ArmedState::Disarmed,
            AuditAction::Disarmed,
            request,
            None,
        )
        .await
    }

    /// Acknowledges a triggered zone: disarm-with-reason under the
    /// `acknowledged` audit action.
    ///
    /// # Errors
    ///
    /// Returns an error when the zone is not accessible or the write fails.
    pub async fn acknowledge(
        &self,
        org: OrgId,
        zone_id: ZoneId,
        mut request: ChangeRequest,
    ) -> Result<AlarmZone> {
        if request.reason.is_none() {
            request.reason = Some("alarm acknowledged".to_string());
        }
        self.set_state(
            org,
            zone_id,
            ArmedState::Disarmed,
            AuditAction::Acknowledged,
            request,
            None,
        )
        .await
    }

    /// Manually moves a zone to triggered (drills, panic buttons).
    ///
    /// # Errors
    ///
    /// Returns an error when the zone is not accessible or the write fails.
    pub async fn trigger(
        &self,
        org: OrgId,
        zone_id: ZoneId,
        request: ChangeRequest,
    ) -> Result<AlarmZone> {
        let zone = self
            .set_state(
                org,
                zone_id,
                ArmedState::Triggered,
                AuditAction::Triggered,
                request,
                None,
            )
            .await?;
        metrics::record_zone_triggered();
        Ok(zone)
    }

    /// Runs trigger evaluation for a freshly normalized event.
    ///
    /// Resolves the event's device, the zone containing it, and — for
    /// custom zones — the override for the event's exact type, then asks
    /// the policy evaluator. Only an ARMED zone is moved to TRIGGERED; a
    /// zone that is already triggered is not re-triggered.
    ///
    /// Returns true when a zone transitioned.
    ///
    /// # Errors
    ///
    /// Returns an error when a repository operation fails.
    pub async fn process_event(
        &self,
        connector: &Connector,
        event: &StandardizedEvent,
    ) -> Result<bool> {
        let Some(external_id) = event.device_external_id.as_deref() else {
            return Ok(false);
        };
        let Some(device) = self.repo.find_device(event.connector_id, external_id).await? else {
            tracing::debug!(
                connector = %connector.id,
                device = %external_id,
                "event references an unknown device; skipping trigger evaluation"
            );
            return Ok(false);
        };

        let org = connector.organization_id;
        let Some(zone) = self.repo.zone_for_device(org, device.id).await? else {
            return Ok(false);
        };
        if zone.armed_state != ArmedState::Armed {
            return Ok(false);
        }

        let override_value = match zone.trigger_behavior {
            TriggerBehavior::Custom => self
                .repo
                .get_trigger_override(org, zone.id, &event.event_type)
                .await?
                .map(|o| o.should_trigger),
            TriggerBehavior::Standard => None,
        };

        if !policy::should_trigger(event, zone.trigger_behavior, override_value) {
            return Ok(false);
        }

        tracing::info!(
            org = %org,
            zone = %zone.id,
            event = %event.id,
            event_type = %event.event_type,
            "event triggered alarm zone"
        );
        self.set_state(
            org,
            zone.id,
            ArmedState::Triggered,
            AuditAction::Triggered,
            ChangeRequest {
                actor: None,
                reason: Some(format!("triggered by {} event", event.event_type)),
                metadata: None,
            },
            Some(event.id),
        )
        .await?;
        metrics::record_zone_triggered();
        Ok(true)
    }

    /// The single internal state-setter every operation funnels through.
    async fn set_state(
        &self,
        org: OrgId,
        zone_id: ZoneId,
        new_state: ArmedState,
        action: AuditAction,
        request: ChangeRequest,
        event_id: Option<warden_core::id::EventId>,
    ) -> Result<AlarmZone> {
        let transition = self
            .repo
            .set_armed_state(
                org,
                zone_id,
                StateChange {
                    new_state,
                    action,
                    actor: request.actor,
                    reason: request.reason,
                    event_id,
                    metadata: request.metadata,
                },
            )
            .await?;

        self.broadcast(org, &transition).await;
        Ok(transition.zone)
    }

    /// Best-effort broadcast of a state transition.
    async fn broadcast(&self, org: OrgId, transition: &StateTransition) {
        let zone = &transition.zone;
        let location_name = match self.repo.get_location(org, zone.location_id).await {
            Ok(location) => location.name,
            Err(err) => {
                tracing::warn!(org = %org, zone = %zone.id, error = %err, "broadcast skipped: location lookup failed");
                return;
            }
        };

        let broadcast = ZoneStateBroadcast::new(
            org,
            ZoneStateChange {
                zone_id: zone.id,
                zone_name: zone.name.clone(),
                location_id: zone.location_id,
                location_name,
                previous_state: transition.previous_state,
                current_state: zone.armed_state,
                previous_state_display: transition.previous_state.display_name().to_string(),
                current_state_display: zone.armed_state.display_name().to_string(),
            },
        );

        let message = match serde_json::to_value(&broadcast) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(org = %org, zone = %zone.id, error = %err, "broadcast skipped: serialization failed");
                return;
            }
        };

        let channel = zone_channel(org);
        if let Err(err) = self.publisher.publish(&channel, &message).await {
            tracing::warn!(org = %org, zone = %zone.id, error = %err, "zone state broadcast failed");
        }

        // The detail channel carries the full zone record, but only while
        // someone is listening. Check-then-publish is non-atomic by design.
        let detail_channel = zone_detail_channel(org);
        if self.publisher.subscriber_count(&detail_channel).await > 0 {
            let detail = serde_json::json!({
                "kind": warden_core::realtime::ARMING_KIND,
                "organizationId": org,
                "change": message["change"],
                "zone": zone,
            });
            if let Err(err) = self.publisher.publish(&detail_channel, &detail).await {
                tracing::warn!(org = %org, zone = %zone.id, error = %err, "zone detail broadcast failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::model::DeviceKind;
    use warden_core::realtime::MemoryPublisher;
    use warden_core::vendor::VendorKind;
    use warden_store::{DeviceRecord, MemoryRepository, NewConnector, NewZone};

    struct Harness {
        repo: Arc<MemoryRepository>,
        publisher: Arc<MemoryPublisher>,
        orchestrator: ArmingOrchestrator,
        org: OrgId,
        zone: ZoneId,
        connector: Connector,
    }

    async fn harness(behavior: TriggerBehavior) -> Harness {
        let repo = Arc::new(MemoryRepository::new());
        let publisher = Arc::new(MemoryPublisher::new());
        let orchestrator = ArmingOrchestrator::new(
            Arc::clone(&repo) as Arc<dyn ZoneRepository>,
            Arc::clone(&publisher) as Arc<dyn RealtimePublisher>,
        );

        let org = repo.create_organization("Acme").await.expect("org");
        let location = repo
            .create_location(org.id, "HQ")
            .await
            .expect("location");
        let zone = repo
            .create_zone(
                org.id,
                NewZone {
                    location_id: location.id,
                    name: "Lobby".to_string(),
                    description: None,
                    trigger_behavior: behavior,
                },
            )
            .await
            .expect("zone");
        let connector = repo
            .create_connector(
                org.id,
                NewConnector {
                    vendor: VendorKind::Passage,
                    name: "doors".to_string(),
                    webhook_token: "whk".to_string(),
                    secret: "s".to_string(),
                },
            )
            .await
            .expect("connector");

        Harness {
            repo,
            publisher,
            orchestrator,
            org: org.id,
            zone: zone.id,
            connector,
        }
    }

    async fn wire_device(h: &Harness) -> String {
        let device = h
            .repo
            .upsert_device(DeviceRecord {
                connector_id: h.connector.id,
                external_id: "d-1".to_string(),
                name: "Front Door".to_string(),
                kind: DeviceKind::Door,
                subtype: None,
            })
            .await
            .expect("device");
        h.repo
            .assign_devices(h.org, h.zone, &[device.id])
            .await
            .expect("assign");
        "d-1".to_string()
    }

    fn forced_open_event(h: &Harness, device: &str) -> StandardizedEvent {
        StandardizedEvent {
            id: warden_core::id::EventId::generate(),
            connector_id: h.connector.id,
            event_type: "door.forced_open".to_string(),
            subtype: None,
            display_state: None,
            device_external_id: Some(device.to_string()),
            payload: serde_json::json!({}),
            occurred_at: chrono::Utc::now(),
            received_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn arm_broadcasts_on_the_tenant_channel() {
        let h = harness(TriggerBehavior::Standard).await;
        h.orchestrator
            .arm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("arm");

        let messages = h.publisher.messages(&zone_channel(h.org));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["kind"], "arming");
        assert_eq!(messages[0]["change"]["previousState"], "DISARMED");
        assert_eq!(messages[0]["change"]["currentState"], "ARMED");
        assert_eq!(messages[0]["change"]["zoneName"], "Lobby");
        assert_eq!(messages[0]["change"]["locationName"], "HQ");
    }

    #[tokio::test]
    async fn detail_channel_is_skipped_without_subscribers() {
        let h = harness(TriggerBehavior::Standard).await;
        h.orchestrator
            .arm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("arm");
        assert!(h.publisher.messages(&zone_detail_channel(h.org)).is_empty());

        h.publisher.set_subscribers(&zone_detail_channel(h.org), 1);
        h.orchestrator
            .disarm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("disarm");
        let detail = h.publisher.messages(&zone_detail_channel(h.org));
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0]["zone"]["name"], "Lobby");
    }

    #[tokio::test]
    async fn armed_zone_triggers_on_policy_mapped_event() {
        let h = harness(TriggerBehavior::Standard).await;
        let device = wire_device(&h).await;
        h.orchestrator
            .arm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("arm");

        let triggered = h
            .orchestrator
            .process_event(&h.connector, &forced_open_event(&h, &device))
            .await
            .expect("process");
        assert!(triggered);

        let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
        assert_eq!(zone.armed_state, ArmedState::Triggered);
    }

    #[tokio::test]
    async fn disarmed_zone_ignores_events() {
        let h = harness(TriggerBehavior::Standard).await;
        let device = wire_device(&h).await;

        let triggered = h
            .orchestrator
            .process_event(&h.connector, &forced_open_event(&h, &device))
            .await
            .expect("process");
        assert!(!triggered);
        let zone = h.repo.get_zone(h.org, h.zone).await.expect("zone");
        assert_eq!(zone.armed_state, ArmedState::Disarmed);
    }

    #[tokio::test]
    async fn triggered_zone_is_not_retriggered() {
        let h = harness(TriggerBehavior::Standard).await;
        let device = wire_device(&h).await;
        h.orchestrator
            .arm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("arm");
        let event = forced_open_event(&h, &device);
        assert!(h
            .orchestrator
            .process_event(&h.connector, &event)
            .await
            .expect("first"));
        assert!(!h
            .orchestrator
            .process_event(&h.connector, &event)
            .await
            .expect("second"));

        // Exactly one trigger transition in the audit log.
        let page = h
            .repo
            .audit_log(h.org, h.zone, warden_store::AuditQuery::default())
            .await
            .expect("audit");
        let triggered_rows = page
            .entries
            .iter()
            .filter(|e| e.action == AuditAction::Triggered)
            .count();
        assert_eq!(triggered_rows, 1);
    }

    #[tokio::test]
    async fn custom_override_suppresses_standard_trigger() {
        let h = harness(TriggerBehavior::Custom).await;
        let device = wire_device(&h).await;
        h.repo
            .put_trigger_override(h.org, h.zone, "door.forced_open", false)
            .await
            .expect("override");
        h.orchestrator
            .arm(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("arm");

        let triggered = h
            .orchestrator
            .process_event(&h.connector, &forced_open_event(&h, &device))
            .await
            .expect("process");
        assert!(!triggered);

        // Removing the override reverts to standard policy.
        h.repo
            .remove_trigger_override(h.org, h.zone, "door.forced_open")
            .await
            .expect("remove");
        let triggered = h
            .orchestrator
            .process_event(&h.connector, &forced_open_event(&h, &device))
            .await
            .expect("process");
        assert!(triggered);
    }

    #[tokio::test]
    async fn acknowledge_is_disarm_with_reason() {
        let h = harness(TriggerBehavior::Standard).await;
        h.orchestrator
            .trigger(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("trigger");
        let zone = h
            .orchestrator
            .acknowledge(h.org, h.zone, ChangeRequest::default())
            .await
            .expect("acknowledge");
        assert_eq!(zone.armed_state, ArmedState::Disarmed);

        let page = h
            .repo
            .audit_log(h.org, h.zone, warden_store::AuditQuery::default())
            .await
            .expect("audit");
        assert_eq!(page.entries[0].action, AuditAction::Acknowledged);
        assert_eq!(page.entries[0].reason.as_deref(), Some("alarm acknowledged"));
    }
}
