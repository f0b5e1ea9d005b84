//! The global trigger policy and its evaluation function.
//!
//! The standard policy is a fixed table shared across the whole platform:
//! an entry matches an event's type, optionally constrained by subtype and
//! display state. Zones with [`TriggerBehavior::Custom`] layer per-zone
//! overrides on top: an override for the event's exact type wins outright;
//! absence falls back to the standard table.
//!
//! Evaluation is pure with respect to its inputs plus the override lookup —
//! no state mutation happens here; the orchestrator acts on the boolean.

use crate::model::{StandardizedEvent, TriggerBehavior};

/// Standardized event type identifiers produced by the Normalizer.
pub mod event_types {
    /// A door was forced open without a grant.
    pub const DOOR_FORCED_OPEN: &str = "door.forced_open";
    /// A door stayed open past its held-open timeout.
    pub const DOOR_HELD_OPEN: &str = "door.held_open";
    /// A door position report.
    pub const DOOR_STATUS: &str = "door.status";
    /// A credential was presented and granted.
    pub const ACCESS_GRANTED: &str = "access.granted";
    /// A credential was presented and denied.
    pub const ACCESS_DENIED: &str = "access.denied";
    /// A motion sensor report.
    pub const MOTION: &str = "sensor.motion";
    /// A glass break sensor fired.
    pub const GLASS_BREAK: &str = "sensor.glass_break";
    /// A camera went offline.
    pub const CAMERA_OFFLINE: &str = "camera.offline";
    /// A camera came back online.
    pub const CAMERA_ONLINE: &str = "camera.online";
}

/// One row of the standard trigger policy table.
#[derive(Debug, Clone, Copy)]
struct PolicyRule {
    event_type: &'static str,
    /// When set, the event's subtype must match exactly.
    subtype: Option<&'static str>,
    /// When set, the event's display state must match exactly.
    display_state: Option<&'static str>,
}

/// The fixed, platform-wide standard trigger policy.
///
/// An event triggers under standard policy iff some rule matches it.
const STANDARD_TRIGGER_RULES: &[PolicyRule] = &[
    PolicyRule {
        event_type: event_types::DOOR_FORCED_OPEN,
        subtype: None,
        display_state: None,
    },
    PolicyRule {
        event_type: event_types::DOOR_HELD_OPEN,
        subtype: None,
        display_state: None,
    },
    // An armed zone treats any door opening as an intrusion.
    PolicyRule {
        event_type: event_types::DOOR_STATUS,
        subtype: None,
        display_state: Some("open"),
    },
    PolicyRule {
        event_type: event_types::MOTION,
        subtype: None,
        display_state: Some("active"),
    },
    PolicyRule {
        event_type: event_types::GLASS_BREAK,
        subtype: None,
        display_state: None,
    },
    PolicyRule {
        event_type: event_types::ACCESS_DENIED,
        subtype: Some("repeated_failure"),
        display_state: None,
    },
];

impl PolicyRule {
    fn matches(&self, event_type: &str, subtype: Option<&str>, display_state: Option<&str>) -> bool {
        if self.event_type != event_type {
            return false;
        }
        if let Some(required) = self.subtype {
            if subtype != Some(required) {
                return false;
            }
        }
        if let Some(required) = self.display_state {
            if display_state != Some(required) {
                return false;
            }
        }
        true
    }
}

/// Applies the standard policy table to a raw (type, subtype, display state)
/// triple.
#[must_use]
pub fn standard_policy_triggers(
    event_type: &str,
    subtype: Option<&str>,
    display_state: Option<&str>,
) -> bool {
    STANDARD_TRIGGER_RULES
        .iter()
        .any(|rule| rule.matches(event_type, subtype, display_state))
}

/// Decides whether `event` should move a zone into the triggered state.
///
/// `override_value` is the zone's override for the event's exact type, if
/// one exists. It is consulted only for [`TriggerBehavior::Custom`] zones,
/// where it wins outright — even when it disagrees with the standard
/// policy. Standard zones ignore overrides entirely.
#[must_use]
pub fn should_trigger(
    event: &StandardizedEvent,
    behavior: TriggerBehavior,
    override_value: Option<bool>,
) -> bool {
    let standard = || {
        standard_policy_triggers(
            &event.event_type,
            event.subtype.as_deref(),
            event.display_state.as_deref(),
        )
    };
    match behavior {
        TriggerBehavior::Standard => standard(),
        TriggerBehavior::Custom => override_value.unwrap_or_else(standard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ConnectorId, EventId};
    use chrono::Utc;

    fn event(event_type: &str, subtype: Option<&str>, display_state: Option<&str>) -> StandardizedEvent {
        StandardizedEvent {
            id: EventId::generate(),
            connector_id: ConnectorId::generate(),
            event_type: event_type.to_string(),
            subtype: subtype.map(str::to_string),
            display_state: display_state.map(str::to_string),
            device_external_id: Some("dev-1".to_string()),
            payload: serde_json::json!({}),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn forced_open_triggers_regardless_of_subtype() {
        assert!(standard_policy_triggers(event_types::DOOR_FORCED_OPEN, None, None));
        assert!(standard_policy_triggers(
            event_types::DOOR_FORCED_OPEN,
            Some("rear_entry"),
            None
        ));
    }

    #[test]
    fn door_status_triggers_only_when_open() {
        assert!(standard_policy_triggers(event_types::DOOR_STATUS, None, Some("open")));
        assert!(!standard_policy_triggers(event_types::DOOR_STATUS, None, Some("closed")));
        assert!(!standard_policy_triggers(event_types::DOOR_STATUS, None, None));
    }

    #[test]
    fn access_denied_triggers_only_on_repeated_failure() {
        assert!(standard_policy_triggers(
            event_types::ACCESS_DENIED,
            Some("repeated_failure"),
            None
        ));
        assert!(!standard_policy_triggers(event_types::ACCESS_DENIED, None, None));
        assert!(!standard_policy_triggers(
            event_types::ACCESS_DENIED,
            Some("expired_credential"),
            None
        ));
    }

    #[test]
    fn benign_events_do_not_trigger() {
        assert!(!standard_policy_triggers(event_types::ACCESS_GRANTED, None, None));
        assert!(!standard_policy_triggers(event_types::CAMERA_OFFLINE, None, None));
    }

    #[test]
    fn custom_override_wins_over_standard_policy() {
        let forced = event(event_types::DOOR_FORCED_OPEN, None, None);
        // Standard policy says trigger; an explicit false override suppresses it.
        assert!(!should_trigger(&forced, TriggerBehavior::Custom, Some(false)));
        // And an explicit true override fires a type standard policy ignores.
        let granted = event(event_types::ACCESS_GRANTED, None, None);
        assert!(should_trigger(&granted, TriggerBehavior::Custom, Some(true)));
    }

    #[test]
    fn custom_without_override_falls_back_to_standard() {
        let forced = event(event_types::DOOR_FORCED_OPEN, None, None);
        assert!(should_trigger(&forced, TriggerBehavior::Custom, None));
        let granted = event(event_types::ACCESS_GRANTED, None, None);
        assert!(!should_trigger(&granted, TriggerBehavior::Custom, None));
    }

    #[test]
    fn standard_zone_ignores_overrides() {
        let forced = event(event_types::DOOR_FORCED_OPEN, None, None);
        assert!(should_trigger(&forced, TriggerBehavior::Standard, Some(false)));
    }
}
