//! Real-time broadcast contract for zone state changes.
//!
//! ## Design Principles
//!
//! 1. **Injected, never ambient**: the publish client is constructed once
//!    at process start and passed explicitly into the orchestrator
//! 2. **Fail-open**: publication failures are logged and swallowed; they
//!    never cause the arming operation itself to fail or roll back
//! 3. **Tenant-scoped channels**: every message goes to a channel derived
//!    from the organization ID
//!
//! A secondary detail channel receives a richer payload only while it has
//! at least one subscriber; that check-then-publish is explicitly
//! non-atomic and acceptable as best-effort.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::id::{LocationId, OrgId, ZoneId};
use crate::model::ArmedState;

/// Discriminant carried by every zone-state broadcast.
pub const ARMING_KIND: &str = "arming";

/// Returns the tenant-scoped broadcast channel for zone state changes.
#[must_use]
pub fn zone_channel(org_id: OrgId) -> String {
    format!("org:{org_id}:zones")
}

/// Returns the secondary channel carrying richer per-change payloads.
#[must_use]
pub fn zone_detail_channel(org_id: OrgId) -> String {
    format!("org:{org_id}:zones:detail")
}

/// The nested zone-change record inside a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStateChange {
    /// Zone ID.
    pub zone_id: ZoneId,
    /// Zone display name.
    pub zone_name: String,
    /// Location ID.
    pub location_id: LocationId,
    /// Location display name.
    pub location_name: String,
    /// State before the change.
    pub previous_state: ArmedState,
    /// State after the change.
    pub current_state: ArmedState,
    /// Human-readable form of the previous state.
    pub previous_state_display: String,
    /// Human-readable form of the current state.
    pub current_state_display: String,
}

/// A tenant-scoped zone-state-change broadcast message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStateBroadcast {
    /// Message discriminant; always [`ARMING_KIND`].
    pub kind: String,
    /// The organization the change belongs to.
    pub organization_id: OrgId,
    /// When the broadcast was produced.
    pub timestamp: DateTime<Utc>,
    /// The change itself.
    pub change: ZoneStateChange,
}

impl ZoneStateBroadcast {
    /// Builds a broadcast with the `arming` discriminant and a fresh
    /// timestamp.
    #[must_use]
    pub fn new(organization_id: OrgId, change: ZoneStateChange) -> Self {
        Self {
            kind: ARMING_KIND.to_string(),
            organization_id,
            timestamp: Utc::now(),
            change,
        }
    }
}

/// Error raised by a publish attempt.
///
/// Callers treat this as observability-only: it is logged, never
/// propagated as an operation failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("publish failed: {message}")]
pub struct PublishError {
    /// Description of the failure.
    pub message: String,
}

/// The injected broadcast client.
///
/// Implementations should be cheap to clone behind an `Arc` and safe to
/// call concurrently from request handlers.
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Publishes a message to a channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying transport rejects the publish;
    /// callers log and continue.
    async fn publish(&self, channel: &str, message: &serde_json::Value)
        -> Result<(), PublishError>;

    /// Returns the current subscriber count for a channel.
    ///
    /// Used to skip detail-channel publishes nobody is listening to. The
    /// count may be stale by the time a publish happens; that is accepted.
    async fn subscriber_count(&self, channel: &str) -> usize;
}

/// Publisher that emits broadcasts as structured log events.
///
/// The default for deployments without a pub/sub transport configured.
/// Reports zero subscribers on every channel, so detail publishes are
/// always skipped.
#[derive(Debug, Default, Clone)]
pub struct TracingPublisher;

#[async_trait]
impl RealtimePublisher for TracingPublisher {
    async fn publish(
        &self,
        channel: &str,
        message: &serde_json::Value,
    ) -> Result<(), PublishError> {
        tracing::info!(target: "realtime", channel = %channel, message = %message, "broadcast");
        Ok(())
    }

    async fn subscriber_count(&self, _channel: &str) -> usize {
        0
    }
}

/// In-memory publisher that captures messages for assertions.
///
/// Use this in tests to verify that expected broadcasts are emitted and
/// that detail publishes respect the subscriber-count gate.
///
/// # Example
///
/// ```rust,ignore
/// let hub = MemoryPublisher::new();
/// hub.publish("org:abc:zones", &serde_json::json!({"kind": "arming"})).await?;
/// assert_eq!(hub.messages("org:abc:zones").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    subscribers: Mutex<HashMap<String, usize>>,
}

impl MemoryPublisher {
    /// Creates a new empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all messages published to a channel.
    #[must_use]
    pub fn messages(&self, channel: &str) -> Vec<serde_json::Value> {
        self.messages
            .lock()
            .map(|guard| guard.get(channel).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Registers `count` subscribers on a channel.
    pub fn set_subscribers(&self, channel: &str, count: usize) {
        if let Ok(mut guard) = self.subscribers.lock() {
            guard.insert(channel.to_string(), count);
        }
    }

    /// Clears all captured messages.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.clear();
        }
    }
}

#[async_trait]
impl RealtimePublisher for MemoryPublisher {
    async fn publish(
        &self,
        channel: &str,
        message: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let mut guard = self.messages.lock().map_err(|_| PublishError {
            message: "publisher lock poisoned".to_string(),
        })?;
        guard
            .entry(channel.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers
            .lock()
            .map(|guard| guard.get(channel).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_publisher_captures_per_channel() {
        let hub = MemoryPublisher::new();
        hub.publish("a", &serde_json::json!({"n": 1})).await.expect("publish");
        hub.publish("b", &serde_json::json!({"n": 2})).await.expect("publish");

        assert_eq!(hub.messages("a").len(), 1);
        assert_eq!(hub.messages("b").len(), 1);
        assert!(hub.messages("c").is_empty());
    }

    #[tokio::test]
    async fn subscriber_counts_default_to_zero() {
        let hub = MemoryPublisher::new();
        assert_eq!(hub.subscriber_count("a").await, 0);
        hub.set_subscribers("a", 3);
        assert_eq!(hub.subscriber_count("a").await, 3);
    }

    #[test]
    fn channel_names_are_tenant_scoped() {
        let org = OrgId::generate();
        assert_eq!(zone_channel(org), format!("org:{org}:zones"));
        assert_eq!(zone_detail_channel(org), format!("org:{org}:zones:detail"));
    }

    #[test]
    fn broadcast_carries_arming_discriminant() {
        let broadcast = ZoneStateBroadcast::new(
            OrgId::generate(),
            ZoneStateChange {
                zone_id: ZoneId::generate(),
                zone_name: "Lobby".to_string(),
                location_id: LocationId::generate(),
                location_name: "HQ".to_string(),
                previous_state: ArmedState::Armed,
                current_state: ArmedState::Triggered,
                previous_state_display: "Armed".to_string(),
                current_state_display: "Triggered".to_string(),
            },
        );
        let json = serde_json::to_value(&broadcast).expect("serialize");
        assert_eq!(json["kind"], "arming");
        assert_eq!(json["change"]["previousState"], "ARMED");
        assert_eq!(json["change"]["currentState"], "TRIGGERED");
    }
}
