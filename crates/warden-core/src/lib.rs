//! # warden-core
//!
//! Core abstractions for the Warden physical-security platform.
//!
//! This crate provides the foundational types shared across all Warden
//! components:
//!
//! - **Identifiers**: Strongly-typed ULID-backed IDs for organizations,
//!   locations, zones, devices, connectors, and events
//! - **Domain Model**: Alarm zones, devices, standardized events, and the
//!   append-only audit log entry shape
//! - **Vendor Taxonomy**: The closed set of supported webhook vendor
//!   categories and their signature schemes
//! - **Trigger Policy**: The global standard trigger policy table and the
//!   pure evaluation function layered with per-zone overrides
//! - **Realtime Contract**: The publisher interface used for best-effort
//!   zone state broadcasts
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `warden-core` is the only crate allowed to define shared primitives.
//! Cross-component interaction happens via the types defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod error;
pub mod id;
pub mod model;
pub mod observability;
pub mod policy;
pub mod realtime;
pub mod vendor;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use warden_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{
        AuditEntryId, ConnectorId, DeviceId, EventId, LocationId, OrgId, ZoneId,
    };
    pub use crate::model::{
        AlarmZone, ArmedState, AuditAction, AuditLogEntry, Connector, Device, DeviceKind,
        Location, Organization, StandardizedEvent, TriggerBehavior, TriggerOverride,
    };
    pub use crate::realtime::{RealtimePublisher, ZoneStateBroadcast, ZoneStateChange};
    pub use crate::vendor::VendorKind;
}

pub use error::{Error, Result};
pub use id::{AuditEntryId, ConnectorId, DeviceId, EventId, LocationId, OrgId, ZoneId};
pub use model::{
    AlarmZone, ArmedState, AuditAction, AuditLogEntry, Connector, Device, DeviceKind, Location,
    Organization, StandardizedEvent, TriggerBehavior, TriggerOverride,
};
pub use observability::{LogFormat, init_logging};
pub use realtime::{MemoryPublisher, RealtimePublisher, TracingPublisher};
pub use vendor::{DigestAlgorithm, SignatureScheme, VendorKind};
