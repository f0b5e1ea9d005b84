//! HTTP route modules.
//!
//! The webhook gateway lives outside `/api/v1` and authenticates each
//! delivery by connector token and vendor signature; everything else is
//! tenant-authenticated via [`crate::context::RequestContext`].

pub mod audit_log;
pub mod overrides;
pub mod webhooks;
pub mod zone_devices;
pub mod zones;
