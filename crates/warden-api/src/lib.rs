//! # warden-api
//!
//! HTTP surface for the Warden alarm-zone subsystem:
//!
//! - the **webhook gateway** (`POST /webhooks/:token`): resolves the
//!   opaque token to a connector, verifies the vendor signature over the
//!   raw body, then normalizes and processes the payload;
//! - the **zone management API** (`/api/v1/...`): tenant-authenticated
//!   zone CRUD, armed-state writes, device membership, trigger overrides,
//!   and audit log reads;
//! - the **arming orchestrator**: the only caller of the repository's
//!   state-mutating operation, pairing every transition with its audit
//!   entry and a best-effort realtime broadcast.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod arming;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

pub use arming::ArmingOrchestrator;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, router};
