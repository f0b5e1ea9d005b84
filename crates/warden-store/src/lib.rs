//! # warden-store
//!
//! Tenant-scoped persistence for alarm zones.
//!
//! This crate defines the [`ZoneRepository`] contract — the only data-layer
//! surface the rest of Warden talks to — and the in-memory reference
//! backend used by tests and local development.
//!
//! Every read and write is scoped to an organization and fails with a
//! "not found or not accessible" condition when the requested entity does
//! not belong to that organization, deliberately not distinguishing
//! "absent" from "belongs to someone else".

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod memory;
pub mod repository;

pub use memory::MemoryRepository;
pub use repository::{
    AUDIT_PAGE_DEFAULT, AUDIT_PAGE_MAX, AuditPage, AuditQuery, DeviceRecord, NewConnector,
    NewZone, StateChange, StateTransition, ZoneRepository, ZoneUpdate,
};
