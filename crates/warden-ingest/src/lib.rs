//! # warden-ingest
//!
//! Inbound webhook processing: per-vendor signature verification and
//! normalization of vendor payloads into the canonical standardized event
//! shape.
//!
//! The Gateway resolves the vendor category once at its boundary; this
//! crate operates on the typed [`warden_core::VendorKind`] variant and
//! never re-inspects a category string.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod mapping;
pub mod normalize;
pub mod signature;

pub use normalize::{Normalizer, Outcome, WebhookPayload};
pub use signature::{SignatureError, sign, verify_signature};
