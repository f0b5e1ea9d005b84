//! Observability infrastructure for Warden.
//!
//! Structured logging with consistent spans. This module provides the
//! initialization helper and span constructors used across all Warden
//! components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `warden_store=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for webhook ingestion with standard fields.
#[must_use]
pub fn ingest_span(vendor: &str, connector: &str) -> Span {
    tracing::info_span!("ingest", vendor = vendor, connector = connector)
}

/// Creates a span for zone operations with standard fields.
#[must_use]
pub fn zone_span(operation: &str, org: &str, zone: &str) -> Span {
    tracing::info_span!("zone", op = operation, org = org, zone = zone)
}
