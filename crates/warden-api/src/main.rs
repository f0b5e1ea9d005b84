//! `warden-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use warden_api::config::Config;
use warden_api::server::{self, AppState};
use warden_core::observability::{LogFormat, init_logging};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));
    let _metrics = warden_api::metrics::init_metrics();

    if !config.debug {
        // The reference repository is in-memory only; a persistent backend
        // must be wired in before running outside debug posture.
        anyhow::bail!("a persistent repository backend is required when WARDEN_DEBUG=false");
    }
    tracing::warn!("using in-memory repository backend (debug only)");

    let state = Arc::new(AppState::with_memory(config));
    server::serve(state).await
}
