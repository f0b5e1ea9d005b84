//! API server implementation.
//!
//! Provides health, ready, metrics, and the webhook/management routers.

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use warden_core::realtime::{RealtimePublisher, TracingPublisher};
use warden_store::{MemoryRepository, ZoneRepository};

use crate::arming::ArmingOrchestrator;
use crate::config::Config;
use crate::error::ApiErrorBody;
use crate::routes;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The alarm zone repository.
    pub repo: Arc<dyn ZoneRepository>,
    /// The realtime publish client, constructed once at process start.
    pub publisher: Arc<dyn RealtimePublisher>,
    /// The arming orchestrator over the repository and publisher.
    pub orchestrator: ArmingOrchestrator,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("repo", &"<ZoneRepository>")
            .field("publisher", &"<RealtimePublisher>")
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates application state over the given repository and publisher.
    #[must_use]
    pub fn new(
        config: Config,
        repo: Arc<dyn ZoneRepository>,
        publisher: Arc<dyn RealtimePublisher>,
    ) -> Self {
        let orchestrator = ArmingOrchestrator::new(Arc::clone(&repo), Arc::clone(&publisher));
        Self {
            config,
            repo,
            publisher,
            orchestrator,
        }
    }

    /// Creates application state with the in-memory repository and a
    /// tracing publisher (local development and tests).
    #[must_use]
    pub fn with_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryRepository::new()),
            Arc::new(TracingPublisher),
        )
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Shallow: returns 200 whenever the process is alive.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
async fn ready() -> impl IntoResponse {
    Json(ReadyResponse { ready: true })
}

async fn handle_timeout_error(_err: tower::BoxError) -> (StatusCode, Json<ApiErrorBody>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorBody {
            code: "SERVICE_UNAVAILABLE".to_string(),
            message: "Request timed out".to_string(),
            request_id: None,
        }),
    )
}

// ============================================================================
// Router
// ============================================================================

/// Creates the Warden router.
pub fn router(state: Arc<AppState>) -> Router {
    let request_timeout = state.config.request_timeout_secs;
    let concurrency_limit = state.config.concurrency_limit;

    let api = Router::new()
        .merge(routes::zones::routes())
        .merge(routes::zone_devices::routes())
        .merge(routes::overrides::routes())
        .merge(routes::audit_log::routes());

    let router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(crate::metrics::serve_metrics))
        .route("/openapi.json", get(crate::openapi::get_openapi_json))
        .merge(routes::webhooks::routes())
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(crate::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let router = match concurrency_limit {
        Some(limit) => router.layer(ConcurrencyLimitLayer::new(limit)),
        None => router,
    };

    let router = match request_timeout {
        Some(secs) => router.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(Duration::from_secs(secs))),
        ),
        None => router,
    };

    router.with_state(state)
}

/// Binds the configured address and serves the router until shutdown.
///
/// # Errors
///
/// Returns an error when binding or serving fails.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.bind_addr;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Warden API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_responds() {
        let state = Arc::new(AppState::with_memory(Config::default()));
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn management_api_requires_tenant_auth() {
        let state = Arc::new(AppState::with_memory(Config::default()));
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/zones/01J00000000000000000000000")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn router_applies_timeout_and_concurrency_layers() {
        let config = Config {
            request_timeout_secs: Some(30),
            concurrency_limit: Some(100),
            ..Config::default()
        };
        let state = Arc::new(AppState::with_memory(config));
        let _router = router(state);
    }
}
