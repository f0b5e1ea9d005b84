//! The webhook gateway.
//!
//! `POST /webhooks/:token` is the single entry point for vendor
//! deliveries. The order of operations is fixed and is a correctness
//! requirement, not a preference:
//!
//! 1. resolve the opaque token to a connector (never trusting any
//!    caller-supplied tenant identifier);
//! 2. verify the vendor signature over the exact raw body bytes;
//! 3. only then parse JSON and hand off to the normalizer;
//! 4. run trigger processing for a normalized event;
//! 5. record connector activity — only after successful processing, so a
//!    malformed-but-authenticated payload never marks a connector active.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use warden_ingest::{Normalizer, Outcome, verify_signature};

use crate::error::{ApiError, ApiErrorBody};
use crate::metrics;
use crate::server::AppState;

/// Webhook processing outcome returned to the vendor.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// Outcome discriminant: `processed`, `inventory_applied`,
    /// `accepted_unmapped`, or `accepted`.
    pub outcome: String,
    /// Human-readable processing message.
    pub message: String,
}

/// Webhook route group.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/:token", post(receive_webhook))
}

/// Receive a vendor webhook delivery.
///
/// POST /webhooks/{token}
#[utoipa::path(
    post,
    path = "/webhooks/{token}",
    tag = "webhooks",
    params(
        ("token" = String, Path, description = "Opaque connector webhook token"),
    ),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookResponse),
        (status = 400, description = "Malformed JSON after valid signature", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Resolve the connector first; the uniform 401 below covers both an
    // unknown token and a bad signature.
    let Some(connector) = state.repo.connector_by_token(&token).await? else {
        metrics::record_webhook_rejected();
        return Err(ApiError::unauthorized("unauthorized"));
    };

    let scheme = connector.vendor.signature_scheme();
    let header_value = headers
        .get(scheme.header)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if verify_signature(
        connector.vendor,
        connector.secret.as_bytes(),
        &body,
        header_value,
    )
    .is_err()
    {
        metrics::record_webhook_rejected();
        tracing::warn!(
            connector = %connector.id,
            vendor = %connector.vendor,
            "webhook signature verification failed"
        );
        return Err(ApiError::unauthorized("unauthorized"));
    }

    // Signature verified over the raw bytes; JSON parsing is safe now.
    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::bad_request(format!("malformed JSON payload: {err}")))?;

    let normalizer = Normalizer::new(Arc::clone(&state.repo));
    let outcome = normalizer.apply(&connector, &raw).await?;

    let response = match &outcome {
        Outcome::Processed(event) => {
            let triggered = state.orchestrator.process_event(&connector, event).await?;
            metrics::record_webhook_received(connector.vendor.as_str(), "processed");
            WebhookResponse {
                outcome: "processed".to_string(),
                message: if triggered {
                    "event processed; alarm zone triggered".to_string()
                } else {
                    "event processed".to_string()
                },
            }
        }
        Outcome::InventoryApplied { upserted } => {
            metrics::record_webhook_received(connector.vendor.as_str(), "inventory_applied");
            WebhookResponse {
                outcome: "inventory_applied".to_string(),
                message: format!("device inventory applied ({upserted} devices)"),
            }
        }
        Outcome::Dropped => {
            metrics::record_webhook_received(connector.vendor.as_str(), "accepted_unmapped");
            WebhookResponse {
                outcome: "accepted_unmapped".to_string(),
                message: "event accepted but has no mapped meaning".to_string(),
            }
        }
        Outcome::Ignored => {
            metrics::record_webhook_received(connector.vendor.as_str(), "accepted");
            WebhookResponse {
                outcome: "accepted".to_string(),
                message: "payload accepted but not processed".to_string(),
            }
        }
    };

    // Liveness marks success of the whole pipeline, not just the
    // signature. Failure to record it is observability-only.
    if let Err(err) = state
        .repo
        .record_connector_activity(connector.id, Utc::now())
        .await
    {
        tracing::warn!(connector = %connector.id, error = %err, "failed to record connector activity");
    }

    Ok(Json(response))
}
