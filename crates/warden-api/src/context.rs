//! Request context extraction and authentication.
//!
//! In debug posture, the organization is supplied via the
//! `X-Organization-Id` header for local development. Outside debug, it is
//! extracted from a verified HS256 bearer token along with the acting
//! user (default claim `sub`, configurable via `WARDEN_JWT_USER_CLAIM`).
//!
//! The webhook gateway never uses this context: it authenticates each
//! delivery by connector token and vendor signature instead.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use ulid::Ulid;

use warden_core::id::OrgId;

use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from authentication and headers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The caller's organization.
    pub org: OrgId,
    /// Optional user identifier (from JWT or debug headers).
    pub user_id: Option<String>,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

impl RequestContext {
    /// Returns the actor label recorded in audit entries, if a user is
    /// known.
    #[must_use]
    pub fn actor(&self) -> Option<String> {
        self.user_id.as_ref().map(|user| format!("user:{user}"))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            request_id_from_headers(headers).unwrap_or_else(|| Ulid::new().to_string());

        let (org, user_id) = if state.config.debug {
            let raw = header_string(headers, "X-Organization-Id").ok_or_else(|| {
                ApiError::unauthorized("missing X-Organization-Id header (debug mode)")
                    .with_request_id(request_id.clone())
            })?;
            let org = OrgId::from_str(&raw).map_err(|_| {
                ApiError::unauthorized("invalid X-Organization-Id header (debug mode)")
                    .with_request_id(request_id.clone())
            })?;
            (org, user_id_from_headers(headers))
        } else {
            extract_from_jwt(headers, state, &request_id)?
        };

        let ctx = Self {
            org,
            user_id,
            request_id,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

fn extract_from_jwt(
    headers: &HeaderMap,
    state: &AppState,
    request_id: &str,
) -> Result<(OrgId, Option<String>), ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::missing_auth().with_request_id(request_id.to_string()))?;

    let Some(secret) = state.config.jwt.hs256_secret.as_deref() else {
        tracing::error!("JWT auth is enabled but no signing secret is configured");
        return Err(ApiError::invalid_token().with_request_id(request_id.to_string()));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    if let Some(iss) = state.config.jwt.issuer.as_deref() {
        validation.set_issuer(&[iss]);
    }
    if let Some(aud) = state.config.jwt.audience.as_deref() {
        validation.set_audience(&[aud]);
    }

    let data = jsonwebtoken::decode::<Value>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::invalid_token().with_request_id(request_id.to_string()))?;

    let Some(obj) = data.claims.as_object() else {
        return Err(ApiError::invalid_token().with_request_id(request_id.to_string()));
    };

    let org_raw = extract_required_claim(obj, &state.config.jwt.org_claim, request_id)?;
    let org = OrgId::from_str(&org_raw)
        .map_err(|_| ApiError::invalid_token().with_request_id(request_id.to_string()))?;
    let user_id = extract_required_claim(obj, &state.config.jwt.user_claim, request_id)?;

    Ok((org, Some(user_id)))
}

fn extract_required_claim(
    obj: &serde_json::Map<String, Value>,
    claim: &str,
    request_id: &str,
) -> Result<String, ApiError> {
    obj.get(claim)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid_token().with_request_id(request_id.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    header_string(headers, "X-Request-Id").or_else(|| header_string(headers, "X-Request-ID"))
}

fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    header_string(headers, "X-User-Id").or_else(|| header_string(headers, "X-User-ID"))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(header_value_to_string)
}

fn header_value_to_string(value: &HeaderValue) -> Option<String> {
    value.to_str().ok().map(str::to_string)
}
