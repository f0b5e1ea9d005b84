//! Server configuration.
//!
//! Everything is loaded from `WARDEN_*` environment variables. In debug
//! posture the management API authenticates via the `X-Organization-Id`
//! header; outside debug a signed HS256 bearer token is required and
//! `WARDEN_JWT_HS256_SECRET` must be set.

use std::net::SocketAddr;

use warden_core::error::{Error, Result};

/// JWT verification settings for the management API.
#[derive(Clone, Default)]
pub struct JwtConfig {
    /// HS256 signing secret.
    pub hs256_secret: Option<String>,
    /// Expected `iss` claim, when set.
    pub issuer: Option<String>,
    /// Expected `aud` claim, when set.
    pub audience: Option<String>,
    /// Claim carrying the organization ID.
    pub org_claim: String,
    /// Claim carrying the user ID.
    pub user_claim: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("hs256_secret", &self.hs256_secret.as_ref().map(|_| "[REDACTED]"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("org_claim", &self.org_claim)
            .field("user_claim", &self.user_claim)
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Debug posture: header auth, pretty logs, in-memory backend allowed.
    pub debug: bool,
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// Optional request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Optional concurrency limit for handlers.
    pub concurrency_limit: Option<usize>,
    /// JWT settings.
    pub jwt: JwtConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: true,
            bind_addr: default_bind_addr(),
            request_timeout_secs: None,
            concurrency_limit: None,
            jwt: JwtConfig {
                hs256_secret: None,
                issuer: None,
                audience: None,
                org_claim: "org".to_string(),
                user_claim: "sub".to_string(),
            },
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from `WARDEN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable fails to parse or the combination
    /// is invalid for the selected posture.
    pub fn from_env() -> Result<Self> {
        let debug = env_string("WARDEN_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let bind_addr = match env_string("WARDEN_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::InvalidInput(format!("WARDEN_BIND_ADDR is not a socket address: {raw}"))
            })?,
            None => default_bind_addr(),
        };

        let request_timeout_secs = match env_string("WARDEN_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(raw.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "WARDEN_REQUEST_TIMEOUT_SECS is not a number: {raw}"
                ))
            })?),
            None => None,
        };

        let concurrency_limit = match env_string("WARDEN_CONCURRENCY_LIMIT") {
            Some(raw) => Some(raw.parse().map_err(|_| {
                Error::InvalidInput(format!("WARDEN_CONCURRENCY_LIMIT is not a number: {raw}"))
            })?),
            None => None,
        };

        let config = Self {
            debug,
            bind_addr,
            request_timeout_secs,
            concurrency_limit,
            jwt: JwtConfig {
                hs256_secret: env_string("WARDEN_JWT_HS256_SECRET"),
                issuer: env_string("WARDEN_JWT_ISSUER"),
                audience: env_string("WARDEN_JWT_AUDIENCE"),
                org_claim: env_string("WARDEN_JWT_ORG_CLAIM").unwrap_or_else(|| "org".to_string()),
                user_claim: env_string("WARDEN_JWT_USER_CLAIM")
                    .unwrap_or_else(|| "sub".to_string()),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for the selected posture.
    ///
    /// # Errors
    ///
    /// Returns an error when `debug` is off and no JWT secret is set.
    pub fn validate(&self) -> Result<()> {
        if !self.debug && self.jwt.hs256_secret.is_none() {
            return Err(Error::InvalidInput(
                "WARDEN_JWT_HS256_SECRET is required when WARDEN_DEBUG=false".to_string(),
            ));
        }
        Ok(())
    }
}
