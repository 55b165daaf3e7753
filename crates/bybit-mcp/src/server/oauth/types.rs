//! OAuth 2.1 types for MCP authentication.

use std::time::{Duration, Instant};

use serde::Serialize;

/// A dynamically registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
    /// Declared software identifier, checked against the registration token.
    pub software_id: Option<String>,
}

impl RegisteredClient {
    /// Whether `redirect_uri` is one of the client's registered URIs.
    #[must_use]
    pub fn allows_redirect(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == redirect_uri)
    }
}

/// Parameters of an authorization request awaiting consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationParams {
    pub scopes: Vec<String>,
    pub code_challenge: String,
    pub redirect_uri: String,
    /// Whether the client sent `redirect_uri`, so the token request must repeat it.
    pub redirect_uri_provided_explicitly: bool,
    pub state: Option<String>,
    pub resource: Option<String>,
}

/// A pending consent request.
#[derive(Debug, Clone)]
pub struct PendingConsent {
    pub client: RegisteredClient,
    pub params: AuthorizationParams,
    pub created_at: Instant,
}

impl PendingConsent {
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// A single-use authorization code issued after user approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub code_challenge: String,
    pub redirect_uri: String,
    pub redirect_uri_provided_explicitly: bool,
    pub resource: Option<String>,
    pub issued_at: Instant,
    pub ttl: Duration,
}

impl AuthorizationCode {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.issued_at.elapsed() > self.ttl
    }
}

/// A verified refresh token, bound to the client that presented it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub expires_at: u64,
}

/// The principal behind an accepted bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub client_id: String,
    pub scopes: Vec<String>,
    /// Unix expiry; `None` for the static API key.
    pub expires_at: Option<u64>,
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub refresh_token: String,
}

impl TokenResponse {
    /// Space-join scopes; an empty grant omits the field.
    #[must_use]
    pub fn join_scopes(scopes: &[String]) -> Option<String> {
        (!scopes.is_empty()).then(|| scopes.join(" "))
    }
}
