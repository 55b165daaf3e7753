//! OAuth 2.1 endpoint handlers for MCP authentication.
//!
//! Implements:
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: OAuth 2.0 Authorization Code Grant
//! - RFC 7009: Token Revocation

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::consent_page::render_consent_page;
use super::provider::{OAuthProvider, WILDCARD_SCOPE};
use super::types::{AuthorizationParams, RegisteredClient, TokenResponse};
use crate::error::AuthError;
use crate::server::transport::HttpState;

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "resource": state.base_url,
        "authorization_servers": [state.base_url],
        "bearer_methods_supported": ["header"],
        "scopes_supported": [WILDCARD_SCOPE]
    }))
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
pub async fn handle_auth_server_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "issuer": state.base_url,
        "authorization_endpoint": format!("{}/authorize", state.base_url),
        "token_endpoint": format!("{}/token", state.base_url),
        "registration_endpoint": format!("{}/register", state.base_url),
        "revocation_endpoint": format!("{}/revoke", state.base_url),
        "scopes_supported": [WILDCARD_SCOPE],
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["none"],
        "revocation_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": ["S256"]
    }))
}

// ─── RFC 7591: Dynamic Client Registration ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub client_name: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub software_id: Option<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: Option<String>,
}

/// `POST /register`
pub async fn handle_register(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    let redirect_uris = req.redirect_uris.unwrap_or_default();
    if redirect_uris.is_empty() {
        return registration_error("redirect_uris is required");
    }
    if let Some(bad) = redirect_uris.iter().find(|u| url::Url::parse(u).is_err()) {
        return registration_error(&format!("Invalid redirect_uri: {bad}"));
    }

    let client = RegisteredClient {
        client_id: uuid::Uuid::new_v4().simple().to_string(),
        client_name: req.client_name,
        redirect_uris,
        software_id: req.software_id,
    };

    if let Err(e) = oauth.register_client(client.clone()).await {
        return auth_error_response(&e);
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "client_id": client.client_id,
            "client_id_issued_at": chrono::Utc::now().timestamp(),
            "client_name": client.client_name,
            "redirect_uris": client.redirect_uris,
            "software_id": client.software_id,
            "grant_types": ["authorization_code", "refresh_token"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "none"
        })),
    )
        .into_response()
}

fn registration_error(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "invalid_client_metadata",
            "error_description": description
        })),
    )
        .into_response()
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub scope: Option<String>,
    pub resource: Option<String>,
}

/// `GET /authorize`
///
/// Validate the request and park it behind the consent page.
pub async fn handle_authorize_get(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    let Some(client_id) = query.client_id.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing client_id").into_response();
    };
    let Some(code_challenge) = query.code_challenge else {
        return (StatusCode::BAD_REQUEST, "Missing code_challenge").into_response();
    };

    if query.response_type.as_deref() != Some("code") {
        return (StatusCode::BAD_REQUEST, "response_type must be 'code'").into_response();
    }
    if query.code_challenge_method.as_deref() != Some("S256") {
        return (
            StatusCode::BAD_REQUEST,
            "code_challenge_method must be 'S256'",
        )
            .into_response();
    }

    let Some(client) = oauth.get_client(client_id).await else {
        return (StatusCode::BAD_REQUEST, "Unknown client_id").into_response();
    };

    let (redirect_uri, provided_explicitly) = match query.redirect_uri {
        Some(uri) => {
            if !client.allows_redirect(&uri) {
                return (
                    StatusCode::BAD_REQUEST,
                    "redirect_uri not registered for this client",
                )
                    .into_response();
            }
            (uri, true)
        }
        None => match client.redirect_uris.as_slice() {
            [only] => (only.clone(), false),
            _ => {
                return (StatusCode::BAD_REQUEST, "redirect_uri is required").into_response();
            }
        },
    };

    let params = AuthorizationParams {
        scopes: parse_scopes(query.scope.as_deref())
            .unwrap_or_else(|| vec![WILDCARD_SCOPE.to_string()]),
        code_challenge,
        redirect_uri,
        redirect_uri_provided_explicitly: provided_explicitly,
        state: query.state,
        resource: query.resource,
    };

    let consent_path = oauth.authorize(&client, params).await;
    (StatusCode::FOUND, [(header::LOCATION, consent_path)]).into_response()
}

// ─── Consent Page ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConsentQuery {
    #[serde(alias = "id")]
    pub consent_id: Option<String>,
}

/// `GET /consent`
pub async fn handle_consent_get(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ConsentQuery>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    let consent_id = query.consent_id.unwrap_or_default();
    let Some(pending) = oauth.pending_consent(&consent_id).await else {
        return (StatusCode::BAD_REQUEST, AuthError::NotFound.to_string()).into_response();
    };

    Html(render_consent_page(
        &consent_id,
        pending.client.client_name.as_deref(),
        oauth.pin_required(),
        None,
    ))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    #[serde(default)]
    pub consent_id: String,
    #[serde(default = "default_action")]
    pub action: String,
    pub pin: Option<String>,
}

fn default_action() -> String {
    "deny".to_string()
}

/// `POST /consent`
///
/// Approve or deny a pending request and redirect back to the client.
pub async fn handle_consent_post(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<ConsentForm>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    let result = if form.action == "approve" {
        oauth
            .approve_consent(&form.consent_id, form.pin.as_deref())
            .await
    } else {
        oauth.deny_consent(&form.consent_id).await
    };

    match result {
        Ok(redirect) => (StatusCode::FOUND, [(header::LOCATION, redirect)]).into_response(),
        Err(AuthError::InvalidPin) => {
            let client_name = oauth
                .pending_consent(&form.consent_id)
                .await
                .and_then(|p| p.client.client_name);
            (
                StatusCode::BAD_REQUEST,
                Html(render_consent_page(
                    &form.consent_id,
                    client_name.as_deref(),
                    true,
                    Some(&AuthError::InvalidPin.to_string()),
                )),
            )
                .into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// `POST /token`
///
/// Exchange authorization code for tokens, or refresh tokens.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<TokenRequest>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    let Some(ref client_id) = form.client_id else {
        return auth_error_response(&AuthError::invalid_request("Missing client_id"));
    };
    let Some(client) = oauth.get_client(client_id).await else {
        return auth_error_response(&AuthError::InvalidClient);
    };

    let result = match form.grant_type.as_str() {
        "authorization_code" => handle_authorization_code_grant(oauth, &client, &form).await,
        "refresh_token" => handle_refresh_token_grant(oauth, &client, &form).await,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "unsupported_grant_type"
                })),
            )
                .into_response();
        }
    };

    match result {
        Ok(tokens) => token_success(&tokens),
        Err(e) => auth_error_response(&e),
    }
}

async fn handle_authorization_code_grant(
    oauth: &OAuthProvider,
    client: &RegisteredClient,
    form: &TokenRequest,
) -> Result<TokenResponse, AuthError> {
    let Some(ref code) = form.code else {
        return Err(AuthError::invalid_request("Missing code"));
    };
    let Some(ref code_verifier) = form.code_verifier else {
        return Err(AuthError::invalid_request("Missing code_verifier"));
    };

    oauth
        .exchange_authorization_code(client, code, code_verifier, form.redirect_uri.as_deref())
        .await
}

async fn handle_refresh_token_grant(
    oauth: &OAuthProvider,
    client: &RegisteredClient,
    form: &TokenRequest,
) -> Result<TokenResponse, AuthError> {
    let Some(ref refresh_token) = form.refresh_token else {
        return Err(AuthError::invalid_request("Missing refresh_token"));
    };

    let Some(grant) = oauth.load_refresh_token(client, refresh_token).await else {
        return Err(AuthError::invalid_grant("Invalid or expired refresh token"));
    };

    let requested = parse_scopes(form.scope.as_deref()).unwrap_or_default();
    oauth
        .exchange_refresh_token(client, &grant, &requested)
        .await
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(tokens: &TokenResponse) -> Response {
    let mut response = Json(tokens).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

// ─── RFC 7009: Token Revocation ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: Option<String>,
    pub token_type_hint: Option<String>,
}

/// `POST /revoke`
///
/// Always answers 200, whether or not the token was recognised.
pub async fn handle_revoke(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<RevokeRequest>,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        return not_configured();
    };

    if let Some(ref token) = form.token {
        oauth.revoke_token(token).await;
    }
    StatusCode::OK.into_response()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn not_configured() -> Response {
    (StatusCode::NOT_FOUND, "OAuth not configured").into_response()
}

/// Map a provider error to an OAuth JSON error body.
fn auth_error_response(err: &AuthError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    let mut response = (
        status,
        Json(serde_json::json!({
            "error": err.oauth_code(),
            "error_description": err.to_string()
        })),
    )
        .into_response();

    if let AuthError::RateLimited { retry_after } = err {
        if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    response
}

/// Split a space-separated scope string; `None` when no scope was given.
fn parse_scopes(scope: Option<&str>) -> Option<Vec<String>> {
    let scopes: Vec<String> = scope
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_owned)
        .collect();
    (!scopes.is_empty()).then_some(scopes)
}
