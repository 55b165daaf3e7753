//! Bearer authentication for the MCP endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use super::provider::WILDCARD_SCOPE;
use super::types::AccessGrant;
use crate::server::transport::HttpState;

/// Principal attached to requests when authentication is disabled.
pub const ANONYMOUS_CLIENT_ID: &str = "anonymous";

/// Resolve the bearer credential and attach the [`AccessGrant`] to the request.
///
/// Without an authorization server every request passes as anonymous.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(ref oauth) = state.oauth else {
        request.extensions_mut().insert(AccessGrant {
            client_id: ANONYMOUS_CLIENT_ID.to_string(),
            scopes: vec![WILDCARD_SCOPE.to_string()],
            expires_at: None,
        });
        return next.run(request).await;
    };

    let bearer = request.headers().typed_get::<Authorization<Bearer>>();
    let Some(Authorization(bearer)) = bearer else {
        tracing::debug!("Missing bearer token");
        return unauthorized(&state.base_url, None);
    };

    let Some(grant) = oauth.load_access_token(bearer.token()).await else {
        tracing::warn!("Rejected invalid bearer token");
        return unauthorized(&state.base_url, Some("invalid_token"));
    };

    tracing::debug!(client_id = %grant.client_id, "Authenticated request");
    request.extensions_mut().insert(grant);
    next.run(request).await
}

/// 401 pointing the client at the protected resource metadata (RFC 9728 §5.1).
fn unauthorized(base_url: &str, error: Option<&str>) -> Response {
    let metadata = format!("{base_url}/.well-known/oauth-protected-resource");
    let challenge = match error {
        Some(code) => format!(r#"Bearer error="{code}", resource_metadata="{metadata}""#),
        None => format!(r#"Bearer resource_metadata="{metadata}""#),
    };

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": error.unwrap_or("invalid_token"),
            "error_description": "Authentication required"
        })),
    )
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
