//! OAuth 2.1 authorization provider with PKCE, consent PIN and static API key.
//!
//! All state is in memory and owned by one provider instance. Signed tokens
//! survive a restart as long as the secret does; registered clients, pending
//! consents, codes and revocations do not.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use url::Url;

use super::consent::{ConsentStore, PinCheck};
use super::rate_limit::SlidingWindowLimiter;
use super::token::{TokenCodec, TokenType};
use super::types::{
    AccessGrant, AuthorizationCode, AuthorizationParams, PendingConsent, RefreshGrant,
    RegisteredClient, TokenResponse,
};
use super::{pkce, secure};
use crate::config::{OAuthSettings, oauth};
use crate::error::{AuthError, AuthResult};

/// Subject of grants accepted through the static API key.
pub const API_KEY_CLIENT_ID: &str = "api-key";

/// Scope that grants every tool.
pub const WILDCARD_SCOPE: &str = "all";

/// Registrations are throttled across all registrants under one key.
const REGISTRATION_KEY: &str = "global";

/// Entropy of an authorization code in bytes.
const AUTH_CODE_BYTES: usize = 32;

/// The authorization server.
pub struct OAuthProvider {
    settings: OAuthSettings,
    codec: TokenCodec,
    registration_limiter: SlidingWindowLimiter,
    consents: ConsentStore,
    clients: RwLock<HashMap<String, RegisteredClient>>,
    auth_codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl OAuthProvider {
    #[must_use]
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            codec: TokenCodec::new(&settings.secret),
            registration_limiter: SlidingWindowLimiter::new(
                settings.registration_limit,
                settings.registration_window,
            ),
            consents: ConsentStore::new(settings.max_pin_attempts),
            clients: RwLock::new(HashMap::new()),
            auth_codes: RwLock::new(HashMap::new()),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Whether the consent page must ask for a PIN.
    #[must_use]
    pub const fn pin_required(&self) -> bool {
        self.settings.consent_pin.is_some()
    }

    // ─── Clients ─────────────────────────────────────────────────────────

    pub async fn get_client(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.read().await.get(client_id).cloned()
    }

    /// Register (or re-register) a client.
    ///
    /// With a registration token configured, the declared `software_id` must
    /// match it. Accepted registrations count against the global limit.
    pub async fn register_client(&self, client: RegisteredClient) -> AuthResult<()> {
        if let Some(ref expected) = self.settings.registration_token {
            let declared = client.software_id.as_deref().unwrap_or_default();
            if !secure::constant_time_eq(declared, expected) {
                tracing::warn!(
                    client_id = %client.client_id,
                    "Rejected registration: unapproved software_id"
                );
                return Err(AuthError::UnapprovedSoftware);
            }
        }

        if !self.registration_limiter.check(REGISTRATION_KEY).await {
            tracing::warn!(client_id = %client.client_id, "Registration rate limit exceeded");
            return Err(AuthError::RateLimited {
                retry_after: self.registration_limiter.window(),
            });
        }

        tracing::info!(client_id = %client.client_id, "Registered OAuth client");
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
        Ok(())
    }

    // ─── Consent ─────────────────────────────────────────────────────────

    /// Park an authorization request and return the consent page path.
    pub async fn authorize(
        &self,
        client: &RegisteredClient,
        params: AuthorizationParams,
    ) -> String {
        let consent_id = self.consents.insert(client.clone(), params).await;
        tracing::debug!(client_id = %client.client_id, "Awaiting consent");
        format!("/consent?consent_id={consent_id}")
    }

    pub async fn pending_consent(&self, consent_id: &str) -> Option<PendingConsent> {
        self.consents.get(consent_id).await
    }

    /// Approve a pending request and mint an authorization code.
    ///
    /// Returns the client redirect carrying `code` and the original `state`.
    pub async fn approve_consent(&self, consent_id: &str, pin: Option<&str>) -> AuthResult<String> {
        let pin_check = match self.settings.consent_pin.as_deref() {
            None => PinCheck::NotRequired,
            Some(expected) => {
                if secure::constant_time_eq(pin.unwrap_or_default(), expected) {
                    PinCheck::Matched
                } else {
                    PinCheck::Mismatched
                }
            }
        };

        let consent = match self.consents.approve(consent_id, pin_check).await {
            Ok(consent) => consent,
            Err(AuthError::InvalidPin) => {
                tracing::warn!("Wrong consent PIN");
                return Err(AuthError::InvalidPin);
            }
            Err(AuthError::Locked) => {
                tracing::warn!("Consent cancelled after too many wrong PINs");
                return Err(AuthError::Locked);
            }
            Err(e) => return Err(e),
        };

        let PendingConsent { client, params, .. } = consent;
        let code = secure::random_token(AUTH_CODE_BYTES);
        let mut query = vec![("code", code.clone())];
        if let Some(ref state) = params.state {
            query.push(("state", state.clone()));
        }
        let redirect = construct_redirect_uri(&params.redirect_uri, &query)?;

        self.auth_codes.write().await.insert(
            code.clone(),
            AuthorizationCode {
                code,
                client_id: client.client_id.clone(),
                scopes: params.scopes,
                code_challenge: params.code_challenge,
                redirect_uri: params.redirect_uri,
                redirect_uri_provided_explicitly: params.redirect_uri_provided_explicitly,
                resource: params.resource,
                issued_at: std::time::Instant::now(),
                ttl: self.settings.auth_code_ttl,
            },
        );

        tracing::info!(client_id = %client.client_id, "Consent approved");
        Ok(redirect)
    }

    /// Deny a pending request. Returns the client redirect carrying `access_denied`.
    pub async fn deny_consent(&self, consent_id: &str) -> AuthResult<String> {
        let PendingConsent { client, params, .. } = self.consents.deny(consent_id).await?;

        let mut query = vec![
            ("error", "access_denied".to_string()),
            ("error_description", "User denied access".to_string()),
        ];
        if let Some(state) = params.state {
            query.push(("state", state));
        }

        tracing::info!(client_id = %client.client_id, "Consent denied");
        construct_redirect_uri(&params.redirect_uri, &query)
    }

    // ─── Authorization codes ─────────────────────────────────────────────

    /// Look up a live code issued to `client` without consuming it.
    pub async fn load_authorization_code(
        &self,
        client: &RegisteredClient,
        code: &str,
    ) -> Option<AuthorizationCode> {
        self.auth_codes
            .read()
            .await
            .get(code)
            .filter(|c| c.client_id == client.client_id && !c.is_expired())
            .cloned()
    }

    /// Redeem an authorization code for an access/refresh token pair.
    ///
    /// The code is removed before any check runs, so it can be presented at
    /// most once whether or not the exchange succeeds.
    pub async fn exchange_authorization_code(
        &self,
        client: &RegisteredClient,
        code: &str,
        code_verifier: &str,
        redirect_uri: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        let Some(stored) = self.auth_codes.write().await.remove(code) else {
            return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
        };

        if stored.is_expired() {
            return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
        }
        if stored.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Authorization code presented by another client"
            );
            return Err(AuthError::invalid_grant("Authorization code was issued to another client"));
        }

        let redirect_ok = match redirect_uri {
            Some(uri) => uri == stored.redirect_uri,
            None => !stored.redirect_uri_provided_explicitly,
        };
        if !redirect_ok {
            return Err(AuthError::invalid_grant("redirect_uri mismatch"));
        }

        if !pkce::verify_s256(code_verifier, &stored.code_challenge) {
            return Err(AuthError::invalid_grant("PKCE verification failed"));
        }

        let tokens = self.issue_token_pair(&client.client_id, &stored.scopes)?;
        tracing::info!(client_id = %client.client_id, "Issued token pair");
        Ok(tokens)
    }

    // ─── Refresh tokens ──────────────────────────────────────────────────

    /// Verify a refresh token presented by `client`.
    pub async fn load_refresh_token(
        &self,
        client: &RegisteredClient,
        token: &str,
    ) -> Option<RefreshGrant> {
        let claims = self.codec.verify(token, false).await?;
        if claims.token_type != TokenType::Refresh || claims.sub != client.client_id {
            return None;
        }
        Some(RefreshGrant {
            token: token.to_owned(),
            client_id: claims.sub,
            scopes: claims.scopes,
            expires_at: claims.exp,
        })
    }

    /// Rotate a refresh token: revoke it and mint a fresh pair.
    ///
    /// A non-empty `requested_scopes` narrows the grant and must be a subset
    /// of the scopes the refresh token carries.
    pub async fn exchange_refresh_token(
        &self,
        client: &RegisteredClient,
        grant: &RefreshGrant,
        requested_scopes: &[String],
    ) -> AuthResult<TokenResponse> {
        if grant.client_id != client.client_id {
            return Err(AuthError::invalid_grant("Refresh token was issued to another client"));
        }

        let scopes = if requested_scopes.is_empty() {
            grant.scopes.clone()
        } else if requested_scopes.iter().all(|s| grant.scopes.contains(s)) {
            requested_scopes.to_vec()
        } else {
            return Err(AuthError::InvalidScope);
        };

        let Some(old) = self.codec.verify(&grant.token, true).await else {
            return Err(AuthError::invalid_grant("Invalid or expired refresh token"));
        };
        if !self.codec.revoke(&old.jti).await {
            tracing::warn!(client_id = %client.client_id, "Refresh token replayed");
            return Err(AuthError::invalid_grant("Refresh token already used"));
        }

        let tokens = self.issue_token_pair(&client.client_id, &scopes)?;
        tracing::info!(client_id = %client.client_id, "Refreshed token pair");
        Ok(tokens)
    }

    // ─── Access tokens ───────────────────────────────────────────────────

    /// Resolve a bearer credential: the static API key first, then a signed access token.
    pub async fn load_access_token(&self, token: &str) -> Option<AccessGrant> {
        if let Some(ref api_key) = self.settings.api_key {
            if secure::constant_time_eq(token, api_key) {
                return Some(AccessGrant {
                    client_id: API_KEY_CLIENT_ID.to_string(),
                    scopes: vec![WILDCARD_SCOPE.to_string()],
                    expires_at: None,
                });
            }
        }

        let claims = self.codec.verify(token, false).await?;
        if claims.token_type != TokenType::Access {
            return None;
        }
        Some(AccessGrant {
            client_id: claims.sub,
            scopes: claims.scopes,
            expires_at: Some(claims.exp),
        })
    }

    /// Revoke an access or refresh token. Tokens that do not decode are ignored.
    pub async fn revoke_token(&self, token: &str) {
        if let Some(claims) = self.codec.inspect(token) {
            if self.codec.revoke(&claims.jti).await {
                tracing::info!(
                    client_id = %claims.sub,
                    token_type = ?claims.token_type,
                    "Revoked token"
                );
            }
        }
    }

    // ─── Maintenance ─────────────────────────────────────────────────────

    /// Drop consent requests older than the authorization code lifetime.
    pub async fn cleanup_expired_consents(&self) -> usize {
        let removed = self
            .consents
            .remove_expired(self.settings.auth_code_ttl)
            .await;
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up expired consents");
        }
        removed
    }

    /// Drop authorization codes past their lifetime.
    pub async fn cleanup_expired_codes(&self) -> usize {
        let mut codes = self.auth_codes.write().await;
        let before = codes.len();
        codes.retain(|_, code| !code.is_expired());
        let removed = before - codes.len();
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up expired authorization codes");
        }
        removed
    }

    /// Start background cleanup of expired consents and codes.
    ///
    /// The task only holds a weak reference and ends at the first tick after
    /// the provider is dropped.
    pub fn start_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let provider = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(oauth::CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let Some(provider) = provider.upgrade() else {
                    break;
                };
                provider.cleanup_expired_consents().await;
                provider.cleanup_expired_codes().await;
            }
            tracing::debug!("OAuth cleanup task stopped");
        })
    }

    fn issue_token_pair(&self, client_id: &str, scopes: &[String]) -> AuthResult<TokenResponse> {
        let access_token = self.codec.issue(
            client_id,
            TokenType::Access,
            scopes,
            self.settings.access_token_ttl,
        )?;
        let refresh_token = self.codec.issue(
            client_id,
            TokenType::Refresh,
            scopes,
            self.settings.refresh_token_ttl,
        )?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.settings.access_token_ttl.as_secs(),
            scope: TokenResponse::join_scopes(scopes),
            refresh_token,
        })
    }
}

impl std::fmt::Debug for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProvider")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Append query parameters to a client redirect URI.
fn construct_redirect_uri(base: &str, params: &[(&str, String)]) -> AuthResult<String> {
    let mut url =
        Url::parse(base).map_err(|_| AuthError::invalid_request("Invalid redirect_uri"))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.into())
}
