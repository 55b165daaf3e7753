//! Authorization server tests against the public `OAuthProvider` API.

use std::sync::Arc;

use bybit_mcp::config::OAuthSettings;
use bybit_mcp::error::{AuthError, AuthResult};
use bybit_mcp::server::oauth::types::{AuthorizationParams, TokenResponse};
use bybit_mcp::server::oauth::{API_KEY_CLIENT_ID, OAuthProvider, RegisteredClient, pkce};

const SECRET: &str = "oauth-test-secret";
const REDIRECT: &str = "http://127.0.0.1:9999/callback";
const VERIFIER: &str = "a-verifier-that-is-long-enough-for-rfc-7636-0123456789";

fn make_client(id: &str) -> RegisteredClient {
    RegisteredClient {
        client_id: id.to_string(),
        client_name: Some("Claude".to_string()),
        redirect_uris: vec![REDIRECT.to_string()],
        software_id: None,
    }
}

fn params(scopes: &[&str]) -> AuthorizationParams {
    AuthorizationParams {
        scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
        code_challenge: pkce::s256_challenge(VERIFIER),
        redirect_uri: REDIRECT.to_string(),
        redirect_uri_provided_explicitly: true,
        state: Some("s1".to_string()),
        resource: None,
    }
}

fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

async fn approved_code(
    provider: &OAuthProvider,
    client: &RegisteredClient,
    scopes: &[&str],
) -> String {
    let consent_path = provider.authorize(client, params(scopes)).await;
    let consent_id = consent_path.strip_prefix("/consent?consent_id=").unwrap();
    let redirect = provider.approve_consent(consent_id, None).await.unwrap();
    query_param(&redirect, "code").unwrap()
}

/// Redeem `code` with the verifier and redirect URI it was issued for.
async fn redeem(
    provider: &OAuthProvider,
    client: &RegisteredClient,
    code: &str,
) -> AuthResult<TokenResponse> {
    provider
        .exchange_authorization_code(client, code, VERIFIER, Some(REDIRECT))
        .await
}

async fn setup(settings: OAuthSettings) -> (OAuthProvider, RegisteredClient) {
    let provider = OAuthProvider::new(settings);
    let client = make_client("client-1");
    provider.register_client(client.clone()).await.unwrap();
    (provider, client)
}

#[tokio::test]
async fn test_access_token_carries_granted_scopes() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let code = approved_code(&provider, &client, &["read", "trade"]).await;

    let tokens = redeem(&provider, &client, &code).await.unwrap();
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.scope.as_deref(), Some("read trade"));

    let access = &tokens.access_token;
    let grant = provider.load_access_token(access).await.unwrap();
    assert_eq!(grant.client_id, "client-1");
    assert_eq!(grant.scopes, vec!["read".to_string(), "trade".to_string()]);
    assert!(grant.expires_at.is_some());

    // A refresh token is never accepted as a bearer credential.
    let refresh = &tokens.refresh_token;
    assert!(provider.load_access_token(refresh).await.is_none());
}

#[tokio::test]
async fn test_code_consumed_even_when_exchange_fails() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let code = approved_code(&provider, &client, &["all"]).await;

    let pending = provider.load_authorization_code(&client, &code).await;
    assert!(pending.is_some());

    let wrong_verifier = "another-verifier-that-is-long-enough-for-rfc-7636-98765";
    let result = provider
        .exchange_authorization_code(&client, &code, wrong_verifier, Some(REDIRECT))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidGrant(_))));

    // The correct verifier no longer helps.
    let result = redeem(&provider, &client, &code).await;
    assert!(matches!(result, Err(AuthError::InvalidGrant(_))));
    let consumed = provider.load_authorization_code(&client, &code).await;
    assert!(consumed.is_none());
}

#[tokio::test]
async fn test_code_bound_to_client_and_redirect() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let other = make_client("client-2");
    provider.register_client(other.clone()).await.unwrap();

    let code = approved_code(&provider, &client, &["all"]).await;
    let stolen = provider.load_authorization_code(&other, &code).await;
    assert!(stolen.is_none());
    let result = redeem(&provider, &other, &code).await;
    assert!(matches!(result, Err(AuthError::InvalidGrant(_))));

    let code = approved_code(&provider, &client, &["all"]).await;
    let elsewhere = Some("http://127.0.0.1:9999/other");
    let result = provider
        .exchange_authorization_code(&client, &code, VERIFIER, elsewhere)
        .await;
    assert!(matches!(result, Err(AuthError::InvalidGrant(_))));

    // The redirect URI was sent explicitly, so it must be repeated.
    let code = approved_code(&provider, &client, &["all"]).await;
    let result = provider
        .exchange_authorization_code(&client, &code, VERIFIER, None)
        .await;
    assert!(matches!(result, Err(AuthError::InvalidGrant(_))));
}

#[tokio::test]
async fn test_static_api_key() {
    let (provider, _) = setup(OAuthSettings::new(SECRET).with_api_key("K")).await;

    let grant = provider.load_access_token("K").await.unwrap();
    assert_eq!(grant.client_id, API_KEY_CLIENT_ID);
    assert_eq!(grant.scopes, vec!["all".to_string()]);
    assert_eq!(grant.expires_at, None);

    assert!(provider.load_access_token("K2").await.is_none());
    assert!(provider.load_access_token("").await.is_none());
}

#[tokio::test]
async fn test_pin_lockout_cancels_request() {
    let (provider, client) = setup(OAuthSettings::new(SECRET).with_consent_pin("2468")).await;
    let consent_path = provider.authorize(&client, params(&["all"])).await;
    let consent_id = consent_path.strip_prefix("/consent?consent_id=").unwrap();

    let no_pin = provider.approve_consent(consent_id, None).await;
    assert_eq!(no_pin, Err(AuthError::InvalidPin));
    for _ in 0..4 {
        let wrong = provider.approve_consent(consent_id, Some("1111")).await;
        assert_eq!(wrong, Err(AuthError::InvalidPin));
    }

    let correct = provider.approve_consent(consent_id, Some("2468")).await;
    assert_eq!(correct, Err(AuthError::Locked));
    assert!(provider.pending_consent(consent_id).await.is_none());
}

#[tokio::test]
async fn test_refresh_replay_rejected_across_tasks() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let provider = Arc::new(provider);
    let code = approved_code(&provider, &client, &["all"]).await;
    let tokens = redeem(&provider, &client, &code).await.unwrap();
    let grant = provider
        .load_refresh_token(&client, &tokens.refresh_token)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let provider = Arc::clone(&provider);
        let client = client.clone();
        let grant = grant.clone();
        handles.push(tokio::spawn(async move {
            provider.exchange_refresh_token(&client, &grant, &[]).await
        }));
    }

    let mut rotated = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => rotated += 1,
            Err(e) => assert!(matches!(e, AuthError::InvalidGrant(_))),
        }
    }
    assert_eq!(rotated, 1);
}

#[tokio::test]
async fn test_refresh_can_narrow_scopes() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let code = approved_code(&provider, &client, &["read", "trade"]).await;
    let tokens = redeem(&provider, &client, &code).await.unwrap();

    let grant = provider
        .load_refresh_token(&client, &tokens.refresh_token)
        .await
        .unwrap();
    let narrowed = provider
        .exchange_refresh_token(&client, &grant, &["read".to_string()])
        .await
        .unwrap();
    assert_eq!(narrowed.scope.as_deref(), Some("read"));

    // Escalation leaves the presented token usable.
    let grant = provider
        .load_refresh_token(&client, &narrowed.refresh_token)
        .await
        .unwrap();
    let escalate = provider
        .exchange_refresh_token(&client, &grant, &["trade".to_string()])
        .await;
    assert_eq!(escalate, Err(AuthError::InvalidScope));
    let presented = provider
        .load_refresh_token(&client, &narrowed.refresh_token)
        .await;
    assert!(presented.is_some());
}

#[tokio::test]
async fn test_revocation_of_both_token_types() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let code = approved_code(&provider, &client, &["all"]).await;
    let tokens = redeem(&provider, &client, &code).await.unwrap();

    provider.revoke_token(&tokens.access_token).await;
    provider.revoke_token(&tokens.refresh_token).await;
    provider.revoke_token("not-a-jwt").await;

    let access = provider.load_access_token(&tokens.access_token).await;
    assert!(access.is_none());
    let refresh = provider
        .load_refresh_token(&client, &tokens.refresh_token)
        .await;
    assert!(refresh.is_none());
}

#[tokio::test]
async fn test_tokens_from_other_secret_rejected() {
    let (provider, client) = setup(OAuthSettings::new(SECRET)).await;
    let (impostor, _) = setup(OAuthSettings::new("some-other-secret")).await;

    let code = approved_code(&impostor, &client, &["all"]).await;
    let forged = redeem(&impostor, &client, &code).await.unwrap();

    let access = provider.load_access_token(&forged.access_token).await;
    assert!(access.is_none());
    let refresh = provider
        .load_refresh_token(&client, &forged.refresh_token)
        .await;
    assert!(refresh.is_none());
}
