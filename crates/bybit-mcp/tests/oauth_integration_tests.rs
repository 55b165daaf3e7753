//! Full end-to-end integration tests for the OAuth 2.1 flow via HTTP.
//!
//! Unlike oauth_tests.rs which drives the provider directly, this tests the
//! actual HTTP endpoints using axum's Router.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, Request, Response, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use bybit_mcp::client::BybitClient;
use bybit_mcp::config::{Config, OAuthSettings};
use bybit_mcp::server::oauth::{OAuthProvider, pkce};
use bybit_mcp::server::transport::create_router;
use bybit_mcp::tools::{self, ToolContext};

const SECRET: &str = "integration-test-secret";
const BASE_URL: &str = "https://example.com";
const REDIRECT: &str = "https://client.example.com/cb";
const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

fn build_router(settings: Option<OAuthSettings>) -> axum::Router {
    let config = Config::for_testing("http://unused.localhost");
    let client = BybitClient::new(config).unwrap();
    let ctx = ToolContext::new(Arc::new(client));
    let oauth = settings.map(|s| Arc::new(OAuthProvider::new(s)));
    let base_url = Some(BASE_URL.to_string());

    create_router(tools::register_all_tools(), ctx, base_url, oauth)
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

fn header_value(response: &Response<Body>, name: HeaderName) -> String {
    let value = &response.headers()[name];
    value.to_str().unwrap().to_string()
}

fn location(response: &Response<Body>) -> String {
    header_value(response, header::LOCATION)
}

fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn form_post(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
        .unwrap()
}

/// Consent form submission for `action`, with an optional PIN.
fn decide(consent_id: &str, action: &str, pin: Option<&str>) -> Request<Body> {
    let mut fields = vec![("consent_id", consent_id), ("action", action)];
    fields.extend(pin.map(|pin| ("pin", pin)));
    form_post("/consent", &fields)
}

fn mcp_post(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn tools_list() -> serde_json::Value {
    json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })
}

async fn register(app: &axum::Router, body: serde_json::Value) -> Response<Body> {
    let request = Request::post("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn register_client(app: &axum::Router) -> String {
    let metadata = json!({ "client_name": "Test Client", "redirect_uris": [REDIRECT] });
    let response = register(app, metadata).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["client_id"].as_str().unwrap().to_string()
}

/// Walk `/authorize` and return the consent id.
async fn start_authorization(app: &axum::Router, client_id: &str) -> String {
    let query = serde_urlencoded::to_string([
        ("client_id", client_id),
        ("redirect_uri", REDIRECT),
        ("response_type", "code"),
        ("state", "xyz123"),
        ("code_challenge", &pkce::s256_challenge(VERIFIER)),
        ("code_challenge_method", "S256"),
        ("scope", "all"),
    ])
    .unwrap();

    let response = send(app, get(&format!("/authorize?{query}"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let consent_path = location(&response);
    consent_path
        .strip_prefix("/consent?consent_id=")
        .unwrap()
        .to_string()
}

async fn exchange_code(app: &axum::Router, client_id: &str, code: &str) -> Response<Body> {
    let fields = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", REDIRECT),
        ("code_verifier", VERIFIER),
        ("client_id", client_id),
    ];
    send(app, form_post("/token", &fields)).await
}

/// Register, authorize, approve, and exchange; returns the token response body.
async fn obtain_tokens(app: &axum::Router) -> (String, serde_json::Value) {
    let client_id = register_client(app).await;
    let consent_id = start_authorization(app, &client_id).await;

    let response = send(app, decide(&consent_id, "approve", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let code = query_param(&location(&response), "code").unwrap();

    let response = exchange_code(app, &client_id, &code).await;
    assert_eq!(response.status(), StatusCode::OK);
    (client_id, body_json(response).await)
}

#[tokio::test]
async fn test_full_oauth_http_flow() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));

    // 1. Discovery
    let response = send(&app, get("/.well-known/oauth-protected-resource")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let metadata = body_json(response).await;
    assert_eq!(metadata["authorization_servers"][0], BASE_URL);

    let response = send(&app, get("/.well-known/oauth-authorization-server")).await;
    let metadata = body_json(response).await;
    let revoke = format!("{BASE_URL}/revoke");
    assert_eq!(metadata["token_endpoint"], format!("{BASE_URL}/token"));
    assert_eq!(metadata["revocation_endpoint"], revoke);
    let methods = &metadata["code_challenge_methods_supported"];
    assert_eq!(methods, &json!(["S256"]));

    // 2. Register and authorize
    let client_id = register_client(&app).await;
    let consent_id = start_authorization(&app, &client_id).await;

    // 3. Consent page renders
    let response = send(&app, get(&format!("/consent?consent_id={consent_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(&consent_id));
    assert!(html.contains("Test Client"));

    // 4. Approve
    let response = send(&app, decide(&consent_id, "approve", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let redirect = location(&response);
    assert!(redirect.starts_with(REDIRECT));
    assert_eq!(query_param(&redirect, "state").as_deref(), Some("xyz123"));
    let code = query_param(&redirect, "code").unwrap();

    // 5. Exchange
    let response = exchange_code(&app, &client_id, &code).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let tokens = body_json(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "all");
    let access_token = tokens["access_token"].as_str().unwrap();

    // 6. Code is single-use
    let response = exchange_code(&app, &client_id, &code).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");

    // 7. Authenticated MCP call
    let response = send(&app, mcp_post(Some(access_token), tools_list())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 31);
}

#[tokio::test]
async fn test_mcp_requires_bearer() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));

    let response = send(&app, mcp_post(None, tools_list())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = header_value(&response, header::WWW_AUTHENTICATE);
    let meta = format!(r#"resource_metadata="{BASE_URL}/.well-known/oauth-protected-resource""#);
    assert!(challenge.starts_with("Bearer "));
    assert!(challenge.contains(&meta));

    let response = send(&app, mcp_post(Some("garbage"), tools_list())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = header_value(&response, header::WWW_AUTHENTICATE);
    assert!(challenge.contains(r#"error="invalid_token""#));
}

#[tokio::test]
async fn test_static_api_key_bypasses_oauth() {
    let app = build_router(Some(OAuthSettings::new(SECRET).with_api_key("K")));

    let response = send(&app, mcp_post(Some("K"), tools_list())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, mcp_post(Some("K2"), tools_list())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotation_over_http() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));
    let (client_id, tokens) = obtain_tokens(&app).await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let refresh = |token: &str| {
        let fields = [
            ("grant_type", "refresh_token"),
            ("refresh_token", token),
            ("client_id", client_id.as_str()),
        ];
        form_post("/token", &fields)
    };

    let response = send(&app, refresh(refresh_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

    // The presented refresh token was consumed.
    let response = send(&app, refresh(refresh_token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");

    // The new one works once.
    let next = rotated["refresh_token"].as_str().unwrap();
    let response = send(&app, refresh(next)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_scope_escalation() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));
    let (client_id, tokens) = obtain_tokens(&app).await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let fields = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client_id.as_str()),
        ("scope", "all admin"),
    ];
    let response = send(&app, form_post("/token", &fields)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_scope");
}

#[tokio::test]
async fn test_token_endpoint_client_checks() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));

    let missing_client = [("grant_type", "authorization_code"), ("code", "x")];
    let response = send(&app, form_post("/token", &missing_client)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    let unknown_client = [
        ("grant_type", "authorization_code"),
        ("code", "x"),
        ("client_id", "nobody"),
    ];
    let response = send(&app, form_post("/token", &unknown_client)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_client");

    let client_id = register_client(&app).await;
    let password = [
        ("grant_type", "password"),
        ("username", "trader"),
        ("client_id", client_id.as_str()),
    ];
    let response = send(&app, form_post("/token", &password)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_revoke_access_token() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));
    let (_, tokens) = obtain_tokens(&app).await;
    let access_token = tokens["access_token"].as_str().unwrap();

    let response = send(&app, form_post("/revoke", &[("token", access_token)])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, mcp_post(Some(access_token), tools_list())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown tokens are accepted silently.
    let response = send(&app, form_post("/revoke", &[("token", "not-a-token")])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_consent_pin_over_http() {
    let app = build_router(Some(OAuthSettings::new(SECRET).with_consent_pin("4321")));
    let client_id = register_client(&app).await;
    let consent_id = start_authorization(&app, &client_id).await;

    let response = send(&app, get(&format!("/consent?id={consent_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"name="pin""#));

    let response = send(&app, decide(&consent_id, "approve", Some("0000"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Invalid PIN"));

    let response = send(&app, decide(&consent_id, "approve", Some("4321"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(query_param(&location(&response), "code").is_some());
}

#[tokio::test]
async fn test_pin_lockout_over_http() {
    let app = build_router(Some(OAuthSettings::new(SECRET).with_consent_pin("4321")));
    let client_id = register_client(&app).await;
    let consent_id = start_authorization(&app, &client_id).await;

    for _ in 0..5 {
        let response = send(&app, decide(&consent_id, "approve", Some("bad"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(&app, decide(&consent_id, "approve", Some("4321"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert_eq!(body, "Too many failed attempts. Authorization cancelled.");
}

#[tokio::test]
async fn test_deny_redirects_with_access_denied() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));
    let client_id = register_client(&app).await;
    let consent_id = start_authorization(&app, &client_id).await;

    let response = send(&app, decide(&consent_id, "deny", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let redirect = location(&response);
    let error = query_param(&redirect, "error");
    assert_eq!(error.as_deref(), Some("access_denied"));
    assert_eq!(query_param(&redirect, "state").as_deref(), Some("xyz123"));

    let response = send(&app, get(&format!("/consent?consent_id={consent_id}"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_validation() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));
    let client_id = register_client(&app).await;
    let challenge = pkce::s256_challenge(VERIFIER);

    let cases = [
        vec![("client_id", "unknown"), ("response_type", "code")],
        vec![
            ("client_id", client_id.as_str()),
            ("response_type", "token"),
        ],
        vec![
            ("client_id", client_id.as_str()),
            ("response_type", "code"),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "plain"),
        ],
        vec![
            ("client_id", client_id.as_str()),
            ("response_type", "code"),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("redirect_uri", "https://evil.example.com/cb"),
        ],
    ];

    for params in cases {
        let query = serde_urlencoded::to_string(&params).unwrap();
        let response = send(&app, get(&format!("/authorize?{query}"))).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "params: {params:?}"
        );
    }

    // A single registered redirect URI may be omitted.
    let query = serde_urlencoded::to_string([
        ("client_id", client_id.as_str()),
        ("response_type", "code"),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "S256"),
    ])
    .unwrap();
    let response = send(&app, get(&format!("/authorize?{query}"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_register_validation() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));

    let response = register(&app, json!({ "client_name": "No URIs" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_client_metadata");

    let response = register(&app, json!({ "redirect_uris": ["not a url"] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_requires_software_id() {
    let app = build_router(Some(OAuthSettings::new(SECRET).with_registration_token("reg-token")));

    let response = register(&app, json!({ "redirect_uris": [REDIRECT] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unapproved_software_statement");

    let metadata = json!({ "redirect_uris": [REDIRECT], "software_id": "reg-token" });
    let response = register(&app, metadata).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_registration_throttled() {
    let app = build_router(Some(OAuthSettings::new(SECRET)));

    for _ in 0..5 {
        register_client(&app).await;
    }

    let response = register(&app, json!({ "redirect_uris": [REDIRECT] })).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_without_oauth() {
    let app = build_router(None);

    let response = send(&app, mcp_post(None, tools_list())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = register(&app, json!({ "redirect_uris": [REDIRECT] })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_notification_accepted() {
    let app = build_router(None);

    let notification = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    let response = send(&app, mcp_post(None, notification)).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}
