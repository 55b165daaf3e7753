//! Transport layer implementations.
//!
//! JSON-RPC types and dispatch shared by both transports, plus the HTTP
//! router. The HTTP transport is stateless: every `POST /mcp` carries one
//! request and gets one JSON response, with no sessions or streams.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::oauth::{AccessGrant, OAuthProvider, handlers, middleware::require_bearer};
use crate::tools::{McpTool, ToolContext};

/// Protocol version announced when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// JSON-RPC version constant.
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: Some(result),
            error: None,
            id,
        }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    pub ctx: ToolContext,
    /// Public base URL, used as issuer and in metadata documents.
    pub base_url: String,
    /// Authorization server; `None` leaves `/mcp` open.
    pub oauth: Option<Arc<OAuthProvider>>,
}

/// Create the HTTP router for MCP.
pub fn create_router(
    tools: Vec<Box<dyn McpTool>>,
    ctx: ToolContext,
    base_url: Option<String>,
    oauth: Option<Arc<OAuthProvider>>,
) -> Router {
    if let Some(ref provider) = oauth {
        provider.start_cleanup_task();
    }

    let base_url = base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let state = Arc::new(HttpState {
        tools,
        ctx,
        base_url,
        oauth,
    });

    let protected = Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_bearer));

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // OAuth discovery
        .route(
            "/.well-known/oauth-protected-resource",
            get(handlers::handle_protected_resource),
        )
        .route(
            "/.well-known/oauth-protected-resource/mcp",
            get(handlers::handle_protected_resource),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::handle_auth_server_metadata),
        )
        // OAuth endpoints
        .route("/register", post(handlers::handle_register))
        .route("/authorize", get(handlers::handle_authorize_get))
        .route(
            "/consent",
            get(handlers::handle_consent_get).post(handlers::handle_consent_post),
        )
        .route("/token", post(handlers::handle_token))
        .route("/revoke", post(handlers::handle_revoke))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "bybit-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handle POST requests to /mcp (stateless Streamable HTTP)
async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    Extension(grant): Extension<AccessGrant>,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    tracing::debug!(
        method = %req.method,
        client_id = %grant.client_id,
        "Handling MCP POST request"
    );

    match dispatch(&req, &state.tools, &state.ctx).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Route one JSON-RPC message. Returns `None` for notifications.
pub async fn dispatch(
    req: &JsonRpcRequest,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> Option<JsonRpcResponse> {
    let id = req.id.clone()?;
    let id = Some(id);

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, handle_initialize(&req.params)),
        "tools/list" => handle_tools_list(id, tools),
        "tools/call" => handle_tools_call(id, &req.params, tools, ctx).await,
        "ping" | "initialized" | "notifications/initialized" => {
            JsonRpcResponse::success(id, serde_json::json!({}))
        }
        _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {}", req.method)),
    };
    Some(response)
}

fn handle_initialize(params: &serde_json::Value) -> serde_json::Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    tracing::info!("MCP initialize: protocol version {}", protocol_version);

    serde_json::json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": "bybit-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_tools_list(id: Option<serde_json::Value>, tools: &[Box<dyn McpTool>]) -> JsonRpcResponse {
    let tool_list: Vec<McpToolInfo> = tools
        .iter()
        .map(|t| McpToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(id, serde_json::json!({ "tools": tool_list }))
}

async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, -32602, "Missing 'name' parameter");
    };

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let Some(tool) = tools.iter().find(|t| t.name() == tool_name) else {
        return JsonRpcResponse::error(id, -32602, format!("Tool not found: {tool_name}"));
    };

    tracing::info!(tool = %tool_name, "Executing tool");

    match tool.execute(ctx, arguments).await {
        Ok(result) => JsonRpcResponse::success(
            id,
            serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": result
                }]
            }),
        ),
        Err(e) => {
            tracing::error!(tool = %tool_name, error = %e, "Tool execution failed");
            JsonRpcResponse::error(id, -32000, e.to_user_message())
        }
    }
}
