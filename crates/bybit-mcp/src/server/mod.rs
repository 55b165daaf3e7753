//! MCP server implementation.
//!
//! Provides both stdio (for local clients) and HTTP transports. Over HTTP the
//! `/mcp` endpoint is guarded by the embedded OAuth authorization server
//! whenever `OAUTH_SECRET` is configured.

pub mod oauth;
pub mod stdio;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::BybitClient;
use crate::config::OAuthSettings;
use crate::tools::{self, McpTool, ToolContext};

use oauth::OAuthProvider;

/// MCP server for the Bybit API.
pub struct McpServer {
    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,

    /// Authorization server, when authentication is enabled.
    oauth: Option<Arc<OAuthProvider>>,
}

impl McpServer {
    /// Create a new MCP server.
    #[must_use]
    pub fn new(client: BybitClient, oauth: Option<OAuthSettings>) -> Self {
        let ctx = ToolContext::new(Arc::new(client));
        let tools = tools::register_all_tools();
        let oauth = oauth.map(|settings| Arc::new(OAuthProvider::new(settings)));

        Self { ctx, tools, oauth }
    }

    /// Run the server in stdio mode.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server in stdio mode");
        tracing::info!("Registered {} tools", self.tools.len());

        stdio::run_stdio(self.tools, self.ctx).await
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16, base_url: Option<String>) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server in HTTP mode on port {}", port);
        tracing::info!("Registered {} tools", self.tools.len());

        match self.oauth {
            Some(ref provider) => tracing::info!(
                api_key = provider.settings().api_key.is_some(),
                consent_pin = provider.pin_required(),
                "OAuth 2.1 enabled"
            ),
            None => tracing::warn!("OAUTH_SECRET not set, /mcp is unauthenticated"),
        }

        let base_url = base_url.unwrap_or_else(|| format!("http://localhost:{port}"));
        let router = transport::create_router(self.tools, self.ctx, Some(base_url), self.oauth);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// List all available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<(&str, &str)> {
        self.tools
            .iter()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Get tool context for execution.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Authorization server, if enabled.
    #[must_use]
    pub fn oauth(&self) -> Option<&Arc<OAuthProvider>> {
        self.oauth.as_ref()
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("tools", &self.tools.len())
            .field("oauth", &self.oauth.is_some())
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
