//! Bybit MCP Server
//!
//! A Model Context Protocol (MCP) server for the Bybit v5 API with an embedded
//! OAuth 2.1 authorization server. LLM agents can read market data and, with
//! API credentials configured, trade and manage positions.
//!
//! # Features
//!
//! - **31 MCP Tools**: Market data, trading, account, position, asset
//! - **OAuth 2.1**: Dynamic registration, PKCE, consent page with optional PIN,
//!   rotating refresh tokens, revocation, and a static API key bypass
//! - **Rate-limited**: Client-side request budget for the Bybit API
//!
//! # Example
//!
//! ```no_run
//! use bybit_mcp::{client::BybitClient, config::Config, server::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let oauth = config.oauth.clone();
//!     let client = BybitClient::new(config)?;
//!
//!     McpServer::new(client, oauth).run_http(8080, None).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod formatters;
pub mod server;
pub mod tools;

pub use client::BybitClient;
pub use config::{Config, OAuthSettings};
pub use error::{AuthError, ClientError, ToolError};
