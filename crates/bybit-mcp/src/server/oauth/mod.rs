//! OAuth 2.1 authorization server for MCP authentication.
//!
//! Implements a self-contained OAuth server embedded in the binary. Clients
//! register dynamically, a human approves each authorization on a consent
//! page (optionally behind a PIN), and the resulting signed tokens gate the
//! `/mcp` endpoint. A static API key is accepted as an alternative bearer.
//!
//! ## Supported Standards
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: Authorization Code Grant
//! - RFC 7009: Token Revocation

pub mod consent;
mod consent_page;
pub mod handlers;
pub mod middleware;
pub mod pkce;
pub mod provider;
pub mod rate_limit;
pub mod secure;
pub mod token;
pub mod types;

pub use provider::{API_KEY_CLIENT_ID, OAuthProvider, WILDCARD_SCOPE};
pub use types::{AccessGrant, RegisteredClient, TokenResponse};
