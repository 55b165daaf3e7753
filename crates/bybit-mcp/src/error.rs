//! Error types for the Bybit MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the Bybit HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Bybit answered with a non-zero `retCode`
    #[error("Bybit error {code}: {message}")]
    Exchange {
        /// Bybit `retCode`
        code: i64,
        /// Bybit `retMsg`
        message: String,
    },

    /// Private endpoint called without API credentials
    #[error("Bybit API credentials not configured. Set BYBIT_API_KEY and BYBIT_API_SECRET.")]
    MissingCredentials,

    /// Rate limited by Bybit (429 / 403 rate response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Request signing failed
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited {
            retry_after: Duration::from_secs(seconds),
        }
    }

    /// Create an exchange-level error from a Bybit envelope.
    #[must_use]
    pub fn exchange(code: i64, message: impl Into<String>) -> Self {
        Self::Exchange {
            code,
            message: message.into(),
        }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Client(ClientError::RateLimited { retry_after }) => {
                format!("Rate limited by Bybit API. Please wait {retry_after:?} before retrying.")
            }
            Self::Client(ClientError::Exchange { code, message }) => {
                format!("Bybit rejected the request ({code}): {message}")
            }
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Outcomes of the authorization provider other than success.
///
/// Each variant is a distinct category so callers can tell a missing consent
/// from a wrong PIN, and a wrong PIN from a lockout, without matching strings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown, consumed, or expired consent request
    #[error("Invalid or expired consent request")]
    NotFound,

    /// Wrong consent PIN; the request may be retried
    #[error("Invalid PIN")]
    InvalidPin,

    /// PIN attempts exhausted; the authorization must be restarted
    #[error("Too many failed attempts. Authorization cancelled.")]
    Locked,

    /// Registration throttled
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited {
        /// Length of the throttling window
        retry_after: Duration,
    },

    /// Registration without the configured software id
    #[error("Client software is not approved for registration")]
    UnapprovedSoftware,

    /// Unknown or mismatched client
    #[error("Unknown or unauthorized client")]
    InvalidClient,

    /// Bad, expired, replayed, or foreign code or refresh token
    #[error("{0}")]
    InvalidGrant(String),

    /// Requested scopes exceed the original grant
    #[error("Requested scope exceeds the original grant")]
    InvalidScope,

    /// Malformed request
    #[error("{0}")]
    InvalidRequest(String),

    /// Failure inside the provider (e.g. token signing)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub fn invalid_grant(reason: impl Into<String>) -> Self {
        Self::InvalidGrant(reason.into())
    }

    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// OAuth `error` code (RFC 6749 §5.2, RFC 7591 §3.2.2).
    #[must_use]
    pub const fn oauth_code(&self) -> &'static str {
        match self {
            Self::NotFound | Self::InvalidPin | Self::Locked | Self::InvalidRequest(_) => {
                "invalid_request"
            }
            Self::RateLimited { .. } => "invalid_client_metadata",
            Self::UnapprovedSoftware => "unapproved_software_statement",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::Internal(_) => "server_error",
        }
    }

    /// HTTP status used when the error reaches the network boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::InvalidClient => 401,
            Self::Internal(_) => 500,
            _ => 400,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type alias for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;
