//! Configuration for the Bybit MCP server.

use std::time::Duration;

use anyhow::Context;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Mainnet REST endpoint.
    pub const MAINNET_URL: &str = "https://api.bybit.com";

    /// Testnet REST endpoint.
    pub const TESTNET_URL: &str = "https://api-testnet.bybit.com";

    /// Receive window for signed requests, in milliseconds.
    pub const RECV_WINDOW_MS: u64 = 5000;

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Outbound request budget per second (Bybit allows 10-20/s per endpoint group).
    pub const REQUESTS_PER_SECOND: u32 = 10;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// OAuth policy defaults.
pub mod oauth {
    use std::time::Duration;

    /// Access token lifetime: 1 hour.
    pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3600);

    /// Refresh token lifetime: 7 days.
    pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Longest configurable refresh token lifetime: 365 days.
    pub const MAX_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

    /// Authorization code and pending consent lifetime: 10 minutes.
    pub const AUTH_CODE_TTL: Duration = Duration::from_secs(600);

    /// Wrong-PIN attempts allowed per consent request.
    pub const MAX_PIN_ATTEMPTS: u32 = 5;

    /// Client registrations allowed per window, across all registrants.
    pub const REGISTRATION_LIMIT: usize = 5;

    /// Registration rate-limit window: 10 minutes.
    pub const REGISTRATION_WINDOW: Duration = Duration::from_secs(600);

    /// Consent and code sweep interval: 5 minutes.
    pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
}

/// Authorization server policy.
#[derive(Clone)]
pub struct OAuthSettings {
    /// HMAC secret for signing tokens.
    pub secret: String,

    /// Static bearer key accepted alongside OAuth tokens.
    pub api_key: Option<String>,

    /// PIN required on the consent page.
    pub consent_pin: Option<String>,

    /// `software_id` a client must declare to register.
    pub registration_token: Option<String>,

    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub auth_code_ttl: Duration,
    pub max_pin_attempts: u32,
    pub registration_limit: usize,
    pub registration_window: Duration,
}

impl OAuthSettings {
    /// Default policy for the given signing secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            api_key: None,
            consent_pin: None,
            registration_token: None,
            access_token_ttl: oauth::ACCESS_TOKEN_TTL,
            refresh_token_ttl: oauth::REFRESH_TOKEN_TTL,
            auth_code_ttl: oauth::AUTH_CODE_TTL,
            max_pin_attempts: oauth::MAX_PIN_ATTEMPTS,
            registration_limit: oauth::REGISTRATION_LIMIT,
            registration_window: oauth::REGISTRATION_WINDOW,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_consent_pin(mut self, pin: impl Into<String>) -> Self {
        self.consent_pin = Some(pin.into());
        self
    }

    #[must_use]
    pub fn with_registration_token(mut self, token: impl Into<String>) -> Self {
        self.registration_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Read settings from the environment; `None` when `OAUTH_SECRET` is unset.
    ///
    /// # Errors
    ///
    /// Returns error if `REFRESH_TOKEN_TTL_SECS` is not a whole number of
    /// seconds between 1 and [`oauth::MAX_REFRESH_TOKEN_TTL`].
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let Some(secret) = env_non_empty("OAUTH_SECRET") else {
            return Ok(None);
        };

        let mut settings = Self::new(secret);
        settings.api_key = env_non_empty("MCP_API_KEY");
        settings.consent_pin = env_non_empty("CONSENT_PIN");
        settings.registration_token = env_non_empty("REGISTRATION_TOKEN");
        if let Some(ttl) = env_non_empty("REFRESH_TOKEN_TTL_SECS") {
            settings.refresh_token_ttl = parse_refresh_token_ttl(&ttl)?;
        }
        Ok(Some(settings))
    }
}

fn parse_refresh_token_ttl(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("REFRESH_TOKEN_TTL_SECS is not a number: {raw:?}"))?;
    let ttl = Duration::from_secs(secs);
    if ttl.is_zero() || ttl > oauth::MAX_REFRESH_TOKEN_TTL {
        anyhow::bail!(
            "REFRESH_TOKEN_TTL_SECS must be between 1 and {} seconds, got {secs}",
            oauth::MAX_REFRESH_TOKEN_TTL.as_secs()
        );
    }
    Ok(ttl)
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("has_api_key", &self.api_key.is_some())
            .field("has_consent_pin", &self.consent_pin.is_some())
            .field("has_registration_token", &self.registration_token.is_some())
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("auth_code_ttl", &self.auth_code_ttl)
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Bybit API key (private endpoints).
    pub api_key: Option<String>,

    /// Bybit API secret (private endpoints).
    pub api_secret: Option<String>,

    /// Whether to talk to the Bybit testnet.
    pub testnet: bool,

    /// REST base URL (overridable for testing with mock servers).
    pub base_url: String,

    /// Receive window for signed requests.
    pub recv_window_ms: u64,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Outbound requests per second.
    pub requests_per_second: u32,

    /// Whether failed GET requests are retried with backoff.
    pub retry_reads: bool,

    /// Authorization server policy; `None` disables authentication.
    pub oauth: Option<OAuthSettings>,
}

impl Config {
    /// Create a new configuration with optional Bybit credentials.
    #[must_use]
    pub fn new(api_key: Option<String>, api_secret: Option<String>, testnet: bool) -> Self {
        let base_url = if testnet {
            api::TESTNET_URL
        } else {
            api::MAINNET_URL
        };
        Self {
            api_key,
            api_secret,
            testnet,
            base_url: base_url.to_string(),
            recv_window_ms: api::RECV_WINDOW_MS,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            requests_per_second: api::REQUESTS_PER_SECOND,
            retry_reads: true,
            oauth: None,
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: None,
            api_secret: None,
            testnet: true,
            base_url: base_url.to_string(),
            recv_window_ms: api::RECV_WINDOW_MS,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            requests_per_second: 1000,
            retry_reads: false,
            oauth: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let testnet = std::env::var("BYBIT_TESTNET")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        let mut config = Self::new(
            env_non_empty("BYBIT_API_KEY"),
            env_non_empty("BYBIT_API_SECRET"),
            testnet,
        );
        config.oauth = OAuthSettings::from_env()?;
        Ok(config)
    }

    /// Check if Bybit credentials are configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None, true)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_credentials", &self.has_credentials())
            .field("testnet", &self.testnet)
            .field("base_url", &self.base_url)
            .field("oauth", &self.oauth)
            .finish()
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.has_credentials());
        assert!(config.testnet);
        assert_eq!(config.base_url, api::TESTNET_URL);
        assert!(config.oauth.is_none());
    }

    #[test]
    fn test_config_mainnet_with_credentials() {
        let config = Config::new(Some("key".into()), Some("secret".into()), false);
        assert!(config.has_credentials());
        assert_eq!(config.base_url, api::MAINNET_URL);
    }

    #[test]
    fn test_oauth_settings_defaults() {
        let settings = OAuthSettings::new("s3cret").with_consent_pin("1234");
        assert_eq!(settings.access_token_ttl, Duration::from_secs(3600));
        assert_eq!(settings.auth_code_ttl, Duration::from_secs(600));
        assert_eq!(settings.max_pin_attempts, 5);
        assert_eq!(settings.registration_limit, 5);
        assert_eq!(settings.consent_pin.as_deref(), Some("1234"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = OAuthSettings::new("s3cret").with_api_key("key-123");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("key-123"));
    }

    #[test]
    fn test_refresh_token_ttl_bounds() {
        assert_eq!(
            parse_refresh_token_ttl("86400").unwrap(),
            Duration::from_secs(86400)
        );
        assert_eq!(
            parse_refresh_token_ttl(" 60 ").unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            parse_refresh_token_ttl("31536000").unwrap(),
            oauth::MAX_REFRESH_TOKEN_TTL
        );

        assert!(parse_refresh_token_ttl("0").is_err());
        assert!(parse_refresh_token_ttl("31536001").is_err());
        assert!(parse_refresh_token_ttl("18446744073709551615").is_err());
        assert!(parse_refresh_token_ttl("-1").is_err());
        assert!(parse_refresh_token_ttl("a week").is_err());
    }
}
