//! Bybit v5 REST client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff (reads only)
//! - Client-side rate limiting via governor
//! - HMAC-SHA256 request signing for private endpoints

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use sha2::Sha256;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::formatters;

type HmacSha256 = Hmac<Sha256>;

const FALLBACK_RATE: NonZeroU32 = NonZeroU32::new(10).unwrap();

#[derive(Clone)]
struct Credentials {
    api_key: String,
    api_secret: String,
}

/// Bybit v5 API client.
#[derive(Clone)]
pub struct BybitClient {
    /// Client for GET requests, with retry middleware when enabled.
    reader: ClientWithMiddleware,

    /// Client for POST requests; writes are never retried.
    writer: ClientWithMiddleware,

    /// Outbound request budget.
    limiter: Arc<DefaultDirectRateLimiter>,

    /// API credentials (private endpoints).
    credentials: Option<Credentials>,

    /// REST base URL.
    base_url: String,

    /// Receive window for signed requests, in milliseconds.
    recv_window_ms: u64,
}

impl BybitClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let reader = if config.retry_reads {
            let retry_policy = ExponentialBackoff::builder()
                .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
                .build_with_max_retries(3);
            ClientBuilder::new(client.clone())
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build()
        } else {
            ClientBuilder::new(client.clone()).build()
        };
        let writer = ClientBuilder::new(client).build();

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(FALLBACK_RATE);
        let quota = Quota::per_second(rate);

        let credentials = match (config.api_key, config.api_secret) {
            (Some(api_key), Some(api_secret)) => Some(Credentials {
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            reader,
            writer,
            limiter: Arc::new(RateLimiter::direct(quota)),
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window_ms,
        })
    }

    /// Check if API credentials are configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request and return the unwrapped `result` object.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a
    /// non-zero `retCode`.
    pub async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
        signed: bool,
    ) -> ClientResult<serde_json::Value> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };

        let mut request = self.reader.get(&url);
        if signed {
            for (name, value) in self.auth_headers(&query)? {
                request = request.header(name, value);
            }
        }

        self.limiter.until_ready().await;
        tracing::debug!(path = %path, signed, "Bybit GET");

        let response = request.send().await?;
        self.parse(response).await
    }

    /// Make a POST request with a JSON body and return the unwrapped `result` object.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a
    /// non-zero `retCode`.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        signed: bool,
    ) -> ClientResult<serde_json::Value> {
        let body_str = serde_json::to_string(body)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.writer.post(&url);
        if signed {
            for (name, value) in self.auth_headers(&body_str)? {
                request = request.header(name, value);
            }
        }

        self.limiter.until_ready().await;
        tracing::debug!(path = %path, signed, "Bybit POST");

        let response = request.body(body_str).send().await?;
        self.parse(response).await
    }

    /// Signature headers for a request payload (query string or JSON body).
    fn auth_headers(&self, payload: &str) -> ClientResult<[(&'static str, String); 4]> {
        let Some(ref creds) = self.credentials else {
            return Err(ClientError::MissingCredentials);
        };

        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let recv_window = self.recv_window_ms.to_string();
        let signature = sign(
            &creds.api_secret,
            &timestamp,
            &creds.api_key,
            &recv_window,
            payload,
        )?;

        Ok([
            ("X-BAPI-API-KEY", creds.api_key.clone()),
            ("X-BAPI-TIMESTAMP", timestamp),
            ("X-BAPI-RECV-WINDOW", recv_window),
            ("X-BAPI-SIGN", signature),
        ])
    }

    async fn parse(&self, response: reqwest::Response) -> ClientResult<serde_json::Value> {
        let response = self.handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;
        formatters::unwrap_envelope(value)
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);

                Err(ClientError::rate_limited(retry_after))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }
}

impl std::fmt::Debug for BybitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

/// Bybit v5 signature: `hex(HMAC_SHA256(secret, timestamp + api_key + recv_window + payload))`.
///
/// # Errors
///
/// Returns error if the secret cannot be used as an HMAC key.
pub fn sign(
    secret: &str,
    timestamp: &str,
    api_key: &str,
    recv_window: &str,
    payload: &str,
) -> ClientResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ClientError::Signing(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(api_key.as_bytes());
    mac.update(recv_window.as_bytes());
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
