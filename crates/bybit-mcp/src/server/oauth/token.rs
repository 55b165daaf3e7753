//! Signed, self-contained bearer tokens (HS256 JWT).
//!
//! Tokens are never stored. The codec only remembers the ids of revoked
//! tokens, which is why a restart keeps every unexpired token valid but
//! forgets revocations.

use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::secure;
use crate::error::{AuthError, AuthResult};

/// Issuer and audience embedded in every token.
pub const TOKEN_ISSUER: &str = "bybit-mcp";

/// Entropy of the `jti` claim in bytes.
const JTI_BYTES: usize = 16;

/// Kind of signed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Client the token was issued to.
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
    pub aud: String,
    /// Unique token id, the unit of revocation.
    pub jti: String,
}

/// Issues and verifies signed tokens and holds the revocation set.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    inspection: Validation,
    revoked: RwLock<HashSet<String>>,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        let mut inspection = validation.clone();
        inspection.validate_exp = false;
        inspection.set_required_spec_claims(&["iss", "aud", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            inspection,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Sign a new token valid for `ttl` from now.
    pub fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        scopes: &[String],
        ttl: Duration,
    ) -> AuthResult<String> {
        let now = jsonwebtoken::get_current_timestamp();
        let exp = now
            .checked_add(ttl.as_secs())
            .ok_or_else(|| AuthError::internal("token lifetime out of range"))?;
        let claims = TokenClaims {
            sub: subject.to_owned(),
            token_type,
            scopes: scopes.to_vec(),
            iat: now,
            exp,
            iss: TOKEN_ISSUER.to_owned(),
            aud: TOKEN_ISSUER.to_owned(),
            jti: secure::random_token(JTI_BYTES),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
    }

    /// Verify signature, issuer, audience and expiry.
    ///
    /// Returns `None` for anything that does not verify, including garbage
    /// input. Unless `skip_revocation_check` is set, revoked tokens are
    /// rejected as well.
    pub async fn verify(&self, token: &str, skip_revocation_check: bool) -> Option<TokenClaims> {
        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .ok()?
            .claims;

        if !skip_revocation_check && self.is_revoked(&claims.jti).await {
            return None;
        }
        Some(claims)
    }

    /// Decode a genuine token regardless of expiry or revocation.
    ///
    /// Signature, issuer and audience are still enforced. Only used to learn
    /// a token's id in order to revoke it.
    pub fn inspect(&self, token: &str) -> Option<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.inspection)
            .ok()
            .map(|data| data.claims)
    }

    /// Add a token id to the revocation set.
    ///
    /// Returns `false` if the id was already revoked.
    pub async fn revoke(&self, jti: &str) -> bool {
        self.revoked.write().await.insert(jti.to_owned())
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains(jti)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &TOKEN_ISSUER)
            .finish()
    }
}
