//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 code challenge verification per RFC 7636.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::secure;

/// RFC 7636 §4.1: 43-128 unreserved characters.
static VERIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9\-._~]{43,128}$").expect("static verifier pattern compiles")
});

/// Check the shape of a code verifier.
pub fn is_valid_verifier(code_verifier: &str) -> bool {
    VERIFIER_RE.is_match(code_verifier)
}

/// Compute `BASE64URL(SHA256(code_verifier))`.
pub fn s256_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Verify a PKCE S256 code challenge.
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    is_valid_verifier(code_verifier)
        && secure::constant_time_eq(&s256_challenge(code_verifier), code_challenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc_vector() {
        assert_eq!(s256_challenge(VERIFIER), CHALLENGE);
        assert!(verify_s256(VERIFIER, CHALLENGE));
    }

    #[test]
    fn test_wrong_verifier_or_challenge() {
        assert!(!verify_s256(&"b".repeat(43), CHALLENGE));
        assert!(!verify_s256(VERIFIER, "wrong-challenge"));
    }

    #[test]
    fn test_verifier_shape() {
        assert!(!is_valid_verifier("short"));
        assert!(!is_valid_verifier(&"a".repeat(129)));
        assert!(!is_valid_verifier(&format!("{}/", "a".repeat(43))));
        assert!(is_valid_verifier(&"a".repeat(43)));
        // Even a matching hash is refused for an invalid verifier.
        assert!(!verify_s256("short", &s256_challenge("short")));
    }
}
