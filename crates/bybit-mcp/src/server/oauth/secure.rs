//! Secret comparison and opaque identifier generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compare two secrets without leaking where (or whether) they differ.
///
/// Both inputs are MACed under a fresh random key and the fixed-size tags are
/// compared with `Mac::verify_slice`, so the work done is independent of the
/// inputs' lengths and contents.
pub fn constant_time_eq(supplied: &str, expected: &str) -> bool {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);

    let Ok(mut expected_mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut supplied_mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    supplied_mac.update(supplied.as_bytes());
    supplied_mac.verify_slice(&expected_tag).is_ok()
}

/// Generate a URL-safe random token carrying `bytes` bytes of entropy.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
