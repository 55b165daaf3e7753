//! JSON handling for Bybit responses.

use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Unwrap a Bybit v5 envelope (`retCode`, `retMsg`, `result`).
///
/// A non-zero `retCode` becomes [`ClientError::Exchange`]. Responses without
/// a `result` field are returned whole.
///
/// # Errors
///
/// Returns error when the envelope reports failure.
pub fn unwrap_envelope(mut envelope: Value) -> ClientResult<Value> {
    let code = envelope.get("retCode").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = envelope
            .get("retMsg")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return Err(ClientError::exchange(code, message));
    }

    match envelope.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Ok(envelope),
    }
}

/// Render a result as tool output text.
#[must_use]
pub fn to_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
