//! Response formatting.

mod json;

pub use json::{to_text, unwrap_envelope};
