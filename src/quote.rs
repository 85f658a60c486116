//! Transport quoting: reversible text-safe encoding of the wire payload.
//!
//! Base64 with the standard alphabet keeps the serialized cookie a single
//! ASCII token fit for a header value. Decoding is tolerant: whitespace is
//! stripped first, and input that still fails to parse is handed back as raw
//! bytes on the assumption it was produced by a configuration with quoting
//! disabled.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as a single-token base64 string.
pub fn encode(raw: &[u8]) -> Vec<u8> {
    STANDARD.encode(raw).into_bytes()
}

/// Reverse [`encode`], falling back to the input itself when it isn't valid
/// base64.
pub fn decode(quoted: &[u8]) -> Cow<'_, [u8]> {
    let stripped: Vec<u8> = quoted
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    match STANDARD.decode(&stripped) {
        Ok(raw) => Cow::Owned(raw),
        Err(_) => Cow::Borrowed(quoted),
    }
}
