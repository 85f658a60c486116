//! Canonical byte encoding for cookie mappings.
//!
//! The wire form is JSON, encoded as UTF-8 with non-ASCII characters left as
//! literal bytes rather than `\u` escapes. serde_json already behaves this
//! way, which keeps ciphertext lengths and golden-format comparisons stable
//! across locales.

use crate::error::{Error, Result};

pub use serde_json::{Map, Value};

/// The mapping type a cookie carries: string keys to JSON-compatible values.
pub type Mapping = Map<String, Value>;

/// Encode a mapping to its canonical byte form.
pub fn dumps(data: &Mapping) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|e| Error::Encode(e.to_string()))
}

/// Decode canonical bytes back into a mapping.
///
/// Fails cleanly on anything that isn't a valid UTF-8 JSON object. Callers
/// treat a failed decode as "no data", so no partially-built mapping ever
/// escapes.
pub fn loads(raw: &[u8]) -> Option<Mapping> {
    serde_json::from_slice(raw).ok()
}
