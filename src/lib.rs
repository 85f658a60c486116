//! encrypted-cookie stores structured key/value state inside an opaque byte
//! string that can round-trip through an untrusted transport, such as an HTTP
//! cookie header. The encode pipeline canonicalizes a mapping to JSON bytes,
//! optionally compresses it, encrypts it under a per-message nonce, optionally
//! appends a key-seeded integrity checksum, and optionally base64-quotes the
//! result. The decode pipeline reverses every stage and fails *softly*:
//! corrupted bytes, a wrong key, garbled compression or quoting, a checksum
//! mismatch, and an expired stamp all collapse to an empty cookie rather than
//! an error. Callers cannot tell those cases apart, which is the point; the
//! only loud failure is serializing without a secret key set.
//!
//! What the format provides:
//!
//! - A canonical UTF-8 JSON byte form for mappings, with non-ASCII characters
//!   left unescaped.
//! - Optional zstd compression behind a fixed marker tag, so compressed and
//!   uncompressed traffic can share a key.
//! - A ChaCha20 stream cipher keyed per message by `SHA-256(key ‖ nonce)`,
//!   with a fresh 16-byte nonce each call.
//! - An optional key-seeded CRC32 trailer for weak tamper and wrong-key
//!   detection. This is not cryptographic authentication; the format targets
//!   a narrow legacy wire layout, not AEAD-grade security.
//! - Optional expiry stamping under the reserved `_expires` key, which never
//!   appears in mappings handed back to the application.
//! - Optional base64 quoting for text-only channels.
//!
//! ```
//! # use encrypted_cookie::{Cookie, CookieConfig};
//! let config = CookieConfig::secure();
//! let mut data = serde_json::Map::new();
//! data.insert("user".into(), "alice".into());
//!
//! let wire = Cookie::new(data.clone(), b"secret".to_vec()).serialize(&config)?;
//!
//! let cookie = Cookie::unserialize(&wire, b"secret".to_vec(), &config);
//! assert_eq!(*cookie.data(), data);
//!
//! let cookie = Cookie::unserialize(&wire, b"wrong".to_vec(), &config);
//! assert!(cookie.is_empty());
//! # Ok::<(), encrypted_cookie::Error>(())
//! ```

pub mod cipher;
pub mod codec;
pub mod compress;
pub mod quote;

mod cookie;
mod error;

pub use self::cipher::{ChecksumMode, CRC_LEN, NONCE_LEN};
pub use self::codec::{Mapping, Value};
pub use self::cookie::{Cookie, CookieConfig, EXPIRES_KEY};
pub use self::error::{Error, Result};
