//! The cookie container and the serialize/unserialize pipeline.

use std::borrow::Cow;
use std::ops::Deref;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cipher::ChecksumMode;
use crate::codec::{self, Mapping, Value};
use crate::compress;
use crate::error::{Error, Result};
use crate::quote;
use serde::{Deserialize, Serialize};

/// Reserved mapping key holding the expiry stamp while a cookie is encoded.
/// It only ever exists inside the wire payload; mappings handed back to the
/// application never contain it.
pub const EXPIRES_KEY: &str = "_expires";

/// Pipeline configuration, fixed per cookie type at definition time.
///
/// Producer and consumer must agree on these knobs for a round-trip to
/// succeed, though the decode path tolerates a compression or quoting
/// mismatch by design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookieConfig {
    /// Compress the payload before encryption. Default on.
    pub compress_cookie: bool,
    /// Base64-quote the final byte string for text-only transports.
    /// Default on.
    pub quote_base64: bool,
    /// Whether ciphertexts carry the key-seeded CRC32 trailer.
    pub checksum: ChecksumMode,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig {
            compress_cookie: true,
            quote_base64: true,
            checksum: ChecksumMode::None,
        }
    }
}

impl CookieConfig {
    /// The default configuration: compressed, quoted, no checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default configuration plus the CRC32 integrity trailer.
    pub fn secure() -> Self {
        CookieConfig {
            checksum: ChecksumMode::Crc32KeySeeded,
            ..Self::default()
        }
    }
}

/// A key/value mapping bound to a secret key, encodable as an opaque byte
/// string that survives an untrusted transport.
///
/// Freshly constructed cookies are flagged as modified; cookies rebuilt from
/// wire bytes by [`unserialize`](Cookie::unserialize) are not, letting
/// downstream code tell the two apart. Reads go through [`Deref`] to the
/// underlying mapping; writes go through [`insert`](Cookie::insert) and
/// [`remove`](Cookie::remove) so the modified flag stays accurate.
#[derive(Clone, Debug)]
pub struct Cookie {
    data: Mapping,
    secret_key: Option<Vec<u8>>,
    modified: bool,
}

impl Cookie {
    /// Create a new cookie around `data`, flagged as modified.
    pub fn new(data: Mapping, secret_key: impl Into<Vec<u8>>) -> Self {
        Cookie {
            data,
            secret_key: Some(secret_key.into()),
            modified: true,
        }
    }

    /// Create a new cookie with no secret key set. It can be read and
    /// written, but serializing it fails with [`Error::MissingSecretKey`].
    pub fn keyless(data: Mapping) -> Self {
        Cookie {
            data,
            secret_key: None,
            modified: true,
        }
    }

    /// The secret key this cookie was built with, if any.
    pub fn secret_key(&self) -> Option<&[u8]> {
        self.secret_key.as_deref()
    }

    /// True for cookies built by the application, false for cookies
    /// reconstructed from wire bytes and not written to since.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Read access to the underlying mapping.
    pub fn data(&self) -> &Mapping {
        &self.data
    }

    /// Consume the cookie, yielding its mapping.
    pub fn into_data(self) -> Mapping {
        self.data
    }

    /// Insert a value, flagging the cookie as modified.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.modified = true;
        self.data.insert(key.into(), value)
    }

    /// Remove a value. Flags the cookie as modified only if the key existed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Encode this cookie as a transport-ready byte string.
    ///
    /// Fails only when no secret key is set; that is a configuration
    /// mistake, not an untrusted-input fault.
    pub fn serialize(&self, config: &CookieConfig) -> Result<Vec<u8>> {
        self.serialize_at(config, None)
    }

    /// Like [`serialize`](Cookie::serialize), but stamps the payload with an
    /// expiry time. Consumers discard the whole mapping once it has passed.
    /// The live mapping is never touched, so a later serialize without an
    /// expiry carries none.
    pub fn serialize_expiring(
        &self,
        config: &CookieConfig,
        expires: SystemTime,
    ) -> Result<Vec<u8>> {
        self.serialize_at(config, Some(expires))
    }

    fn serialize_at(&self, config: &CookieConfig, expires: Option<SystemTime>) -> Result<Vec<u8>> {
        let secret_key = self.secret_key.as_deref().ok_or(Error::MissingSecretKey)?;

        let payload = match expires {
            Some(at) => {
                // Stamp a copy; the reserved key must never leak into the
                // live mapping.
                let mut stamped = self.data.clone();
                stamped.insert(EXPIRES_KEY.into(), Value::from(unix_time(at)));
                codec::dumps(&stamped)?
            }
            None => codec::dumps(&self.data)?,
        };

        let payload = if config.compress_cookie {
            compress::compress(&payload)
        } else {
            payload
        };

        let wire = config.checksum.encrypt(&payload, secret_key);

        Ok(if config.quote_base64 {
            quote::encode(&wire)
        } else {
            wire
        })
    }

    /// Decode wire bytes back into a cookie, flagged as not modified.
    ///
    /// This never fails: corrupted bytes, a wrong key, a checksum mismatch,
    /// garbled compression or quoting, and expired stamps all collapse to a
    /// cookie with an empty mapping. Callers cannot distinguish those cases
    /// by error type, only by the empty state, and that is deliberate.
    pub fn unserialize(wire: &[u8], secret_key: impl Into<Vec<u8>>, config: &CookieConfig) -> Cookie {
        let secret_key = secret_key.into();
        let data = decode_wire(wire, &secret_key, config).unwrap_or_default();
        Cookie {
            data,
            secret_key: Some(secret_key),
            modified: false,
        }
    }
}

impl Deref for Cookie {
    type Target = Mapping;
    fn deref(&self) -> &Mapping {
        &self.data
    }
}

impl PartialEq<Mapping> for Cookie {
    fn eq(&self, other: &Mapping) -> bool {
        self.data == *other
    }
}

fn decode_wire(wire: &[u8], secret_key: &[u8], config: &CookieConfig) -> Option<Mapping> {
    let wire = if config.quote_base64 {
        quote::decode(wire)
    } else {
        Cow::Borrowed(wire)
    };
    let payload = config.checksum.decrypt(&wire, secret_key);
    let payload = compress::decompress(&payload);
    let mut data = codec::loads(&payload)?;

    if let Some(stamp) = data.remove(EXPIRES_KEY) {
        // A stamp that isn't an integer timestamp means the payload was
        // tampered with; treat it like any other corruption.
        let expires = stamp.as_i64()?;
        if now_unix() > expires {
            return None;
        }
    }
    Some(data)
}

fn unix_time(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        // Pre-epoch expiry times are simply long expired.
        Err(_) => 0,
    }
}

fn now_unix() -> i64 {
    unix_time(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const KEY: &[u8] = b"my little key";

    fn mapping(value: serde_json::Value) -> Mapping {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test mapping must be an object"),
        }
    }

    fn cases() -> Vec<Mapping> {
        vec![
            mapping(json!({"a": "b"})),
            mapping(json!({"a": "próba"})),
            mapping(json!({"próba": "123"})),
        ]
    }

    fn all_configs() -> Vec<CookieConfig> {
        let mut configs = Vec::new();
        for checksum in [ChecksumMode::None, ChecksumMode::Crc32KeySeeded] {
            for compress_cookie in [false, true] {
                for quote_base64 in [false, true] {
                    configs.push(CookieConfig {
                        compress_cookie,
                        quote_base64,
                        checksum,
                    });
                }
            }
        }
        configs
    }

    #[test]
    fn round_trip_all_configs() {
        for config in all_configs() {
            for case in cases() {
                let wire = Cookie::new(case.clone(), KEY).serialize(&config).unwrap();
                let cookie = Cookie::unserialize(&wire, KEY, &config);
                assert_eq!(cookie, case, "config: {:?}", config);
                assert!(!cookie.is_modified());
                assert_eq!(cookie.secret_key(), Some(KEY));
            }
        }
    }

    #[test]
    fn quoted_output_is_ascii() {
        for config in [CookieConfig::new(), CookieConfig::secure()] {
            for case in cases() {
                let wire = Cookie::new(case, KEY).serialize(&config).unwrap();
                assert!(wire.iter().all(u8::is_ascii));
            }
        }
    }

    #[test]
    fn literal_scenario() {
        let config = CookieConfig::secure();
        let wire = Cookie::new(mapping(json!({"a": "b"})), b"k".to_vec())
            .serialize(&config)
            .unwrap();
        let cookie = Cookie::unserialize(&wire, b"k".to_vec(), &config);
        assert_eq!(cookie, mapping(json!({"a": "b"})));
        let cookie = Cookie::unserialize(&wire, b"wrong".to_vec(), &config);
        assert!(cookie.is_empty());
    }

    #[test]
    fn missing_key_is_loud() {
        let cookie = Cookie::keyless(mapping(json!({"a": "b"})));
        assert!(matches!(
            cookie.serialize(&CookieConfig::new()),
            Err(Error::MissingSecretKey)
        ));
    }

    #[test]
    fn wrong_key_collapses_to_empty() {
        // Even without the checksum trailer, a wrong key decrypts to bytes
        // the codec rejects.
        for config in all_configs() {
            let cookie = Cookie::new(mapping(json!({"a": "próba"})), b"one key".to_vec());
            let wire = cookie.serialize(&config).unwrap();
            let cookie = Cookie::unserialize(&wire, b"another key".to_vec(), &config);
            assert!(cookie.is_empty(), "config: {:?}", config);
            assert!(!cookie.is_modified());
        }
    }

    #[test]
    fn expiry_in_the_past_discards_everything() {
        let config = CookieConfig::new();
        let cookie = Cookie::new(mapping(json!({"a": "próba", "b": 2})), KEY);
        let wire = cookie
            .serialize_expiring(&config, SystemTime::now() - Duration::from_secs(5))
            .unwrap();
        let decoded = Cookie::unserialize(&wire, KEY, &config);
        // The whole mapping goes, not just the stamp.
        assert!(decoded.is_empty());
    }

    #[test]
    fn expiry_in_the_future_is_stripped() {
        let config = CookieConfig::new();
        let cookie = Cookie::new(mapping(json!({"a": "próba"})), KEY);
        let wire = cookie
            .serialize_expiring(&config, SystemTime::now() + Duration::from_secs(3600))
            .unwrap();
        let decoded = Cookie::unserialize(&wire, KEY, &config);
        assert_eq!(decoded, mapping(json!({"a": "próba"})));
        assert!(decoded.get(EXPIRES_KEY).is_none());
    }

    #[test]
    fn expiry_does_not_stick() {
        let config = CookieConfig::new();
        let cookie = Cookie::new(mapping(json!({"a": "próba"})), KEY);
        let wire = cookie
            .serialize_expiring(&config, SystemTime::now() - Duration::from_secs(5))
            .unwrap();
        assert!(Cookie::unserialize(&wire, KEY, &config).is_empty());

        // A later serialize without an expiry must not carry the old stamp.
        let wire = cookie.serialize(&config).unwrap();
        let decoded = Cookie::unserialize(&wire, KEY, &config);
        assert_eq!(decoded, mapping(json!({"a": "próba"})));
    }

    #[test]
    fn corruption_collapses_to_empty() {
        let config = CookieConfig {
            quote_base64: false,
            ..CookieConfig::secure()
        };
        let cookie = Cookie::new(mapping(json!({"a": "próba"})), KEY);
        let wire = cookie.serialize(&config).unwrap();

        // Drop one byte.
        let mut truncated = wire.clone();
        truncated.remove(20);
        assert!(Cookie::unserialize(&truncated, KEY, &config).is_empty());

        // Flip one byte.
        for i in 0..wire.len() {
            let mut mutated = wire.clone();
            mutated[i] ^= 0x01;
            assert!(
                Cookie::unserialize(&mutated, KEY, &config).is_empty(),
                "byte {} of {}",
                i,
                wire.len()
            );
        }
    }

    #[test]
    fn non_json_payload_collapses_to_empty() {
        let config = CookieConfig {
            quote_base64: false,
            compress_cookie: false,
            checksum: ChecksumMode::None,
        };
        let wire = crate::cipher::encrypt("{\"a\", \"próba\"}".as_bytes(), KEY);
        assert!(Cookie::unserialize(&wire, KEY, &config).is_empty());
    }

    #[test]
    fn compression_interop() {
        let case = mapping(json!({"a": "próba"}));
        let plain = CookieConfig {
            compress_cookie: false,
            ..CookieConfig::new()
        };
        let compressed = CookieConfig::new();
        for produce in [&plain, &compressed] {
            for consume in [&plain, &compressed] {
                let wire = Cookie::new(case.clone(), KEY).serialize(produce).unwrap();
                let decoded = Cookie::unserialize(&wire, KEY, consume);
                assert_eq!(decoded, case, "produce {:?} consume {:?}", produce, consume);
            }
        }
    }

    #[test]
    fn unquoted_wire_accepted_by_quoting_consumer() {
        let case = mapping(json!({"a": "b"}));
        let raw = CookieConfig {
            quote_base64: false,
            ..CookieConfig::new()
        };
        let wire = Cookie::new(case.clone(), KEY).serialize(&raw).unwrap();
        let decoded = Cookie::unserialize(&wire, KEY, &CookieConfig::new());
        assert_eq!(decoded, case);
    }

    #[test]
    fn modified_flag_tracks_writes() {
        let config = CookieConfig::new();
        let wire = Cookie::new(mapping(json!({"a": "b"})), KEY)
            .serialize(&config)
            .unwrap();
        let mut cookie = Cookie::unserialize(&wire, KEY, &config);
        assert!(!cookie.is_modified());
        assert!(cookie.remove("missing").is_none());
        assert!(!cookie.is_modified());
        cookie.insert("c", json!("d"));
        assert!(cookie.is_modified());
        assert_eq!(cookie.get("c"), Some(&json!("d")));
    }

    #[test]
    fn arbitrary_garbage_never_panics() {
        let config = CookieConfig::secure();
        for wire in [
            &b""[..],
            &b"shrt"[..],
            &[0u8; 15][..],
            &[0u8; 16][..],
            &[0xFFu8; 64][..],
            "~!~zstd~!~not a frame".as_bytes(),
            &b"AAAA"[..],
        ] {
            assert!(Cookie::unserialize(wire, KEY, &config).is_empty());
        }
    }
}
