use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the serialization pipeline.
///
/// Only programmer errors appear here. Faults caused by untrusted input
/// (corrupted bytes, a wrong key, an expired stamp, garbled compression or
/// quoting) are absorbed by [`Cookie::unserialize`](crate::Cookie::unserialize)
/// and collapse to an empty cookie instead of an error.
#[derive(Debug)]
pub enum Error {
    /// Occurs when serializing a cookie that has no secret key set. This is a
    /// configuration mistake, not an untrusted-input fault, so it is never
    /// swallowed.
    MissingSecretKey,
    /// Occurs when the canonical codec fails to encode the mapping.
    Encode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MissingSecretKey => f.write_str("no secret key defined"),
            Error::Encode(ref err) => write!(f, "failed to encode mapping: {}", err),
        }
    }
}

impl std::error::Error for Error {}
