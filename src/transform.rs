//! Stateless text transform served by the socket binding.

use bytes::Bytes;

/// Uppercase a payload.
///
/// Valid UTF-8 gets full Unicode case mapping. Anything else (including a
/// multi-byte character cut in half by a short read) falls back to ASCII
/// uppercasing so no bytes are lost.
pub fn uppercase(payload: &[u8]) -> Bytes {
    match std::str::from_utf8(payload) {
        Ok(text) => Bytes::from(text.to_uppercase()),
        Err(_) => Bytes::from(payload.to_ascii_uppercase()),
    }
}
