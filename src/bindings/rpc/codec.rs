//! Frame encoding and decoding.
//!
//! Wire format: a 4-byte big-endian payload length followed by a JSON
//! payload. Framing is delegated to `LengthDelimitedCodec`.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Maximum frame payload (4 MB).
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialisation error: {0}")]
    Serialisation(#[source] serde_json::Error),

    #[error("deserialisation error: {0}")]
    Deserialisation(#[source] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Wrap a stream in the RPC frame codec.
pub fn framed<S>(stream: S) -> Framed<S, LengthDelimitedCodec>
where
    S: AsyncRead + AsyncWrite,
{
    let codec = LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec();
    Framed::new(stream, codec)
}

/// Serialise a message into a frame payload.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, CodecError> {
    let payload = serde_json::to_vec(message).map_err(CodecError::Serialisation)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(Bytes::from(payload))
}

/// Deserialise a frame payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(payload).map_err(CodecError::Deserialisation)
}
