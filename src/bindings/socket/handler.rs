//! Per-connection worker for the socket binding.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::transform;

/// Serve one connection until the peer closes it.
///
/// Each `read` is one request (see the module docs on framing). A zero-byte
/// read ends the loop cleanly; I/O errors are returned to the caller, which
/// drops the stream.
pub async fn handle_connection<S>(
    mut stream: S,
    buffer_size: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::zeroed(buffer_size);

    loop {
        let n = stream.read(&mut buffer[..]).await?;
        if n == 0 {
            trace!("Connection closed by client");
            return Ok(());
        }

        let request = &buffer[..n];
        trace!(bytes = n, request = %String::from_utf8_lossy(request), "Received message");

        let reply = transform::uppercase(request);
        stream.write_all(&reply).await?;
    }
}
