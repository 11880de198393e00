//! Connection-oriented text binding.
//!
//! Each accepted connection gets its own task that loops:
//!
//! ```text
//! AWAIT_REQUEST -> READ_PAYLOAD -> PROCESS -> WRITE_REPLY -> AWAIT_REQUEST
//!                       |
//!                  0 bytes / error -> CLOSED
//! ```
//!
//! ## Framing
//!
//! There is no length prefix or delimiter. One `read` of up to
//! `buffer_size` bytes is taken as the whole request and the reply is the
//! transformed bytes, unframed. This holds for short text payloads only: a
//! request larger than the buffer, or one the network splits across
//! segments, is answered piecewise. That is a known limitation of the wire
//! format rather than something the server tries to repair.

pub mod handler;

pub use handler::handle_connection;

use crate::net::bind_listener;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Raw socket server instance
pub struct SocketServer {
    listener: TcpListener,
    buffer_size: usize,
    connection_limit: Option<Arc<Semaphore>>,
}

impl SocketServer {
    /// Bind the listener. `max_connections = None` admits every connection.
    pub fn bind(
        addr: &str,
        buffer_size: usize,
        max_connections: Option<usize>,
    ) -> std::io::Result<Self> {
        let listener = bind_listener(addr)?;
        Ok(Self {
            listener,
            buffer_size,
            connection_limit: max_connections.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Connection tasks are detached; the accept loop never waits on them.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        info!(address = %self.local_addr()?, "Socket binding listening");

        loop {
            // Wait for a connection slot when admission is capped
            let permit = match &self.connection_limit {
                Some(limit) => tokio::select! {
                    permit = Arc::clone(limit).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    _ = shutdown.cancelled() => break,
                },
                None => None,
            };

            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.cancelled() => break,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");
                    let buffer_size = self.buffer_size;

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, buffer_size).await {
                            debug!(peer = %peer, error = %e, "Connection error");
                        }
                        debug!(peer = %peer, "Closed connection");
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }

        info!("Socket binding stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start(max_connections: Option<usize>) -> (SocketAddr, CancellationToken) {
        let server = SocketServer::bind("127.0.0.1:0", 1024, max_connections).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(server.run(shutdown.clone()));
        (addr, shutdown)
    }

    async fn round_trip(stream: &mut TcpStream, message: &[u8]) -> Vec<u8> {
        stream.write_all(message).await.unwrap();
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_uppercase_round_trips() {
        let (addr, shutdown) = start(None).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        assert_eq!(round_trip(&mut stream, b"hello world").await, b"HELLO WORLD");
        assert_eq!(round_trip(&mut stream, b"12345").await, b"12345");
        assert_eq!(round_trip(&mut stream, b"HELLO WORLD").await, b"HELLO WORLD");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let (addr, shutdown) = start(None).await;

        // An idle connection must not stall acceptance of others
        let _idle = TcpStream::connect(addr).await.unwrap();

        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(round_trip(&mut second, b"second").await, b"SECOND");
        assert_eq!(round_trip(&mut first, b"first").await, b"FIRST");

        // A peer hanging up does not disturb the rest
        drop(first);
        assert_eq!(round_trip(&mut second, b"still here").await, b"STILL HERE");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_connection_limit_queues_extra_clients() {
        let (addr, shutdown) = start(Some(1)).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        assert_eq!(round_trip(&mut first, b"one").await, b"ONE");

        // Connects at the TCP level but is not served until a slot frees
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"two").await.unwrap();
        drop(first);

        let mut buf = vec![0u8; 16];
        let n = second.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"TWO");

        shutdown.cancel();
    }
}
