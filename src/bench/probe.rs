//! Probes: one round trip against one binding.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::bindings::rpc::{RpcClient, RpcError};

/// Payload the socket probe sends on every round trip.
pub const SOCKET_PAYLOAD: &[u8] = b"performance test";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("connection closed before reply")]
    EmptyReply,
}

/// A single timed operation against a binding.
#[async_trait]
pub trait Probe: Send {
    /// Display name used in reports.
    fn name(&self) -> &str;

    /// Perform one round trip. Timing is done by the caller.
    async fn call(&mut self) -> Result<(), ProbeError>;
}

/// Opens a fresh connection per round trip, sends the payload and reads
/// the reply once.
pub struct SocketProbe {
    addr: String,
    buffer_size: usize,
}

impl SocketProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            buffer_size: 1024,
        }
    }
}

#[async_trait]
impl Probe for SocketProbe {
    fn name(&self) -> &str {
        "Socket"
    }

    async fn call(&mut self) -> Result<(), ProbeError> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(SOCKET_PAYLOAD).await?;

        let mut buf = vec![0u8; self.buffer_size];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(ProbeError::EmptyReply);
        }
        Ok(())
    }
}

/// Lists users over HTTP and decodes the JSON body.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// `base` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/users", base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn call(&mut self) -> Result<(), ProbeError> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;
        Ok(())
    }
}

/// Lists users over RPC, reusing one connection across calls.
pub struct RpcProbe {
    addr: String,
    client: Option<RpcClient>,
}

impl RpcProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            client: None,
        }
    }
}

#[async_trait]
impl Probe for RpcProbe {
    fn name(&self) -> &str {
        "RPC"
    }

    async fn call(&mut self) -> Result<(), ProbeError> {
        let mut client = match self.client.take() {
            Some(client) => client,
            None => RpcClient::connect(self.addr.as_str()).await?,
        };

        match client.list_users().await {
            Ok(_) => {
                self.client = Some(client);
                Ok(())
            }
            Err(e @ RpcError::Status(_)) => {
                self.client = Some(client);
                Err(e.into())
            }
            // Connection is dropped; the next call reconnects.
            Err(e) => Err(e.into()),
        }
    }
}
