//! Composition of the three bindings around one registry.
//!
//! The socket binding is independent of the registry; the HTTP and RPC
//! bindings share a single `Arc<Registry>`.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bindings::http::HttpServer;
use crate::bindings::rpc::RpcServer;
use crate::bindings::socket::SocketServer;
use crate::config::Config;
use crate::registry::Registry;

/// Bound addresses, useful when listening on port 0
#[derive(Debug, Clone, Copy)]
pub struct Addresses {
    pub socket: SocketAddr,
    pub http: SocketAddr,
    pub rpc: SocketAddr,
}

/// Server instance
pub struct Server {
    registry: Arc<Registry>,
    socket: SocketServer,
    http: HttpServer,
    rpc: RpcServer,
}

impl Server {
    /// Bind every listener. Must be called inside a Tokio runtime.
    pub fn bind(config: &Config) -> std::io::Result<Self> {
        let registry = Registry::new();
        if config.seed_sample_users {
            registry.seed_sample_users();
            info!(users = registry.len(), "Seeded sample users");
        }

        Ok(Self {
            socket: SocketServer::bind(
                &config.socket_listen,
                config.buffer_size,
                config.max_connections,
            )?,
            http: HttpServer::bind(&config.http_listen, Arc::clone(&registry))?,
            rpc: RpcServer::bind(&config.rpc_listen, Arc::clone(&registry), config.rpc_workers)?,
            registry,
        })
    }

    pub fn addresses(&self) -> std::io::Result<Addresses> {
        Ok(Addresses {
            socket: self.socket.local_addr()?,
            http: self.http.local_addr()?,
            rpc: self.rpc.local_addr()?,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run all bindings until `shutdown` fires or one of them fails.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let result = tokio::try_join!(
            self.socket.run(shutdown.clone()),
            self.http.run(shutdown.clone()),
            self.rpc.run(shutdown.clone()),
        );

        // One binding failing takes the others down with it
        shutdown.cancel();
        result.map(|_| ())
    }
}
