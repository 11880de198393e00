//! HTTP/JSON binding.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | /api/users | list |
//! | GET | /api/users/{id} | get |
//! | POST | /api/users | create |
//! | PUT | /api/users/{id} | update |
//! | DELETE | /api/users/{id} | delete |
//! | GET | /api/users/search?q= | search |
//!
//! Every response, including errors and unknown routes, is an
//! [`Envelope`](envelope::Envelope).

pub mod envelope;
pub mod error;
pub mod users;

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::net::bind_listener;
use crate::registry::Registry;

/// Build the router over a shared registry
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/search", get(users::search_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .fallback(users::route_not_found)
        .method_not_allowed_fallback(users::method_not_allowed)
        .with_state(registry)
}

/// HTTP server instance
pub struct HttpServer {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl HttpServer {
    pub fn bind(addr: &str, registry: Arc<Registry>) -> std::io::Result<Self> {
        Ok(Self {
            listener: bind_listener(addr)?,
            registry,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        info!(address = %self.local_addr()?, "HTTP binding listening");

        axum::serve(self.listener, router(self.registry))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("HTTP binding stopped");
        Ok(())
    }
}
