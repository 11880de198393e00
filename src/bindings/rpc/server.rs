//! RPC server: connection tasks feed one shared worker pool.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::codec::{self, CodecError};
use super::interceptor::ErrorToStatus;
use super::messages::{RpcReply, RpcRequest, Status};
use super::pool::WorkerPool;
use super::service::UserService;
use crate::net::bind_listener;
use crate::registry::Registry;

type Handler = Arc<ErrorToStatus<UserService>>;

/// RPC server instance
pub struct RpcServer {
    listener: TcpListener,
    pool: Arc<WorkerPool>,
    handler: Handler,
}

impl RpcServer {
    pub fn bind(addr: &str, registry: Arc<Registry>, workers: usize) -> std::io::Result<Self> {
        let listener = bind_listener(addr)?;
        let pool = Arc::new(WorkerPool::new(workers)?);
        let handler = Arc::new(ErrorToStatus::new(UserService::new(registry)));

        Ok(Self {
            listener,
            pool,
            handler,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        info!(
            address = %self.local_addr()?,
            workers = self.pool.size(),
            "RPC binding listening"
        );

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.cancelled() => break,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New RPC connection");
                    let pool = Arc::clone(&self.pool);
                    let handler = Arc::clone(&self.handler);
                    let shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = serve_connection(stream, pool, handler) => {
                                if let Err(e) = result {
                                    debug!(peer = %peer, error = %e, "RPC connection error");
                                }
                            }
                            _ = shutdown.cancelled() => {}
                        }
                        debug!(peer = %peer, "Closed RPC connection");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept RPC connection");
                }
            }
        }

        info!("RPC binding stopped");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Answer calls on one connection, in order, until the peer hangs up.
async fn serve_connection(
    stream: TcpStream,
    pool: Arc<WorkerPool>,
    handler: Handler,
) -> Result<(), ConnectionError> {
    let mut framed = codec::framed(stream);

    while let Some(frame) = framed.next().await {
        let frame = frame?;

        let reply = match codec::decode::<RpcRequest>(&frame) {
            Ok(request) => dispatch(&pool, &handler, request).await,
            Err(e) => {
                warn!(error = %e, "Malformed RPC request");
                RpcReply::error(Status::internal(format!("Failed to parse request: {e}")))
            }
        };

        framed.send(codec::encode(&reply)?).await?;
    }

    Ok(())
}

/// Run one call on the pool and wait for its reply.
async fn dispatch(pool: &WorkerPool, handler: &Handler, request: RpcRequest) -> RpcReply {
    let (tx, rx) = oneshot::channel();
    let handler = Arc::clone(handler);

    let job = Box::new(move || {
        // Receiver gone means the connection closed mid-call
        let _ = tx.send(handler.call(request));
    });

    if let Err(e) = pool.execute(job) {
        return RpcReply::error(Status::internal(e.to_string()));
    }

    rx.await
        .unwrap_or_else(|_| RpcReply::error(Status::internal("RPC worker dropped the call")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::rpc::client::{RpcClient, RpcError};
    use crate::bindings::rpc::messages::Code;
    use bytes::Bytes;

    async fn start(registry: Arc<Registry>, workers: usize) -> (SocketAddr, CancellationToken) {
        let server = RpcServer::bind("127.0.0.1:0", registry, workers).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(server.run(shutdown.clone()));
        (addr, shutdown)
    }

    fn status_code<T: std::fmt::Debug>(result: Result<T, RpcError>) -> Code {
        match result {
            Err(RpcError::Status(status)) => status.code,
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_crud_over_rpc() {
        let registry = Registry::new();
        let (addr, shutdown) = start(Arc::clone(&registry), 4).await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        let created = client.create_user("Lucy", "lucy@example.com").await.unwrap();
        let user = created.user.unwrap();
        assert!(created.success);
        assert_eq!(user.email, "lucy@example.com");

        let fetched = client.get_user(&user.id).await.unwrap().user.unwrap();
        assert_eq!(fetched, user);

        let updated = client
            .update_user(&user.id, Some("Lucille"), None)
            .await
            .unwrap()
            .user
            .unwrap();
        assert_eq!(updated.name, "Lucille");
        assert_eq!(updated.email, "lucy@example.com");

        let list = client.list_users().await.unwrap();
        assert_eq!(list.count, 1);

        let deleted = client.delete_user(&user.id).await.unwrap();
        assert!(deleted.success);
        assert!(registry.is_empty());

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_domain_errors_become_status_codes() {
        let registry = Registry::new();
        let (addr, shutdown) = start(registry, 2).await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        assert_eq!(status_code(client.get_user("missing").await), Code::NotFound);
        assert_eq!(status_code(client.delete_user("missing").await), Code::NotFound);
        assert_eq!(
            status_code(client.create_user("", "a@b.c").await),
            Code::InvalidArgument
        );
        assert_eq!(
            status_code(client.create_user("Ann", "no-at").await),
            Code::InvalidArgument
        );

        client.create_user("Ann", "ann@example.com").await.unwrap();
        assert_eq!(
            status_code(client.create_user("Ann 2", "ANN@example.com").await),
            Code::InvalidArgument
        );

        // The connection survives failed calls
        assert_eq!(client.list_users().await.unwrap().count, 1);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_missing_fields_are_invalid_argument() {
        let registry = Registry::new();
        let (addr, shutdown) = start(Arc::clone(&registry), 2).await;
        let mut framed = codec::framed(TcpStream::connect(addr).await.unwrap());

        framed
            .send(Bytes::from_static(
                br#"{"method":"CreateUser","params":{"name":"Ann"}}"#,
            ))
            .await
            .unwrap();
        let frame = framed.next().await.unwrap().unwrap();
        let reply: RpcReply = codec::decode(&frame).unwrap();
        assert_eq!(reply.status.code, Code::InvalidArgument);
        assert_eq!(reply.status.message, "Email cannot be empty");
        assert!(reply.body.is_none());

        framed
            .send(Bytes::from_static(br#"{"method":"GetUser","params":{}}"#))
            .await
            .unwrap();
        let frame = framed.next().await.unwrap().unwrap();
        let reply: RpcReply = codec::decode(&frame).unwrap();
        assert_eq!(reply.status.code, Code::NotFound);

        assert!(registry.is_empty());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_more_clients_than_workers() {
        let registry = Registry::new();
        let (addr, shutdown) = start(Arc::clone(&registry), 2).await;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                tokio::spawn(async move {
                    let mut client = RpcClient::connect(addr).await.unwrap();
                    client
                        .create_user(&format!("user-{i}"), &format!("user{i}@example.com"))
                        .await
                        .unwrap();
                    client.list_users().await.unwrap().count
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap() >= 1);
        }
        assert_eq!(registry.len(), 8);

        shutdown.cancel();
    }
}
