//! RPC binding.
//!
//! Five typed calls (`CreateUser`, `GetUser`, `ListUsers`, `UpdateUser`,
//! `DeleteUser`) travel as length-prefixed JSON frames. Connection tasks
//! decode requests and hand them to a fixed [`WorkerPool`](pool::WorkerPool);
//! the synchronous [`UserService`](service::UserService) runs behind
//! [`ErrorToStatus`](interceptor::ErrorToStatus), which turns domain errors
//! into status codes.

pub mod client;
pub mod codec;
pub mod interceptor;
pub mod messages;
pub mod pool;
pub mod server;
pub mod service;

pub use client::{RpcClient, RpcError};
pub use messages::{Code, Status};
pub use server::RpcServer;
