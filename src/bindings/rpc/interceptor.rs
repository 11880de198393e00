//! Translation of handler outcomes into RPC statuses.
//!
//! Handlers return domain results and never build a [`Status`] themselves.
//! [`ErrorToStatus`] maps:
//!
//! - `NotFound` to `NOT_FOUND`
//! - `InvalidInput` and `DuplicateEmail` to `INVALID_ARGUMENT`
//! - a panicking handler to `INTERNAL`

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

use super::messages::{RpcReply, RpcRequest, RpcResponse, Status};
use crate::registry::RegistryError;

/// A synchronous RPC handler.
pub trait RpcService: Send + Sync + 'static {
    fn handle(&self, request: RpcRequest) -> Result<RpcResponse, RegistryError>;
}

impl From<RegistryError> for Status {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Status::not_found(err.to_string()),
            RegistryError::InvalidInput(_) | RegistryError::DuplicateEmail(_) => {
                Status::invalid_argument(err.to_string())
            }
        }
    }
}

/// Wraps a service so every call yields an [`RpcReply`].
pub struct ErrorToStatus<S> {
    inner: S,
}

impl<S: RpcService> ErrorToStatus<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn call(&self, request: RpcRequest) -> RpcReply {
        let method = request.method();

        match catch_unwind(AssertUnwindSafe(|| self.inner.handle(request))) {
            Ok(Ok(body)) => RpcReply::ok(body),
            Ok(Err(err)) => {
                let status = Status::from(err);
                debug!(method, status = %status, "RPC call failed");
                RpcReply::error(status)
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!(method, error = %detail, "RPC handler panicked");
                RpcReply::error(Status::internal(format!("Exception calling {method}: {detail}")))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
