//! RPC client over a single persistent connection.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::codec::{self, CodecError};
use super::messages::{
    CreateUserRequest, DeleteResponse, RpcReply, RpcRequest, RpcResponse, Status,
    UpdateUserRequest, UserList, UserRequest, UserResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC error {0}")]
    Status(Status),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),
}

pub struct RpcClient {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl RpcClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: codec::framed(stream),
        })
    }

    /// Send one request and wait for its reply.
    pub async fn call(&mut self, request: RpcRequest) -> Result<RpcResponse, RpcError> {
        self.framed.send(codec::encode(&request)?).await?;

        let frame = self
            .framed
            .next()
            .await
            .ok_or(RpcError::ConnectionClosed)??;
        let reply: RpcReply = codec::decode(&frame)?;

        if !reply.status.is_ok() {
            return Err(RpcError::Status(reply.status));
        }
        reply
            .body
            .ok_or(RpcError::UnexpectedResponse(request.method()))
    }

    pub async fn create_user(&mut self, name: &str, email: &str) -> Result<UserResponse, RpcError> {
        let request = RpcRequest::CreateUser(CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
        });
        match self.call(request).await? {
            RpcResponse::User(response) => Ok(response),
            _ => Err(RpcError::UnexpectedResponse("CreateUser")),
        }
    }

    pub async fn get_user(&mut self, id: &str) -> Result<UserResponse, RpcError> {
        let request = RpcRequest::GetUser(UserRequest { id: id.to_string() });
        match self.call(request).await? {
            RpcResponse::User(response) => Ok(response),
            _ => Err(RpcError::UnexpectedResponse("GetUser")),
        }
    }

    pub async fn list_users(&mut self) -> Result<UserList, RpcError> {
        match self.call(RpcRequest::ListUsers).await? {
            RpcResponse::UserList(list) => Ok(list),
            _ => Err(RpcError::UnexpectedResponse("ListUsers")),
        }
    }

    /// `None` leaves a field unchanged.
    pub async fn update_user(
        &mut self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserResponse, RpcError> {
        let request = RpcRequest::UpdateUser(UpdateUserRequest {
            id: id.to_string(),
            name: name.unwrap_or_default().to_string(),
            email: email.unwrap_or_default().to_string(),
        });
        match self.call(request).await? {
            RpcResponse::User(response) => Ok(response),
            _ => Err(RpcError::UnexpectedResponse("UpdateUser")),
        }
    }

    pub async fn delete_user(&mut self, id: &str) -> Result<DeleteResponse, RpcError> {
        let request = RpcRequest::DeleteUser(UserRequest { id: id.to_string() });
        match self.call(request).await? {
            RpcResponse::Delete(response) => Ok(response),
            _ => Err(RpcError::UnexpectedResponse("DeleteUser")),
        }
    }
}
