//! Typed RPC requests, responses and status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::User;

/// RPC status code. Numbering follows gRPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Code {
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    Internal = 13,
}

impl From<Code> for u8 {
    fn from(code: Code) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Code {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ok),
            3 => Ok(Self::InvalidArgument),
            5 => Ok(Self::NotFound),
            13 => Ok(Self::Internal),
            other => Err(format!("unknown status code {other}")),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Call outcome carried on every reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

/// Wire copy of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserMessage {
    fn from(user: User) -> Self {
        let created_at = user.created_at_string();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at,
        }
    }
}

/// Absent fields decode as empty strings and fail registry validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub id: String,
}

/// Empty `name`/`email` mean "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: Option<UserMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub success: bool,
    pub users: Vec<UserMessage>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// One inbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcRequest {
    CreateUser(CreateUserRequest),
    GetUser(UserRequest),
    ListUsers,
    UpdateUser(UpdateUserRequest),
    DeleteUser(UserRequest),
}

impl RpcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateUser(_) => "CreateUser",
            Self::GetUser(_) => "GetUser",
            Self::ListUsers => "ListUsers",
            Self::UpdateUser(_) => "UpdateUser",
            Self::DeleteUser(_) => "DeleteUser",
        }
    }
}

/// Successful call payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum RpcResponse {
    User(UserResponse),
    UserList(UserList),
    Delete(DeleteResponse),
}

/// One outbound reply: a status, plus a body when the status is OK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcReply {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RpcResponse>,
}

impl RpcReply {
    pub fn ok(body: RpcResponse) -> Self {
        Self {
            status: Status::ok(),
            body: Some(body),
        }
    }

    pub fn error(status: Status) -> Self {
        Self { status, body: None }
    }
}
