//! Registry-backed RPC handlers.

use std::sync::Arc;
use tracing::debug;

use super::interceptor::RpcService;
use super::messages::{
    CreateUserRequest, DeleteResponse, RpcRequest, RpcResponse, UpdateUserRequest, UserList,
    UserMessage, UserRequest, UserResponse,
};
use crate::registry::{Registry, RegistryError, UserPatch};

pub struct UserService {
    registry: Arc<Registry>,
}

impl UserService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, RegistryError> {
        debug!(name = %request.name, email = %request.email, "CreateUser");
        let user = self.registry.create(&request.name, &request.email)?;
        Ok(UserResponse {
            success: true,
            message: "User created successfully".to_string(),
            user: Some(user.into()),
        })
    }

    fn get_user(&self, request: UserRequest) -> Result<UserResponse, RegistryError> {
        debug!(id = %request.id, "GetUser");
        let user = self.registry.get(&request.id)?;
        Ok(UserResponse {
            success: true,
            message: "User fetched successfully".to_string(),
            user: Some(user.into()),
        })
    }

    fn list_users(&self) -> UserList {
        let users: Vec<UserMessage> = self.registry.list().into_iter().map(Into::into).collect();
        UserList {
            success: true,
            count: users.len(),
            users,
        }
    }

    fn update_user(&self, request: UpdateUserRequest) -> Result<UserResponse, RegistryError> {
        debug!(id = %request.id, "UpdateUser");
        let patch = UserPatch {
            name: non_empty(request.name),
            email: non_empty(request.email),
        };
        let user = self.registry.update(&request.id, patch)?;
        Ok(UserResponse {
            success: true,
            message: "User updated successfully".to_string(),
            user: Some(user.into()),
        })
    }

    fn delete_user(&self, request: UserRequest) -> Result<DeleteResponse, RegistryError> {
        debug!(id = %request.id, "DeleteUser");
        self.registry.delete(&request.id)?;
        Ok(DeleteResponse {
            success: true,
            message: "User deleted successfully".to_string(),
        })
    }
}

impl RpcService for UserService {
    fn handle(&self, request: RpcRequest) -> Result<RpcResponse, RegistryError> {
        Ok(match request {
            RpcRequest::CreateUser(req) => RpcResponse::User(self.create_user(req)?),
            RpcRequest::GetUser(req) => RpcResponse::User(self.get_user(req)?),
            RpcRequest::ListUsers => RpcResponse::UserList(self.list_users()),
            RpcRequest::UpdateUser(req) => RpcResponse::User(self.update_user(req)?),
            RpcRequest::DeleteUser(req) => RpcResponse::Delete(self.delete_user(req)?),
        })
    }
}

// Unset string fields arrive as ""
fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
