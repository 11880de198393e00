//! `/api/users` handlers.
//!
//! Registry calls are synchronous and may block on the registry lock, so
//! each one runs on the blocking pool. A panic there comes back as a
//! `JoinError` and is answered with a 500 envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::envelope::Envelope;
use super::error::ApiError;
use crate::registry::{Registry, UserPatch};

type ApiResult = Result<(StatusCode, Json<Envelope>), ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => {
            Err(ApiError::InvalidBody("Request body must be JSON".to_string()))
        }
        Err(rejection) => Err(ApiError::InvalidBody(rejection.body_text())),
    }
}

fn ok(status: StatusCode, envelope: Envelope) -> ApiResult {
    Ok((status, Json(envelope)))
}

pub async fn list_users(State(registry): State<Arc<Registry>>) -> ApiResult {
    let users = blocking(move || Ok(registry.list())).await?;

    ok(
        StatusCode::OK,
        Envelope::success(format!("Found {} users", users.len()))
            .with_count(users.len())
            .with_data(&users),
    )
}

pub async fn get_user(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
) -> ApiResult {
    let user = blocking(move || Ok(registry.get(&id)?)).await?;

    ok(
        StatusCode::OK,
        Envelope::success("User fetched successfully").with_data(&user),
    )
}

pub async fn create_user(
    State(registry): State<Arc<Registry>>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;

    let (name, email) = match (body.name, body.email) {
        (Some(name), Some(email)) => (name, email),
        (name, email) => {
            let mut missing = Vec::new();
            if name.is_none() {
                missing.push("name");
            }
            if email.is_none() {
                missing.push("email");
            }
            return Err(ApiError::MissingFields(missing));
        }
    };

    let user = blocking(move || Ok(registry.create(&name, &email)?)).await?;

    ok(
        StatusCode::CREATED,
        Envelope::success("User created successfully").with_data(&user),
    )
}

pub async fn update_user(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserBody>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let patch = UserPatch {
        name: body.name,
        email: body.email,
    };

    let user = blocking(move || Ok(registry.update(&id, patch)?)).await?;

    ok(
        StatusCode::OK,
        Envelope::success("User updated successfully").with_data(&user),
    )
}

pub async fn delete_user(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
) -> ApiResult {
    let user = blocking(move || Ok(registry.delete(&id)?)).await?;

    ok(
        StatusCode::OK,
        Envelope::success(format!(
            "User {} (ID: {}) deleted successfully",
            user.name, user.id
        )),
    )
}

pub async fn search_users(
    State(registry): State<Arc<Registry>>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let lookup = query.clone();
    let users = blocking(move || Ok(registry.search(&lookup))).await?;

    ok(
        StatusCode::OK,
        Envelope::success(format!("Found {} users", users.len()))
            .with_count(users.len())
            .with_query(query)
            .with_data(&users),
    )
}

pub async fn route_not_found(method: Method, uri: Uri) -> impl IntoResponse {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> impl IntoResponse {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
