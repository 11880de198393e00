//! HTTP binding error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use super::envelope::Envelope;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{0}")]
    InvalidBody(String),

    #[error("Query parameter \"q\" is required")]
    MissingQuery,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("The requested resource does not exist")]
    RouteNotFound { method: String, path: String },

    #[error("Method {method} is not allowed")]
    MethodNotAllowed { method: String, path: String },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) | Self::InvalidBody(_) | Self::MissingQuery => {
                StatusCode::BAD_REQUEST
            }
            Self::Registry(RegistryError::NotFound(_)) | Self::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Registry(RegistryError::InvalidInput(_) | RegistryError::DuplicateEmail(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details are logged, never returned
        if let Self::Internal(detail) = &self {
            error!(error = %detail, "Unhandled error in HTTP handler");
        }

        let mut envelope = Envelope::error(self.to_string());
        if let Self::RouteNotFound { method, path } | Self::MethodNotAllowed { method, path } = self
        {
            envelope = envelope.with_route(method, path);
        }

        (status, Json(envelope)).into_response()
    }
}
