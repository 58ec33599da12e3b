//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use boundary_secrets_engine::EngineError;
use serde_json::json;
use tracing::warn;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => match err {
                EngineError::RoleNotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Configuration(_)
                | EngineError::InvalidRole(_)
                | EngineError::InvalidInternalData(_) => StatusCode::BAD_REQUEST,
                EngineError::Authentication(_) | EngineError::RemoteResource { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                EngineError::Storage(_) | EngineError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn retryable(&self) -> bool {
        match self {
            ApiError::Engine(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": self.retryable(),
        }));

        (status, body).into_response()
    }
}
