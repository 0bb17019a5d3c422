//! API error handling
//!
//! The engine's error taxonomy maps onto HTTP statuses here; DTO
//! validation failures become 422s. Every error body uses the same
//! envelope as success responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use moneybee_types::MoneyBeeError;

use crate::dto::ApiResponse;

/// Errors leaving the API layer
#[derive(Debug)]
pub enum ApiError {
    /// Business outcome from the engine
    Engine(MoneyBeeError),
    /// Request body failed validation
    Validation(Vec<String>),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                MoneyBeeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                MoneyBeeError::NotFound(_) => StatusCode::NOT_FOUND,
                MoneyBeeError::FailedPrecondition(_) => StatusCode::CONFLICT,
                MoneyBeeError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                MoneyBeeError::Aborted(_) => StatusCode::CONFLICT,
                MoneyBeeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                MoneyBeeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<MoneyBeeError> for ApiError {
    fn from(err: MoneyBeeError) -> Self {
        Self::Engine(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let detail = e
                        .message
                        .as_deref()
                        .unwrap_or("invalid value");
                    format!("{}: {}", field, detail)
                })
            })
            .collect();
        Self::Validation(messages)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Engine(e) => {
                if matches!(e, MoneyBeeError::Internal(_)) {
                    // internal details stay in the logs
                    tracing::error!(error = %e, "Internal error");
                    ApiResponse::<()>::error(
                        "internal error",
                        vec!["INTERNAL".to_string()],
                    )
                } else {
                    ApiResponse::<()>::error(e.to_string(), vec![e.error_code().to_string()])
                }
            }
            Self::Validation(messages) => {
                ApiResponse::<()>::error("validation failed", messages)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Result alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;
