use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::app_error::{AppError, ErrorCode, FieldError};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Config(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ConfigError,
                None,
            ),
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                None,
            ),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::RemoteNotFound(_) => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::RemoteNotFound, None)
            }
            AppError::RemoteValidation(errors) => validation_resp(errors),
            AppError::RemoteUnavailable(_) => error_resp(
                StatusCode::BAD_GATEWAY,
                ErrorCode::RemoteUnavailable,
                Some(
                    "The billing system is temporarily unavailable. Please try again later."
                        .to_string(),
                ),
            ),
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::InvalidCredentials => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials, None)
            }
            AppError::Forbidden => error_resp(StatusCode::FORBIDDEN, ErrorCode::Forbidden, None),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}

/// Field-level provider rejections surface per-field so forms can attach
/// messages to the offending inputs.
fn validation_resp(errors: Vec<FieldError>) -> Response {
    let body = serde_json::json!({
        "code": ErrorCode::RemoteValidation.as_str(),
        "errors": errors,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}
