//! Mapping from [`AppError`] to HTTP responses.
//!
//! Internal and configuration errors are reported with a generic message;
//! their sources only reach the logs.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::auth::RequestContext;
use crate::error::AppError;

pub fn status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::InvalidCredentials
        | AppError::InvalidToken
        | AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        AppError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
        AppError::NoProviderConfigured => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Delivery { .. } => StatusCode::BAD_GATEWAY,
        AppError::Configuration { .. } | AppError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_body(error: &AppError) -> ErrorResponse {
    let code = error.code();
    match error {
        AppError::Validation { field, reason } => {
            ErrorResponse::new(code, error.to_string()).with_details(json!({
                "field": field,
                "reason": reason,
            }))
        }
        AppError::Delivery { email_id, .. } => {
            ErrorResponse::new(code, error.to_string()).with_details(json!({
                "email_id": email_id,
            }))
        }
        AppError::Configuration { .. } | AppError::Internal { .. } => {
            ErrorResponse::new(code, "An internal error occurred")
        }
        _ => ErrorResponse::new(code, error.to_string()),
    }
}

/// An [`AppError`] tagged with the request it belongs to.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(error: AppError, ctx: &RequestContext) -> Self {
        Self {
            error,
            request_id: ctx.request_id().map(str::to_string),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.error);
        if status.is_server_error() {
            tracing::error!(error = ?self.error, request_id = ?self.request_id, "Request failed");
        }

        let mut body = error_body(&self.error);
        if let Some(request_id) = &self.request_id {
            body = body.with_request_id(request_id);
        }
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`".to_string()
            }
            other => other.body_text(),
        };
        AppError::BadRequest { message }
    }
}
