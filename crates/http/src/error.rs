//! Error handling for the shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shelf_kernel::ValidationErrors;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const EDIT_CONFLICT_MESSAGE: &str =
    "unable to update the record due to an edit conflict, please try again";
const INTERNAL_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed on {} field(s)", .errors.len())]
    Validation { errors: ValidationErrors },

    #[error("conflict: {message}")]
    Conflict { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error from a field → message map
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Validation { errors }
    }

    /// Optimistic-concurrency loss on update
    pub fn edit_conflict() -> Self {
        Self::Conflict {
            message: EDIT_CONFLICT_MESSAGE.to_string(),
            code: "edit_conflict".to_string(),
        }
    }

    /// Create a not found error with the stock message
    pub fn not_found() -> Self {
        Self::NotFound {
            message: NOT_FOUND_MESSAGE.to_string(),
            code: "not_found".to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message) = match self {
            // Field errors go back verbatim; nothing else to report.
            AppError::Validation { errors } => {
                tracing::debug!(
                    fields = ?errors.keys().collect::<Vec<_>>(),
                    "request failed validation"
                );
                return (status, Json(json!({ "errors": errors }))).into_response();
            }
            AppError::Conflict { message, code } => (code, message),
            AppError::NotFound { message, code } => (code, message),
            AppError::BadRequest { message, code } => (code, message),
            AppError::Internal(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = ?e,
                    "request failed with internal error"
                );
                return envelope(
                    status,
                    error_id,
                    "internal_error".to_string(),
                    INTERNAL_MESSAGE.to_string(),
                );
            }
        };

        let error_id = Uuid::new_v4();
        tracing::warn!(
            error_id = %error_id,
            error_code = %error_code,
            status_code = %status.as_u16(),
            "request error"
        );

        envelope(status, error_id, error_code, message)
    }
}

fn envelope(status: StatusCode, error_id: Uuid, code: String, message: String) -> Response {
    let timestamp = OffsetDateTime::now_utc().to_string();

    let body = json!({
        "error": {
            "code": code,
            "message": message,
            "details": [],
            "trace_id": error_id.to_string(),
            "timestamp": timestamp
        }
    });

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_render_field_map() {
        let mut errors = ValidationErrors::new();
        errors.insert("title".to_string(), "must be provided".to_string());

        let response = AppError::validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body, json!({ "errors": { "title": "must be provided" } }));
    }

    #[tokio::test]
    async fn not_found_uses_envelope() {
        let response = AppError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], NOT_FOUND_MESSAGE);
        assert!(body["error"]["trace_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn edit_conflict_maps_to_409() {
        let response = AppError::edit_conflict().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], EDIT_CONFLICT_MESSAGE);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let error = AppError::Internal(anyhow::anyhow!("password authentication failed"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
        assert!(!body.to_string().contains("password"));
    }
}
