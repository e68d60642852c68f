use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidAssignment(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// `Json` extractor whose rejections use the `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Missing field or wrong type.
            JsonRejection::JsonDataError(err) => AppError::Validation(err.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidAssignment(_)
            | AppError::Validation(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound("Bus not found".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidAssignment("Invalid driver".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(DbErr::Custom("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_json_rejection_uses_error_body() {
        use axum::body::Body;
        use axum::http::Request;

        #[derive(Debug, serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            name: String,
        }

        let request = Request::builder()
            .header("content-type", "application/json")
            .body(Body::from(r#"{"number": 5}"#))
            .unwrap();
        let err = match AppJson::<Payload>::from_request(request, &()).await {
            Err(err) => err,
            Ok(_) => panic!("body without name was accepted"),
        };
        assert!(matches!(err, AppError::Validation(_)));

        let request = Request::builder()
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = match AppJson::<Payload>::from_request(request, &()).await {
            Err(err) => err,
            Ok(_) => panic!("malformed body was accepted"),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_message_is_passed_through() {
        let err = AppError::NotFound("Route not found".to_string());
        assert_eq!(err.to_string(), "Route not found");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
