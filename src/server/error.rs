//! Error types for the server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::RetentionError;
use crate::security::AuthError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Retention(#[from] RetentionError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ServerError::Auth(e) => {
                let status = match e {
                    AuthError::InvalidCredentials | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
                    AuthError::UsernameTaken(_) => StatusCode::CONFLICT,
                    AuthError::PasswordMismatch | AuthError::EmptyField(_) => StatusCode::BAD_REQUEST,
                    AuthError::Storage(detail) => {
                        tracing::error!(detail = %detail, "Credential store error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
            ServerError::Retention(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            ServerError::Retention(e) => {
                tracing::error!(detail = %e, "Prediction pipeline error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed. Check server logs for details.".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unknown = ServerError::from(RetentionError::UnknownCategory {
            column: "city".into(),
            value: "city_0".into(),
        });
        assert_eq!(unknown.into_response().status(), StatusCode::BAD_REQUEST);

        let taken = ServerError::from(AuthError::UsernameTaken("admin".into()));
        assert_eq!(taken.into_response().status(), StatusCode::CONFLICT);

        let session = ServerError::from(AuthError::InvalidSession);
        assert_eq!(session.into_response().status(), StatusCode::UNAUTHORIZED);

        let malformed = ServerError::BadRequest("record: missing field".into());
        assert_eq!(malformed.into_response().status(), StatusCode::BAD_REQUEST);

        let io = ServerError::from(RetentionError::ModelNotFitted);
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
