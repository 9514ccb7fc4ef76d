// web-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use farm_common::auth::{AuthError, StatusClass};
use farm_common::models::auth::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("token endpoint does not match request path")]
    EndpointMismatch,

    #[error("not found")]
    NotFound,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Auth(err) => ErrorBody::from(err),
            // Same wording as any other unacceptable token
            ApiError::EndpointMismatch => ErrorBody::new("Forbidden", "Invalid authorization token"),
            ApiError::NotFound => ErrorBody::new("Not Found", "Resource not found"),
            ApiError::Internal => ErrorBody::new("Internal Server Error", "Internal server error"),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => match err.status_class() {
                StatusClass::Unauthorized => StatusCode::UNAUTHORIZED,
                StatusClass::Forbidden => StatusCode::FORBIDDEN,
            },
            ApiError::EndpointMismatch => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
