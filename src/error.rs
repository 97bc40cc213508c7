use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("Internal Server Error")]
    StoreUnavailable,
}

impl ResponseError for CartError {
    fn status_code(&self) -> StatusCode {
        match self {
            CartError::NotFound => StatusCode::NOT_FOUND,
            CartError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            CartError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}
