//! API error taxonomy shared by all services
//!
//! Every variant is recoverable and maps to a 4xx response; failed
//! operations never mutate store state.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("No available spots in this lot")]
    NoAvailability,
    #[error("{0}")]
    InvalidPayment(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidPayment(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::NoAvailability => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ApiResponse::<()>::err(self.to_string()));
        (status, body).into_response()
    }
}
