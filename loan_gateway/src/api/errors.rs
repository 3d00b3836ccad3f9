//! API error handling for the loan gateway

use crate::ledger::LedgerError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Everything the loan endpoint can fail with
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be read, or strict input checks rejected it
    #[error("{0}")]
    Validation(String),
    /// Submission or confirmation failed on the ledger side
    #[error(transparent)]
    RemoteCall(#[from] LedgerError),
    /// Confirmation did not arrive within the configured bound
    #[error("transaction confirmation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::RemoteCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Error body returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::Validation(rejection.body_text())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
