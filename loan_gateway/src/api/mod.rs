//! HTTP surface of the loan gateway

pub mod errors;
pub mod handlers;

use crate::config::EndpointConfig;
use crate::ledger::LoanLedger;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub use errors::{ErrorResponse, GatewayError, GatewayResult};

/// Application state shared by all handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LoanLedger>,
    pub confirmation_timeout: Option<Duration>,
    pub validate_input: bool,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LoanLedger>, endpoint: &EndpointConfig) -> Self {
        Self {
            ledger,
            confirmation_timeout: endpoint.confirmation_timeout(),
            validate_input: endpoint.validate_input,
        }
    }
}

/// Create the gateway router
pub fn create_loan_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::status::health_check))
        .route("/request-loan", post(handlers::loans::request_loan))
        // Path used by earlier releases
        .route("/api/loans/request", post(handlers::loans::request_loan))
        .layer(cors)
        .with_state(state)
}
