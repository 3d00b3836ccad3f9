//! Loan gateway
//!
//! Accepts loan requests over HTTP, submits each one as a `requestLoan`
//! transaction to a configured ledger contract, and answers once the
//! transaction is confirmed.

pub mod api;
pub mod config;
pub mod ledger;

pub use api::{create_loan_api_router, AppState, GatewayError};
pub use config::Config;
pub use ledger::{LedgerError, LoanLedger, LoanReceipt};
