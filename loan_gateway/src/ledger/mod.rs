//! Ledger port used by the loan endpoint
//!
//! The endpoint only sees [`LoanLedger`]. The production implementation lives in
//! [`ethereum`] and talks to an EVM node over JSON-RPC.

pub mod ethereum;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use ethereum::EthersLoanLedger;

/// Confirmed loan-request transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanReceipt {
    /// Full `0x`-prefixed transaction hash
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

impl LoanReceipt {
    pub fn new(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            block_number: None,
        }
    }
}

/// Failures while building, submitting or confirming a loan transaction.
///
/// `Rejected` keeps the provider's text verbatim; clients see it unchanged.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("invalid argument `{field}`: {reason}")]
    Encoding { field: &'static str, reason: String },
    #[error("{0}")]
    Rejected(String),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    #[error("transaction {tx_hash} dropped from mempool")]
    Dropped { tx_hash: String },
    #[error("ledger setup failed: {0}")]
    Setup(String),
}

/// True for unsigned decimal literals: ASCII digits with at most one `.`
pub fn is_plain_decimal(literal: &str) -> bool {
    literal.chars().any(|c| c.is_ascii_digit())
        && literal.chars().all(|c| c.is_ascii_digit() || c == '.')
        && literal.matches('.').count() <= 1
}

/// A ledger contract that accepts loan requests
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// Submit one `requestLoan` transaction and wait until it is confirmed.
    ///
    /// Arguments arrive exactly as the client sent them; `Value::Null` stands for
    /// a missing field. Implementations decide what they can encode.
    async fn request_loan(
        &self,
        amount: &Value,
        interest_rate: &Value,
    ) -> Result<LoanReceipt, LedgerError>;
}
