use crate::api::errors::{GatewayError, GatewayResult};
use crate::api::AppState;
use crate::ledger::is_plain_decimal;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LOAN_SUBMITTED_MESSAGE: &str = "Loan request submitted";

/// Loan request body.
///
/// Fields are kept as raw JSON so they reach the ledger exactly as sent;
/// a missing field is `Value::Null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRequest {
    #[serde(default)]
    pub amount: Value,
    #[serde(rename = "interestRate", default)]
    pub interest_rate: Value,
}

impl LoanRequest {
    /// Strict-mode checks: both fields present, numeric and non-negative
    pub fn validate(&self) -> GatewayResult<()> {
        check_numeric("amount", &self.amount)?;
        check_numeric("interestRate", &self.interest_rate)
    }
}

fn check_numeric(field: &str, value: &Value) -> GatewayResult<()> {
    let literal = match value {
        Value::Null => {
            return Err(GatewayError::Validation(format!("`{}` is required", field)));
        }
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => String::new(),
    };

    // Same literal rule the ledger encoder applies
    if is_plain_decimal(&literal) {
        return Ok(());
    }
    match literal.strip_prefix('-') {
        Some(magnitude) if is_plain_decimal(magnitude) => Err(GatewayError::Validation(
            format!("`{}` must not be negative", field),
        )),
        _ => Err(GatewayError::Validation(format!(
            "`{}` must be a number",
            field
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSubmissionResult {
    pub message: String,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

impl LoanSubmissionResult {
    pub fn submitted(tx_hash: String) -> Self {
        Self {
            message: LOAN_SUBMITTED_MESSAGE.to_string(),
            tx_hash,
        }
    }
}

/// Submit a loan request to the ledger contract and wait for confirmation
pub async fn request_loan(
    State(state): State<AppState>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> GatewayResult<Json<LoanSubmissionResult>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Unreadable loan request body: {}", rejection.body_text());
        GatewayError::from(rejection)
    })?;

    if state.validate_input {
        if let Err(e) = request.validate() {
            warn!("Loan request rejected: {}", e);
            return Err(e);
        }
    }

    info!(
        "Submitting loan request: amount={} interestRate={}",
        request.amount,
        request.interest_rate
    );

    let submission = state
        .ledger
        .request_loan(&request.amount, &request.interest_rate);

    // Without a configured bound this waits as long as the ledger does.
    let outcome = match state.confirmation_timeout {
        Some(limit) => match tokio::time::timeout(limit, submission).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Loan request not confirmed within {:?}", limit);
                return Err(GatewayError::Timeout(limit));
            }
        },
        None => submission.await,
    };

    match outcome {
        Ok(receipt) => {
            info!(
                "Loan request confirmed: tx={} block={:?}",
                receipt.tx_hash,
                receipt.block_number
            );
            Ok(Json(LoanSubmissionResult::submitted(receipt.tx_hash)))
        }
        Err(e) => {
            error!("Loan request failed: {}", e);
            Err(GatewayError::RemoteCall(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_deserialize_as_null() {
        let request: LoanRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.amount.is_null());
        assert!(request.interest_rate.is_null());

        let request: LoanRequest =
            serde_json::from_value(json!({"amount": 100, "interestRate": "5"})).unwrap();
        assert_eq!(request.amount, json!(100));
        assert_eq!(request.interest_rate, json!("5"));
    }

    #[test]
    fn test_validate_accepts_numbers_and_numeric_strings() {
        let request = LoanRequest {
            amount: json!(1500.25),
            interest_rate: json!("7"),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejections() {
        let cases = [
            (json!(null), json!(5), "`amount` is required"),
            (json!(100), json!(null), "`interestRate` is required"),
            (json!("lots"), json!(5), "`amount` must be a number"),
            (json!(100), json!(-1), "`interestRate` must not be negative"),
            (json!([100]), json!(5), "`amount` must be a number"),
            (json!("NaN"), json!(5), "`amount` must be a number"),
            (json!(100), json!("inf"), "`interestRate` must be a number"),
            (json!("-inf"), json!(5), "`amount` must be a number"),
            (json!("1e5"), json!(5), "`amount` must be a number"),
            (json!("1_000"), json!(5), "`amount` must be a number"),
            (json!(100), json!("-2.5"), "`interestRate` must not be negative"),
        ];

        for (amount, interest_rate, expected) in cases {
            let request = LoanRequest {
                amount,
                interest_rate,
            };
            let err = request.validate().unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)));
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_result_serializes_camel_case_hash() {
        let result = LoanSubmissionResult::submitted("0xabc".to_string());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"message": "Loan request submitted", "txHash": "0xabc"})
        );
    }
}
