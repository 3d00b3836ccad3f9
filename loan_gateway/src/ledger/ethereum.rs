//! Contract binding backed by ethers-rs
//!
//! Holds the HTTP provider, the signing wallet and the loan contract instance.
//! Built once at startup and shared read-only between requests.

use super::{is_plain_decimal, LedgerError, LoanLedger, LoanReceipt};
use crate::config::LedgerConfig;
use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::prelude::*;
use ethers::providers::{JsonRpcClient, MiddlewareError};
use ethers::utils::parse_units;
use log::{debug, info};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

type SigningClient<P> = SignerMiddleware<Provider<P>, LocalWallet>;

pub struct EthersLoanLedger<P: JsonRpcClient = Http> {
    contract: Contract<SigningClient<P>>,
    method: String,
    confirmations: usize,
    amount_decimals: u32,
    gas_limit: Option<U256>,
    gas_price: Option<U256>,
}

impl EthersLoanLedger<Http> {
    /// Build the binding from config, reading the ABI from `config.abi_path`
    pub async fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let abi = load_abi(&config.abi_path)?;
        Self::connect_with_abi(config, abi).await
    }

    pub async fn connect_with_abi(config: &LedgerConfig, abi: Abi) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| LedgerError::Setup(format!("Failed to create HTTP provider: {}", e)))?
            .interval(config.poll_interval());
        Self::bind(provider, config, abi).await
    }
}

impl<P: JsonRpcClient + 'static> EthersLoanLedger<P> {
    /// Bind the loan contract on an already constructed provider
    pub async fn bind(
        provider: Provider<P>,
        config: &LedgerConfig,
        abi: Abi,
    ) -> Result<Self, LedgerError> {
        abi.function(&config.method).map_err(|_| {
            LedgerError::Setup(format!("contract ABI has no `{}` method", config.method))
        })?;

        let contract_address = config
            .contract_address
            .parse::<Address>()
            .map_err(|e| LedgerError::Setup(format!("Invalid contract address: {}", e)))?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => provider
                .get_chainid()
                .await
                .map_err(|e| LedgerError::Setup(format!("Failed to get chain ID: {}", e)))?
                .as_u64(),
        };

        let wallet = config
            .private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| LedgerError::Setup(format!("Invalid private key: {}", e)))?
            .with_chain_id(chain_id);

        info!(
            "Loan contract {:?} bound on chain {} as {:?}",
            contract_address,
            chain_id,
            wallet.address()
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = Contract::new(contract_address, abi, client);

        Ok(Self {
            contract,
            method: config.method.clone(),
            confirmations: config.confirmations,
            amount_decimals: config.amount_decimals,
            gas_limit: config.gas_limit.map(U256::from),
            gas_price: config
                .gas_price_gwei
                .map(|gwei| U256::from(gwei) * U256::exp10(9)),
        })
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> LoanLedger for EthersLoanLedger<P> {
    async fn request_loan(
        &self,
        amount: &Value,
        interest_rate: &Value,
    ) -> Result<LoanReceipt, LedgerError> {
        let amount = encode_uint("amount", amount, self.amount_decimals)?;
        let interest_rate = encode_uint("interestRate", interest_rate, 0)?;

        let mut call = self
            .contract
            .method::<_, ()>(&self.method, (amount, interest_rate))
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        if let Some(gas) = self.gas_limit {
            call = call.gas(gas);
        }
        if let Some(price) = self.gas_price {
            call = call.legacy().gas_price(price);
        }

        let pending_tx = call.send().await.map_err(|e| {
            let message = e
                .as_middleware_error()
                .and_then(|inner| rpc_message(inner))
                .unwrap_or_else(|| e.to_string());
            LedgerError::Rejected(message)
        })?;
        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        debug!("Loan transaction sent: {}", tx_hash);

        let receipt = pending_tx
            .confirmations(self.confirmations)
            .await
            .map_err(|e| LedgerError::Rejected(rpc_message(&e).unwrap_or_else(|| e.to_string())))?;

        settle_receipt(tx_hash, receipt)
    }
}

/// Message of the JSON-RPC error behind `err`, if the node answered with one
fn rpc_message<E: MiddlewareError>(err: &E) -> Option<String> {
    MiddlewareError::as_error_response(err).map(|rpc| rpc.message.clone())
}

/// Map the confirmed receipt (or its absence) to the loan outcome
fn settle_receipt(
    tx_hash: String,
    receipt: Option<TransactionReceipt>,
) -> Result<LoanReceipt, LedgerError> {
    match receipt {
        Some(receipt) if receipt.status == Some(U64::from(1)) => Ok(LoanReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        }),
        Some(_) => Err(LedgerError::Reverted { tx_hash }),
        None => Err(LedgerError::Dropped { tx_hash }),
    }
}

/// Read a contract ABI from a JSON file
pub fn load_abi(path: &Path) -> Result<Abi, LedgerError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::Setup(format!("Failed to read ABI {:?}: {}", path, e)))?;
    parse_abi(&raw)
}

pub fn parse_abi(raw: &str) -> Result<Abi, LedgerError> {
    serde_json::from_str(raw).map_err(|e| LedgerError::Setup(format!("Malformed ABI: {}", e)))
}

/// Encode a client-supplied JSON value as a `uint256` argument.
///
/// Numbers and plain decimal strings are accepted; `decimals` shifts the
/// decimal point (18 turns ether into wei). Everything else fails to encode.
pub fn encode_uint(field: &'static str, value: &Value, decimals: u32) -> Result<U256, LedgerError> {
    let literal = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Null => {
            return Err(LedgerError::Encoding {
                field,
                reason: "value is missing".to_string(),
            })
        }
        other => {
            return Err(LedgerError::Encoding {
                field,
                reason: format!("expected a number, got {}", other),
            })
        }
    };

    if literal.is_empty() {
        return Err(LedgerError::Encoding {
            field,
            reason: "value is empty".to_string(),
        });
    }
    if literal.starts_with('-') {
        return Err(LedgerError::Encoding {
            field,
            reason: format!("{} is negative", literal),
        });
    }
    // parse_units slices by byte offset, so only ASCII digits and one dot get through.
    if !is_plain_decimal(&literal) {
        return Err(LedgerError::Encoding {
            field,
            reason: format!("{} is not a decimal number", literal),
        });
    }

    // Scaling multiplies inside U256, keep the result below 10^77.
    let integer_digits = literal
        .split('.')
        .next()
        .unwrap_or_default()
        .trim_start_matches('0')
        .len();
    if decimals > 0 && integer_digits as u32 + decimals > 77 {
        return Err(LedgerError::Encoding {
            field,
            reason: format!("{} does not fit in uint256", literal),
        });
    }

    parse_units(&literal, decimals)
        .map(U256::from)
        .map_err(|e| LedgerError::Encoding {
            field,
            reason: format!("cannot encode {}: {}", literal, e),
        })
}
