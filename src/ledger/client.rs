// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network client.
//!
//! [`LedgerClient`] is the injected collaborator the engine and balance
//! tracker talk to; [`HttpLedgerClient`] implements it over JSON-RPC.
//! Reads are idempotent, submission is not — the caller owns retry policy.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Default timeout for ledger RPC requests.
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from ledger interactions.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Ledger request failed: {0}")]
    Request(String),

    #[error("Ledger rejected the transaction: {0}")]
    Rejected(String),

    #[error("Ledger response was invalid: {0}")]
    InvalidResponse(String),
}

/// Network-reported status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed(String),
}

/// Ledger network collaborator.
///
/// Submits signed transactions and answers confirmation and balance
/// queries. Injected so tests can substitute a fake without process-wide
/// state.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit signed transaction bytes; returns the transaction identifier.
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<String, LedgerError>;

    /// Query the confirmation status of a submitted transaction.
    async fn confirmation_status(&self, tx_id: &str) -> Result<TxStatus, LedgerError>;

    /// Current balance of an address in base units.
    async fn balance_base_units(&self, public_address: &str) -> Result<u64, LedgerError>;
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Confirmation-status result payload.
#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// JSON-RPC ledger client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    rpc_url: url::Url,
    http: Client,
}

impl HttpLedgerClient {
    /// Create a client for the given RPC endpoint.
    pub fn new(rpc_url: &str) -> Result<Self, LedgerError> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { rpc_url, http })
    }

    /// Issue one JSON-RPC call and unwrap the result payload.
    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::Rejected(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }

        envelope
            .result
            .ok_or_else(|| LedgerError::InvalidResponse("missing result".to_string()))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<String, LedgerError> {
        let encoded = Base64::encode_string(signed_tx);
        let result = self.call("submitTransaction", json!([encoded])).await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LedgerError::InvalidResponse("transaction id is not a string".to_string()))
    }

    async fn confirmation_status(&self, tx_id: &str) -> Result<TxStatus, LedgerError> {
        let result = self.call("getConfirmationStatus", json!([tx_id])).await?;
        parse_status(result)
    }

    async fn balance_base_units(&self, public_address: &str) -> Result<u64, LedgerError> {
        let result = self.call("getBalance", json!([public_address])).await?;

        result
            .as_u64()
            .ok_or_else(|| LedgerError::InvalidResponse("balance is not an integer".to_string()))
    }
}

/// Map a status payload onto [`TxStatus`].
fn parse_status(result: Value) -> Result<TxStatus, LedgerError> {
    let body: StatusBody = serde_json::from_value(result)
        .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

    match body.status.as_str() {
        "pending" => Ok(TxStatus::Pending),
        "confirmed" => Ok(TxStatus::Confirmed),
        "failed" => Ok(TxStatus::Failed(
            body.reason.unwrap_or_else(|| "unspecified".to_string()),
        )),
        other => Err(LedgerError::InvalidResponse(format!(
            "unknown status `{other}`"
        ))),
    }
}
