// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Ledger RPC client.
//!
//! [`LedgerClient`] is the seam between the transfer pipeline and the
//! network: the builder asks it for balances and freshness tokens, the relay
//! submits signed bytes and polls status through it. Tests substitute a mock
//! so the pipeline's behavior can be pinned down without a validator.
//!
//! [`RpcLedgerClient`] speaks the node's JSON-RPC dialect over HTTP. Every
//! request carries a bounded timeout; a node that hangs must surface as an
//! error, not stall a signing operation.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::address::Address;
use crate::transaction::FreshnessToken;

/// Errors from ledger RPC interactions.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger rpc transport error: {0}")]
    Transport(String),

    #[error("ledger rpc returned an error: {0}")]
    Rpc(String),

    #[error("unexpected ledger rpc response shape: {0}")]
    Malformed(String),
}

/// On-ledger status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerTxStatus {
    /// Not yet visible or not yet finalized.
    Pending,
    /// Finalized successfully.
    Success,
    /// Finalized with an error payload.
    Failed(String),
}

/// Read/submit interface to the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// A recent blockhash plus the deadline after which it must not be used.
    async fn latest_blockhash(&self) -> Result<FreshnessToken, LedgerError>;

    /// Submit fully-signed transaction bytes; returns the ledger's tx id.
    async fn submit_transaction(&self, tx_bytes: &[u8]) -> Result<String, LedgerError>;

    /// Status of a previously submitted transaction.
    async fn transaction_status(&self, tx_id: &str) -> Result<LedgerTxStatus, LedgerError>;

    /// Balance of a token sub-account in minor units. `None` when the
    /// account does not exist yet (a wallet that never received the token).
    async fn token_account_balance(
        &self,
        account: &Address,
    ) -> Result<Option<u64>, LedgerError>;
}

/// JSON-RPC ledger client backed by `reqwest`.
pub struct RpcLedgerClient {
    http: reqwest::Client,
    rpc_url: Url,
    blockhash_ttl: Duration,
}

impl RpcLedgerClient {
    pub fn new(
        rpc_url: Url,
        request_timeout: std::time::Duration,
        blockhash_ttl_secs: i64,
    ) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            rpc_url,
            blockhash_ttl: Duration::seconds(blockhash_ttl_secs),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!(method, "ledger rpc request");

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if let Some(err) = payload.get("error") {
            warn!(method, %err, "ledger rpc error");
            return Err(LedgerError::Rpc(err.to_string()));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed("missing result field".to_string()))
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn latest_blockhash(&self) -> Result<FreshnessToken, LedgerError> {
        let result = self
            .call("getLatestBlockhash", json!([{"commitment": "finalized"}]))
            .await?;
        let blockhash = result["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| LedgerError::Malformed("missing blockhash".to_string()))?
            .to_string();
        Ok(FreshnessToken {
            blockhash,
            expires_at: Utc::now() + self.blockhash_ttl,
        })
    }

    async fn submit_transaction(&self, tx_bytes: &[u8]) -> Result<String, LedgerError> {
        use base64ct::{Base64, Encoding};
        let encoded = Base64::encode_string(tx_bytes);
        let result = self
            .call("sendTransaction", json!([encoded, {"encoding": "base64"}]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LedgerError::Malformed("tx id is not a string".to_string()))
    }

    async fn transaction_status(&self, tx_id: &str) -> Result<LedgerTxStatus, LedgerError> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[tx_id], {"searchTransactionHistory": true}]),
            )
            .await?;
        let entry = &result["value"][0];
        if entry.is_null() {
            return Ok(LedgerTxStatus::Pending);
        }
        if let Some(err) = entry.get("err").filter(|e| !e.is_null()) {
            return Ok(LedgerTxStatus::Failed(err.to_string()));
        }
        match entry["confirmationStatus"].as_str() {
            Some("finalized") | Some("confirmed") => Ok(LedgerTxStatus::Success),
            _ => Ok(LedgerTxStatus::Pending),
        }
    }

    async fn token_account_balance(
        &self,
        account: &Address,
    ) -> Result<Option<u64>, LedgerError> {
        let result = self
            .call(
                "getTokenAccountBalance",
                json!([account.to_base58(), {"commitment": "finalized"}]),
            )
            .await;
        let result = match result {
            Ok(v) => v,
            // An account that was never funded does not exist on ledger.
            Err(LedgerError::Rpc(msg)) if msg.contains("could not find") => return Ok(None),
            Err(e) => return Err(e),
        };
        let amount = result["value"]["amount"]
            .as_str()
            .ok_or_else(|| LedgerError::Malformed("missing balance amount".to_string()))?;
        amount
            .parse::<u64>()
            .map(Some)
            .map_err(|e| LedgerError::Malformed(format!("balance not a u64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_enum_distinguishes_failure_payloads() {
        let failed = LedgerTxStatus::Failed("InstructionError".to_string());
        assert_ne!(failed, LedgerTxStatus::Pending);
        assert_ne!(failed, LedgerTxStatus::Success);
    }

    #[test]
    fn client_construction_validates_timeout() {
        let url = Url::parse("http://127.0.0.1:8899").unwrap();
        let client = RpcLedgerClient::new(url, std::time::Duration::from_secs(10), 60);
        assert!(client.is_ok());
    }
}
