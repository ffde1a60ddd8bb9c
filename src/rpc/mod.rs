//! Node RPC client
//!
//! JSON-RPC 1.0 over HTTP with basic auth, against the node's wallet. Backs
//! both pipeline collaborators: `listunspent` is the funding source,
//! `createrawtransaction` + `signrawtransaction` sign, and
//! `sendrawtransaction` broadcasts.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::RpcConfig;
use crate::runtime::{
    BroadcastOutcome, FundingSource, ServiceError, SignedTransaction, SpendableUnit, TxOutput,
    TransactionService, UnsignedTransaction, COIN,
};

/// Only units with at least this many confirmations are spendable
pub const MIN_CONFIRMATIONS: u32 = 1;
pub const MAX_CONFIRMATIONS: u32 = 9_999_999;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One entry of a `listunspent` reply
#[derive(Debug, Clone, Deserialize)]
pub struct UnspentEntry {
    pub txid: String,
    pub vout: u32,
    /// Coins, as a decimal
    pub amount: f64,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default = "default_spendable")]
    pub spendable: bool,
}

fn default_spendable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SignReply {
    hex: String,
    #[serde(default)]
    complete: bool,
}

// ============================================================================
// AMOUNT CONVERSION
// ============================================================================

/// Decimal coins to base units; `None` for negative or non-finite amounts
pub fn coins_to_units(coins: f64) -> Option<u64> {
    if !coins.is_finite() || coins < 0.0 {
        return None;
    }
    let units = (coins * COIN as f64).round();
    if units > u64::MAX as f64 {
        return None;
    }
    Some(units as u64)
}

pub fn units_to_coins(units: u64) -> f64 {
    units as f64 / COIN as f64
}

/// Spendable units from a `listunspent` reply, order preserved
pub fn parse_unspent(result: Value) -> Result<Vec<SpendableUnit>, ServiceError> {
    let entries: Vec<UnspentEntry> = serde_json::from_value(result)
        .map_err(|e| ServiceError::InvalidResponse(format!("listunspent: {}", e)))?;

    entries
        .into_iter()
        .filter(|entry| entry.spendable)
        .map(|entry| {
            let amount = coins_to_units(entry.amount).ok_or_else(|| {
                ServiceError::InvalidResponse(format!(
                    "listunspent: bad amount {} for {}:{}",
                    entry.amount, entry.txid, entry.vout
                ))
            })?;
            Ok(SpendableUnit {
                txid: entry.txid,
                vout: entry.vout,
                amount,
            })
        })
        .collect()
}

/// `createrawtransaction` parameters for `tx`
pub fn raw_transaction_params(tx: &UnsignedTransaction) -> Value {
    let inputs: Vec<Value> = tx
        .inputs
        .iter()
        .map(|input| json!({ "txid": input.txid, "vout": input.vout }))
        .collect();

    let mut outputs = Map::new();
    let mut payments: Vec<(String, u64)> = Vec::new();
    for output in &tx.outputs {
        match output {
            TxOutput::Payment { address, amount } => {
                match payments.iter_mut().find(|(a, _)| a == address) {
                    Some((_, total)) => *total = total.saturating_add(*amount),
                    None => payments.push((address.clone(), *amount)),
                }
            }
            TxOutput::Data { data } => {
                outputs.insert("data".to_string(), Value::String(hex::encode(data)));
            }
        }
    }
    for (address, amount) in payments {
        outputs.insert(address, json!(units_to_coins(amount)));
    }

    json!([inputs, outputs])
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct NodeRpcClient {
    config: RpcConfig,
    http_client: reqwest::Client,
}

impl NodeRpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Issue one call; node-side errors come back as `ServiceError::Rpc`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "bet-oracle",
            "method": method,
            "params": params,
        });
        debug!("RPC {} -> {}", method, self.config.url);

        let mut request = self.http_client.post(&self.config.url).json(&body);
        if !self.config.user.is_empty() {
            request = request.basic_auth(&self.config.user, Some(&self.config.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        // The node answers RPC errors with a non-2xx status and a JSON body
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let reply: RpcResponse = serde_json::from_str(&text).map_err(|_| {
            if status.is_success() {
                ServiceError::InvalidResponse(format!("{}: unparseable reply", method))
            } else {
                ServiceError::Transport(format!("HTTP {}: {}", status, text.trim()))
            }
        })?;

        match reply.error {
            Some(err) => Err(ServiceError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(reply.result),
        }
    }
}

#[async_trait]
impl FundingSource for NodeRpcClient {
    async fn list_spendable_units(&self, address: &str) -> Result<Vec<SpendableUnit>, ServiceError> {
        let result = self
            .call(
                "listunspent",
                json!([MIN_CONFIRMATIONS, MAX_CONFIRMATIONS, [address]]),
            )
            .await?;
        parse_unspent(result)
    }
}

#[async_trait]
impl TransactionService for NodeRpcClient {
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, ServiceError> {
        let raw = self
            .call("createrawtransaction", raw_transaction_params(tx))
            .await?;
        let raw_hex = raw
            .as_str()
            .ok_or_else(|| ServiceError::InvalidResponse("createrawtransaction: expected hex".into()))?
            .to_string();

        let signed = self.call("signrawtransaction", json!([raw_hex])).await?;
        let reply: SignReply = serde_json::from_value(signed)
            .map_err(|e| ServiceError::InvalidResponse(format!("signrawtransaction: {}", e)))?;

        if !reply.complete {
            return Err(ServiceError::SigningIncomplete(format!(
                "{} inputs, fingerprint {}",
                tx.inputs.len(),
                tx.fingerprint()
            )));
        }

        Ok(SignedTransaction { hex: reply.hex })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastOutcome, ServiceError> {
        match self.call("sendrawtransaction", json!([tx.hex])).await {
            Ok(Value::String(txid)) => Ok(BroadcastOutcome::Accepted(txid)),
            Ok(other) => Err(ServiceError::InvalidResponse(format!(
                "sendrawtransaction: expected txid, got {}",
                other
            ))),
            Err(ServiceError::Rpc { message, .. }) => Ok(BroadcastOutcome::Rejected(message)),
            Err(e) => Err(e),
        }
    }
}
