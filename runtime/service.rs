//! External collaborators of the submission pipeline
//!
//! The pipeline never holds key material: it asks a `FundingSource` what it
//! may spend and hands unsigned transactions to a `TransactionService`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::funding::{SpendableUnit, UnsignedTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Signing incomplete: {0}")]
    SigningIncomplete(String),
}

/// Opaque signed transaction, as produced by the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Serialized transaction, hex
    pub hex: String,
}

/// Broadcaster's verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastOutcome {
    Accepted(String),
    Rejected(String),
}

/// Lists spendable units for an address, in a stable order
#[async_trait]
pub trait FundingSource: Send + Sync {
    async fn list_spendable_units(&self, address: &str) -> Result<Vec<SpendableUnit>, ServiceError>;
}

/// Signs and broadcasts transactions
#[async_trait]
pub trait TransactionService: Send + Sync {
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, ServiceError>;

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastOutcome, ServiceError>;
}
