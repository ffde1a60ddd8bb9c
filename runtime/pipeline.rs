//! Submission Pipeline
//!
//! Turns an encoded opcode into a funded, signed, broadcast transaction:
//!
//! ```text
//! Idle -> InputsSelected -> TransactionBuilt -> Signed -> Broadcast -> Confirmed | Rejected
//! ```
//!
//! At most one submission per funding address is in flight; concurrent
//! callers queue on a per-address lock so they never select the same units.
//! Nothing is retried here: a rejection or funding failure goes back to the
//! caller, who must re-read balances before trying again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use super::funding::{
    build_from_plan, select_inputs, FundingError, FundingPlan, DEFAULT_TX_FEE,
};
use super::service::{BroadcastOutcome, FundingSource, ServiceError, TransactionService};
use crate::protocol::{encode, OpcodeError, OpcodeRecord};

// ============================================================================
// STATE & ERRORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionState {
    Idle,
    InputsSelected,
    TransactionBuilt,
    Signed,
    Broadcast,
    Confirmed,
    Rejected,
}

impl SubmissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Confirmed | SubmissionState::Rejected)
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Opcode(#[from] OpcodeError),

    #[error(transparent)]
    Funding(#[from] FundingError),

    #[error("Funding source failed: {0}")]
    FundingSource(ServiceError),

    #[error("Signing failed: {0}")]
    Signing(ServiceError),

    #[error("Broadcast failed: {0}")]
    Broadcast(ServiceError),

    /// Broadcaster declined the transaction; reason is passed through verbatim
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),
}

// ============================================================================
// SETTINGS & RECEIPT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Address whose units fund the fee and which receives the change
    pub funding_address: String,
    pub fee: u64,
    /// Sign but never broadcast
    pub dry_run: bool,
}

impl PipelineSettings {
    pub fn new(funding_address: impl Into<String>) -> Self {
        Self {
            funding_address: funding_address.into(),
            fee: DEFAULT_TX_FEE,
            dry_run: false,
        }
    }
}

/// Outcome of a submission that reached a resting state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Set once the broadcaster accepted the transaction
    pub txid: Option<String>,
    pub state: SubmissionState,
    pub plan: FundingPlan,
    pub opcode_hex: String,
    pub fingerprint: String,
    pub signed_hex: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub submissions: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub dry_runs: u64,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct SubmissionPipeline {
    source: Arc<dyn FundingSource>,
    service: Arc<dyn TransactionService>,
    settings: PipelineSettings,
    /// Single-flight lock per funding address
    in_flight: DashMap<String, Arc<TokioMutex<()>>>,

    submissions: AtomicU64,
    confirmed: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    dry_runs: AtomicU64,
}

impl SubmissionPipeline {
    pub fn new(
        source: Arc<dyn FundingSource>,
        service: Arc<dyn TransactionService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            service,
            settings,
            in_flight: DashMap::new(),
            submissions: AtomicU64::new(0),
            confirmed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dry_runs: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Encode `record` and submit it
    pub async fn submit_record(&self, record: &OpcodeRecord) -> PipelineResult<SubmissionReceipt> {
        let opcode = encode(record)?;
        self.submit(&opcode).await
    }

    /// Fund, sign and broadcast a transaction carrying `opcode` from the
    /// configured funding address
    pub async fn submit(&self, opcode: &[u8]) -> PipelineResult<SubmissionReceipt> {
        let address = self.settings.funding_address.clone();
        self.submit_from(&address, opcode).await
    }

    /// Same as [`submit`](Self::submit) but funded (and paid back) to
    /// `funding_address`. Calls for different addresses run side by side.
    pub async fn submit_from(
        &self,
        funding_address: &str,
        opcode: &[u8],
    ) -> PipelineResult<SubmissionReceipt> {
        if opcode.is_empty() {
            return Err(FundingError::EmptyPayload.into());
        }

        let lock = self
            .in_flight
            .entry(funding_address.to_string())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        self.submissions.fetch_add(1, Ordering::Relaxed);
        let result = self.run(funding_address, opcode).await;

        match &result {
            Ok(receipt) if receipt.state == SubmissionState::Confirmed => {
                self.confirmed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                self.dry_runs.fetch_add(1, Ordering::Relaxed);
            }
            Err(PipelineError::SubmissionRejected(reason)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Opcode {} rejected: {}", hex::encode(opcode), reason);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Opcode {} not submitted: {}", hex::encode(opcode), e);
            }
        }

        result
    }

    async fn run(&self, address: &str, opcode: &[u8]) -> PipelineResult<SubmissionReceipt> {
        let opcode_hex = hex::encode(opcode);
        let mut state = SubmissionState::Idle;

        let units = self
            .source
            .list_spendable_units(address)
            .await
            .map_err(PipelineError::FundingSource)?;
        let selection = select_inputs(&units, self.settings.fee)?;
        let plan = FundingPlan::new(selection, self.settings.fee)?;
        advance(&mut state, SubmissionState::InputsSelected, &opcode_hex);
        debug!(
            "Selected {} of {} units, total {} fee {} change {}",
            plan.selected.len(),
            units.len(),
            plan.total,
            plan.fee,
            plan.change
        );

        let unsigned = build_from_plan(&plan, opcode, address)?;
        let fingerprint = unsigned.fingerprint();
        advance(&mut state, SubmissionState::TransactionBuilt, &opcode_hex);

        let signed = self
            .service
            .sign(&unsigned)
            .await
            .map_err(PipelineError::Signing)?;
        advance(&mut state, SubmissionState::Signed, &opcode_hex);

        let mut receipt = SubmissionReceipt {
            txid: None,
            state,
            plan,
            opcode_hex,
            fingerprint,
            signed_hex: signed.hex.clone(),
            submitted_at: Utc::now(),
        };

        if self.settings.dry_run {
            info!("Dry run: not broadcasting opcode {}", receipt.opcode_hex);
            return Ok(receipt);
        }

        advance(&mut receipt.state, SubmissionState::Broadcast, &receipt.opcode_hex);
        let outcome = self
            .service
            .broadcast(&signed)
            .await
            .map_err(PipelineError::Broadcast)?;

        match outcome {
            BroadcastOutcome::Accepted(txid) => {
                advance(&mut receipt.state, SubmissionState::Confirmed, &receipt.opcode_hex);
                info!("Opcode {} sent in transaction {}", receipt.opcode_hex, txid);
                receipt.txid = Some(txid);
                Ok(receipt)
            }
            BroadcastOutcome::Rejected(reason) => {
                advance(&mut receipt.state, SubmissionState::Rejected, &receipt.opcode_hex);
                Err(PipelineError::SubmissionRejected(reason))
            }
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            submissions: self.submissions.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dry_runs: self.dry_runs.load(Ordering::Relaxed),
        }
    }
}

fn advance(state: &mut SubmissionState, next: SubmissionState, opcode_hex: &str) {
    debug!("Opcode {}: {:?} -> {:?}", opcode_hex, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SubmissionState::Confirmed.is_terminal());
        assert!(SubmissionState::Rejected.is_terminal());
        assert!(!SubmissionState::Signed.is_terminal());
    }

    #[test]
    fn test_settings_default_fee() {
        let settings = PipelineSettings::new("TFvZVYGdrxxNunQLzSnRSC58BSRA7si6zu");
        assert_eq!(settings.fee, DEFAULT_TX_FEE);
        assert!(!settings.dry_run);
    }
}
