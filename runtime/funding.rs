//! Funding: input selection and transaction assembly
//!
//! Amounts are integer base units (`COIN` per coin). Selection is greedy in
//! the order the funding source returned the units, so that order is part
//! of the contract: the same unit list always yields the same plan.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Base units per coin
pub const COIN: u64 = 100_000_000;

/// Flat fee paid by every opcode transaction (0.001 coin)
pub const DEFAULT_TX_FEE: u64 = 100_000;

/// Result type for funding operations
pub type FundingResult<T> = Result<T, FundingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundingError {
    #[error("Insufficient funds: {available} available, need more than {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Negative change: inputs {total} < fee {fee}")]
    NegativeChange { total: u64, fee: u64 },

    #[error("Input amounts overflow")]
    AmountOverflow,

    #[error("Opcode payload is empty")]
    EmptyPayload,
}

// ============================================================================
// TYPES
// ============================================================================

/// An unspent output the operator can spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableUnit {
    pub txid: String,
    pub vout: u32,
    pub amount: u64,
}

/// Reference to a spent output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

impl From<&SpendableUnit> for OutPoint {
    fn from(unit: &SpendableUnit) -> Self {
        Self {
            txid: unit.txid.clone(),
            vout: unit.vout,
        }
    }
}

/// Units chosen by `select_inputs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSelection {
    pub selected: Vec<SpendableUnit>,
    pub total: u64,
}

/// Inputs plus the fee/change split for one submission; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPlan {
    pub selected: Vec<SpendableUnit>,
    pub total: u64,
    pub fee: u64,
    pub change: u64,
}

impl FundingPlan {
    pub fn new(selection: InputSelection, fee: u64) -> FundingResult<Self> {
        let change = selection
            .total
            .checked_sub(fee)
            .ok_or(FundingError::NegativeChange {
                total: selection.total,
                fee,
            })?;
        Ok(Self {
            selected: selection.selected,
            total: selection.total,
            fee,
            change,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxOutput {
    /// Spendable payment
    Payment { address: String, amount: u64 },
    /// Zero-value, unspendable auxiliary data
    Data {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
}

/// Transaction ready for the external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOutput>,
}

impl UnsignedTransaction {
    /// Auxiliary data carried by the transaction, if any
    pub fn opcode_data(&self) -> Option<&[u8]> {
        self.outputs.iter().find_map(|output| match output {
            TxOutput::Data { data } => Some(data.as_slice()),
            TxOutput::Payment { .. } => None,
        })
    }

    /// Sum of payment outputs
    pub fn payment_total(&self) -> u64 {
        self.outputs
            .iter()
            .map(|output| match output {
                TxOutput::Payment { amount, .. } => *amount,
                TxOutput::Data { .. } => 0,
            })
            .sum()
    }

    /// SHA-256 over the JSON form, for correlating log lines
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&json))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SELECTION
// ============================================================================

/// Accumulate units in order until the running total strictly exceeds
/// `minimum_amount`, stopping at the first unit that crosses it.
pub fn select_inputs(available: &[SpendableUnit], minimum_amount: u64) -> FundingResult<InputSelection> {
    let mut selected = Vec::new();
    let mut total: u64 = 0;

    for unit in available {
        total = total
            .checked_add(unit.amount)
            .ok_or(FundingError::AmountOverflow)?;
        selected.push(unit.clone());

        if total > minimum_amount {
            return Ok(InputSelection { selected, total });
        }
    }

    Err(FundingError::InsufficientFunds {
        available: total,
        required: minimum_amount,
    })
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Build `[change -> change_address, data -> opcode]` spending `selected`
pub fn build_transaction(
    selected: &[SpendableUnit],
    total: u64,
    opcode: &[u8],
    fee: u64,
    change_address: &str,
) -> FundingResult<UnsignedTransaction> {
    if opcode.is_empty() {
        return Err(FundingError::EmptyPayload);
    }

    let change = total
        .checked_sub(fee)
        .ok_or(FundingError::NegativeChange { total, fee })?;

    Ok(UnsignedTransaction {
        inputs: selected.iter().map(OutPoint::from).collect(),
        outputs: vec![
            TxOutput::Payment {
                address: change_address.to_string(),
                amount: change,
            },
            TxOutput::Data {
                data: opcode.to_vec(),
            },
        ],
    })
}

/// `build_transaction` from a plan
pub fn build_from_plan(
    plan: &FundingPlan,
    opcode: &[u8],
    change_address: &str,
) -> FundingResult<UnsignedTransaction> {
    build_transaction(&plan.selected, plan.total, opcode, plan.fee, change_address)
}
