//! Bet Oracle
//!
//! Oracle-side tooling for a betting protocol carried in transaction data
//! outputs.
//!
//! ## Layout
//!
//! - **protocol**: opcode wire format, records, fixed-point scaling, builder
//! - **runtime**: input selection, transaction assembly, submission pipeline
//! - **mapping**: name <-> numeric id registry for sports, rounds, teams, tournaments
//! - **rpc**: node JSON-RPC client backing the pipeline
//! - **config**: network and operator settings from `BET_ORACLE_*`

// Infrastructure
#[path = "../protocol/mod.rs"]
pub mod protocol;
#[path = "../runtime/mod.rs"]
pub mod runtime;

pub mod config;
pub mod mapping;
pub mod rpc;

// ============================================================================
// PUBLIC API
// ============================================================================

// Wire format
pub use protocol::{
    build_record, decode, decode_hex, encode, encode_hex, looks_like_opcode, render_record,
    BuildError, EventPatchRecord, EventRecord, MalformedOpcode, MappingIndex, MappingRecord,
    MappingRef, MoneylineRecord, OpcodeError, OpcodeRecord, RecordFields, ResultRecord,
    ResultType, SpreadRecord, TotalRecord, TypeTag, MAX_OPCODE_BYTES, OPCODE_PREFIX,
    OPCODE_VERSION,
};

// Funding & submission
pub use runtime::{
    build_transaction, select_inputs, BroadcastOutcome, FundingError, FundingPlan, FundingSource,
    PipelineError, PipelineSettings, PipelineStats, ServiceError, SignedTransaction,
    SpendableUnit, SubmissionPipeline, SubmissionReceipt, SubmissionState, TransactionService,
    UnsignedTransaction, COIN, DEFAULT_TX_FEE,
};

// Mapping registry
pub use mapping::{
    InMemoryMappingRegistry, MappingEntry, MappingError, MappingLookup, MappingRegistry,
};

pub use config::{ConfigError, Network, OracleConfig, RpcConfig};
pub use rpc::NodeRpcClient;
