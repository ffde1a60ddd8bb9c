//! Funding & Submission Runtime
//!
//! Wraps encoded opcodes in funded, fee-paying transactions:
//! - `funding`: greedy input selection, fee/change arithmetic, assembly
//! - `service`: external funding source and signer/broadcaster contracts
//! - `pipeline`: single-flight submission state machine

pub mod funding;
pub mod service;
pub mod pipeline;

pub use funding::{
    build_from_plan, build_transaction, select_inputs,
    FundingError, FundingPlan, FundingResult, InputSelection,
    OutPoint, SpendableUnit, TxOutput, UnsignedTransaction,
    COIN, DEFAULT_TX_FEE,
};

pub use service::{
    BroadcastOutcome, FundingSource, ServiceError, SignedTransaction, TransactionService,
};

pub use pipeline::{
    PipelineError, PipelineResult, PipelineSettings, PipelineStats,
    SubmissionPipeline, SubmissionReceipt, SubmissionState,
};
