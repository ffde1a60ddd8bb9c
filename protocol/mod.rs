//! Betting Opcode Protocol
//!
//! Bit-exact wire format for oracle betting instructions carried as
//! auxiliary (null-data) transaction outputs:
//! - `opcode`: header constants, type tags, codec errors
//! - `records`: one record type per betting operation
//! - `codec`: pure encode/decode, safe on adversarial input
//! - `fixed_point`: odds/points scaling, kept out of the codec
//! - `builder`: operator input -> record, record -> display JSON

pub mod opcode;
pub mod records;
pub mod codec;
pub mod fixed_point;
pub mod builder;

pub use opcode::{
    MalformedOpcode, OpcodeError, OpcodeResult, TypeTag,
    HEADER_LEN, MAX_OPCODE_BYTES, OPCODE_PREFIX, OPCODE_VERSION,
};
pub use records::{
    EventPatchRecord, EventRecord, MappingIndex, MappingRecord, MoneylineRecord,
    OpcodeRecord, ResultRecord, ResultType, SpreadRecord, TotalRecord,
};
pub use codec::{decode, decode_hex, encode, encode_hex, looks_like_opcode};
pub use builder::{build_record, render_record, BuildError, BuildResult, MappingRef, RecordFields};
