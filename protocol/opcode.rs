//! Opcode wire constants, type tags and codec errors
//!
//! Every betting opcode starts with the same three-byte header:
//!
//! ```text
//! [prefix 0x2A][version 0x01][type tag]
//! ```
//!
//! followed by a fixed-width little-endian body chosen by the type tag
//! (see `records.rs`). The tag set is closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// WIRE CONSTANTS
// ============================================================================

/// Marker byte identifying a byte stream as a betting opcode
pub const OPCODE_PREFIX: u8 = 0x2A;

/// Highest protocol version this implementation reads and the one it writes
pub const OPCODE_VERSION: u8 = 0x01;

/// Prefix + version + type tag
pub const HEADER_LEN: usize = 3;

/// Standard null-data relay limit for auxiliary transaction data
pub const MAX_OPCODE_BYTES: usize = 80;

// ============================================================================
// TYPE TAGS
// ============================================================================

/// Closed set of betting opcode types.
///
/// The numeric values match the node's betting transaction type identifiers;
/// gaps (0x03, 0x06-0x08) belong to bet placement and chain games, which are
/// not oracle opcodes and are refused by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TypeTag {
    Mapping = 0x01,
    Event = 0x02,
    Result = 0x04,
    Moneyline = 0x05,
    Spread = 0x09,
    Total = 0x0a,
    EventPatch = 0x0b,
}

impl TypeTag {
    pub const ALL: [TypeTag; 7] = [
        TypeTag::Mapping,
        TypeTag::Event,
        TypeTag::Result,
        TypeTag::Moneyline,
        TypeTag::Spread,
        TypeTag::Total,
        TypeTag::EventPatch,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| *tag as u8 == byte)
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Body length for fixed-width variants, `None` for `Mapping`
    pub fn body_len(self) -> Option<usize> {
        match self {
            TypeTag::Mapping => None,
            TypeTag::Event => Some(34),
            TypeTag::Result => Some(9),
            TypeTag::Moneyline => Some(16),
            TypeTag::Spread => Some(14),
            TypeTag::Total => Some(14),
            TypeTag::EventPatch => Some(8),
        }
    }

    /// Smallest body the decoder accepts for this tag
    pub fn min_body_len(self) -> usize {
        match self.body_len() {
            Some(len) => len,
            // mapping_type + mapping_id, name may be empty
            None => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Mapping => "mapping",
            TypeTag::Event => "event",
            TypeTag::Result => "result",
            TypeTag::Moneyline => "moneyline",
            TypeTag::Spread => "spread",
            TypeTag::Total => "total",
            TypeTag::EventPatch => "event_patch",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.as_byte())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Result type for codec operations
pub type OpcodeResult<T> = Result<T, OpcodeError>;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpcodeError {
    /// Caller supplied a value that does not fit its wire field
    #[error("Field {field} out of range: {detail}")]
    EncodingRange {
        field: &'static str,
        detail: String,
    },

    /// Untrusted input failed a structural check
    #[error("Malformed opcode: {0}")]
    Malformed(#[from] MalformedOpcode),

    /// Input declares a protocol version newer than this decoder
    #[error("Unknown opcode version {found} (supported up to {supported})")]
    UnknownVersion { found: u8, supported: u8 },
}

impl OpcodeError {
    /// Decoder failures that mean "discard this record"
    pub fn is_malformed(&self) -> bool {
        matches!(self, OpcodeError::Malformed(_) | OpcodeError::UnknownVersion { .. })
    }

    pub(crate) fn range(field: &'static str, detail: impl Into<String>) -> Self {
        OpcodeError::EncodingRange {
            field,
            detail: detail.into(),
        }
    }
}

/// Structural reasons a byte string is not a valid opcode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedOpcode {
    #[error("truncated input: need at least {needed} bytes, got {found}")]
    Truncated { needed: usize, found: usize },

    #[error("input of {found} bytes exceeds the {max} byte data limit")]
    TooLong { found: usize, max: usize },

    #[error("bad prefix byte 0x{0:02x}")]
    BadPrefix(u8),

    #[error("invalid version byte 0x{0:02x}")]
    InvalidVersion(u8),

    #[error("unknown type tag 0x{0:02x}")]
    UnknownTypeTag(u8),

    #[error("{tag} body must be {expected} bytes, got {found}")]
    LengthMismatch {
        tag: TypeTag,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field}: {detail}")]
    InvalidField { field: &'static str, detail: String },
}
