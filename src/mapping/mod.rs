//! Mapping Registry
//!
//! Stable numeric ids for human-readable names, one id space per index
//! (sports, rounds, teams, tournaments). The opcode builder queries it to
//! turn names into wire ids; the decoder side renders ids back to names and
//! applies decoded `Mapping` opcodes to it.
//!
//! Registration and query are separate operations. `resolve_id` combines
//! them for callers that want the node's "get or assign" behaviour and
//! reports whether the name existed before the call.

pub mod registry;

pub use registry::InMemoryMappingRegistry;
pub use crate::protocol::records::{MappingIndex, MappingRecord};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for registry operations
pub type MappingResult<T> = Result<T, MappingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("No mapping exists for the mapping index you provided: {0:?}")]
    UnknownIndex(String),

    #[error("No {index} mapping named {name:?}")]
    UnknownName { index: MappingIndex, name: String },

    #[error("{index} id {id} is already mapped to {existing:?}, refusing {requested:?}")]
    IdConflict {
        index: MappingIndex,
        id: u32,
        existing: String,
        requested: String,
    },

    #[error("{index} name {name:?} is already mapped to id {existing_id}, refusing id {requested_id}")]
    NameConflict {
        index: MappingIndex,
        name: String,
        existing_id: u32,
        requested_id: u32,
    },

    #[error("{index} id space exhausted")]
    IdsExhausted { index: MappingIndex },

    #[error("Mapping storage error: {0}")]
    Storage(String),
}

/// Parse an index name as used on the command line and RPC (`"teams"`)
pub fn parse_index(name: &str) -> MappingResult<MappingIndex> {
    MappingIndex::from_name(name).ok_or_else(|| MappingError::UnknownIndex(name.to_string()))
}

/// A stored mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub index: MappingIndex,
    pub id: u32,
    pub name: String,
    /// True when this call created the entry
    pub created: bool,
}

/// Answer of `resolve_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingLookup {
    #[serde(rename = "mapping-index")]
    pub index: MappingIndex,
    #[serde(rename = "mapping-id")]
    pub id: u32,
    /// Whether the name was already registered before this lookup
    pub exists: bool,
}

/// Name ↔ id lookup service
pub trait MappingRegistry: Send + Sync {
    /// Id registered for `name`, if any
    fn find_id(&self, index: MappingIndex, name: &str) -> Option<u32>;

    /// Name registered under `id`, if any
    fn find_name(&self, index: MappingIndex, id: u32) -> Option<String>;

    /// Register `name`, reusing its id when already known
    fn register(&self, index: MappingIndex, name: &str) -> MappingResult<MappingEntry>;

    /// Store an explicit id/name pair (from a decoded mapping opcode).
    /// Neither the id nor the name may already be bound to something else.
    fn apply(&self, record: &MappingRecord) -> MappingResult<MappingEntry>;

    /// Query, then register on miss
    fn resolve_id(&self, index: MappingIndex, name: &str) -> MappingResult<MappingLookup> {
        if let Some(id) = self.find_id(index, name) {
            return Ok(MappingLookup { index, id, exists: true });
        }
        let entry = self.register(index, name)?;
        Ok(MappingLookup {
            index,
            id: entry.id,
            exists: !entry.created,
        })
    }

    /// Like `find_id`, but a miss is an error
    fn require_id(&self, index: MappingIndex, name: &str) -> MappingResult<u32> {
        self.find_id(index, name).ok_or_else(|| MappingError::UnknownName {
            index,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("teams").unwrap(), MappingIndex::Teams);
        assert_eq!(
            parse_index("").unwrap_err(),
            MappingError::UnknownIndex(String::new())
        );
    }

    #[test]
    fn test_lookup_json_field_names() {
        let lookup = MappingLookup {
            index: MappingIndex::Sports,
            id: 0,
            exists: false,
        };
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["mapping-index"], "sports");
        assert_eq!(json["mapping-id"], 0);
        assert_eq!(json["exists"], false);
    }
}
