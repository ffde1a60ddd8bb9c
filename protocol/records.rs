//! Opcode record types
//!
//! One struct per betting operation. Fixed-width bodies derive Borsh, whose
//! encoding of integers is exactly the wire layout: little-endian, fixed
//! width, fields in declaration order, no padding. Field order here IS the
//! wire order - do not reorder.
//!
//! Odds are stored ×10 000, points and scores ×10 (see `fixed_point.rs`).

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::opcode::TypeTag;

// ============================================================================
// ENUMERATED FIELDS
// ============================================================================

/// Named index a mapping belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MappingIndex {
    Sports = 0x01,
    Rounds = 0x02,
    Teams = 0x03,
    Tournaments = 0x04,
}

impl MappingIndex {
    pub const ALL: [MappingIndex; 4] = [
        MappingIndex::Sports,
        MappingIndex::Rounds,
        MappingIndex::Teams,
        MappingIndex::Tournaments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MappingIndex::Sports => "sports",
            MappingIndex::Rounds => "rounds",
            MappingIndex::Teams => "teams",
            MappingIndex::Tournaments => "tournaments",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|index| index.as_str() == name)
    }
}

impl std::fmt::Display for MappingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an event was settled
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ResultType {
    /// Normal result, winning bets are paid out
    Payout = 0x01,
    /// Whole event refunded
    EventRefund = 0x02,
    /// Moneyline market refunded
    MoneylineRefund = 0x03,
    SpreadsRefund = 0x04,
    TotalsRefund = 0x05,
}

// ============================================================================
// FIXED-WIDTH BODIES
// ============================================================================

/// New event with its schedule, participants and opening moneyline odds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EventRecord {
    pub event_id: u32,
    /// Unix seconds
    pub start_time: u32,
    pub sport_id: u16,
    pub tournament_id: u16,
    pub stage_id: u16,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

/// Reschedule an existing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EventPatchRecord {
    pub event_id: u32,
    pub start_time: u32,
}

/// Settlement of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ResultRecord {
    pub event_id: u32,
    pub result_type: ResultType,
    pub home_score: u16,
    pub away_score: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MoneylineRecord {
    pub event_id: u32,
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SpreadRecord {
    pub event_id: u32,
    /// Signed tenths, home team perspective
    pub spread_points: i16,
    pub home_odds: u32,
    pub away_odds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TotalRecord {
    pub event_id: u32,
    pub total_points: u16,
    pub over_odds: u32,
    pub under_odds: u32,
}

// ============================================================================
// MAPPING (VARIABLE LENGTH)
// ============================================================================

/// Name registration. The name runs to the end of the payload, so this body
/// is laid out by hand rather than through Borsh (which would length-prefix it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub index: MappingIndex,
    pub mapping_id: u32,
    pub name: String,
}

/// Fixed part of a mapping body: mapping_type + mapping_id
#[derive(BorshSerialize, BorshDeserialize)]
pub(crate) struct MappingHeader {
    pub index: MappingIndex,
    pub mapping_id: u32,
}

pub(crate) const MAPPING_HEADER_LEN: usize = 5;

// ============================================================================
// OPCODE RECORD
// ============================================================================

/// One betting instruction, as carried in a transaction's auxiliary data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpcodeRecord {
    Mapping(MappingRecord),
    Event(EventRecord),
    EventPatch(EventPatchRecord),
    Result(ResultRecord),
    Moneyline(MoneylineRecord),
    Spread(SpreadRecord),
    Total(TotalRecord),
}

impl OpcodeRecord {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            OpcodeRecord::Mapping(_) => TypeTag::Mapping,
            OpcodeRecord::Event(_) => TypeTag::Event,
            OpcodeRecord::EventPatch(_) => TypeTag::EventPatch,
            OpcodeRecord::Result(_) => TypeTag::Result,
            OpcodeRecord::Moneyline(_) => TypeTag::Moneyline,
            OpcodeRecord::Spread(_) => TypeTag::Spread,
            OpcodeRecord::Total(_) => TypeTag::Total,
        }
    }

    /// Event the record refers to (mappings have none)
    pub fn event_id(&self) -> Option<u32> {
        match self {
            OpcodeRecord::Mapping(_) => None,
            OpcodeRecord::Event(r) => Some(r.event_id),
            OpcodeRecord::EventPatch(r) => Some(r.event_id),
            OpcodeRecord::Result(r) => Some(r.event_id),
            OpcodeRecord::Moneyline(r) => Some(r.event_id),
            OpcodeRecord::Spread(r) => Some(r.event_id),
            OpcodeRecord::Total(r) => Some(r.event_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_index_names() {
        for index in MappingIndex::ALL {
            assert_eq!(MappingIndex::from_name(index.as_str()), Some(index));
        }
        assert_eq!(MappingIndex::from_name("leagues"), None);
        assert_eq!(MappingIndex::from_name(""), None);
    }

    #[test]
    fn test_record_json_is_tagged() {
        let record = OpcodeRecord::EventPatch(EventPatchRecord {
            event_id: 42,
            start_time: 1_570_000_000,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "event_patch");
        assert_eq!(json["event_id"], 42);

        let back: OpcodeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_event_id_accessor() {
        let record = OpcodeRecord::Mapping(MappingRecord {
            index: MappingIndex::Teams,
            mapping_id: 7,
            name: "Chicago Bulls".to_string(),
        });
        assert_eq!(record.event_id(), None);
        assert_eq!(record.type_tag(), TypeTag::Mapping);
    }
}
