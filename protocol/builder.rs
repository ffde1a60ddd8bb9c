//! Record builder and renderer
//!
//! `build_record` turns operator input in human units (decimal odds, points,
//! team names) into a wire-ready `OpcodeRecord`. All scaling and name
//! resolution happens here so the codec only ever sees integers.
//! `render_record` goes the other way for display.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::fixed_point::{
    fixed_to_odds, odds_to_fixed, points_to_tenths, score_to_tenths, tenths_to_points,
    tenths_to_total, total_points_to_tenths,
};
use super::opcode::{OpcodeError, OpcodeResult};
use super::records::{
    EventPatchRecord, EventRecord, MappingIndex, MappingRecord, MoneylineRecord, OpcodeRecord,
    ResultRecord, ResultType, SpreadRecord, TotalRecord,
};
use crate::mapping::{parse_index, MappingError, MappingRegistry};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Opcode(#[from] OpcodeError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

pub type BuildResult<T> = Result<T, BuildError>;

// ============================================================================
// INPUT
// ============================================================================

/// A mapped entity given either by id or by registered name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingRef {
    Id(u64),
    Name(String),
}

impl Default for MappingRef {
    fn default() -> Self {
        MappingRef::Id(0)
    }
}

/// Operator input for one opcode, in human units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordFields {
    Mapping {
        index: String,
        name: String,
        /// Register the name and use the assigned id when absent
        #[serde(default)]
        id: Option<u64>,
    },
    Event {
        event_id: u64,
        start_time: u64,
        sport: MappingRef,
        tournament: MappingRef,
        #[serde(default)]
        stage: MappingRef,
        home_team: MappingRef,
        away_team: MappingRef,
        home_odds: f64,
        away_odds: f64,
        draw_odds: f64,
    },
    EventPatch {
        event_id: u64,
        start_time: u64,
    },
    Result {
        event_id: u64,
        result_type: ResultType,
        home_score: f64,
        away_score: f64,
    },
    Moneyline {
        event_id: u64,
        home_odds: f64,
        away_odds: f64,
        draw_odds: f64,
    },
    Spread {
        event_id: u64,
        points: f64,
        home_odds: f64,
        away_odds: f64,
    },
    Total {
        event_id: u64,
        points: f64,
        over_odds: f64,
        under_odds: f64,
    },
}

// ============================================================================
// BUILD
// ============================================================================

fn narrow<T: TryFrom<u64>>(field: &'static str, value: u64) -> OpcodeResult<T> {
    T::try_from(value).map_err(|_| {
        OpcodeError::range(
            field,
            format!("{} does not fit in {} bytes", value, std::mem::size_of::<T>()),
        )
    })
}

fn resolve<T: TryFrom<u64>>(
    registry: &dyn MappingRegistry,
    field: &'static str,
    index: MappingIndex,
    reference: &MappingRef,
) -> BuildResult<T> {
    let id = match reference {
        MappingRef::Id(id) => *id,
        MappingRef::Name(name) => registry.require_id(index, name)? as u64,
    };
    Ok(narrow(field, id)?)
}

/// Build a wire record from operator input
pub fn build_record(fields: &RecordFields, registry: &dyn MappingRegistry) -> BuildResult<OpcodeRecord> {
    let record = match fields {
        RecordFields::Mapping { index, name, id } => {
            let index = parse_index(index)?;
            let record = match id {
                Some(id) => {
                    let record = MappingRecord {
                        index,
                        mapping_id: narrow("mapping_id", *id)?,
                        name: name.clone(),
                    };
                    // An explicit id must agree with what the registry already holds
                    registry.apply(&record)?;
                    record
                }
                None => MappingRecord {
                    index,
                    mapping_id: registry.register(index, name)?.id,
                    name: name.clone(),
                },
            };
            OpcodeRecord::Mapping(record)
        }
        RecordFields::Event {
            event_id,
            start_time,
            sport,
            tournament,
            stage,
            home_team,
            away_team,
            home_odds,
            away_odds,
            draw_odds,
        } => OpcodeRecord::Event(EventRecord {
            event_id: narrow("event_id", *event_id)?,
            start_time: narrow("start_time", *start_time)?,
            sport_id: resolve(registry, "sport_id", MappingIndex::Sports, sport)?,
            tournament_id: resolve(registry, "tournament_id", MappingIndex::Tournaments, tournament)?,
            stage_id: resolve(registry, "stage_id", MappingIndex::Rounds, stage)?,
            home_team_id: resolve(registry, "home_team_id", MappingIndex::Teams, home_team)?,
            away_team_id: resolve(registry, "away_team_id", MappingIndex::Teams, away_team)?,
            home_odds: odds_to_fixed("home_odds", *home_odds)?,
            away_odds: odds_to_fixed("away_odds", *away_odds)?,
            draw_odds: odds_to_fixed("draw_odds", *draw_odds)?,
        }),
        RecordFields::EventPatch { event_id, start_time } => OpcodeRecord::EventPatch(EventPatchRecord {
            event_id: narrow("event_id", *event_id)?,
            start_time: narrow("start_time", *start_time)?,
        }),
        RecordFields::Result {
            event_id,
            result_type,
            home_score,
            away_score,
        } => OpcodeRecord::Result(ResultRecord {
            event_id: narrow("event_id", *event_id)?,
            result_type: *result_type,
            home_score: score_to_tenths("home_score", *home_score)?,
            away_score: score_to_tenths("away_score", *away_score)?,
        }),
        RecordFields::Moneyline {
            event_id,
            home_odds,
            away_odds,
            draw_odds,
        } => OpcodeRecord::Moneyline(MoneylineRecord {
            event_id: narrow("event_id", *event_id)?,
            home_odds: odds_to_fixed("home_odds", *home_odds)?,
            away_odds: odds_to_fixed("away_odds", *away_odds)?,
            draw_odds: odds_to_fixed("draw_odds", *draw_odds)?,
        }),
        RecordFields::Spread {
            event_id,
            points,
            home_odds,
            away_odds,
        } => OpcodeRecord::Spread(SpreadRecord {
            event_id: narrow("event_id", *event_id)?,
            spread_points: points_to_tenths("spread_points", *points)?,
            home_odds: odds_to_fixed("home_odds", *home_odds)?,
            away_odds: odds_to_fixed("away_odds", *away_odds)?,
        }),
        RecordFields::Total {
            event_id,
            points,
            over_odds,
            under_odds,
        } => OpcodeRecord::Total(TotalRecord {
            event_id: narrow("event_id", *event_id)?,
            total_points: total_points_to_tenths("total_points", *points)?,
            over_odds: odds_to_fixed("over_odds", *over_odds)?,
            under_odds: odds_to_fixed("under_odds", *under_odds)?,
        }),
    };

    Ok(record)
}

// ============================================================================
// RENDER
// ============================================================================

fn name_or_id(registry: &dyn MappingRegistry, index: MappingIndex, id: u32) -> serde_json::Value {
    match registry.find_name(index, id) {
        Some(name) => json!({ "id": id, "name": name }),
        None => json!({ "id": id }),
    }
}

/// JSON view of a record with decimals and names filled in
pub fn render_record(record: &OpcodeRecord, registry: &dyn MappingRegistry) -> serde_json::Value {
    match record {
        OpcodeRecord::Mapping(r) => json!({
            "type": "mapping",
            "index": r.index.as_str(),
            "mapping_id": r.mapping_id,
            "name": r.name,
        }),
        OpcodeRecord::Event(r) => json!({
            "type": "event",
            "event_id": r.event_id,
            "start_time": r.start_time,
            "sport": name_or_id(registry, MappingIndex::Sports, r.sport_id as u32),
            "tournament": name_or_id(registry, MappingIndex::Tournaments, r.tournament_id as u32),
            "stage": name_or_id(registry, MappingIndex::Rounds, r.stage_id as u32),
            "home_team": name_or_id(registry, MappingIndex::Teams, r.home_team_id),
            "away_team": name_or_id(registry, MappingIndex::Teams, r.away_team_id),
            "home_odds": fixed_to_odds(r.home_odds),
            "away_odds": fixed_to_odds(r.away_odds),
            "draw_odds": fixed_to_odds(r.draw_odds),
        }),
        OpcodeRecord::EventPatch(r) => json!({
            "type": "event_patch",
            "event_id": r.event_id,
            "start_time": r.start_time,
        }),
        OpcodeRecord::Result(r) => json!({
            "type": "result",
            "event_id": r.event_id,
            "result_type": r.result_type,
            "home_score": tenths_to_total(r.home_score),
            "away_score": tenths_to_total(r.away_score),
        }),
        OpcodeRecord::Moneyline(r) => json!({
            "type": "moneyline",
            "event_id": r.event_id,
            "home_odds": fixed_to_odds(r.home_odds),
            "away_odds": fixed_to_odds(r.away_odds),
            "draw_odds": fixed_to_odds(r.draw_odds),
        }),
        OpcodeRecord::Spread(r) => json!({
            "type": "spread",
            "event_id": r.event_id,
            "points": tenths_to_points(r.spread_points),
            "home_odds": fixed_to_odds(r.home_odds),
            "away_odds": fixed_to_odds(r.away_odds),
        }),
        OpcodeRecord::Total(r) => json!({
            "type": "total",
            "event_id": r.event_id,
            "points": tenths_to_total(r.total_points),
            "over_odds": fixed_to_odds(r.over_odds),
            "under_odds": fixed_to_odds(r.under_odds),
        }),
    }
}
