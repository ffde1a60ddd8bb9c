//! In-memory mapping registry with JSON snapshots
//!
//! Snapshot writes go to a temp file first and are renamed into place so a
//! crash mid-save never leaves a truncated snapshot behind.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{MappingEntry, MappingError, MappingIndex, MappingRecord, MappingRegistry, MappingResult};

#[derive(Debug, Default)]
struct IndexTable {
    by_id: BTreeMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl IndexTable {
    fn next_id(&self) -> Option<u32> {
        match self.by_id.keys().next_back() {
            None => Some(0),
            Some(max) => max.checked_add(1),
        }
    }

    fn insert(&mut self, id: u32, name: &str) {
        self.by_id.insert(id, name.to_string());
        self.by_name.insert(name.to_string(), id);
    }
}

/// Thread-safe registry held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryMappingRegistry {
    tables: RwLock<HashMap<MappingIndex, IndexTable>>,
}

impl InMemoryMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in one index
    pub fn len(&self, index: MappingIndex) -> usize {
        self.tables
            .read()
            .get(&index)
            .map(|table| table.by_id.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(|table| table.by_id.is_empty())
    }

    /// All entries, ordered by index then id
    pub fn entries(&self) -> Vec<MappingRecord> {
        let tables = self.tables.read();
        let mut records = Vec::new();
        for index in MappingIndex::ALL {
            if let Some(table) = tables.get(&index) {
                for (id, name) in &table.by_id {
                    records.push(MappingRecord {
                        index,
                        mapping_id: *id,
                        name: name.clone(),
                    });
                }
            }
        }
        records
    }

    /// Write a JSON snapshot of every entry
    pub fn save_to(&self, path: &Path) -> MappingResult<()> {
        let records = self.entries();
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| MappingError::Storage(e.to_string()))?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).map_err(|e| MappingError::Storage(e.to_string()))?;
        fs::rename(&temp_path, path).map_err(|e| MappingError::Storage(e.to_string()))?;

        info!("Saved {} mappings to {}", records.len(), path.display());
        Ok(())
    }

    /// Load a snapshot written by `save_to`
    pub fn load_from(path: &Path) -> MappingResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| MappingError::Storage(e.to_string()))?;
        let records: Vec<MappingRecord> =
            serde_json::from_str(&json).map_err(|e| MappingError::Storage(e.to_string()))?;

        let registry = Self::new();
        for record in &records {
            registry.apply(record)?;
        }

        info!("Loaded {} mappings from {}", records.len(), path.display());
        Ok(registry)
    }
}

impl MappingRegistry for InMemoryMappingRegistry {
    fn find_id(&self, index: MappingIndex, name: &str) -> Option<u32> {
        self.tables
            .read()
            .get(&index)
            .and_then(|table| table.by_name.get(name).copied())
    }

    fn find_name(&self, index: MappingIndex, id: u32) -> Option<String> {
        self.tables
            .read()
            .get(&index)
            .and_then(|table| table.by_id.get(&id).cloned())
    }

    fn register(&self, index: MappingIndex, name: &str) -> MappingResult<MappingEntry> {
        let mut tables = self.tables.write();
        let table = tables.entry(index).or_default();

        if let Some(id) = table.by_name.get(name) {
            return Ok(MappingEntry {
                index,
                id: *id,
                name: name.to_string(),
                created: false,
            });
        }

        let id = table.next_id().ok_or(MappingError::IdsExhausted { index })?;
        table.insert(id, name);
        debug!("Registered {} mapping {} -> {:?}", index, id, name);

        Ok(MappingEntry {
            index,
            id,
            name: name.to_string(),
            created: true,
        })
    }

    fn apply(&self, record: &MappingRecord) -> MappingResult<MappingEntry> {
        let mut tables = self.tables.write();
        let table = tables.entry(record.index).or_default();

        if let Some(existing_id) = table.by_name.get(&record.name) {
            if *existing_id != record.mapping_id {
                return Err(MappingError::NameConflict {
                    index: record.index,
                    name: record.name.clone(),
                    existing_id: *existing_id,
                    requested_id: record.mapping_id,
                });
            }
        }

        match table.by_id.get(&record.mapping_id) {
            Some(existing) if *existing == record.name => Ok(MappingEntry {
                index: record.index,
                id: record.mapping_id,
                name: record.name.clone(),
                created: false,
            }),
            Some(existing) => Err(MappingError::IdConflict {
                index: record.index,
                id: record.mapping_id,
                existing: existing.clone(),
                requested: record.name.clone(),
            }),
            None => {
                table.insert(record.mapping_id, &record.name);
                debug!(
                    "Applied {} mapping {} -> {:?}",
                    record.index, record.mapping_id, record.name
                );
                Ok(MappingEntry {
                    index: record.index,
                    id: record.mapping_id,
                    name: record.name.clone(),
                    created: true,
                })
            }
        }
    }
}
