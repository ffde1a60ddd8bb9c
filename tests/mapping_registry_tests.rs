//! Mapping Registry Tests
//!
//! - "get or assign" lookups report whether the name existed before
//! - Snapshots survive a save/load cycle
//! - Concurrent registration hands out each id exactly once
//! - Decoded mapping opcodes feed the registry

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use bet_oracle::mapping::parse_index;
use bet_oracle::{
    decode, encode, InMemoryMappingRegistry, MappingError, MappingIndex, MappingRecord,
    MappingRegistry, OpcodeRecord,
};

// ============================================================================
// LOOKUP
// ============================================================================

#[test]
fn test_resolve_id_exists_flag() {
    let registry = InMemoryMappingRegistry::new();

    let first = registry.resolve_id(MappingIndex::Teams, "Real Madrid").unwrap();
    assert_eq!(first.id, 0);
    assert!(!first.exists, "first lookup registers the name");

    let second = registry.resolve_id(MappingIndex::Teams, "Real Madrid").unwrap();
    assert_eq!(second.id, 0);
    assert!(second.exists);

    let other = registry.resolve_id(MappingIndex::Teams, "Barcelona").unwrap();
    assert_eq!(other.id, 1);
    assert!(!other.exists);
}

#[test]
fn test_query_does_not_register() {
    let registry = InMemoryMappingRegistry::new();
    assert_eq!(registry.find_id(MappingIndex::Sports, "Tennis"), None);
    assert!(registry.is_empty());
    assert!(matches!(
        registry.require_id(MappingIndex::Sports, "Tennis"),
        Err(MappingError::UnknownName { .. })
    ));
}

#[test]
fn test_names_are_case_sensitive() {
    let registry = InMemoryMappingRegistry::new();
    let upper = registry.register(MappingIndex::Sports, "MMA").unwrap();
    let lower = registry.register(MappingIndex::Sports, "mma").unwrap();
    assert_ne!(upper.id, lower.id);
}

#[test]
fn test_unknown_index_name() {
    assert_eq!(parse_index("rounds").unwrap(), MappingIndex::Rounds);
    assert_eq!(
        parse_index("leagues").unwrap_err(),
        MappingError::UnknownIndex("leagues".to_string())
    );
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[test]
fn test_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.json");

    let registry = InMemoryMappingRegistry::new();
    registry.register(MappingIndex::Sports, "Basketball").unwrap();
    registry.register(MappingIndex::Teams, "Chicago Bulls").unwrap();
    registry.register(MappingIndex::Teams, "Boston Celtics").unwrap();
    registry
        .apply(&MappingRecord {
            index: MappingIndex::Tournaments,
            mapping_id: 40,
            name: "NBA".to_string(),
        })
        .unwrap();
    registry.save_to(&path).unwrap();

    let loaded = InMemoryMappingRegistry::load_from(&path).unwrap();
    assert_eq!(loaded.entries(), registry.entries());
    assert_eq!(loaded.find_id(MappingIndex::Teams, "Boston Celtics"), Some(1));
    assert_eq!(loaded.find_name(MappingIndex::Tournaments, 40).as_deref(), Some("NBA"));

    // New ids continue after the loaded ones
    assert_eq!(loaded.register(MappingIndex::Teams, "Miami Heat").unwrap().id, 2);
}

#[test]
fn test_load_missing_snapshot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = InMemoryMappingRegistry::load_from(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, MappingError::Storage(_)));
}

#[test]
fn test_load_corrupt_snapshot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        InMemoryMappingRegistry::load_from(&path),
        Err(MappingError::Storage(_))
    ));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_registration_assigns_unique_ids() {
    let registry = Arc::new(InMemoryMappingRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..25)
                    .map(|n| {
                        registry
                            .register(MappingIndex::Teams, &format!("team-{}-{}", worker, n))
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<u32>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "id {} handed out twice", id);
        }
    }
    assert_eq!(ids.len(), 200);
    assert_eq!(registry.len(MappingIndex::Teams), 200);
}

#[test]
fn test_concurrent_same_name_gets_one_id() {
    let registry = Arc::new(InMemoryMappingRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.resolve_id(MappingIndex::Sports, "Cricket").unwrap())
        })
        .collect();

    let lookups: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(lookups.iter().all(|l| l.id == 0));
    assert_eq!(lookups.iter().filter(|l| !l.exists).count(), 1);
}

// ============================================================================
// OPCODES
// ============================================================================

#[test]
fn test_decoded_mapping_opcode_applies() {
    let record = MappingRecord {
        index: MappingIndex::Rounds,
        mapping_id: 5,
        name: "Quarter-finals".to_string(),
    };
    let bytes = encode(&OpcodeRecord::Mapping(record.clone())).unwrap();

    let registry = InMemoryMappingRegistry::new();
    match decode(&bytes).unwrap() {
        OpcodeRecord::Mapping(decoded) => {
            assert!(registry.apply(&decoded).unwrap().created);
            // replaying the same opcode is a no-op
            assert!(!registry.apply(&decoded).unwrap().created);
        }
        other => panic!("expected mapping, got {:?}", other),
    }
    assert_eq!(registry.find_id(MappingIndex::Rounds, "Quarter-finals"), Some(5));
    assert_eq!(registry.entries(), vec![record]);
}

#[test]
fn test_name_keeps_its_first_id() {
    let registry = InMemoryMappingRegistry::new();
    let first = registry.resolve_id(MappingIndex::Teams, "Chicago Bulls").unwrap();

    let err = registry
        .apply(&MappingRecord {
            index: MappingIndex::Teams,
            mapping_id: 5,
            name: "Chicago Bulls".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, MappingError::NameConflict { existing_id: 0, requested_id: 5, .. }));

    let again = registry.resolve_id(MappingIndex::Teams, "Chicago Bulls").unwrap();
    assert_eq!(again.id, first.id);
    assert!(again.exists);
    assert_eq!(registry.find_name(MappingIndex::Teams, 5), None);
    assert_eq!(registry.len(MappingIndex::Teams), 1);
}
