//! Handle staleness and slot recycling over arbitrary add/free sequences

use std::collections::{HashMap, HashSet};

use brickyard::entity::{EntityHandle, EntityStore, EntityType, WallEntity};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(EntityType),
    /// Free the n-th issued handle (modulo the number issued)
    Free(usize),
}

fn arb_kind() -> impl Strategy<Value = EntityType> {
    prop::sample::select(EntityType::ALL.to_vec())
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_kind().prop_map(Op::Add),
        2 => any::<usize>().prop_map(Op::Free),
    ]
}

proptest! {
    #[test]
    fn stale_handles_never_resolve(ops in prop::collection::vec(arb_op(), 1..200)) {
        let mut store = EntityStore::with_type_capacities(16, [8; EntityType::COUNT]);
        let mut issued: Vec<EntityHandle> = Vec::new();
        let mut live: HashSet<EntityHandle> = HashSet::new();
        let mut newest_generation: HashMap<u32, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(kind) => {
                    if let Ok(handle) = store.add_entity(kind) {
                        prop_assert!(!issued.contains(&handle));
                        prop_assert_eq!(handle.kind(), kind);
                        if let Some(&previous) = newest_generation.get(&handle.slot_index()) {
                            prop_assert!(handle.generation() > previous);
                        }
                        newest_generation.insert(handle.slot_index(), handle.generation());
                        issued.push(handle);
                        live.insert(handle);
                    }
                }
                Op::Free(n) => {
                    if issued.is_empty() {
                        continue;
                    }
                    let handle = issued[n % issued.len()];
                    prop_assert_eq!(store.free_entity(handle), live.remove(&handle));
                }
            }

            for &handle in &issued {
                prop_assert_eq!(store.contains(handle), live.contains(&handle));
            }
            prop_assert_eq!(store.len(), live.len());
        }
    }

    #[test]
    fn recycled_slots_get_newer_generations(count in 1usize..64, rounds in 1usize..4) {
        let mut store = EntityStore::with_type_capacities(count, [count; EntityType::COUNT]);
        let mut previous: Vec<EntityHandle> = Vec::new();

        for _ in 0..rounds {
            let handles: Vec<EntityHandle> = (0..count)
                .map(|_| store.add_entity(EntityType::Wall))
                .collect::<Result<_, _>>()
                .unwrap();
            prop_assert!(store.add_entity(EntityType::Wall).is_err());

            for old in &previous {
                prop_assert!(store.get_entity::<WallEntity>(*old).is_none());
                let reused = handles
                    .iter()
                    .find(|h| h.slot_index() == old.slot_index())
                    .unwrap();
                prop_assert!(reused.generation() > old.generation());
            }

            for &handle in &handles {
                prop_assert!(store.free_entity(handle));
            }
            previous = handles;
        }
    }
}

#[test]
fn handle_of_other_type_does_not_resolve() {
    let mut store = EntityStore::new(8);
    let wall = store.add_entity(EntityType::Wall).unwrap();
    assert!(store.get_entity::<WallEntity>(wall).is_some());
    assert!(store
        .get_entity::<brickyard::entity::FloorEntity>(wall)
        .is_none());
}

#[test]
fn invalid_handle_never_resolves() {
    let mut store = EntityStore::new(8);
    store.add_entity(EntityType::Player).unwrap();
    assert!(!store.contains(EntityHandle::INVALID));
    assert!(!store.free_entity(EntityHandle::INVALID));
}
