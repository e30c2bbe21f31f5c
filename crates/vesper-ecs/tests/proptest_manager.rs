//! Property tests for component storage.
//!
//! These tests use `proptest` to generate random sequences of manager
//! operations and verify that the dense-array/index invariants hold after
//! every single step.

use std::collections::HashMap;

use proptest::prelude::*;
use vesper_ecs::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Pos {
    x: f32,
    y: f32,
}
impl Component for Pos {}

/// Operations we can perform on a manager.
#[derive(Debug, Clone)]
enum ManagerOp {
    /// Create a component on a brand-new entity.
    CreateFresh(f32, f32),
    /// Remove the component of a previously seen entity (may already be gone).
    Remove(usize),
    /// Remove an entity the manager has never seen.
    RemoveUnknown,
    /// Mutate a live component through `get_mut`.
    Update(usize, f32),
}

/// Strategy that generates finite (non-NaN, non-Inf) f32 values.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

fn manager_op_strategy() -> impl Strategy<Value = ManagerOp> {
    prop_oneof![
        3 => (finite_f32(), finite_f32()).prop_map(|(x, y)| ManagerOp::CreateFresh(x, y)),
        2 => (0..100usize).prop_map(ManagerOp::Remove),
        1 => Just(ManagerOp::RemoveUnknown),
        1 => (0..100usize, finite_f32()).prop_map(|(i, x)| ManagerOp::Update(i, x)),
    ]
}

/// `components.len == owners.len == index.len` and every index entry points
/// at its own owner.
fn check_invariants(manager: &ComponentManager<Pos>) -> Result<(), TestCaseError> {
    prop_assert_eq!(manager.components().len(), manager.entities().len());
    prop_assert_eq!(manager.len(), manager.entities().len());
    for (index, &entity) in manager.entities().iter().enumerate() {
        prop_assert!(entity.is_valid());
        prop_assert_eq!(manager.index_of(entity), Some(index));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_ops_preserve_dense_index_invariants(
        ops in prop::collection::vec(manager_op_strategy(), 1..80),
    ) {
        let mut manager = ComponentManager::<Pos>::new();
        let mut seen: Vec<Entity> = Vec::new();
        let mut model: HashMap<Entity, Pos> = HashMap::new();

        for op in ops {
            match op {
                ManagerOp::CreateFresh(x, y) => {
                    let e = Entity::create();
                    *manager.create(e) = Pos { x, y };
                    model.insert(e, Pos { x, y });
                    seen.push(e);
                }
                ManagerOp::Remove(idx) => {
                    if !seen.is_empty() {
                        let e = seen[idx % seen.len()];
                        let removed = manager.remove(e);
                        prop_assert_eq!(removed, model.remove(&e));
                    }
                }
                ManagerOp::RemoveUnknown => {
                    let before = manager.len();
                    prop_assert!(manager.remove(Entity::create()).is_none());
                    prop_assert_eq!(manager.len(), before);
                }
                ManagerOp::Update(idx, x) => {
                    if !seen.is_empty() {
                        let e = seen[idx % seen.len()];
                        if let Some(pos) = manager.get_mut(e) {
                            pos.x = x;
                            model.get_mut(&e).unwrap().x = x;
                        }
                    }
                }
            }

            check_invariants(&manager)?;
            prop_assert_eq!(manager.len(), model.len());

            // Contains(e) == (get(e) != None), for every entity ever seen.
            for &e in &seen {
                prop_assert_eq!(manager.contains(e), manager.get(e).is_some());
                prop_assert_eq!(manager.get(e), model.get(&e));
            }
        }
    }

    #[test]
    fn archive_round_trip_reproduces_arrays(
        values in prop::collection::vec((finite_f32(), finite_f32()), 0..40),
        removals in prop::collection::vec(0..40usize, 0..10),
    ) {
        let mut manager = ComponentManager::<Pos>::new();
        let mut owners = Vec::new();
        for (x, y) in values {
            let e = Entity::create();
            manager.insert(e, Pos { x, y });
            owners.push(e);
        }
        for idx in removals {
            if !owners.is_empty() {
                manager.remove(owners[idx % owners.len()]);
            }
        }

        let mut writer = ArchiveWriter::new();
        manager.serialize(&mut writer, 1).unwrap();

        let mut loaded = ComponentManager::<Pos>::new();
        let mut reader = ArchiveReader::new(writer.as_bytes());
        loaded.deserialize(&mut reader, 1).unwrap();

        prop_assert!(reader.is_at_end());
        prop_assert_eq!(loaded.entities(), manager.entities());
        prop_assert_eq!(loaded.components(), manager.components());
        check_invariants(&loaded)?;
    }

    #[test]
    fn merge_keeps_every_pair(
        left_count in 0..30usize,
        right_count in 0..30usize,
    ) {
        let mut left = ComponentManager::<Pos>::new();
        let mut right = ComponentManager::<Pos>::new();
        for i in 0..left_count {
            left.insert(Entity::create(), Pos { x: i as f32, y: 0.0 });
        }
        let right_pairs: Vec<(Entity, Pos)> = (0..right_count)
            .map(|i| (Entity::create(), Pos { x: 0.0, y: i as f32 }))
            .collect();
        for (e, p) in &right_pairs {
            right.insert(*e, p.clone());
        }

        left.merge(&mut right);

        prop_assert!(right.is_empty());
        prop_assert_eq!(left.len(), left_count + right_count);
        for (e, p) in &right_pairs {
            prop_assert_eq!(left.get(*e), Some(p));
        }
        check_invariants(&left)?;
    }
}
