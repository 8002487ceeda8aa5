//! Position persistence on the content tree
//!
//! Records the "last visited child" on every positioned ancestor of a block.

use serde::Serialize;

use crate::block::{Actor, BlockBinder, BoundBlock};
use crate::keys::UsageKey;
use crate::logger;
use crate::store::{ModuleStore, StoreError};

/// Result of saving one ancestor's position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionUpdate {
    pub location: UsageKey,
    pub position: Option<u32>,
    pub changed: bool,
}

/// Set `block`'s position to the 1-based index of the child named `child_name`.
///
/// Writes only when the index differs from the stored position. Returns whether
/// a write happened; blocks without a position field are left untouched.
pub fn save_child_position(block: &mut BoundBlock, child_name: &str) -> Result<bool, StoreError> {
    let index = block
        .children()
        .iter()
        .position(|child| child.block_id() == child_name);

    let Some(field) = block.position_mut() else {
        return Ok(false);
    };
    if let Some(index) = index {
        field.set(u32::try_from(index + 1).unwrap_or(u32::MAX));
    }
    block.save()
}

/// Walk from `leaf` to the course root, saving each positioned ancestor's
/// position to point at the child the walk came from.
///
/// Stops at the root or at the first ancestor the binder declines. Returns the
/// positioned ancestors in root-ward order.
pub fn save_positions_recursively_up(
    actor: &Actor,
    store: &dyn ModuleStore,
    binder: &dyn BlockBinder,
    leaf: &UsageKey,
) -> Result<Vec<PositionUpdate>, StoreError> {
    let mut updates = Vec::new();
    let mut current = leaf.clone();

    while let Some(parent_location) = store.get_parent_location(&current)? {
        let parent_block = store.get_item(&parent_location)?;
        let Some(mut parent) = binder.bind(actor, parent_block)? else {
            logger::log_debug(&format!(
                "[Position] {parent_location} not bound for {actor}, stopping"
            ));
            break;
        };

        if parent.position().is_some() {
            let changed = save_child_position(&mut parent, current.block_id())?;
            updates.push(PositionUpdate {
                location: parent_location.clone(),
                position: parent.position().and_then(|field| field.get()),
                changed,
            });
        }

        current = parent_location;
    }

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RuntimeBinder;
    use crate::store::PositionStore;
    use crate::test_utils::{demo_key, demo_store, memory_positions};
    use std::sync::Arc;

    fn setup() -> (crate::store::MemoryStore, Arc<PositionStore>, RuntimeBinder) {
        let positions = Arc::new(memory_positions());
        let binder = RuntimeBinder::new(["course", "chapter", "sequential"], positions.clone());
        (demo_store(), positions, binder)
    }

    fn alice() -> Actor {
        Actor::User("alice".to_string())
    }

    #[test]
    fn test_save_child_position_changes_once() {
        let (store, positions, binder) = setup();
        let location = demo_key("sequential", "lesson2");
        let bind = || {
            binder
                .bind(&alice(), store.get_item(&location).unwrap())
                .unwrap()
                .unwrap()
        };

        let mut seq = bind();
        assert!(save_child_position(&mut seq, "lesson2_unit_c").unwrap());
        assert_eq!(positions.get("alice", &location).unwrap(), Some(3));

        // Same child again: position unchanged, nothing written
        let mut seq = bind();
        assert!(!save_child_position(&mut seq, "lesson2_unit_c").unwrap());

        let mut seq = bind();
        assert!(save_child_position(&mut seq, "lesson2_unit_a").unwrap());
        assert_eq!(positions.get("alice", &location).unwrap(), Some(1));
    }

    #[test]
    fn test_save_child_position_unknown_child() {
        let (store, positions, binder) = setup();
        let location = demo_key("sequential", "lesson2");
        let mut seq = binder
            .bind(&alice(), store.get_item(&location).unwrap())
            .unwrap()
            .unwrap();
        assert!(!save_child_position(&mut seq, "not_a_child").unwrap());
        assert_eq!(positions.get("alice", &location).unwrap(), None);
    }

    #[test]
    fn test_save_child_position_without_capability() {
        let (store, _, binder) = setup();
        let mut unit = binder
            .bind(&alice(), store.get_item(&demo_key("vertical", "welcome_unit")).unwrap())
            .unwrap()
            .unwrap();
        assert!(!save_child_position(&mut unit, "welcome_html").unwrap());
    }

    #[test]
    fn test_recursive_save_updates_all_ancestors() {
        let (store, positions, binder) = setup();
        let leaf = demo_key("vertical", "lesson2_unit_b");

        let updates = save_positions_recursively_up(&alice(), &store, &binder, &leaf).unwrap();

        let locations: Vec<_> = updates.iter().map(|u| u.location.clone()).collect();
        assert_eq!(
            locations,
            vec![
                demo_key("sequential", "lesson2"),
                demo_key("chapter", "week1"),
                demo_key("course", "course"),
            ]
        );
        assert!(updates.iter().all(|u| u.changed));
        assert_eq!(updates[0].position, Some(2));
        assert_eq!(updates[1].position, Some(2));
        assert_eq!(updates[2].position, Some(2));

        assert_eq!(
            positions.get("alice", &demo_key("chapter", "week1")).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_recursive_save_second_visit_unchanged() {
        let (store, _, binder) = setup();
        let leaf = demo_key("vertical", "welcome_video");

        let first = save_positions_recursively_up(&alice(), &store, &binder, &leaf).unwrap();
        assert_eq!(first[0].position, Some(2));
        assert_eq!(first[1].position, Some(1));
        assert_eq!(first[2].position, Some(1));

        let second = save_positions_recursively_up(&alice(), &store, &binder, &leaf).unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|u| !u.changed));
    }

    #[test]
    fn test_recursive_save_skips_unpositioned_ancestors() {
        let (store, positions, _) = setup();
        let binder = RuntimeBinder::new(["sequential"], positions);
        let leaf = demo_key("html", "welcome_html");

        let updates = save_positions_recursively_up(&alice(), &store, &binder, &leaf).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].location, demo_key("sequential", "welcome"));
        assert_eq!(updates[0].position, Some(1));
    }

    #[test]
    fn test_recursive_save_from_root_and_anonymous() {
        let (store, _, binder) = setup();
        let root = demo_key("course", "course");
        assert!(save_positions_recursively_up(&alice(), &store, &binder, &root)
            .unwrap()
            .is_empty());

        let leaf = demo_key("vertical", "lesson1_unit");
        assert!(
            save_positions_recursively_up(&Actor::Anonymous, &store, &binder, &leaf)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_recursive_save_unknown_leaf() {
        let (store, _, binder) = setup();
        let leaf = demo_key("vertical", "ghost");
        assert!(matches!(
            save_positions_recursively_up(&alice(), &store, &binder, &leaf),
            Err(StoreError::ItemNotFound(_))
        ));
    }
}
