//! Entity registry
//!
//! Insertion-ordered arena holding every entity known to a town. Follower
//! links are stored as identifiers, so chain traversal is a series of
//! lookups in this arena and chain destruction is an explicit operation on it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::game::entity::{Entity, EntityId};

/// Arena of all entities in a town
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Map of entity ID to entity
    entities: HashMap<EntityId, Entity>,
    /// Entity IDs in insertion order
    order: Vec<EntityId>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, replacing nothing
    ///
    /// # Panics
    ///
    /// Panics if an entity with the same ID is already registered.
    pub fn insert(&mut self, entity: Entity) {
        let id = entity.id();
        assert!(
            !self.entities.contains_key(&id),
            "entity {id} registered twice"
        );
        self.order.push(id);
        self.entities.insert(id, entity);
    }

    /// Get an entity by ID
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a mutable entity by ID
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Check if an entity is registered
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of registered entities, followers included
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over all entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Find the entity whose direct follower is `id`
    pub fn leader_of(&self, id: &EntityId) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| e.follower() == Some(*id))
            .map(|e| e.id())
    }

    /// Iterate over the follower chain of `root`, excluding `root` itself
    pub fn chain(&self, root: &EntityId) -> Chain<'_> {
        let mut visited = HashSet::new();
        visited.insert(*root);
        Chain {
            registry: self,
            next: self.get(root).and_then(|e| e.follower()),
            visited,
        }
    }

    /// Remove `root` together with its whole follower chain
    ///
    /// If `root` is itself somebody's follower, that link is cleared.
    /// Returns the removed entities, root first, in chain order.
    pub fn remove_with_chain(&mut self, root: &EntityId) -> Vec<Entity> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut ids = vec![*root];
        ids.extend(self.chain(root).map(|e| e.id()));

        if let Some(leader) = self.leader_of(root) {
            if let Some(entity) = self.entities.get_mut(&leader) {
                entity.set_follower(None);
            }
        }

        let removed: Vec<Entity> = ids
            .iter()
            .filter_map(|id| self.entities.remove(id))
            .collect();
        self.order.retain(|id| !ids.contains(id));

        debug!(
            root = %root,
            removed = removed.len(),
            "Removed entity and follower chain"
        );

        removed
    }
}

/// Iterator over a follower chain
///
/// # Panics
///
/// Panics when the chain revisits an entity or references an entity that is
/// not registered: both mean the ownership invariant is already broken.
pub struct Chain<'a> {
    registry: &'a EntityRegistry,
    next: Option<EntityId>,
    visited: HashSet<EntityId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        assert!(self.visited.insert(id), "follower chain cycle at {id}");
        let entity = self
            .registry
            .get(&id)
            .unwrap_or_else(|| panic!("follower chain references unknown entity {id}"));
        self.next = entity.follower();
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{SpriteKind, UserLocation};

    fn entity(name: &str, kind: SpriteKind) -> Entity {
        Entity::new(EntityId::new(), name, UserLocation::new(0.0, 0.0), kind)
    }

    /// Build root -> pet1 -> pet2 and return their ids
    fn chained(registry: &mut EntityRegistry) -> (EntityId, EntityId, EntityId) {
        let root = entity("root", SpriteKind::Player);
        let pet1 = entity("Pet", SpriteKind::Pet);
        let pet2 = entity("Pet", SpriteKind::Pet);
        let (r, p1, p2) = (root.id(), pet1.id(), pet2.id());
        registry.insert(root);
        registry.insert(pet1);
        registry.insert(pet2);
        registry.get_mut(&r).unwrap().set_follower(Some(p1));
        registry.get_mut(&p1).unwrap().set_follower(Some(p2));
        (r, p1, p2)
    }

    #[test]
    fn test_insertion_order() {
        let mut registry = EntityRegistry::new();
        assert!(registry.is_empty());

        let names = ["a", "b", "c"];
        for name in names {
            registry.insert(entity(name, SpriteKind::Player));
        }

        let listed: Vec<&str> = registry.iter().map(|e| e.display_name()).collect();
        assert_eq!(listed, names);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_insert_panics() {
        let mut registry = EntityRegistry::new();
        let e = entity("dup", SpriteKind::Player);
        registry.insert(e.clone());
        registry.insert(e);
    }

    #[test]
    fn test_chain_walk() {
        let mut registry = EntityRegistry::new();
        let (root, p1, p2) = chained(&mut registry);

        let chain: Vec<EntityId> = registry.chain(&root).map(|e| e.id()).collect();
        assert_eq!(chain, vec![p1, p2]);
        assert_eq!(registry.leader_of(&p2), Some(p1));
        assert_eq!(registry.leader_of(&root), None);
    }

    #[test]
    fn test_chain_of_unknown_root_is_empty() {
        let registry = EntityRegistry::new();
        assert_eq!(registry.chain(&EntityId::new()).count(), 0);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_cycle_panics() {
        let mut registry = EntityRegistry::new();
        let (root, _, p2) = chained(&mut registry);
        registry.get_mut(&p2).unwrap().set_follower(Some(root));
        let _ = registry.chain(&root).count();
    }

    #[test]
    #[should_panic(expected = "unknown entity")]
    fn test_dangling_link_panics() {
        let mut registry = EntityRegistry::new();
        let (root, _, p2) = chained(&mut registry);
        registry.get_mut(&p2).unwrap().set_follower(Some(EntityId::new()));
        let _ = registry.chain(&root).count();
    }

    #[test]
    fn test_remove_with_chain() {
        let mut registry = EntityRegistry::new();
        let other = entity("other", SpriteKind::Player);
        let other_id = other.id();
        registry.insert(other);
        let (root, p1, p2) = chained(&mut registry);

        let removed: Vec<EntityId> = registry
            .remove_with_chain(&root)
            .iter()
            .map(|e| e.id())
            .collect();

        assert_eq!(removed, vec![root, p1, p2]);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&other_id));
    }

    #[test]
    fn test_remove_mid_chain_detaches_leader() {
        let mut registry = EntityRegistry::new();
        let (root, p1, p2) = chained(&mut registry);

        let removed = registry.remove_with_chain(&p1);
        assert_eq!(removed.len(), 2);
        assert!(!registry.contains(&p2));
        assert_eq!(registry.get(&root).unwrap().follower(), None);
    }
}
