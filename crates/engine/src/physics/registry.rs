use crate::scene::EntityId;

use super::shape::{Collide, WorldShape};

/// Flat set of the live shapes of one world. Queries scan every entry.
#[derive(Debug, Default)]
pub struct PhysicsRegistry {
    shapes: Vec<EntityId>,
}

impl PhysicsRegistry {
    pub(crate) fn register(&mut self, id: EntityId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.shapes.push(id);
        true
    }

    pub(crate) fn unregister(&mut self, id: EntityId) -> bool {
        match self.shapes.iter().position(|shape| *shape == id) {
            Some(index) => {
                self.shapes.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.shapes.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.shapes.iter().copied()
    }

    /// Every other registered shape overlapping `query`. `resolve` maps an id
    /// to its current world-space shape.
    pub fn overlapping<F>(&self, query: EntityId, mut resolve: F) -> Vec<EntityId>
    where
        F: FnMut(EntityId) -> Option<WorldShape>,
    {
        if !self.contains(query) {
            return Vec::new();
        }
        let Some(query_shape) = resolve(query) else {
            return Vec::new();
        };

        self.shapes
            .iter()
            .copied()
            .filter(|candidate| *candidate != query)
            .filter(|candidate| {
                resolve(*candidate).is_some_and(|shape| query_shape.collide(&shape))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use slotmap::SlotMap;

    use super::*;
    use crate::physics::shape::WorldCircle;
    use crate::scene::Vec2;

    fn ids(count: usize) -> Vec<EntityId> {
        let mut keys: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..count).map(|_| keys.insert(())).collect()
    }

    fn circle(x: f32, radius: f32) -> WorldShape {
        WorldShape::Circle(WorldCircle {
            center: Vec2::new(x, 0.0),
            radius,
        })
    }

    #[test]
    fn double_registration_is_rejected() {
        let ids = ids(1);
        let mut registry = PhysicsRegistry::default();
        assert!(registry.register(ids[0]));
        assert!(!registry.register(ids[0]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_unknown_is_reported() {
        let ids = ids(2);
        let mut registry = PhysicsRegistry::default();
        registry.register(ids[0]);
        assert!(!registry.unregister(ids[1]));
        assert!(registry.unregister(ids[0]));
        assert!(registry.is_empty());
    }

    #[test]
    fn overlapping_excludes_query_even_when_coincident() {
        let ids = ids(3);
        let mut registry = PhysicsRegistry::default();
        for id in &ids {
            registry.register(*id);
        }
        let shapes: HashMap<EntityId, WorldShape> = HashMap::from([
            (ids[0], circle(0.0, 1.0)),
            (ids[1], circle(0.0, 1.0)),
            (ids[2], circle(50.0, 1.0)),
        ]);

        let hits = registry.overlapping(ids[0], |id| shapes.get(&id).copied());
        assert_eq!(hits, vec![ids[1]]);
    }

    #[test]
    fn unregistered_query_returns_nothing() {
        let ids = ids(2);
        let mut registry = PhysicsRegistry::default();
        registry.register(ids[1]);
        let hits = registry.overlapping(ids[0], |_| Some(circle(0.0, 10.0)));
        assert!(hits.is_empty());
    }
}
