use std::any::Any;
use std::cell::Cell;
use std::fmt;

use slotmap::new_key_type;

use super::context::{DrawCtx, EntityCtx};
use super::layers::LayerMask;
use super::transform::{Transform, Vec2};
use super::viewport::Camera;
use crate::physics::Shape;

new_key_type! {
    /// Generational handle into a world's entity arena. A stale id never
    /// resolves to a newer entity.
    pub struct EntityId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Created but not owned by any parent.
    Detached,
    PendingAddition,
    Live,
    PendingRemoval,
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-entity lifecycle hooks. Every hook defaults to a no-op.
///
/// The behavior is taken out of its entity for the duration of a hook, so the
/// context may mutate the whole world, including the entity itself.
pub trait Behavior: AsAny {
    fn on_attach(&mut self, _ctx: &mut EntityCtx<'_>) {}

    fn on_tick(&mut self, _ctx: &mut EntityCtx<'_>) {}

    fn on_draw(&mut self, _ctx: &mut DrawCtx<'_>) {}

    fn on_detach(&mut self, _ctx: &mut EntityCtx<'_>) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    Plain,
    Shape(Shape),
    Viewport(Camera),
}

/// Everything needed to create an entity.
pub struct EntityDesc {
    pub label: Option<String>,
    pub transform: Transform,
    pub layers: LayerMask,
    pub kind: EntityKind,
    pub behavior: Option<Box<dyn Behavior>>,
}

impl fmt::Debug for EntityDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDesc")
            .field("label", &self.label)
            .field("transform", &self.transform)
            .field("layers", &self.layers)
            .field("kind", &self.kind)
            .field("has_behavior", &self.behavior.is_some())
            .finish()
    }
}

impl Default for EntityDesc {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityDesc {
    pub fn new() -> Self {
        Self {
            label: None,
            transform: Transform::IDENTITY,
            layers: LayerMask::DEFAULT,
            kind: EntityKind::Plain,
            behavior: None,
        }
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new()
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_rotation(mut self, rotation_radians: f32) -> Self {
        self.transform.rotation_radians = rotation_radians;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.kind = EntityKind::Shape(shape);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.kind = EntityKind::Viewport(camera);
        self
    }
}

pub(crate) struct Node {
    pub(crate) serial: u64,
    pub(crate) label: Option<String>,
    pub(crate) local: Transform,
    /// Memoized world transform, valid while `dirty` is false.
    pub(crate) world: Cell<Transform>,
    pub(crate) dirty: Cell<bool>,
    pub(crate) layers: LayerMask,
    pub(crate) kind: EntityKind,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) state: LifecycleState,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) pending_additions: Vec<EntityId>,
    pub(crate) pending_removals: Vec<EntityId>,
}

impl Node {
    pub(crate) fn from_desc(serial: u64, desc: EntityDesc) -> Self {
        Self {
            serial,
            label: desc.label,
            local: desc.transform,
            world: Cell::new(desc.transform),
            dirty: Cell::new(true),
            layers: desc.layers,
            kind: desc.kind,
            behavior: desc.behavior,
            state: LifecycleState::Detached,
            parent: None,
            children: Vec::new(),
            pending_additions: Vec::new(),
            pending_removals: Vec::new(),
        }
    }

    pub(crate) fn shape(&self) -> Option<Shape> {
        match self.kind {
            EntityKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub(crate) fn camera(&self) -> Option<&Camera> {
        match &self.kind {
            EntityKind::Viewport(camera) => Some(camera),
            _ => None,
        }
    }

    pub(crate) fn camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            EntityKind::Viewport(camera) => Some(camera),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SerialAllocator {
    next: u64,
}

impl SerialAllocator {
    pub(crate) fn allocate(&mut self) -> u64 {
        let serial = self.next;
        self.next = self.next.saturating_add(1);
        serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_allocator_never_reuses_serials() {
        let mut serials = SerialAllocator::default();
        assert_eq!(serials.allocate(), 0);
        assert_eq!(serials.allocate(), 1);
        assert_eq!(serials.allocate(), 2);
    }

    #[test]
    fn desc_defaults_to_plain_default_layer() {
        let desc = EntityDesc::new();
        assert_eq!(desc.layers, LayerMask::DEFAULT);
        assert_eq!(desc.kind, EntityKind::Plain);
        assert_eq!(desc.transform, Transform::IDENTITY);
        assert!(desc.behavior.is_none());
    }

    #[test]
    fn node_starts_detached_and_dirty() {
        let node = Node::from_desc(7, EntityDesc::labeled("labeled").with_shape(Shape::circle(1.0)));
        assert_eq!(node.state, LifecycleState::Detached);
        assert!(node.dirty.get());
        assert_eq!(node.label.as_deref(), Some("labeled"));
        assert_eq!(node.shape(), Some(Shape::circle(1.0)));
        assert!(node.camera().is_none());
    }
}
