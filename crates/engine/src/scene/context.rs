use super::entity::{EntityDesc, EntityId};
use super::transform::{Transform, Vec2};
use super::world::World;
use crate::app::input::InputSnapshot;
use crate::app::rendering::RenderTarget;

/// Mutable access to the world during `on_attach`, `on_tick` and `on_detach`,
/// addressed at the entity whose hook is running.
pub struct EntityCtx<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl<'w> EntityCtx<'w> {
    pub(crate) fn new(world: &'w mut World, id: EntityId) -> Self {
        Self { world, id }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    pub fn input(&self) -> &InputSnapshot {
        self.world.input()
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.world.fixed_dt_seconds()
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.world.parent(self.id)
    }

    pub fn label(&self) -> Option<&str> {
        self.world.label(self.id)
    }

    pub fn spawn_child(&mut self, desc: EntityDesc) -> Option<EntityId> {
        self.world.spawn_child(self.id, desc)
    }

    pub fn add_child(&mut self, child: EntityId) -> bool {
        self.world.add_child(self.id, child)
    }

    pub fn request_destroy(&mut self, id: EntityId) {
        self.world.request_destroy(id);
    }

    /// Same as the parent requesting it. No-op for the root.
    pub fn request_self_destroy(&mut self) {
        self.world.request_destroy(self.id);
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.world.is_live(id)
    }

    pub fn position(&self) -> Vec2 {
        self.world
            .local_transform(self.id)
            .map(|local| local.position)
            .unwrap_or_default()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.world.set_position(self.id, position);
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.world.translate(self.id, delta);
    }

    pub fn set_rotation(&mut self, rotation_radians: f32) {
        self.world.set_rotation(self.id, rotation_radians);
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.world.set_scale(self.id, scale);
    }

    pub fn world_transform(&self) -> Transform {
        self.world
            .world_transform(self.id)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn overlapping(&self) -> Vec<EntityId> {
        self.world.overlapping(self.id)
    }
}

/// Read access to the world plus the render target during `on_draw`.
pub struct DrawCtx<'w> {
    world: &'w World,
    id: EntityId,
    viewport: EntityId,
    target: &'w mut dyn RenderTarget,
}

impl<'w> DrawCtx<'w> {
    pub(crate) fn new(
        world: &'w World,
        id: EntityId,
        viewport: EntityId,
        target: &'w mut dyn RenderTarget,
    ) -> Self {
        Self {
            world,
            id,
            viewport,
            target,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The viewport entity whose pass is running.
    pub fn viewport(&self) -> EntityId {
        self.viewport
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn world_transform(&self) -> Transform {
        self.world
            .world_transform(self.id)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn target(&mut self) -> &mut dyn RenderTarget {
        &mut *self.target
    }
}
