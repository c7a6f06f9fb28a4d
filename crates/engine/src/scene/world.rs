use std::collections::HashSet;
use std::fmt;
use std::mem;

use slotmap::SlotMap;
use tracing::{debug, error, warn};

use super::context::{DrawCtx, EntityCtx};
use super::entity::{Behavior, EntityDesc, EntityId, LifecycleState, Node, SerialAllocator};
use super::layers::LayerMask;
use super::transform::{Transform, Vec2};
use super::viewport::{Camera, ViewportManager};
use crate::app::input::InputSnapshot;
use crate::app::rendering::RenderTarget;
use crate::physics::{Collide, PhysicsRegistry, WorldShape};

/// Upper bound on drain passes per entity per sweep. Anything still queued
/// after the last pass waits for the next sweep.
pub const MAX_SWEEP_PASSES: usize = 64;

const ROOT_LABEL: &str = "root";

#[derive(Debug, Clone, Copy, Default)]
struct TickState {
    fixed_dt_seconds: f32,
    input: InputSnapshot,
    tick: u64,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Attach,
    Tick,
    Detach,
}

/// Owns the entity tree and everything registered against it.
pub struct World {
    nodes: SlotMap<EntityId, Node>,
    root: EntityId,
    live: HashSet<EntityId>,
    physics: PhysicsRegistry,
    viewports: ViewportManager,
    serials: SerialAllocator,
    tick_state: TickState,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("root", &self.root)
            .field("entity_count", &self.nodes.len())
            .field("live_count", &self.live.len())
            .field("shape_count", &self.physics.len())
            .field("viewport_count", &self.viewports.len())
            .field("tick", &self.tick_state.tick)
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut serials = SerialAllocator::default();
        let mut root_node = Node::from_desc(
            serials.allocate(),
            EntityDesc::labeled(ROOT_LABEL).with_layers(LayerMask::ALL),
        );
        root_node.state = LifecycleState::Live;
        let root = nodes.insert(root_node);
        let mut live = HashSet::new();
        live.insert(root);

        Self {
            nodes,
            root,
            live,
            physics: PhysicsRegistry::default(),
            viewports: ViewportManager::default(),
            serials,
            tick_state: TickState::default(),
        }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Allocates a detached entity. It has no owner until `add_child`.
    pub fn create(&mut self, desc: EntityDesc) -> EntityId {
        let serial = self.serials.allocate();
        self.nodes.insert(Node::from_desc(serial, desc))
    }

    /// Queues a detached `child` for attachment under `parent` at the parent's
    /// next sweep. Returns whether the request was accepted.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if parent == child || !self.nodes.contains_key(parent) {
            contract_violation("add_child", parent);
            return false;
        }
        let Some(child_node) = self.nodes.get(child) else {
            contract_violation("add_child", child);
            return false;
        };
        if child_node.state != LifecycleState::Detached || child_node.parent.is_some() {
            contract_violation("add_child", child);
            return false;
        }
        if self.is_ancestor(child, parent) {
            contract_violation("add_child", child);
            return false;
        }

        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
            child_node.state = LifecycleState::PendingAddition;
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.pending_additions.push(child);
        }
        self.mark_dirty(child);
        true
    }

    pub fn spawn_child(&mut self, parent: EntityId, desc: EntityDesc) -> Option<EntityId> {
        let child = self.create(desc);
        if self.add_child(parent, child) {
            Some(child)
        } else {
            self.nodes.remove(child);
            None
        }
    }

    /// Drops a detached entity and its detached subtree without firing hooks.
    pub fn discard(&mut self, id: EntityId) -> bool {
        match self.nodes.get(id) {
            Some(node) if node.state == LifecycleState::Detached && id != self.root => {
                self.remove_subtree(id);
                true
            }
            _ => false,
        }
    }

    /// Queues `id` for removal by its owner. Idempotent; ignored for the root,
    /// detached entities and ids that no longer resolve.
    pub fn request_destroy(&mut self, id: EntityId) {
        if id == self.root {
            return;
        }
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        match node.state {
            LifecycleState::Live => node.state = LifecycleState::PendingRemoval,
            LifecycleState::PendingAddition => {}
            LifecycleState::PendingRemoval | LifecycleState::Detached => return,
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            if !parent_node.pending_removals.contains(&id) {
                parent_node.pending_removals.push(id);
            }
        }
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn register_live(&mut self, id: EntityId) -> bool {
        if !self.live.insert(id) {
            contract_violation("register_live", id);
            return false;
        }
        true
    }

    pub(crate) fn unregister_live(&mut self, id: EntityId) -> bool {
        if !self.live.remove(&id) {
            contract_violation("unregister_live", id);
            return false;
        }
        true
    }

    pub fn lifecycle(&self, id: EntityId) -> Option<LifecycleState> {
        self.nodes.get(id).map(|node| node.state)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Live children in attachment order.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn label(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.label.as_deref())
    }

    pub fn layers(&self, id: EntityId) -> Option<LayerMask> {
        self.nodes.get(id).map(|node| node.layers)
    }

    pub fn set_layers(&mut self, id: EntityId, layers: LayerMask) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.layers = layers;
                true
            }
            None => false,
        }
    }

    pub fn find_child_by_label(&self, parent: EntityId, label: &str) -> Option<EntityId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.label(*child) == Some(label))
    }

    pub fn find_child_with<T: Behavior>(&self, parent: EntityId) -> Option<EntityId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.behavior::<T>(*child).is_some())
    }

    /// Typed access to an entity's behavior. `None` while that entity's own
    /// hook is running.
    pub fn behavior<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        let behavior: &dyn Behavior = self.nodes.get(id)?.behavior.as_deref()?;
        behavior.as_any().downcast_ref::<T>()
    }

    pub fn behavior_mut<T: Behavior>(&mut self, id: EntityId) -> Option<&mut T> {
        let behavior: &mut dyn Behavior = self.nodes.get_mut(id)?.behavior.as_deref_mut()?;
        behavior.as_any_mut().downcast_mut::<T>()
    }

    pub fn set_behavior(&mut self, id: EntityId, behavior: impl Behavior) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.behavior = Some(Box::new(behavior));
                true
            }
            None => false,
        }
    }

    pub fn local_transform(&self, id: EntityId) -> Option<Transform> {
        self.nodes.get(id).map(|node| node.local)
    }

    /// Parent-composed transform, recomputed only along the stale part of the
    /// ancestor chain.
    pub fn world_transform(&self, id: EntityId) -> Option<Transform> {
        let mut stale = Vec::new();
        let mut base = None;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(current)?;
            if !node.dirty.get() {
                base = Some(node.world.get());
                break;
            }
            stale.push(current);
            cursor = node.parent;
        }

        for current in stale.into_iter().rev() {
            let node = self.nodes.get(current)?;
            let world = match base {
                Some(parent_world) => parent_world.compose(&node.local),
                None => node.local,
            };
            node.world.set(world);
            node.dirty.set(false);
            base = Some(world);
        }
        base
    }

    pub fn set_transform(&mut self, id: EntityId, transform: Transform) {
        self.update_local(id, |local| *local = transform);
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec2) {
        self.update_local(id, |local| local.position = position);
    }

    pub fn translate(&mut self, id: EntityId, delta: Vec2) {
        self.update_local(id, |local| local.position += delta);
    }

    pub fn set_rotation(&mut self, id: EntityId, rotation_radians: f32) {
        self.update_local(id, |local| local.rotation_radians = rotation_radians);
    }

    pub fn set_scale(&mut self, id: EntityId, scale: Vec2) {
        self.update_local(id, |local| local.scale = scale);
    }

    fn update_local(&mut self, id: EntityId, update: impl FnOnce(&mut Transform)) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        update(&mut node.local);
        self.mark_dirty(id);
    }

    // A dirty node always has dirty descendants, so the walk stops there.
    fn mark_dirty(&self, id: EntityId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if node.dirty.replace(true) && current != id {
                continue;
            }
            stack.extend(node.children.iter().copied());
            stack.extend(node.pending_additions.iter().copied());
        }
    }

    fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.tick_state.fixed_dt_seconds
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.tick_state.input
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_state.tick
    }

    /// Sweeps then ticks every live entity, parent before children.
    pub fn tick(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) {
        self.tick_state = TickState {
            fixed_dt_seconds,
            input: *input,
            tick: self.tick_state.tick.saturating_add(1),
        };
        self.traverse(true);
    }

    /// Drains pending structural changes across the live tree without ticking.
    pub fn apply_pending(&mut self) {
        self.traverse(false);
    }

    fn traverse(&mut self, fire_tick: bool) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !self.is_live(id) {
                continue;
            }
            self.sweep(id);
            if fire_tick {
                self.fire_hook(id, Hook::Tick);
            }
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    fn sweep(&mut self, id: EntityId) {
        for _ in 0..MAX_SWEEP_PASSES {
            let Some(node) = self.nodes.get_mut(id) else {
                return;
            };
            if node.pending_removals.is_empty() && node.pending_additions.is_empty() {
                return;
            }

            let removals = mem::take(&mut node.pending_removals);
            for child in removals {
                self.drain_removal(id, child);
            }

            let Some(node) = self.nodes.get_mut(id) else {
                return;
            };
            let additions = mem::take(&mut node.pending_additions);
            for child in additions {
                self.drain_addition(id, child);
            }
        }

        if let Some(node) = self.nodes.get(id) {
            if !node.pending_removals.is_empty() || !node.pending_additions.is_empty() {
                warn!(
                    entity = ?id,
                    passes = MAX_SWEEP_PASSES,
                    pending_additions = node.pending_additions.len(),
                    pending_removals = node.pending_removals.len(),
                    "sweep_pass_limit_reached"
                );
            }
        }
    }

    fn drain_removal(&mut self, parent: EntityId, child: EntityId) {
        let Some(node) = self.nodes.get(child) else {
            return;
        };
        if node.parent != Some(parent) {
            return;
        }
        match node.state {
            LifecycleState::Live | LifecycleState::PendingRemoval => self.detach(child),
            LifecycleState::PendingAddition => {
                // Removal wins over a not-yet-drained addition; no hooks fire.
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.pending_additions.retain(|pending| *pending != child);
                }
                self.remove_subtree(child);
                debug!(entity = ?child, parent = ?parent, "pending_entity_discarded");
            }
            LifecycleState::Detached => {}
        }
    }

    fn drain_addition(&mut self, parent: EntityId, child: EntityId) {
        let Some(node) = self.nodes.get(child) else {
            return;
        };
        if node.parent != Some(parent) || node.state != LifecycleState::PendingAddition {
            return;
        }
        let removal_queued = self
            .nodes
            .get(parent)
            .is_some_and(|parent_node| parent_node.pending_removals.contains(&child));
        if removal_queued {
            return;
        }
        if !self.register_live(child) {
            return;
        }

        let (serial, shape, camera) = match self.nodes.get_mut(child) {
            Some(node) => {
                node.state = LifecycleState::Live;
                (node.serial, node.shape(), node.camera().copied())
            }
            None => return,
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        if shape.is_some() && !self.physics.register(child) {
            contract_violation("register_shape", child);
        }
        if let Some(camera) = camera {
            if !self.viewports.insert(child, camera.priority, serial) {
                contract_violation("register_viewport", child);
            }
        }

        debug!(
            entity = ?child,
            parent = ?parent,
            label = self.label(child).unwrap_or(""),
            "entity_attached"
        );
        self.fire_hook(child, Hook::Attach);
    }

    /// Fires `on_detach` over the live subtree parent-first, then unlinks it.
    fn detach(&mut self, id: EntityId) {
        for member in self.live_subtree(id) {
            if self.is_live(member) {
                self.fire_hook(member, Hook::Detach);
            }
        }

        if let Some(parent) = self.parent(id) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|child| *child != id);
                parent_node.pending_additions.retain(|child| *child != id);
            }
        }
        self.remove_subtree(id);
        debug!(entity = ?id, "entity_detached");
    }

    fn live_subtree(&self, id: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Removes `id` and everything it owns, live or pending, from the arena
    /// and every registry. Fires no hooks.
    fn remove_subtree(&mut self, id: EntityId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            stack.extend(node.children);
            stack.extend(node.pending_additions);
            if self.live.contains(&current) {
                self.unregister_live(current);
                self.physics.unregister(current);
                self.viewports.remove(current);
            }
        }
    }

    fn fire_hook(&mut self, id: EntityId, hook: Hook) {
        let Some(mut behavior) = self
            .nodes
            .get_mut(id)
            .and_then(|node| node.behavior.take())
        else {
            return;
        };

        {
            let mut ctx = EntityCtx::new(self, id);
            match hook {
                Hook::Attach => behavior.on_attach(&mut ctx),
                Hook::Tick => behavior.on_tick(&mut ctx),
                Hook::Detach => behavior.on_detach(&mut ctx),
            }
        }

        // A hook may have replaced its own behavior; keep the replacement.
        if let Some(node) = self.nodes.get_mut(id) {
            if node.behavior.is_none() {
                node.behavior = Some(behavior);
            }
        }
    }

    /// One pass per viewport in `(priority, serial)` order. Entities whose
    /// layers miss the viewport filter are skipped with their whole subtree.
    pub fn draw(&mut self, target: &mut dyn RenderTarget) {
        let viewports: Vec<EntityId> = self.viewports.ordered().collect();
        for viewport in viewports {
            let Some(camera) = self.camera(viewport).copied() else {
                continue;
            };
            let center = self
                .world_transform(viewport)
                .map(|world| world.position)
                .unwrap_or_default();
            target.set_view(camera.view(center, target.size()));
            self.draw_pass(viewport, camera.filter, target);
        }
    }

    fn draw_pass(&mut self, viewport: EntityId, filter: LayerMask, target: &mut dyn RenderTarget) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if !node.layers.is_drawn_by(filter) {
                continue;
            }
            stack.extend(node.children.iter().rev().copied());

            let Some(mut behavior) = node.behavior.take() else {
                continue;
            };
            {
                let mut ctx = DrawCtx::new(self, id, viewport, &mut *target);
                behavior.on_draw(&mut ctx);
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.behavior = Some(behavior);
            }
        }
    }

    pub fn camera(&self, id: EntityId) -> Option<&Camera> {
        self.nodes.get(id).and_then(Node::camera)
    }

    pub fn set_camera_priority(&mut self, id: EntityId, priority: i32) -> bool {
        let Some(camera) = self.nodes.get_mut(id).and_then(Node::camera_mut) else {
            return false;
        };
        camera.priority = priority;
        self.viewports.set_priority(id, priority);
        true
    }

    pub fn set_camera_filter(&mut self, id: EntityId, filter: LayerMask) -> bool {
        match self.nodes.get_mut(id).and_then(Node::camera_mut) {
            Some(camera) => {
                camera.filter = filter;
                true
            }
            None => false,
        }
    }

    pub fn set_camera_zoom(&mut self, id: EntityId, zoom: f32) -> bool {
        match self.nodes.get_mut(id).and_then(Node::camera_mut) {
            Some(camera) => {
                *camera = camera.with_zoom(zoom);
                true
            }
            None => false,
        }
    }

    pub fn world_shape(&self, id: EntityId) -> Option<WorldShape> {
        let shape = self.nodes.get(id)?.shape()?;
        Some(shape.to_world(&self.world_transform(id)?))
    }

    /// Every other live shape overlapping `id`, in no particular order.
    pub fn overlapping(&self, id: EntityId) -> Vec<EntityId> {
        self.physics
            .overlapping(id, |candidate| self.world_shape(candidate))
    }

    pub fn overlaps(&self, a: EntityId, b: EntityId) -> bool {
        if a == b || !self.physics.contains(a) || !self.physics.contains(b) {
            return false;
        }
        match (self.world_shape(a), self.world_shape(b)) {
            (Some(first), Some(second)) => first.collide(&second),
            _ => false,
        }
    }

    pub fn physics(&self) -> &PhysicsRegistry {
        &self.physics
    }

    pub fn viewports(&self) -> Vec<EntityId> {
        self.viewports.ordered().collect()
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn shape_count(&self) -> usize {
        self.physics.len()
    }

    pub fn viewport_count(&self) -> usize {
        self.viewports.len()
    }

    /// Detaches everything below the root, firing `on_detach`, and drops
    /// every detached or pending entity.
    pub fn clear(&mut self) {
        let root = self.root;
        loop {
            let Some(child) = self.children(root).first().copied() else {
                break;
            };
            self.detach(child);
        }
        if let Some(root_node) = self.nodes.get_mut(root) {
            root_node.pending_additions.clear();
            root_node.pending_removals.clear();
        }
        self.nodes.retain(|id, _| id == root);
        self.live.retain(|id| *id == root);
        self.physics.clear();
        self.viewports.clear();
    }
}

fn contract_violation(operation: &'static str, id: EntityId) {
    error!(operation, entity = ?id, "scene_contract_violation");
    debug_assert!(false, "scene contract violated by {operation} on {id:?}");
}
