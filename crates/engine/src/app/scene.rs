use tracing::info;

use super::input::InputSnapshot;
use crate::assets::AssetCache;
use crate::scene::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SceneCommand {
    #[default]
    Continue,
    Quit,
}

/// Game-side driver of one world. The loop owns the world and calls these
/// around the world's own tick.
pub trait Scene {
    fn load(&mut self, world: &mut World, assets: &mut AssetCache);

    fn after_tick(&mut self, _world: &mut World, _input: &InputSnapshot) -> SceneCommand {
        SceneCommand::Continue
    }

    fn unload(&mut self, _world: &mut World) {}

    fn debug_title(&self, _world: &World) -> Option<String> {
        None
    }
}

/// Owns the world and the active scene and sequences their calls.
pub(crate) struct SceneRunner {
    scene: Box<dyn Scene>,
    world: World,
    loaded: bool,
}

impl SceneRunner {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: World::new(),
            loaded: false,
        }
    }

    pub(crate) fn load(&mut self, assets: &mut AssetCache) {
        if self.loaded {
            return;
        }
        self.scene.load(&mut self.world, assets);
        self.world.apply_pending();
        self.loaded = true;
        info!(
            entity_count = self.world.entity_count(),
            live_count = self.world.live_count(),
            viewport_count = self.world.viewport_count(),
            "scene_loaded"
        );
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.world.tick(fixed_dt_seconds, input);
        self.scene.after_tick(&mut self.world, input)
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.loaded = false;
        info!(tick_count = self.world.tick_count(), "scene_unloaded");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::scene::{Behavior, EntityCtx, EntityDesc};

    #[derive(Default)]
    struct Lifetime {
        detached: Rc<Cell<u32>>,
    }

    impl Behavior for Lifetime {
        fn on_detach(&mut self, _ctx: &mut EntityCtx<'_>) {
            self.detached.set(self.detached.get() + 1);
        }
    }

    struct QuitAfter {
        ticks: u64,
        detached: Rc<Cell<u32>>,
        unloaded: Rc<Cell<bool>>,
    }

    impl Scene for QuitAfter {
        fn load(&mut self, world: &mut World, _assets: &mut AssetCache) {
            let root = world.root();
            world.spawn_child(
                root,
                EntityDesc::labeled("tracked").with_behavior(Lifetime {
                    detached: Rc::clone(&self.detached),
                }),
            );
        }

        fn after_tick(&mut self, world: &mut World, _input: &InputSnapshot) -> SceneCommand {
            if world.tick_count() >= self.ticks {
                SceneCommand::Quit
            } else {
                SceneCommand::Continue
            }
        }

        fn unload(&mut self, _world: &mut World) {
            self.unloaded.set(true);
        }
    }

    #[test]
    fn runner_loads_ticks_and_shuts_down() {
        let detached = Rc::new(Cell::new(0));
        let unloaded = Rc::new(Cell::new(false));
        let mut runner = SceneRunner::new(Box::new(QuitAfter {
            ticks: 2,
            detached: Rc::clone(&detached),
            unloaded: Rc::clone(&unloaded),
        }));
        let mut assets = AssetCache::new("unused");

        runner.load(&mut assets);
        runner.load(&mut assets);
        let root = runner.world().root();
        let tracked = runner
            .world()
            .find_child_by_label(root, "tracked")
            .expect("live after load");
        assert!(runner.world().is_live(tracked));

        let input = InputSnapshot::empty();
        assert_eq!(runner.tick(1.0 / 60.0, &input), SceneCommand::Continue);
        assert_eq!(runner.tick(1.0 / 60.0, &input), SceneCommand::Quit);

        runner.shutdown();
        runner.shutdown();
        assert!(unloaded.get());
        assert_eq!(detached.get(), 1);
        assert_eq!(runner.world().live_count(), 1);
    }

    #[test]
    fn default_hooks_continue_without_title() {
        struct Empty;

        impl Scene for Empty {
            fn load(&mut self, _world: &mut World, _assets: &mut AssetCache) {}
        }

        let mut runner = SceneRunner::new(Box::new(Empty));
        runner.load(&mut AssetCache::new("unused"));
        assert_eq!(
            runner.tick(0.1, &InputSnapshot::empty()),
            SceneCommand::Continue
        );
        assert!(runner.debug_title().is_none());
        let root = runner.world().root();
        assert!(runner.world().children(root).is_empty());
    }
}
