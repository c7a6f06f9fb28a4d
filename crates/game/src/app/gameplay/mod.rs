mod behaviors;
mod scene;

use arbor_engine::Scene;

pub(crate) fn build_scene() -> Box<dyn Scene> {
    Box::new(scene::DemoScene::new())
}

#[cfg(test)]
mod tests;
