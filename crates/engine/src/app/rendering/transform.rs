use crate::app::rendering::target::{ScreenRegion, View};
use crate::scene::Vec2;

pub const PIXELS_PER_WORLD: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

pub fn region_to_pixels(region: ScreenRegion, target_size: (u32, u32)) -> PixelRect {
    PixelRect {
        left: region.x * target_size.0 as f32,
        top: region.y * target_size.1 as f32,
        width: region.width * target_size.0 as f32,
        height: region.height * target_size.1 as f32,
    }
}

pub fn view_pixels_per_world(view: &View, target_size: (u32, u32)) -> Vec2 {
    let rect = region_to_pixels(view.region, target_size);
    let safe = |pixels: f32, world: f32| {
        if world.is_finite() && world > f32::EPSILON {
            pixels / world
        } else {
            PIXELS_PER_WORLD
        }
    };
    Vec2::new(safe(rect.width, view.size.x), safe(rect.height, view.size.y))
}

/// World space is y-up; screen space is y-down with the view center at the
/// center of its screen region.
pub fn world_to_screen(world: Vec2, view: &View, target_size: (u32, u32)) -> Vec2 {
    let rect = region_to_pixels(view.region, target_size);
    let scale = view_pixels_per_world(view, target_size);
    Vec2::new(
        rect.left + rect.width * 0.5 + (world.x - view.center.x) * scale.x,
        rect.top + rect.height * 0.5 - (world.y - view.center.y) * scale.y,
    )
}

pub fn screen_to_world(screen: Vec2, view: &View, target_size: (u32, u32)) -> Vec2 {
    let rect = region_to_pixels(view.region, target_size);
    let scale = view_pixels_per_world(view, target_size);
    Vec2::new(
        view.center.x + (screen.x - rect.left - rect.width * 0.5) / scale.x,
        view.center.y - (screen.y - rect.top - rect.height * 0.5) / scale.y,
    )
}
