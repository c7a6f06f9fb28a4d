mod renderer;
mod target;
mod transform;

pub use renderer::{Renderer, DEFAULT_CLEAR_COLOR};
pub use target::{FrameBuffer, RenderTarget, Rgba, ScreenRegion, TextureRegion, View};
pub use transform::{
    region_to_pixels, screen_to_world, view_pixels_per_world, world_to_screen, PixelRect,
    PIXELS_PER_WORLD,
};
