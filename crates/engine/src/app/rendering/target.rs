use crate::assets::Texture;
use crate::scene::Vec2;

use super::transform::{region_to_pixels, view_pixels_per_world, world_to_screen, PixelRect};

pub type Rgba = [u8; 4];

/// Normalized sub-rectangle of the render target, each component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRegion {
    pub const FULL: ScreenRegion = ScreenRegion {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

impl Default for ScreenRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// World-space rectangle shown in a screen region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: Vec2,
    pub size: Vec2,
    pub region: ScreenRegion,
}

impl Default for View {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            size: Vec2::new(1.0, 1.0),
            region: ScreenRegion::FULL,
        }
    }
}

/// Texel sub-rectangle of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    pub fn whole(texture: &Texture) -> Self {
        Self {
            x: 0,
            y: 0,
            width: texture.width(),
            height: texture.height(),
        }
    }
}

/// Drawing surface handed to `on_draw`. Coordinates are world space and are
/// mapped through the active view.
pub trait RenderTarget {
    fn size(&self) -> (u32, u32);
    fn set_view(&mut self, view: View);
    fn view(&self) -> View;
    fn fill_rect(&mut self, center: Vec2, size: Vec2, color: Rgba);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);
    fn draw_texture(&mut self, center: Vec2, size: Vec2, texture: &Texture, region: TextureRegion);
}

/// CPU-side RGBA8 surface.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    view: View,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
            view: View::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.rgba = vec![0; width as usize * height as usize * 4];
    }

    pub fn clear(&mut self, color: Rgba) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut color = [0; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    fn clip_rect(&self) -> PixelRect {
        let region = region_to_pixels(self.view.region, (self.width, self.height));
        let left = region.left.max(0.0);
        let top = region.top.max(0.0);
        PixelRect {
            left,
            top,
            width: (region.right().min(self.width as f32) - left).max(0.0),
            height: (region.bottom().min(self.height as f32) - top).max(0.0),
        }
    }

    /// Pixel columns/rows whose centers fall in `[min, max)` and in the clip.
    fn covered_pixels(&self, min: Vec2, max: Vec2) -> Option<(i32, i32, i32, i32)> {
        let clip = self.clip_rect();
        let x0 = (min.x.max(clip.left) - 0.5).ceil() as i32;
        let y0 = (min.y.max(clip.top) - 0.5).ceil() as i32;
        let x1 = (max.x.min(clip.right()) - 0.5).ceil() as i32;
        let y1 = (max.y.min(clip.bottom()) - 0.5).ceil() as i32;
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    fn write_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        write_pixel_rgba_clipped(&mut self.rgba, self.width as usize, x, y, color);
    }

    fn screen_bounds(&self, center: Vec2, size: Vec2) -> (Vec2, Vec2) {
        let target_size = (self.width, self.height);
        let scale = view_pixels_per_world(&self.view, target_size);
        let screen_center = world_to_screen(center, &self.view, target_size);
        let half = Vec2::new(size.x.abs() * scale.x, size.y.abs() * scale.y) * 0.5;
        (screen_center - half, screen_center + half)
    }
}

impl RenderTarget for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }

    fn view(&self) -> View {
        self.view
    }

    fn fill_rect(&mut self, center: Vec2, size: Vec2, color: Rgba) {
        let (min, max) = self.screen_bounds(center, size);
        let Some((x0, y0, x1, y1)) = self.covered_pixels(min, max) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.write_pixel(x, y, color);
            }
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        let target_size = (self.width, self.height);
        let scale = view_pixels_per_world(&self.view, target_size);
        let screen_center = world_to_screen(center, &self.view, target_size);
        let radius_px = Vec2::new(radius.abs() * scale.x, radius.abs() * scale.y);
        if radius_px.x <= 0.0 || radius_px.y <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) =
            self.covered_pixels(screen_center - radius_px, screen_center + radius_px)
        else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = (x as f32 + 0.5 - screen_center.x) / radius_px.x;
                let dy = (y as f32 + 0.5 - screen_center.y) / radius_px.y;
                if dx * dx + dy * dy <= 1.0 {
                    self.write_pixel(x, y, color);
                }
            }
        }
    }

    fn draw_texture(&mut self, center: Vec2, size: Vec2, texture: &Texture, region: TextureRegion) {
        if region.width == 0
            || region.height == 0
            || region.x + region.width > texture.width()
            || region.y + region.height > texture.height()
        {
            return;
        }
        let (min, max) = self.screen_bounds(center, size);
        let Some((x0, y0, x1, y1)) = self.covered_pixels(min, max) else {
            return;
        };
        let span = max - min;
        for y in y0..y1 {
            let v = ((y as f32 + 0.5 - min.y) / span.y * region.height as f32).floor() as u32;
            let src_y = region.y + v.min(region.height - 1);
            for x in x0..x1 {
                let u = ((x as f32 + 0.5 - min.x) / span.x * region.width as f32).floor() as u32;
                let src_x = region.x + u.min(region.width - 1);
                let Some(texel) = texture.pixel(src_x, src_y) else {
                    continue;
                };
                if texel[3] == 0 {
                    continue;
                }
                self.write_pixel(x, y, texel);
            }
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: Rgba) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];
    const CLEAR: Rgba = [0, 0, 0, 255];

    fn unit_view(width: u32, height: u32) -> View {
        // One world unit per pixel, origin at the target center.
        View {
            center: Vec2::ZERO,
            size: Vec2::new(width as f32, height as f32),
            region: ScreenRegion::FULL,
        }
    }

    #[test]
    fn fill_rect_covers_expected_pixels() {
        let mut frame = FrameBuffer::new(8, 8);
        frame.clear(CLEAR);
        frame.set_view(unit_view(8, 8));
        frame.fill_rect(Vec2::ZERO, Vec2::new(2.0, 2.0), RED);

        assert_eq!(frame.pixel(3, 3), Some(RED));
        assert_eq!(frame.pixel(4, 4), Some(RED));
        assert_eq!(frame.pixel(2, 3), Some(CLEAR));
        assert_eq!(frame.pixel(5, 4), Some(CLEAR));
    }

    #[test]
    fn drawing_is_clipped_to_view_region() {
        let mut frame = FrameBuffer::new(8, 8);
        frame.clear(CLEAR);
        let mut view = unit_view(4, 8);
        view.region = ScreenRegion {
            x: 0.0,
            y: 0.0,
            width: 0.5,
            height: 1.0,
        };
        frame.set_view(view);
        frame.fill_rect(Vec2::ZERO, Vec2::new(100.0, 100.0), RED);

        assert_eq!(frame.pixel(3, 0), Some(RED));
        assert_eq!(frame.pixel(4, 0), Some(CLEAR));
    }

    #[test]
    fn fill_circle_leaves_corners_untouched() {
        let mut frame = FrameBuffer::new(10, 10);
        frame.clear(CLEAR);
        frame.set_view(unit_view(10, 10));
        frame.fill_circle(Vec2::ZERO, 4.0, RED);

        assert_eq!(frame.pixel(5, 5), Some(RED));
        assert_eq!(frame.pixel(1, 1), Some(CLEAR));
    }

    #[test]
    fn texture_draw_skips_transparent_texels() {
        let texture = Texture::from_rgba(
            2,
            1,
            vec![255, 255, 255, 255, 0, 0, 0, 0],
        )
        .expect("texture");
        let mut frame = FrameBuffer::new(2, 1);
        frame.clear(CLEAR);
        frame.set_view(unit_view(2, 1));
        frame.draw_texture(
            Vec2::ZERO,
            Vec2::new(2.0, 1.0),
            &texture,
            TextureRegion::whole(&texture),
        );

        assert_eq!(frame.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(1, 0), Some(CLEAR));
    }

    #[test]
    fn zero_sized_frame_is_safe() {
        let mut frame = FrameBuffer::new(0, 0);
        frame.set_view(unit_view(1, 1));
        frame.fill_rect(Vec2::ZERO, Vec2::new(5.0, 5.0), RED);
        frame.fill_circle(Vec2::ZERO, 5.0, RED);
        assert!(frame.as_bytes().is_empty());
    }
}
