use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::scene::World;

use super::target::{FrameBuffer, Rgba};

pub const DEFAULT_CLEAR_COLOR: Rgba = [20, 22, 28, 255];

/// Presents a world's viewports to a window. Every pass draws into a CPU
/// frame buffer which is copied into the surface once per frame.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    frame: FrameBuffer,
    clear_color: Rgba,
}

impl Renderer {
    pub fn new(window: Arc<Window>, clear_color: Rgba) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            frame: FrameBuffer::new(size.width, size.height),
            clear_color,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.frame.resize(width, height);
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn render_world(&mut self, world: &mut World) -> Result<(), Error> {
        self.frame.clear(self.clear_color);
        world.draw(&mut self.frame);

        copy_to_surface(self.pixels.frame_mut(), self.frame.as_bytes());
        self.pixels.render()
    }
}

/// Copies the frame into the surface. Between a resize and the next surface
/// rebuild the lengths can disagree; only the shared prefix is copied and any
/// surface bytes past it are zeroed.
fn copy_to_surface(surface: &mut [u8], source: &[u8]) {
    let shared = surface.len().min(source.len());
    surface[..shared].copy_from_slice(&source[..shared]);
    surface[shared..].fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_lengths_copy_everything() {
        let source = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut surface = [0u8; 8];
        copy_to_surface(&mut surface, &source);
        assert_eq!(surface, source);
    }

    #[test]
    fn larger_surface_gets_prefix_and_zeroed_tail() {
        let mut surface = [9u8; 8];
        copy_to_surface(&mut surface, &[1, 2, 3, 4]);
        assert_eq!(surface, [1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn smaller_surface_takes_what_fits() {
        let mut surface = [0u8; 4];
        copy_to_surface(&mut surface, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(surface, [1, 2, 3, 4]);
    }

    #[test]
    fn frame_buffer_bytes_fit_a_surface_of_the_same_size() {
        let mut frame = FrameBuffer::new(3, 2);
        frame.clear(DEFAULT_CLEAR_COLOR);
        let mut surface = vec![0u8; 3 * 2 * 4];
        copy_to_surface(&mut surface, frame.as_bytes());
        assert_eq!(&surface[..4], &DEFAULT_CLEAR_COLOR);
        assert_eq!(&surface[20..], &DEFAULT_CLEAR_COLOR);
    }
}
