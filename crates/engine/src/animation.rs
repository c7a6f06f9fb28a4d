use crate::app::rendering::TextureRegion;
use crate::assets::TextureHandle;
use crate::scene::{Behavior, DrawCtx, EntityCtx, Vec2};

/// Uniform grid of frames in one texture, numbered row-major from the top-left.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub texture: TextureHandle,
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: u32,
}

impl SpriteSheet {
    pub fn new(texture: TextureHandle, frame_width: u32, frame_height: u32) -> Self {
        let columns = if frame_width == 0 {
            0
        } else {
            texture.width() / frame_width
        };
        Self {
            texture,
            frame_width,
            frame_height,
            columns,
        }
    }

    pub fn frame_count(&self) -> u32 {
        if self.columns == 0 || self.frame_height == 0 {
            return 0;
        }
        self.columns * (self.texture.height() / self.frame_height)
    }

    /// `None` when the frame falls outside the texture.
    pub fn frame_region(&self, index: u32) -> Option<TextureRegion> {
        if self.columns == 0 {
            return None;
        }
        let region = TextureRegion {
            x: (index % self.columns) * self.frame_width,
            y: (index / self.columns) * self.frame_height,
            width: self.frame_width,
            height: self.frame_height,
        };
        let fits = region.x + region.width <= self.texture.width()
            && region.y + region.height <= self.texture.height();
        fits.then_some(region)
    }
}

/// Steps through `count` consecutive sheet frames starting at `first`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAnimation {
    pub first: u32,
    pub count: u32,
    pub frame_seconds: f32,
    pub looping: bool,
    offset: u32,
    elapsed: f32,
    finished: bool,
}

impl SpriteAnimation {
    pub fn new(first: u32, count: u32, frame_seconds: f32, looping: bool) -> Self {
        Self {
            first,
            count,
            frame_seconds,
            looping,
            offset: 0,
            elapsed: 0.0,
            finished: false,
        }
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        if self.finished || self.count <= 1 || !(self.frame_seconds > 0.0) {
            return;
        }
        self.elapsed += dt_seconds.max(0.0);
        while self.elapsed >= self.frame_seconds {
            self.elapsed -= self.frame_seconds;
            if self.offset + 1 < self.count {
                self.offset += 1;
            } else if self.looping {
                self.offset = 0;
            } else {
                self.finished = true;
                self.elapsed = 0.0;
                break;
            }
        }
    }

    /// Absolute sheet index of the current frame.
    pub fn frame(&self) -> u32 {
        self.first + self.offset
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn restart(&mut self) {
        self.offset = 0;
        self.elapsed = 0.0;
        self.finished = false;
    }
}

/// Draws the current animation frame centered on its entity, advancing once
/// per tick.
#[derive(Debug, Clone)]
pub struct AnimatedSprite {
    sheet: SpriteSheet,
    animation: SpriteAnimation,
    size: Vec2,
}

impl AnimatedSprite {
    pub fn new(sheet: SpriteSheet, animation: SpriteAnimation, size: Vec2) -> Self {
        Self {
            sheet,
            animation,
            size,
        }
    }

    pub fn animation(&self) -> &SpriteAnimation {
        &self.animation
    }

    /// Switches clips, restarting unless the clip is already playing.
    pub fn play(&mut self, animation: SpriteAnimation) {
        if self.animation.first == animation.first && self.animation.count == animation.count {
            return;
        }
        self.animation = animation;
        self.animation.restart();
    }
}

impl Behavior for AnimatedSprite {
    fn on_tick(&mut self, ctx: &mut EntityCtx<'_>) {
        self.animation.advance(ctx.fixed_dt_seconds());
    }

    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let Some(region) = self.sheet.frame_region(self.animation.frame()) else {
            return;
        };
        let transform = ctx.world_transform();
        ctx.target().draw_texture(
            transform.position,
            self.size.component_mul(transform.scale),
            &self.sheet.texture,
            region,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Texture;

    fn sheet(width: u32, height: u32) -> SpriteSheet {
        SpriteSheet::new(
            TextureHandle::from(Texture::solid(width, height, [255; 4])),
            16,
            8,
        )
    }

    #[test]
    fn frames_are_row_major() {
        let sheet = sheet(64, 16);
        assert_eq!(sheet.columns, 4);
        assert_eq!(sheet.frame_count(), 8);
        assert_eq!(
            sheet.frame_region(5),
            Some(TextureRegion {
                x: 16,
                y: 8,
                width: 16,
                height: 8
            })
        );
        assert_eq!(sheet.frame_region(8), None);
    }

    #[test]
    fn zero_width_frames_have_no_regions() {
        let sheet = SpriteSheet::new(
            TextureHandle::from(Texture::solid(4, 4, [0; 4])),
            0,
            4,
        );
        assert_eq!(sheet.frame_count(), 0);
        assert_eq!(sheet.frame_region(0), None);
    }

    #[test]
    fn looping_animation_wraps() {
        let mut animation = SpriteAnimation::new(4, 3, 0.1, true);
        animation.advance(0.25);
        assert_eq!(animation.frame(), 6);
        animation.advance(0.1);
        assert_eq!(animation.frame(), 4);
        assert!(!animation.is_finished());
    }

    #[test]
    fn one_shot_animation_holds_last_frame() {
        let mut animation = SpriteAnimation::new(0, 2, 0.1, false);
        animation.advance(1.0);
        assert!(animation.is_finished());
        assert_eq!(animation.frame(), 1);

        animation.restart();
        assert_eq!(animation.frame(), 0);
        assert!(!animation.is_finished());
    }

    #[test]
    fn degenerate_timing_does_not_advance() {
        let mut animation = SpriteAnimation::new(2, 4, 0.0, true);
        animation.advance(5.0);
        assert_eq!(animation.frame(), 2);
    }

    #[test]
    fn play_restarts_only_on_clip_change() {
        let mut sprite = AnimatedSprite::new(
            sheet(64, 16),
            SpriteAnimation::new(0, 4, 0.1, true),
            Vec2::ONE,
        );
        sprite.animation.advance(0.15);
        sprite.play(SpriteAnimation::new(0, 4, 0.1, true));
        assert_eq!(sprite.animation().frame(), 1);

        sprite.play(SpriteAnimation::new(4, 4, 0.1, true));
        assert_eq!(sprite.animation().frame(), 4);
    }
}
