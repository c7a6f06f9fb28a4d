use thiserror::Error;

use crate::app::rendering::Rgba;
use crate::scene::{Behavior, DrawCtx, Vec2};

/// Grid of tile ids in the local space of its owning entity.
///
/// `origin` is the bottom-left corner of tile (0,0); the center of tile (x,y)
/// is `origin + (x + 0.5, y + 0.5) * tile_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    origin: Vec2,
    tile_size: f32,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be positive and finite, got {0}")]
    InvalidTileSize(f32),
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        origin: Vec2,
        tile_size: f32,
        tiles: Vec<u16>,
    ) -> Result<Self, TilemapError> {
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(TilemapError::InvalidTileSize(tile_size));
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tile_size,
            tiles,
        })
    }

    pub fn filled(
        width: u32,
        height: u32,
        origin: Vec2,
        tile_size: f32,
        tile: u16,
    ) -> Result<Self, TilemapError> {
        Self::new(
            width,
            height,
            origin,
            tile_size,
            vec![tile; width as usize * height as usize],
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn set_tile(&mut self, x: u32, y: u32, tile: u16) -> bool {
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        self.tiles[index] = tile;
        true
    }

    /// Cell containing `position`. Cell edges belong to the cell above/right.
    pub fn cell_at_world(&self, position: Vec2) -> Option<(u32, u32)> {
        let fx = ((position.x - self.origin.x) / self.tile_size).floor();
        let fy = ((position.y - self.origin.y) / self.tile_size).floor();
        if !(fx.is_finite() && fy.is_finite()) || fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (x, y) = (fx as u32, fy as u32);
        self.index_of(x, y).map(|_| (x, y))
    }

    pub fn tile_at_world(&self, position: Vec2) -> Option<u16> {
        let (x, y) = self.cell_at_world(position)?;
        self.tile_at(x, y)
    }

    pub fn in_bounds_world(&self, position: Vec2) -> bool {
        self.cell_at_world(position).is_some()
    }

    pub fn tile_center_world(&self, x: u32, y: u32) -> Option<Vec2> {
        self.index_of(x, y)?;
        Some(Vec2::new(
            self.origin.x + (x as f32 + 0.5) * self.tile_size,
            self.origin.y + (y as f32 + 0.5) * self.tile_size,
        ))
    }

    /// Inclusive cell range overlapping the local-space box `[min, max]`.
    fn cells_overlapping(&self, min: Vec2, max: Vec2) -> Option<CellRect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let to_cell = |value: f32, origin: f32| (value - origin) / self.tile_size;
        let raw_x_min = to_cell(min.x, self.origin.x).floor() as i64;
        let raw_x_max = to_cell(max.x, self.origin.x).ceil() as i64 - 1;
        let raw_y_min = to_cell(min.y, self.origin.y).floor() as i64;
        let raw_y_max = to_cell(max.y, self.origin.y).ceil() as i64 - 1;

        let x_min = raw_x_min.max(0);
        let x_max = raw_x_max.min(self.width as i64 - 1);
        let y_min = raw_y_min.max(0);
        let y_max = raw_y_max.min(self.height as i64 - 1);
        if x_min > x_max || y_min > y_max {
            return None;
        }

        Some(CellRect {
            x_min: x_min as u32,
            x_max: x_max as u32,
            y_min: y_min as u32,
            y_max: y_max as u32,
        })
    }

    fn all_cells(&self) -> Option<CellRect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(CellRect {
            x_min: 0,
            x_max: self.width - 1,
            y_min: 0,
            y_max: self.height - 1,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRect {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

/// Draws a [`Tilemap`] as filled cells, one palette colour per tile id.
/// Ids without a palette entry, or with a transparent one, are skipped.
#[derive(Debug, Clone)]
pub struct TileLayer {
    map: Tilemap,
    palette: Vec<Rgba>,
}

impl TileLayer {
    pub fn new(map: Tilemap, palette: Vec<Rgba>) -> Self {
        Self { map, palette }
    }

    pub fn map(&self) -> &Tilemap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Tilemap {
        &mut self.map
    }

    fn color_of(&self, tile: u16) -> Option<Rgba> {
        self.palette
            .get(tile as usize)
            .copied()
            .filter(|color| color[3] > 0)
    }
}

impl Behavior for TileLayer {
    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let transform = ctx.world_transform();
        let scale = transform.scale;
        let view = ctx.target().view();

        // Cull against the view only when the grid stays axis aligned.
        let cells = if transform.rotation_radians == 0.0 && scale.x != 0.0 && scale.y != 0.0 {
            let half = view.size * 0.5;
            let a = (view.center - half - transform.position).component_mul(inverse(scale));
            let b = (view.center + half - transform.position).component_mul(inverse(scale));
            let min = Vec2::new(a.x.min(b.x), a.y.min(b.y));
            let max = Vec2::new(a.x.max(b.x), a.y.max(b.y));
            self.map.cells_overlapping(min, max)
        } else {
            self.map.all_cells()
        };
        let Some(cells) = cells else {
            return;
        };

        let cell_size = Vec2::ONE.component_mul(scale) * self.map.tile_size;
        for y in cells.y_min..=cells.y_max {
            for x in cells.x_min..=cells.x_max {
                let Some(color) = self.map.tile_at(x, y).and_then(|tile| self.color_of(tile)) else {
                    continue;
                };
                let Some(center) = self.map.tile_center_world(x, y) else {
                    continue;
                };
                ctx.target()
                    .fill_rect(transform.transform_point(center), cell_size, color);
            }
        }
    }
}

fn inverse(scale: Vec2) -> Vec2 {
    Vec2::new(1.0 / scale.x, 1.0 / scale.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::FrameBuffer;
    use crate::scene::{Camera, EntityDesc, LayerMask, World};

    const GRASS: Rgba = [40, 160, 60, 255];
    const DIRT: Rgba = [120, 80, 40, 255];
    const WATER: Rgba = [30, 60, 200, 255];

    #[test]
    fn new_rejects_invalid_tile_count() {
        let error = Tilemap::new(2, 2, Vec2::ZERO, 1.0, vec![0, 1, 2]).expect_err("err");
        assert_eq!(
            error,
            TilemapError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert!(matches!(
            Tilemap::new(1, 1, Vec2::ZERO, 0.0, vec![0]),
            Err(TilemapError::InvalidTileSize(_))
        ));
    }

    #[test]
    fn indexing_and_bounds() {
        let map = Tilemap::new(2, 2, Vec2::ZERO, 1.0, vec![10, 11, 12, 13]).expect("tilemap");
        assert_eq!(map.index_of(1, 1), Some(3));
        assert_eq!(map.tile_at(0, 0), Some(10));
        assert_eq!(map.tile_at(1, 1), Some(13));
        assert_eq!(map.index_of(2, 0), None);
        assert_eq!(map.tile_at(2, 2), None);
    }

    #[test]
    fn origin_and_tile_size_place_centers() {
        let map = Tilemap::filled(4, 4, Vec2::new(3.0, -2.0), 2.0, 1).expect("tilemap");
        let center = map.tile_center_world(2, 1).expect("center");
        assert_eq!(center, Vec2::new(8.0, 1.0));
        assert_eq!(map.tile_center_world(4, 0), None);
    }

    #[test]
    fn world_lookup_uses_floor_and_rejects_outside() {
        let mut map = Tilemap::filled(3, 2, Vec2::new(-1.0, 0.0), 0.5, 0).expect("tilemap");
        assert!(map.set_tile(2, 1, 7));
        assert!(!map.set_tile(3, 0, 7));

        assert_eq!(map.cell_at_world(Vec2::new(-1.0, 0.0)), Some((0, 0)));
        assert_eq!(map.cell_at_world(Vec2::new(0.25, 0.75)), Some((2, 1)));
        assert_eq!(map.tile_at_world(Vec2::new(0.4, 0.9)), Some(7));
        assert!(map.in_bounds_world(Vec2::new(0.49, 0.99)));
        assert!(!map.in_bounds_world(Vec2::new(0.5, 0.5)));
        assert!(!map.in_bounds_world(Vec2::new(-1.01, 0.5)));
        assert!(!map.in_bounds_world(Vec2::new(f32::NAN, 0.5)));
    }

    #[test]
    fn overlap_range_is_clamped_to_grid() {
        let map = Tilemap::filled(4, 4, Vec2::ZERO, 1.0, 0).expect("tilemap");
        assert_eq!(
            map.cells_overlapping(Vec2::new(-5.0, 1.5), Vec2::new(2.5, 9.0)),
            Some(CellRect {
                x_min: 0,
                x_max: 2,
                y_min: 1,
                y_max: 3
            })
        );
        assert_eq!(
            map.cells_overlapping(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0)),
            None
        );
    }

    #[test]
    fn layer_draws_palette_colors_through_viewport() {
        let mut world = World::new();
        let root = world.root();
        world.spawn_child(root, EntityDesc::new().with_camera(Camera::new(0, LayerMask::ALL)));
        let map = Tilemap::new(2, 2, Vec2::new(-1.0, -1.0), 1.0, vec![0, 1, 2, 3]).expect("map");
        world.spawn_child(
            root,
            EntityDesc::labeled("ground").with_behavior(TileLayer::new(map, vec![GRASS, DIRT, WATER])),
        );
        world.apply_pending();

        let mut frame = FrameBuffer::new(64, 64);
        world.draw(&mut frame);

        // Screen is y-down: the top-left quadrant is cell (0,1).
        assert_eq!(frame.pixel(16, 16), Some(WATER));
        assert_eq!(frame.pixel(16, 48), Some(GRASS));
        assert_eq!(frame.pixel(48, 48), Some(DIRT));
        // Tile id 3 has no palette entry.
        assert_eq!(frame.pixel(48, 16), Some([0, 0, 0, 0]));
    }

    #[test]
    fn layer_follows_entity_transform() {
        let mut world = World::new();
        let root = world.root();
        world.spawn_child(root, EntityDesc::new().with_camera(Camera::new(0, LayerMask::ALL)));
        let map = Tilemap::filled(1, 1, Vec2::ZERO, 0.5, 0).expect("map");
        let layer = world
            .spawn_child(
                root,
                EntityDesc::new().with_behavior(TileLayer::new(map, vec![GRASS])),
            )
            .expect("spawned");
        world.apply_pending();
        world.set_position(layer, Vec2::new(-1.0, -1.0));
        world.set_scale(layer, Vec2::new(2.0, 2.0));

        let mut frame = FrameBuffer::new(64, 64);
        world.draw(&mut frame);

        // The single cell now spans world [-1, 0] on both axes.
        assert_eq!(frame.pixel(16, 48), Some(GRASS));
        assert_eq!(frame.pixel(48, 16), Some([0, 0, 0, 0]));
        assert!(world.behavior::<TileLayer>(layer).is_some());
    }
}
