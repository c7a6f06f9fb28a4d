use super::entity::EntityId;
use super::layers::LayerMask;
use super::transform::Vec2;
use crate::app::rendering::{region_to_pixels, ScreenRegion, View, PIXELS_PER_WORLD};

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.1;
pub const CAMERA_ZOOM_MAX: f32 = 8.0;

/// Viewport parameters carried by a viewport entity. The view is centered on
/// the entity's world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Lower priorities draw first.
    pub priority: i32,
    pub filter: LayerMask,
    pub zoom: f32,
    pub region: ScreenRegion,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            priority: 0,
            filter: LayerMask::DEFAULT,
            zoom: CAMERA_ZOOM_DEFAULT,
            region: ScreenRegion::FULL,
        }
    }
}

impl Camera {
    pub fn new(priority: i32, filter: LayerMask) -> Self {
        Self {
            priority,
            filter,
            ..Self::default()
        }
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = clamp_camera_zoom(zoom);
        self
    }

    pub fn with_region(mut self, region: ScreenRegion) -> Self {
        self.region = region;
        self
    }

    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn view(&self, center: Vec2, target_size: (u32, u32)) -> View {
        let pixels = region_to_pixels(self.region, target_size);
        let pixels_per_world = PIXELS_PER_WORLD * self.effective_zoom();
        View {
            center,
            size: Vec2::new(
                pixels.width / pixels_per_world,
                pixels.height / pixels_per_world,
            ),
            region: self.region,
        }
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ViewportEntry {
    priority: i32,
    serial: u64,
    id: EntityId,
}

impl ViewportEntry {
    fn sort_key(&self) -> (i32, u64) {
        (self.priority, self.serial)
    }
}

/// Live viewports of one world, kept sorted by `(priority, serial)`.
#[derive(Debug, Default)]
pub struct ViewportManager {
    entries: Vec<ViewportEntry>,
}

impl ViewportManager {
    pub(crate) fn insert(&mut self, id: EntityId, priority: i32, serial: u64) -> bool {
        if self.contains(id) {
            return false;
        }
        let entry = ViewportEntry {
            priority,
            serial,
            id,
        };
        let index = self
            .entries
            .partition_point(|existing| existing.sort_key() < entry.sort_key());
        self.entries.insert(index, entry);
        true
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_priority(&mut self, id: EntityId, priority: i32) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let mut entry = self.entries.remove(index);
        entry.priority = priority;
        let index = self
            .entries
            .partition_point(|existing| existing.sort_key() < entry.sort_key());
        self.entries.insert(index, entry);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn ordered(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
