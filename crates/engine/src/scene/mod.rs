mod context;
mod entity;
mod layers;
mod transform;
mod viewport;
mod world;

pub use context::{DrawCtx, EntityCtx};
pub use entity::{AsAny, Behavior, EntityDesc, EntityId, EntityKind, LifecycleState};
pub use layers::{LayerMask, MAX_LAYERS};
pub use transform::{Transform, Vec2};
pub use viewport::{
    Camera, ViewportManager, CAMERA_ZOOM_DEFAULT, CAMERA_ZOOM_MAX, CAMERA_ZOOM_MIN,
};
pub use world::{World, MAX_SWEEP_PASSES};
