mod registry;
mod shape;

pub use registry::PhysicsRegistry;
pub use shape::{Circle, Collide, Rect, Shape, WorldCircle, WorldRect, WorldShape};
