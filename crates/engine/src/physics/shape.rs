use crate::scene::{Transform, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f32,
}

/// Axis-aligned rectangle centered on its entity; `size` is the full width/height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub size: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Rect(Rect),
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle(Circle { radius })
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect(Rect {
            size: Vec2::new(width, height),
        })
    }

    /// Resolves the local shape against a world transform. Rotation is ignored.
    pub fn to_world(&self, pose: &Transform) -> WorldShape {
        match self {
            Shape::Circle(circle) => WorldShape::Circle(WorldCircle {
                center: pose.position,
                radius: circle.radius.abs() * pose.scale.max_abs_component(),
            }),
            Shape::Rect(rect) => WorldShape::Rect(WorldRect {
                center: pose.position,
                half_extents: (rect.size * 0.5).abs().component_mul(pose.scale.abs()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCircle {
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl WorldRect {
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extents: ((max - min) * 0.5).abs(),
        }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min(), self.max())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldShape {
    Circle(WorldCircle),
    Rect(WorldRect),
}

/// Pairwise overlap test resolved on the concrete kinds of both operands.
///
/// `collide` re-dispatches to the partner's kind-specific method. There is one
/// kind-specific method per shape kind and none of them has a default, so a new
/// kind does not compile until it can be tested against every existing kind.
pub trait Collide {
    fn collide(&self, other: &WorldShape) -> bool;
    fn collide_circle(&self, circle: &WorldCircle) -> bool;
    fn collide_rect(&self, rect: &WorldRect) -> bool;
}

impl Collide for WorldCircle {
    fn collide(&self, other: &WorldShape) -> bool {
        other.collide_circle(self)
    }

    fn collide_circle(&self, circle: &WorldCircle) -> bool {
        circle_overlaps_circle(self, circle)
    }

    fn collide_rect(&self, rect: &WorldRect) -> bool {
        circle_overlaps_rect(self, rect)
    }
}

impl Collide for WorldRect {
    fn collide(&self, other: &WorldShape) -> bool {
        other.collide_rect(self)
    }

    fn collide_circle(&self, circle: &WorldCircle) -> bool {
        circle_overlaps_rect(circle, self)
    }

    fn collide_rect(&self, rect: &WorldRect) -> bool {
        rect_overlaps_rect(self, rect)
    }
}

impl Collide for WorldShape {
    fn collide(&self, other: &WorldShape) -> bool {
        match self {
            WorldShape::Circle(circle) => circle.collide(other),
            WorldShape::Rect(rect) => rect.collide(other),
        }
    }

    fn collide_circle(&self, circle: &WorldCircle) -> bool {
        match self {
            WorldShape::Circle(own) => own.collide_circle(circle),
            WorldShape::Rect(own) => own.collide_circle(circle),
        }
    }

    fn collide_rect(&self, rect: &WorldRect) -> bool {
        match self {
            WorldShape::Circle(own) => own.collide_rect(rect),
            WorldShape::Rect(own) => own.collide_rect(rect),
        }
    }
}

// Touching counts as overlapping in every test below.

fn circle_overlaps_circle(a: &WorldCircle, b: &WorldCircle) -> bool {
    let radius_sum = a.radius + b.radius;
    (a.center - b.center).length_squared() <= radius_sum * radius_sum
}

fn rect_overlaps_rect(a: &WorldRect, b: &WorldRect) -> bool {
    let (a_min, a_max) = (a.min(), a.max());
    let (b_min, b_max) = (b.min(), b.max());
    let separated = a_min.x > b_max.x || a_max.x < b_min.x || a_min.y > b_max.y || a_max.y < b_min.y;
    !separated
}

fn circle_overlaps_rect(circle: &WorldCircle, rect: &WorldRect) -> bool {
    let closest = rect.closest_point(circle.center);
    (circle.center - closest).length_squared() <= circle.radius * circle.radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_at(x: f32, y: f32, radius: f32) -> WorldShape {
        WorldShape::Circle(WorldCircle {
            center: Vec2::new(x, y),
            radius,
        })
    }

    fn rect_spanning(min: (f32, f32), max: (f32, f32)) -> WorldShape {
        WorldShape::Rect(WorldRect::from_min_max(
            Vec2::new(min.0, min.1),
            Vec2::new(max.0, max.1),
        ))
    }

    #[test]
    fn touching_circles_overlap() {
        assert!(circle_at(0.0, 0.0, 5.0).collide(&circle_at(10.0, 0.0, 5.0)));
    }

    #[test]
    fn circles_just_apart_do_not_overlap() {
        assert!(!circle_at(0.0, 0.0, 5.0).collide(&circle_at(10.1, 0.0, 5.0)));
    }

    #[test]
    fn rects_separated_on_x_do_not_overlap() {
        let a = rect_spanning((0.0, 0.0), (10.0, 10.0));
        let b = rect_spanning((10.1, 0.0), (20.0, 10.0));
        assert!(!a.collide(&b));
        assert!(!b.collide(&a));
    }

    #[test]
    fn rects_sharing_a_strip_overlap() {
        let a = rect_spanning((0.0, 0.0), (10.0, 10.0));
        let b = rect_spanning((9.9, 0.0), (20.0, 10.0));
        assert!(a.collide(&b));
        assert!(b.collide(&a));
    }

    #[test]
    fn rects_separated_on_y_do_not_overlap() {
        let a = rect_spanning((0.0, 0.0), (10.0, 10.0));
        let b = rect_spanning((0.0, -8.0), (10.0, -0.5));
        assert!(!a.collide(&b));
    }

    #[test]
    fn circle_near_rect_corner_uses_closest_point() {
        let rect = rect_spanning((0.0, 0.0), (10.0, 10.0));
        // Distance from (13,14) to the corner (10,10) is exactly 5.
        assert!(circle_at(13.0, 14.0, 5.0).collide(&rect));
        assert!(!circle_at(13.0, 14.0, 4.9).collide(&rect));
        assert!(rect.collide(&circle_at(13.0, 14.0, 5.0)));
    }

    #[test]
    fn circle_inside_rect_overlaps() {
        let rect = rect_spanning((0.0, 0.0), (10.0, 10.0));
        assert!(circle_at(5.0, 5.0, 0.5).collide(&rect));
    }

    #[test]
    fn circle_radius_uses_dominant_scale_axis() {
        let pose = Transform::from_position(Vec2::new(1.0, 2.0)).with_scale(Vec2::new(0.5, -3.0));
        let WorldShape::Circle(circle) = Shape::circle(2.0).to_world(&pose) else {
            panic!("expected circle");
        };
        assert_eq!(circle.center, Vec2::new(1.0, 2.0));
        assert!((circle.radius - 6.0).abs() < 0.0001);
    }

    #[test]
    fn rect_half_extents_scale_per_axis_and_ignore_rotation() {
        let pose = Transform::from_position(Vec2::new(5.0, 5.0))
            .with_rotation(1.0)
            .with_scale(Vec2::new(2.0, -0.5));
        let WorldShape::Rect(rect) = Shape::rect(10.0, 4.0).to_world(&pose) else {
            panic!("expected rect");
        };
        assert_eq!(rect.half_extents, Vec2::new(10.0, 1.0));
        assert_eq!(rect.min(), Vec2::new(-5.0, 4.0));
    }
}
