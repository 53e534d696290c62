//! Physics body records and collision shapes
//!
//! Bodies belong to the game that creates them. The kernel only ever borrows
//! them for the duration of a call.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Zero/negative area or non-finite coordinates
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || !(self.x.is_finite() && self.y.is_finite())
            || !(self.width.is_finite() && self.height.is_finite())
    }

    /// Closest point inside the rectangle to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.max(self.x).min(self.right()),
            p.y.max(self.y).min(self.bottom()),
        )
    }
}

/// Circle collider
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            radius,
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.radius > 0.0 && self.radius.is_finite()) || !self.center.is_finite()
    }

    /// Same center, radius scaled by `factor`
    #[inline]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            center: self.center,
            radius: self.radius * factor,
        }
    }
}

/// A moving or static game entity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub velocity_x: f32,
    #[serde(default)]
    pub velocity_y: f32,
    #[serde(default)]
    pub acceleration_x: Option<f32>,
    #[serde(default)]
    pub acceleration_y: Option<f32>,
    /// Exempt from integration; still collides
    #[serde(default)]
    pub is_static: bool,
    /// Overrides the radius derived from the bounds
    #[serde(default)]
    pub collision_radius: Option<f32>,
}

impl Body {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    /// Immovable body (walls, platforms, obstacles)
    pub fn fixed(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            is_static: true,
            ..Self::new(x, y, width, height)
        }
    }

    pub fn with_velocity(mut self, velocity_x: f32, velocity_y: f32) -> Self {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
        self
    }

    pub fn with_acceleration(mut self, acceleration_x: f32, acceleration_y: f32) -> Self {
        self.acceleration_x = Some(acceleration_x);
        self.acceleration_y = Some(acceleration_y);
        self
    }

    pub fn with_collision_radius(mut self, radius: f32) -> Self {
        self.collision_radius = Some(radius);
        self
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.velocity_x, self.velocity_y)
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.bounds().is_degenerate()
    }

    /// Circle hitbox: explicit collision radius, or half the smaller side
    pub fn circle(&self) -> Circle {
        let radius = self
            .collision_radius
            .unwrap_or_else(|| self.width.min(self.height) / 2.0);
        Circle {
            center: self.center(),
            radius,
        }
    }
}

/// Obstacle spanning a column with a passable opening (pipe pair, wall gap)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapObstacle {
    pub x: f32,
    pub width: f32,
    /// Top edge of the opening
    pub gap_y: f32,
    pub gap_height: f32,
    /// Vertical extent of the column
    pub top: f32,
    pub bottom: f32,
}

impl GapObstacle {
    pub fn new(x: f32, width: f32, gap_y: f32, gap_height: f32, top: f32, bottom: f32) -> Self {
        Self {
            x,
            width,
            gap_y,
            gap_height,
            top,
            bottom,
        }
    }

    /// Solid part above the opening
    pub fn upper(&self) -> Rect {
        Rect::new(self.x, self.top, self.width, self.gap_y - self.top)
    }

    /// Solid part below the opening
    pub fn lower(&self) -> Rect {
        let gap_bottom = self.gap_y + self.gap_height;
        Rect::new(self.x, gap_bottom, self.width, self.bottom - gap_bottom)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_circle_uses_smaller_side() {
        let body = Body::new(0.0, 0.0, 40.0, 20.0);
        let circle = body.circle();
        assert_eq!(circle.radius, 10.0);
        assert_eq!(circle.center, Vec2::new(20.0, 10.0));

        let body = body.with_collision_radius(4.0);
        assert_eq!(body.circle().radius, 4.0);
    }

    #[test]
    fn test_degenerate_shapes() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 10.0, -1.0).is_degenerate());
        assert!(Rect::new(f32::NAN, 0.0, 10.0, 10.0).is_degenerate());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
        assert!(Circle::new(0.0, 0.0, 0.0).is_degenerate());
        assert!(!Circle::new(0.0, 0.0, 0.5).is_degenerate());
    }

    #[test]
    fn test_gap_obstacle_parts() {
        let gap = GapObstacle::new(100.0, 50.0, 200.0, 120.0, 0.0, 600.0);
        assert_eq!(gap.upper(), Rect::new(100.0, 0.0, 50.0, 200.0));
        assert_eq!(gap.lower(), Rect::new(100.0, 320.0, 50.0, 280.0));
        assert_eq!(gap.right(), 150.0);
    }

    #[test]
    fn test_body_deserializes_partial_record() {
        let body: Body =
            serde_json::from_str(r#"{"x": 1, "y": 2, "width": 3, "height": 4, "isStatic": true}"#)
                .unwrap();
        assert!(body.is_static);
        assert_eq!(body.velocity_x, 0.0);
        assert_eq!(body.acceleration_y, None);
    }
}
