//! Collision predicates
//!
//! All checks are overlap tests on the current positions. There is no swept
//! test, so a fast body can pass through a thin obstacle between two frames;
//! the frame loop's delta clamp keeps that window small.
//!
//! Degenerate shapes (zero/negative size, NaN) never collide.

use super::body::{Body, Circle, GapObstacle, Rect};

/// Strict AABB overlap; rectangles that only touch do not overlap
pub fn check_aabb(a: &Rect, b: &Rect) -> bool {
    if a.is_degenerate() || b.is_degenerate() {
        return false;
    }
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// AABB overlap of two bodies' bounds
pub fn check_body_overlap(a: &Body, b: &Body) -> bool {
    check_aabb(&a.bounds(), &b.bounds())
}

/// Circles overlap when the center distance is below the radius sum
pub fn check_circle_collision(a: &Circle, b: &Circle) -> bool {
    if a.is_degenerate() || b.is_degenerate() {
        return false;
    }
    let reach = a.radius + b.radius;
    a.center.distance_squared(b.center) < reach * reach
}

/// Circle vs rectangle via the rectangle point closest to the circle center
pub fn check_circle_rect(circle: &Circle, rect: &Rect) -> bool {
    if circle.is_degenerate() || rect.is_degenerate() {
        return false;
    }
    let closest = rect.closest_point(circle.center);
    circle.center.distance_squared(closest) < circle.radius * circle.radius
}

/// Player hitbox: the body's circle shrunk by `forgiveness` (clamped to 0..=1)
///
/// A smaller collider than the drawn sprite makes near misses count as misses.
pub fn forgiving_circle(body: &Body, forgiveness: f32) -> Circle {
    body.circle().scaled(forgiveness.clamp(0.0, 1.0))
}

/// Shrunken player circle against a solid rectangle
pub fn check_forgiving_collision(player: &Body, obstacle: &Rect, forgiveness: f32) -> bool {
    check_circle_rect(&forgiving_circle(player, forgiveness), obstacle)
}

/// Shrunken player circle against the solid parts of a gap obstacle
pub fn check_gap_collision(player: &Body, gap: &GapObstacle, forgiveness: f32) -> bool {
    let hitbox = forgiving_circle(player, forgiveness);
    check_circle_rect(&hitbox, &gap.upper()) || check_circle_rect(&hitbox, &gap.lower())
}

/// Distance between two bodies' centers
pub fn distance(a: &Body, b: &Body) -> f32 {
    a.center().distance(b.center())
}
