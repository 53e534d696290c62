//! Keeping bodies inside a play area

use serde::Serialize;

use super::body::{Body, Rect};
use super::collision::check_aabb;

/// Which edges of the boundary a body was pushed back from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EdgeHits {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl EdgeHits {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }

    /// Landed on the floor (y grows downward)
    pub fn grounded(&self) -> bool {
        self.bottom
    }
}

/// Push `body` back inside `bounds`, zeroing the velocity component that
/// carried it out
///
/// A body larger than the bounds on an axis is aligned to the left/top edge.
pub fn clamp_to_bounds(body: &mut Body, bounds: &Rect) -> EdgeHits {
    let mut hits = EdgeHits::default();

    if body.x + body.width > bounds.right() {
        body.x = bounds.right() - body.width;
        body.velocity_x = 0.0;
        hits.right = true;
    }
    if body.x < bounds.x {
        body.x = bounds.x;
        body.velocity_x = 0.0;
        hits.left = true;
    }
    if body.y + body.height > bounds.bottom() {
        body.y = bounds.bottom() - body.height;
        body.velocity_y = 0.0;
        hits.bottom = true;
    }
    if body.y < bounds.y {
        body.y = bounds.y;
        body.velocity_y = 0.0;
        hits.top = true;
    }

    hits
}

/// True once the body no longer overlaps the area at all
pub fn is_out_of_bounds(body: &Body, bounds: &Rect) -> bool {
    !check_aabb(&body.bounds(), bounds)
}
