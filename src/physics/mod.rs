//! 2D physics kernel
//!
//! Pure functions over caller-owned bodies:
//! - Integration scaled against a 60 Hz baseline
//! - AABB, circle and circle-vs-rectangle overlap tests
//! - Forgiving player hitboxes and gap obstacles
//! - Boundary clamping

pub mod body;
pub mod bounds;
pub mod collision;
pub mod integrate;

pub use body::{Body, Circle, GapObstacle, Rect};
pub use bounds::{EdgeHits, clamp_to_bounds, is_out_of_bounds};
pub use collision::{
    check_aabb, check_body_overlap, check_circle_collision, check_circle_rect,
    check_forgiving_collision, check_gap_collision, distance, forgiving_circle,
};
pub use integrate::PhysicsKernel;
