//! Frame-rate independent integration
//!
//! Velocities and accelerations are tuned "per frame at 60 Hz". Every update
//! scales by `dt / BASE_TIMESTEP_MS`, so a 30 Hz device advances twice as far
//! per call and the motion matches a 60 Hz one over the same wall time.

use super::body::{Body, GapObstacle, Rect};
use super::bounds::{EdgeHits, clamp_to_bounds};
use super::collision::{check_forgiving_collision, check_gap_collision};
use crate::config::PhysicsConfig;
use crate::consts::BASE_TIMESTEP_MS;

/// Physics tuning plus the functions that use it. Holds no body state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsKernel {
    config: PhysicsConfig,
}

/// `dt` (ms) relative to one 60 Hz frame; 0 for unusable deltas
#[inline]
fn time_scale(dt: f64) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        (dt / BASE_TIMESTEP_MS) as f32
    } else {
        0.0
    }
}

impl PhysicsKernel {
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// `velocity_y += gravity * scale`
    pub fn apply_gravity(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        body.velocity_y += self.config.gravity * time_scale(dt);
    }

    /// Apply the body's own acceleration, if it has one
    pub fn apply_acceleration(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        let scale = time_scale(dt);
        if let Some(ax) = body.acceleration_x {
            body.velocity_x += ax * scale;
        }
        if let Some(ay) = body.acceleration_y {
            body.velocity_y += ay * scale;
        }
    }

    /// `position += velocity * scale`
    pub fn apply_velocity(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        let scale = time_scale(dt);
        body.x += body.velocity_x * scale;
        body.y += body.velocity_y * scale;
    }

    pub fn clamp_velocity(&self, body: &mut Body) {
        let max_x = self.config.max_velocity_x;
        let max_y = self.config.max_velocity_y;
        body.velocity_x = body.velocity_x.max(-max_x).min(max_x);
        body.velocity_y = body.velocity_y.max(-max_y).min(max_y);
    }

    /// Instantaneous velocity change (jump, flap, knockback)
    pub fn apply_impulse(&self, body: &mut Body, impulse_x: f32, impulse_y: f32) {
        if body.is_static {
            return;
        }
        body.velocity_x += impulse_x;
        body.velocity_y += impulse_y;
        self.clamp_velocity(body);
    }

    pub fn set_velocity(&self, body: &mut Body, velocity_x: f32, velocity_y: f32) {
        body.velocity_x = velocity_x;
        body.velocity_y = velocity_y;
        self.clamp_velocity(body);
    }

    /// Horizontal damping for bodies resting on a surface
    pub fn apply_friction(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        body.velocity_x *= self.config.friction.powf(time_scale(dt));
    }

    /// Damping on both axes while airborne
    pub fn apply_air_resistance(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        let factor = self.config.air_resistance.powf(time_scale(dt));
        body.velocity_x *= factor;
        body.velocity_y *= factor;
    }

    /// One full integration step for a free-flying body
    pub fn step(&self, body: &mut Body, dt: f64) {
        if body.is_static {
            return;
        }
        self.apply_gravity(body, dt);
        self.apply_acceleration(body, dt);
        self.apply_air_resistance(body, dt);
        self.clamp_velocity(body);
        self.apply_velocity(body, dt);
    }

    /// [`step`](Self::step), then keep the body inside `bounds`, applying
    /// friction when it ends up on the floor
    pub fn step_within(&self, body: &mut Body, dt: f64, bounds: &Rect) -> EdgeHits {
        self.step(body, dt);
        let hits = clamp_to_bounds(body, bounds);
        if hits.grounded() {
            self.apply_friction(body, dt);
        }
        hits
    }

    /// Player vs obstacle with the configured forgiveness
    pub fn player_hits(&self, player: &Body, obstacle: &Rect) -> bool {
        check_forgiving_collision(player, obstacle, self.config.forgiveness)
    }

    /// Player vs gap obstacle with the configured forgiveness
    pub fn player_hits_gap(&self, player: &Body, gap: &GapObstacle) -> bool {
        check_gap_collision(player, gap, self.config.forgiveness)
    }
}
