//! Horizontal velocity easing with separate acceleration and deceleration rates.

use rapier3d::prelude::Real;

use crate::config::MovementConfig;
use crate::planar::{angle_between, lerp, world_to_local, Planar, HALF_PI};

/// Per-tick inputs that scale how fast the lerp advances.
#[derive(Clone, Copy, Debug)]
pub struct LerpContext {
    pub grounded: bool,
    pub heading: Real,
    /// Held-time-this-press from the sprint manager; boosts acceleration while > 0.
    pub sprint_time: Real,
    pub sprint_pressed_value: Real,
    pub sprint_accel_adjust: Real,
}

#[derive(Clone, Debug, Default)]
pub struct VelocityLerper {
    last_applied: Planar,
    lerp_time: Real,
    total_lerp_time: Real,
}

impl VelocityLerper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_applied(&self) -> Planar {
        self.last_applied
    }

    pub fn lerp_time(&self) -> Real {
        self.lerp_time
    }

    pub fn total_lerp_time(&self) -> Real {
        self.total_lerp_time
    }

    /// Starts a new lerp from `origin` (local frame).
    pub fn restart(&mut self, origin: Planar) {
        self.last_applied = origin;
        self.lerp_time = 0.0;
    }

    /// Returns the local-frame velocity to apply this tick. `applied` is the
    /// world-frame velocity applied last tick.
    pub fn step(
        &mut self,
        target: Planar,
        applied: Planar,
        ctx: &LerpContext,
        config: &MovementConfig,
        dt: Real,
    ) -> Planar {
        let total = (target - self.last_applied).norm() / config.acceleration.max(1.0e-6);
        self.total_lerp_time = total;
        if total <= 0.0 {
            self.lerp_time = 0.0;
            return target;
        }

        let mut lerp_dt = dt.max(0.0);
        if ctx.sprint_time > 0.0 {
            lerp_dt *= 1.0 + (ctx.sprint_pressed_value - 1.0) * ctx.sprint_accel_adjust;
        }
        if !ctx.grounded {
            lerp_dt *= config.jump_accel_factor;
        }

        let last_lerp_time = self.lerp_time;
        self.lerp_time = (last_lerp_time + lerp_dt).clamp(0.0, total);
        let mut velocity = lerp(self.last_applied, target, self.lerp_time / total);

        if velocity.norm() < applied.norm() {
            let applied_local = world_to_local(applied, ctx.heading);
            let mut deceleration = config.deceleration;
            if target.norm() != 0.0 && angle_between(applied_local, target) > HALF_PI {
                deceleration *= config.braking_factor;
            }
            self.lerp_time = (last_lerp_time + lerp_dt * deceleration).clamp(0.0, total);
            velocity = lerp(self.last_applied, target, self.lerp_time / total);
        }
        velocity
    }
}
