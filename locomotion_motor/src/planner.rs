//! Horizontal target planning: input axes to a target velocity, then sprint
//! scaling and easing toward it.

use rapier3d::prelude::Real;

use crate::config::MovementConfig;
use crate::lerp::{LerpContext, VelocityLerper};
use crate::planar::{local_to_world, world_to_local, Planar};
use crate::sprint::{SprintOutput, SprintRequest, SprintStaminaManager};

/// Raw movement axis values. Back and left are negative when pressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveAxes {
    pub forward: Real,
    pub back: Real,
    pub left: Real,
    pub right: Real,
    pub sprint: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct PlannerOutput {
    /// World-frame horizontal velocity to apply.
    pub applied: Planar,
    /// Local-frame target after sprint scaling.
    pub target: Planar,
    pub sprint: SprintOutput,
}

#[derive(Clone, Debug, Default)]
pub struct VelocityXYPlanner {
    applied: Planar,
    prev_target: Planar,
    script_target: Option<Planar>,
    /// Last nonzero sprint press scaled by `sprint_scale`; outlives the release
    /// so the lerp keeps its boost while sprint time winds down.
    sprint_pressed_value: Real,
    sprint: SprintStaminaManager,
    lerper: VelocityLerper,
}

impl VelocityXYPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Planar {
        self.applied
    }

    pub fn prev_target(&self) -> Planar {
        self.prev_target
    }

    pub fn sprint(&self) -> &SprintStaminaManager {
        &self.sprint
    }

    pub fn sprint_mut(&mut self) -> &mut SprintStaminaManager {
        &mut self.sprint
    }

    pub fn lerper(&self) -> &VelocityLerper {
        &self.lerper
    }

    /// Replaces the input-derived target with a local-frame velocity until cleared.
    pub fn set_script_target(&mut self, target: Option<Planar>) {
        self.script_target = target;
    }

    pub fn script_target(&self) -> Option<Planar> {
        self.script_target
    }

    pub fn step(
        &mut self,
        axes: &MoveAxes,
        grounded: bool,
        heading: Real,
        config: &MovementConfig,
        dt: Real,
    ) -> PlannerOutput {
        let planned = planned_direction(axes, config);
        let pressed_value = if axes.sprint > 0.0 {
            axes.sprint * config.sprint_scale
        } else {
            0.0
        };
        if pressed_value > 0.0 {
            self.sprint_pressed_value = pressed_value;
        }
        let sprint = self.sprint.step(
            &SprintRequest {
                pressed_value,
                forward: axes.forward,
                back: axes.back,
                left: axes.left,
                right: axes.right,
                target: planned,
                applied: self.applied,
            },
            config,
            dt,
        );

        let target = match self.script_target {
            Some(target) => target,
            None => {
                planned
                    * config.top_speed
                    * (1.0 + (sprint.multiplier - 1.0) * sprint.velocity_adjust)
            }
        };

        if target != self.prev_target {
            self.prev_target = target;
            self.lerper.restart(world_to_local(self.applied, heading));
        }

        if self.applied != local_to_world(target, heading) {
            let ctx = LerpContext {
                grounded,
                heading,
                sprint_time: self.sprint.sprint_time(),
                sprint_pressed_value: self.sprint_pressed_value,
                sprint_accel_adjust: sprint.accel_adjust,
            };
            let local = self.lerper.step(target, self.applied, &ctx, config, dt);
            self.applied = local_to_world(local, heading);
        }

        PlannerOutput {
            applied: self.applied,
            target,
            sprint,
        }
    }
}

/// Unit-bounded local direction with the per-direction scales applied.
pub fn planned_direction(axes: &MoveAxes, config: &MovementConfig) -> Planar {
    let forward_back = axes.forward * config.forward_scale + axes.back * config.back_scale;
    let left_right = axes.left * config.left_scale + axes.right * config.right_scale;

    let forward_back = if forward_back >= 0.0 {
        unscale(forward_back, config.forward_scale)
    } else {
        unscale(forward_back, config.back_scale)
    };
    let left_right = if left_right >= 0.0 {
        unscale(left_right, config.right_scale)
    } else {
        unscale(left_right, config.left_scale)
    };

    let mut direction = Planar::new(left_right, forward_back);
    let magnitude = direction.norm();
    if magnitude > 1.0 {
        direction /= magnitude;
    }
    direction.y *= if direction.y >= 0.0 {
        config.forward_scale
    } else {
        config.back_scale
    };
    direction.x *= if direction.x >= 0.0 {
        config.right_scale
    } else {
        config.left_scale
    };
    direction
}

fn unscale(value: Real, scale: Real) -> Real {
    if scale == 0.0 {
        0.0
    } else {
        value / scale
    }
}
