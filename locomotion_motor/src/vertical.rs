//! Vertical velocity: jump, held-jump float and falling gravity.
//!
//! Each tick produces a velocity delta; the applied change is the average of this
//! tick's and last tick's delta (trapezoidal integration).

use rapier3d::prelude::Real;

use crate::config::MovementConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalPhase {
    #[default]
    Grounded,
    AscendingHeld,
    Falling,
}

#[derive(Clone, Copy, Debug)]
pub struct VerticalInput {
    pub grounded: bool,
    pub jump: Real,
    /// Vertical velocity reported by the physics body.
    pub reported_velocity: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalOutput {
    pub velocity: Real,
    pub phase: VerticalPhase,
    pub jumped: bool,
}

#[derive(Clone, Debug)]
pub struct VerticalVelocityIntegrator {
    velocity: Real,
    current_delta: Real,
    prev_delta: Real,
    jump_held: bool,
    jump_requires_repress: bool,
    jump_counter: Real,
    jump_max_hold_time: Real,
    phase: VerticalPhase,
}

impl VerticalVelocityIntegrator {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            velocity: 0.0,
            current_delta: 0.0,
            prev_delta: 0.0,
            jump_held: false,
            jump_requires_repress: true,
            jump_counter: 0.0,
            jump_max_hold_time: config.jump_max_hold_time(),
            phase: VerticalPhase::Grounded,
        }
    }

    /// Recomputes the derived hold window after a config change.
    pub fn reconfigure(&mut self, config: &MovementConfig) {
        self.jump_max_hold_time = config.jump_max_hold_time();
    }

    pub fn velocity(&self) -> Real {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Real) {
        self.velocity = velocity;
    }

    pub fn jump_max_hold_time(&self) -> Real {
        self.jump_max_hold_time
    }

    pub fn jump_counter(&self) -> Real {
        self.jump_counter
    }

    pub fn jump_held(&self) -> bool {
        self.jump_held
    }

    pub fn phase(&self) -> VerticalPhase {
        self.phase
    }

    pub fn step(
        &mut self,
        input: VerticalInput,
        config: &MovementConfig,
        dt: Real,
    ) -> VerticalOutput {
        let dt = dt.max(0.0);
        let reported = input.reported_velocity;
        let jump_pressed = input.jump != 0.0;
        let mut jumped = false;
        self.prev_delta = self.current_delta;

        // A fresh jump leaves the ground with positive velocity while the probe may
        // still report grounded; only repress-pending or non-rising states count as landed.
        if input.grounded && (self.jump_requires_repress || reported <= 0.0) {
            self.phase = VerticalPhase::Grounded;
            if jump_pressed && !self.jump_held {
                // Velocity injection, not an acceleration.
                self.current_delta = config.jump_initial_velocity;
                self.jump_held = true;
                self.jump_requires_repress = false;
                jumped = true;
                tracing::debug!(velocity = config.jump_initial_velocity, "jump started");
            } else {
                self.velocity = 0.0;
                self.current_delta = 0.0;
                self.jump_counter = 0.0;
                if !jump_pressed && self.jump_held {
                    self.jump_held = false;
                }
            }
        } else if self.jump_counter < self.jump_max_hold_time
            && reported > 0.0
            && self.jump_held
            && !self.jump_requires_repress
        {
            if jump_pressed {
                self.phase = VerticalPhase::AscendingHeld;
                self.jump_counter += dt;
                self.current_delta = config.gravity * config.jump_held_gravity_factor * dt;
            } else {
                self.phase = VerticalPhase::Falling;
                self.jump_held = false;
                self.jump_counter = 0.0;
                self.current_delta = config.gravity * dt;
            }
        } else {
            self.phase = VerticalPhase::Falling;
            self.jump_requires_repress = true;
            self.jump_counter = 0.0;
            self.current_delta = if reported <= 0.0 {
                config.gravity * config.jump_falling_gravity_factor * dt
            } else {
                config.gravity * dt
            };
        }

        self.velocity += (self.current_delta + self.prev_delta) * 0.5;

        if config.gravity == 0.0 && input.grounded && reported <= 0.0 {
            self.velocity = 0.0;
        }

        VerticalOutput {
            velocity: self.velocity,
            phase: self.phase,
            jumped,
        }
    }
}
