//! Sprint stamina accounting.
//!
//! `held_duration` is the stamina spent since the last cooldown. Releasing sprint
//! waits out a decrement pause before stamina recovers, so tapping sprint cannot
//! dodge the cooldown.

use rapier3d::prelude::Real;

use crate::config::MovementConfig;
use crate::planar::{angle_between, Planar, HALF_PI};

/// Raw axis values and the planned target the sprint decision is based on.
#[derive(Clone, Copy, Debug, Default)]
pub struct SprintRequest {
    /// Sprint axis value times `sprint_scale`; zero while released.
    pub pressed_value: Real,
    pub forward: Real,
    pub back: Real,
    pub left: Real,
    pub right: Real,
    /// Pre-sprint target velocity in the local frame.
    pub target: Planar,
    /// Currently applied horizontal velocity.
    pub applied: Planar,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SprintOutput {
    pub multiplier: Real,
    pub velocity_adjust: Real,
    pub accel_adjust: Real,
    pub cooldown_started: bool,
}

#[derive(Clone, Debug)]
pub struct SprintStaminaManager {
    multiplier: Real,
    sprint_time: Real,
    held_duration: Real,
    cooldown: Real,
    decrement_pause: Real,
    prev_decrement_pause: Real,
    decrementing: bool,
    velocity_adjust: Real,
    accel_adjust: Real,
}

impl Default for SprintStaminaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SprintStaminaManager {
    pub fn new() -> Self {
        Self {
            multiplier: 1.0,
            sprint_time: 0.0,
            held_duration: 0.0,
            cooldown: 0.0,
            decrement_pause: 0.0,
            prev_decrement_pause: 0.0,
            decrementing: false,
            velocity_adjust: 0.0,
            accel_adjust: 0.0,
        }
    }

    pub fn multiplier(&self) -> Real {
        self.multiplier
    }

    /// Time spent ramping into the current sprint press.
    pub fn sprint_time(&self) -> Real {
        self.sprint_time
    }

    pub fn held_duration(&self) -> Real {
        self.held_duration
    }

    pub fn set_held_duration(&mut self, held: Real, config: &MovementConfig) {
        self.held_duration = held.clamp(0.0, config.sprint_max_time.max(0.0));
    }

    pub fn cooldown(&self) -> Real {
        self.cooldown
    }

    pub fn decrement_pause(&self) -> Real {
        self.decrement_pause
    }

    pub fn is_decrementing(&self) -> bool {
        self.decrementing
    }

    pub fn velocity_adjust(&self) -> Real {
        self.velocity_adjust
    }

    pub fn accel_adjust(&self) -> Real {
        self.accel_adjust
    }

    pub fn stamina_percentage(&self, config: &MovementConfig) -> Real {
        if self.cooldown > 0.0 || config.sprint_max_time <= 0.0 {
            return 0.0;
        }
        100.0 * (config.sprint_max_time - self.held_duration) / config.sprint_max_time
    }

    pub fn step(
        &mut self,
        request: &SprintRequest,
        config: &MovementConfig,
        dt: Real,
    ) -> SprintOutput {
        let dt = dt.max(0.0);
        let no_motion = request.target == Planar::zeros() || request.applied == Planar::zeros();
        self.multiplier = request.pressed_value.max(1.0);
        if self.multiplier > 1.0 && (no_motion || sprint_cancelled(request, config)) {
            self.multiplier = 1.0;
        }
        if no_motion {
            self.multiplier = 1.0;
            self.sprint_time = 0.0;
        }

        let max_time = config.sprint_max_time;
        let mut cooldown_started = false;
        if self.multiplier > 1.0 && self.held_duration < max_time && self.cooldown == 0.0 {
            let total_sprint_time =
                (self.multiplier - 1.0) * config.top_speed / config.acceleration.max(1.0e-6);
            let adjust = if config.sprint_adjust_based_on_angle {
                1.0 - angle_between(request.target, Planar::y()) / HALF_PI
            } else {
                1.0
            };
            self.velocity_adjust = adjust;
            self.accel_adjust = adjust;
            self.sprint_time = (self.sprint_time + dt).min(total_sprint_time);
            self.held_duration = (self.held_duration + dt * adjust).clamp(0.0, max_time);
            self.decrementing = false;
        } else {
            self.multiplier = 1.0;
            self.velocity_adjust = 0.0;
            self.sprint_time = (self.sprint_time - dt).max(0.0);
            if self.held_duration >= max_time && self.cooldown == 0.0 {
                self.held_duration = 0.0;
                self.cooldown = config.sprint_cooldown_time;
                self.decrementing = false;
                cooldown_started = true;
                tracing::debug!(cooldown = self.cooldown, "sprint cooldown started");
            } else if self.cooldown > 0.0 {
                self.cooldown = (self.cooldown - dt).max(0.0);
            } else {
                self.recover(config, dt);
            }
        }

        SprintOutput {
            multiplier: self.multiplier,
            velocity_adjust: self.velocity_adjust,
            accel_adjust: self.accel_adjust,
            cooldown_started,
        }
    }

    /// Restores stamina after the decrement pause has run out.
    fn recover(&mut self, config: &MovementConfig, dt: Real) {
        let max_time = config.sprint_max_time;
        let cooldown_time = config.sprint_cooldown_time;
        let long_cooldown = cooldown_time > max_time;
        self.decrement_pause -= dt;
        if self.held_duration > 0.0 && !self.decrementing {
            self.decrement_pause = if long_cooldown {
                (cooldown_time - max_time) * (self.held_duration / max_time)
            } else {
                0.1 * cooldown_time * self.held_duration / max_time
            };
            self.prev_decrement_pause = self.decrement_pause;
            self.decrementing = true;
        }
        if self.decrement_pause > 0.0 {
            return;
        }
        self.decrement_pause = 0.0;
        // With a short cooldown, recovery runs at the rate that makes the pause
        // plus the decay last exactly as long as letting a full cooldown elapse.
        let rate = if long_cooldown {
            1.0
        } else {
            (max_time + self.prev_decrement_pause) / cooldown_time
        };
        self.held_duration -= dt * rate;
        if self.held_duration <= 0.0 {
            self.held_duration = 0.0;
            self.decrementing = false;
        }
    }
}

/// Sprinting only makes sense with forward drive. Opposite strafes of equal
/// magnitude cancel; unequal strafes are left alone.
fn sprint_cancelled(request: &SprintRequest, config: &MovementConfig) -> bool {
    let no_drive = request.forward == 0.0
        && request.left == 0.0
        && request.right == 0.0
        && (!config.sprint_backwards || request.back == 0.0);
    let strafes_cancel =
        request.forward == 0.0 && request.left != 0.0 && -request.left == request.right;
    let backward = !config.sprint_backwards && request.target.y < 0.0;
    no_drive || strafes_cancel || backward
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Real = 0.125;

    fn forward_request(pressed_value: Real) -> SprintRequest {
        SprintRequest {
            pressed_value,
            forward: 1.0,
            target: Planar::new(0.0, 1.0),
            applied: Planar::new(0.0, 5.0),
            ..Default::default()
        }
    }

    fn released() -> SprintRequest {
        forward_request(0.0)
    }

    #[test]
    fn forward_sprint_accrues_full_credit() {
        let config = MovementConfig::default();
        let mut sprint = SprintStaminaManager::new();
        let output = sprint.step(&forward_request(1.5), &config, DT);
        assert_eq!(output.multiplier, 1.5);
        assert!((output.velocity_adjust - 1.0).abs() < 1.0e-6);
        assert!((sprint.held_duration() - DT).abs() < 1.0e-6);
        assert!((sprint.sprint_time() - DT).abs() < 1.0e-6);
    }

    #[test]
    fn diagonal_sprint_accrues_half_credit() {
        let config = MovementConfig::default();
        let mut sprint = SprintStaminaManager::new();
        let request = SprintRequest {
            right: 1.0,
            target: Planar::new(1.0, 1.0).normalize(),
            ..forward_request(1.5)
        };
        let output = sprint.step(&request, &config, DT);
        assert!((output.velocity_adjust - 0.5).abs() < 1.0e-5);
        assert!((sprint.held_duration() - DT * 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn backward_or_cancelled_strafe_disables_sprint() {
        let config = MovementConfig::default();
        let mut sprint = SprintStaminaManager::new();
        let backward = SprintRequest {
            forward: 0.0,
            back: -1.0,
            target: Planar::new(0.0, -0.75),
            ..forward_request(1.5)
        };
        assert_eq!(sprint.step(&backward, &config, DT).multiplier, 1.0);

        let strafes = SprintRequest {
            forward: 0.0,
            left: -1.0,
            right: 1.0,
            target: Planar::zeros(),
            ..forward_request(1.5)
        };
        assert_eq!(sprint.step(&strafes, &config, DT).multiplier, 1.0);

        let uneven = SprintRequest {
            forward: 0.0,
            left: -0.5,
            right: 1.0,
            target: Planar::new(0.5, 0.0),
            ..forward_request(1.5)
        };
        assert_eq!(sprint.step(&uneven, &config, DT).multiplier, 1.5);
    }

    #[test]
    fn sprint_backwards_option_allows_backpedal_sprint() {
        let config = MovementConfig {
            sprint_backwards: true,
            sprint_adjust_based_on_angle: false,
            ..Default::default()
        };
        let mut sprint = SprintStaminaManager::new();
        let backward = SprintRequest {
            forward: 0.0,
            back: -1.0,
            target: Planar::new(0.0, -0.75),
            ..forward_request(1.5)
        };
        let output = sprint.step(&backward, &config, DT);
        assert_eq!(output.multiplier, 1.5);
        assert_eq!(output.velocity_adjust, 1.0);
    }

    #[test]
    fn no_motion_resets_press_timer() {
        let config = MovementConfig::default();
        let mut sprint = SprintStaminaManager::new();
        sprint.step(&forward_request(1.5), &config, DT);
        sprint.step(&forward_request(1.5), &config, DT);
        let idle = SprintRequest {
            forward: 0.0,
            target: Planar::zeros(),
            ..forward_request(1.5)
        };
        let output = sprint.step(&idle, &config, DT);
        assert_eq!(output.multiplier, 1.0);
        assert_eq!(sprint.sprint_time(), 0.0);
    }

    #[test]
    fn exhausting_stamina_starts_cooldown_once() {
        let config = MovementConfig {
            sprint_max_time: 1.0,
            sprint_cooldown_time: 2.0,
            ..Default::default()
        };
        let mut sprint = SprintStaminaManager::new();
        let mut started = 0;
        let mut ticks_after = 0;
        // Stamina runs out after 8 ticks; the cooldown lasts 16 more.
        for _ in 0..24 {
            let output = sprint.step(&forward_request(1.5), &config, DT);
            if output.cooldown_started {
                started += 1;
            }
            if started > 0 {
                ticks_after += 1;
                assert_eq!(output.multiplier, 1.0);
                assert_eq!(output.velocity_adjust, 0.0);
            }
            assert!(sprint.held_duration() >= 0.0 && sprint.held_duration() <= 1.0);
            assert!(sprint.cooldown() >= 0.0 && sprint.cooldown() <= 2.0);
        }
        assert_eq!(started, 1);
        assert!(ticks_after > 0);
    }

    #[test]
    fn cooldown_elapses_and_sprint_resumes() {
        let config = MovementConfig {
            sprint_max_time: 0.5,
            sprint_cooldown_time: 1.0,
            ..Default::default()
        };
        let mut sprint = SprintStaminaManager::new();
        for _ in 0..6 {
            sprint.step(&forward_request(1.5), &config, DT);
        }
        assert!(sprint.cooldown() > 0.0);
        assert_eq!(sprint.stamina_percentage(&config), 0.0);
        for _ in 0..10 {
            sprint.step(&released(), &config, DT);
        }
        assert_eq!(sprint.cooldown(), 0.0);
        let output = sprint.step(&forward_request(1.5), &config, DT);
        assert_eq!(output.multiplier, 1.5);
    }

    #[test]
    fn long_cooldown_pauses_before_recovering() {
        let config = MovementConfig {
            sprint_max_time: 2.0,
            sprint_cooldown_time: 4.0,
            ..Default::default()
        };
        let mut sprint = SprintStaminaManager::new();
        for _ in 0..8 {
            sprint.step(&forward_request(1.5), &config, DT);
        }
        let held = sprint.held_duration();
        assert_eq!(held, 1.0);

        // Pause = (4 − 2) · (1 / 2) = 1 s.
        sprint.step(&released(), &config, DT);
        assert!(sprint.is_decrementing());
        assert_eq!(sprint.decrement_pause(), 1.0);
        for _ in 0..7 {
            sprint.step(&released(), &config, DT);
            assert!((sprint.held_duration() - held).abs() < 1.0e-6);
        }
        for _ in 0..10 {
            sprint.step(&released(), &config, DT);
        }
        assert_eq!(sprint.held_duration(), 0.0);
        assert!(!sprint.is_decrementing());
    }

    #[test]
    fn short_cooldown_recovers_at_scaled_rate() {
        let config = MovementConfig {
            sprint_max_time: 4.0,
            sprint_cooldown_time: 2.0,
            ..Default::default()
        };
        let mut sprint = SprintStaminaManager::new();
        for _ in 0..16 {
            sprint.step(&forward_request(1.5), &config, DT);
        }
        assert_eq!(sprint.held_duration(), 2.0);

        // Pause = 0.1 · 2 · 2 / 4 = 0.1 s, recovery rate = (4 + 0.1) / 2.
        sprint.step(&released(), &config, DT);
        assert!((sprint.decrement_pause() - 0.1).abs() < 1.0e-5);
        sprint.step(&released(), &config, DT);
        let expected = 2.0 - DT * (4.1 / 2.0);
        assert!((sprint.held_duration() - expected).abs() < 1.0e-4);
    }

    #[test]
    fn set_held_duration_is_clamped() {
        let config = MovementConfig::default();
        let mut sprint = SprintStaminaManager::new();
        sprint.set_held_duration(10.0, &config);
        assert_eq!(sprint.held_duration(), config.sprint_max_time);
        sprint.set_held_duration(-1.0, &config);
        assert_eq!(sprint.held_duration(), 0.0);
    }
}
