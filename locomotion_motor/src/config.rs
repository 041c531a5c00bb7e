//! Movement tuning loaded once before activation.

use std::fs;
use std::path::Path;

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read movement config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse movement config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize movement config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid movement config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Scalars read by every locomotion stage. Gravity is signed (negative is down);
/// a gravity of exactly zero hands vertical acceleration to the physics body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Top walking speed in m/s.
    pub top_speed: Real,
    /// Walking acceleration in m/s².
    pub acceleration: Real,
    /// Multiplier on the lerp rate while slowing down.
    pub deceleration: Real,
    /// Extra deceleration multiplier when the target opposes the current velocity.
    pub braking_factor: Real,
    pub forward_scale: Real,
    pub back_scale: Real,
    pub left_scale: Real,
    pub right_scale: Real,
    pub sprint_scale: Real,
    /// Seconds of straight-ahead sprinting before the cooldown kicks in.
    pub sprint_max_time: Real,
    pub sprint_cooldown_time: Real,
    pub sprint_backwards: bool,
    pub sprint_adjust_based_on_angle: bool,
    pub rotation_damp: Real,
    pub yaw_sensitivity: Real,
    pub pitch_sensitivity: Real,
    pub gravity: Real,
    pub jump_initial_velocity: Real,
    pub jump_held_gravity_factor: Real,
    pub jump_falling_gravity_factor: Real,
    /// Scales the XY lerp rate while airborne.
    pub jump_accel_factor: Real,
    pub capsule_height: Real,
    pub capsule_radius: Real,
    /// How far below the feet the ground is still detected.
    pub grounded_offset: Real,
    /// Ascending distance over which the held-jump gravity factor applies.
    pub jump_hold_offset: Real,
    pub update_xy_midair: bool,
    pub update_xy_only_near_ground: bool,
    pub update_xy_only_ascending: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            top_speed: 10.0,
            acceleration: 1.0,
            deceleration: 1.5,
            braking_factor: 2.0,
            forward_scale: 1.0,
            back_scale: 0.75,
            left_scale: 1.0,
            right_scale: 1.0,
            sprint_scale: 1.5,
            sprint_max_time: 3.0,
            sprint_cooldown_time: 5.0,
            sprint_backwards: false,
            sprint_adjust_based_on_angle: true,
            rotation_damp: 20.0,
            yaw_sensitivity: 0.005,
            pitch_sensitivity: 0.005,
            gravity: -9.81,
            jump_initial_velocity: 2.5,
            jump_held_gravity_factor: 0.1,
            jump_falling_gravity_factor: 1.1,
            jump_accel_factor: 0.5,
            capsule_height: 1.753,
            capsule_radius: 0.25,
            grounded_offset: 0.001,
            jump_hold_offset: 0.5,
            update_xy_midair: true,
            update_xy_only_near_ground: true,
            update_xy_only_ascending: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl MovementConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse_toml(&text)?;
        let validation = config.validate();
        if !validation.is_ok() {
            return Err(ConfigError::Invalid(validation.errors));
        }
        for warning in &validation.warnings {
            tracing::warn!(path = %path.display(), "{warning}");
        }
        Ok(config)
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();
        let scalars = [
            ("top_speed", self.top_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("braking_factor", self.braking_factor),
            ("forward_scale", self.forward_scale),
            ("back_scale", self.back_scale),
            ("left_scale", self.left_scale),
            ("right_scale", self.right_scale),
            ("sprint_scale", self.sprint_scale),
            ("sprint_max_time", self.sprint_max_time),
            ("sprint_cooldown_time", self.sprint_cooldown_time),
            ("rotation_damp", self.rotation_damp),
            ("yaw_sensitivity", self.yaw_sensitivity),
            ("pitch_sensitivity", self.pitch_sensitivity),
            ("gravity", self.gravity),
            ("jump_initial_velocity", self.jump_initial_velocity),
            ("jump_held_gravity_factor", self.jump_held_gravity_factor),
            ("jump_falling_gravity_factor", self.jump_falling_gravity_factor),
            ("jump_accel_factor", self.jump_accel_factor),
            ("capsule_height", self.capsule_height),
            ("capsule_radius", self.capsule_radius),
            ("grounded_offset", self.grounded_offset),
            ("jump_hold_offset", self.jump_hold_offset),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                validation.errors.push(format!("{name} must be finite"));
            }
        }
        if self.acceleration <= 0.0 {
            validation.errors.push("acceleration must be > 0".to_string());
        }
        if self.top_speed < 0.0 {
            validation.errors.push("top_speed must be >= 0".to_string());
        }
        if self.sprint_max_time <= 0.0 {
            validation
                .errors
                .push("sprint_max_time must be > 0".to_string());
        }
        if self.sprint_cooldown_time <= 0.0 {
            validation
                .errors
                .push("sprint_cooldown_time must be > 0".to_string());
        }
        if self.sprint_scale < 1.0 {
            validation
                .errors
                .push("sprint_scale must be >= 1".to_string());
        }
        if self.capsule_radius <= 0.0 || self.capsule_height <= 0.0 {
            validation
                .errors
                .push("capsule_height and capsule_radius must be > 0".to_string());
        } else if self.capsule_height < self.capsule_radius * 2.0 {
            validation
                .warnings
                .push("capsule_height is shorter than its two end caps".to_string());
        }
        if self.back_scale == 0.0 || self.left_scale == 0.0 {
            validation
                .warnings
                .push("back_scale or left_scale is 0, that direction is disabled".to_string());
        }
        if self.gravity > 0.0 {
            validation
                .warnings
                .push("gravity is positive, characters will fall upward".to_string());
        }
        validation
    }

    /// Offset from the feet to the grounded probe's center.
    pub fn grounded_probe_offset(&self) -> Real {
        self.capsule_height * 0.5 - self.grounded_offset
    }

    /// Offset from the feet to the near-ground probe's center.
    pub fn jump_hold_probe_offset(&self) -> Real {
        self.capsule_height * 0.5 - self.jump_hold_offset
    }

    /// Longest time the jump key extends the held-gravity phase, derived from
    /// the average velocity across the hold window.
    pub fn jump_max_hold_time(&self) -> Real {
        let v0 = self.jump_initial_velocity;
        let held_gravity = self.gravity * self.jump_held_gravity_factor;
        let edge_velocity_squared = v0 * v0 + 2.0 * held_gravity * self.jump_hold_offset;
        if edge_velocity_squared >= 0.0 {
            let average = (v0 + edge_velocity_squared.sqrt()) * 0.5;
            if average <= 0.0 {
                return 0.0;
            }
            self.jump_hold_offset / average
        } else if held_gravity == 0.0 {
            0.0
        } else {
            (v0 / held_gravity).abs()
        }
    }
}
