//! Look smoothing and pitch limiting.

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::Real;

use crate::config::MovementConfig;
use crate::planar::HALF_PI;

/// Rotations to apply this tick: yaw to the character, pitch to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LookDelta {
    pub yaw: Real,
    pub pitch: Real,
}

#[derive(Clone, Debug)]
pub struct RotationSmoother {
    look: UnitQuaternion<Real>,
}

impl Default for RotationSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationSmoother {
    pub fn new() -> Self {
        Self {
            look: UnitQuaternion::identity(),
        }
    }

    pub fn look_rotation(&self) -> UnitQuaternion<Real> {
        self.look
    }

    pub fn reset(&mut self) {
        self.look = UnitQuaternion::identity();
    }

    /// Eases the look rotation toward the one requested by this tick's input.
    /// Positive yaw input (look right) is a clockwise turn about +Z, hence the negation.
    pub fn update(
        &mut self,
        yaw_input: Real,
        pitch_input: Real,
        config: &MovementConfig,
        dt: Real,
    ) -> LookDelta {
        let target = UnitQuaternion::from_euler_angles(
            -pitch_input * config.pitch_sensitivity,
            0.0,
            -yaw_input * config.yaw_sensitivity,
        );
        let t = config.rotation_damp * dt.max(0.0);
        self.look = if t <= 1.0 {
            self.look.try_slerp(&target, t, 1.0e-6).unwrap_or(target)
        } else {
            target
        };
        let (pitch, _, yaw) = self.look.euler_angles();
        LookDelta { yaw, pitch }
    }
}

/// Rotation to apply to a camera at `current` pitch so it never passes straight up or down.
pub fn limit_pitch_delta(current: Real, planned: Real) -> Real {
    let mut pitch = current;
    if current.abs() <= HALF_PI
        || (current >= HALF_PI && planned < 0.0)
        || (current <= -HALF_PI && planned > 0.0)
    {
        pitch += planned;
    }
    pitch.clamp(-HALF_PI, HALF_PI) - current
}
