//! First-person camera attached to the character and the lookup of the active one.
#![forbid(unsafe_code)]

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

#[derive(Clone, Copy, Debug)]
pub struct CameraPose {
    pub eye: Vector<Real>,
    pub yaw: Real,
    pub pitch: Real,
}

/// Camera child of the character. The character owns yaw; the camera owns pitch
/// (rotation about its local X axis, positive looking up).
#[derive(Clone, Copy, Debug)]
pub struct PlayerCamera {
    eye_height: Real,
    pitch: Real,
    eye: Vector<Real>,
    yaw: Real,
}

impl PlayerCamera {
    pub fn new(eye_height: Real) -> Self {
        Self {
            eye_height,
            pitch: 0.0,
            eye: Vector::zeros(),
            yaw: 0.0,
        }
    }

    pub fn eye_height(&self) -> Real {
        self.eye_height
    }

    pub fn pitch(&self) -> Real {
        self.pitch
    }

    pub fn rotate_pitch(&mut self, delta: Real) {
        self.pitch += delta;
    }

    pub fn set_pitch(&mut self, pitch: Real) {
        self.pitch = pitch;
    }

    /// Follows the character: `feet` is its position, `heading` its yaw.
    pub fn update_from_origin(&mut self, feet: Vector<Real>, heading: Real) -> CameraPose {
        self.eye = feet + Vector::new(0.0, 0.0, self.eye_height);
        self.yaw = heading;
        self.pose()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            eye: self.eye,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }
}

/// Finds the camera currently driving the view. `None` when no camera is active;
/// callers skip camera work for that tick.
pub trait CameraResolver {
    fn active_camera(&mut self) -> Option<&mut PlayerCamera>;
}

impl CameraResolver for PlayerCamera {
    fn active_camera(&mut self) -> Option<&mut PlayerCamera> {
        Some(self)
    }
}

impl CameraResolver for Option<PlayerCamera> {
    fn active_camera(&mut self) -> Option<&mut PlayerCamera> {
        self.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_follows_feet_and_heading() {
        let mut camera = PlayerCamera::new(1.6);
        camera.rotate_pitch(0.25);
        let pose = camera.update_from_origin(Vector::new(1.0, 2.0, 0.5), 0.7);
        assert!((pose.eye.z - 2.1).abs() < 1.0e-6);
        assert_eq!(pose.eye.x, 1.0);
        assert_eq!(pose.yaw, 0.7);
        assert_eq!(pose.pitch, 0.25);
    }

    #[test]
    fn optional_camera_resolves_only_when_present() {
        let mut none: Option<PlayerCamera> = None;
        assert!(none.active_camera().is_none());
        let mut some = Some(PlayerCamera::new(1.6));
        if let Some(camera) = some.active_camera() {
            camera.set_pitch(0.5);
        }
        assert_eq!(some.map(|camera| camera.pitch()), Some(0.5));
    }
}
