//! Planar (XY) helpers shared by the horizontal stages.
//!
//! Local frame: +X right, +Y forward. World = Rz(heading) · local.

use rapier3d::na::{Rotation2, Vector2};
use rapier3d::prelude::Real;

pub type Planar = Vector2<Real>;

pub const HALF_PI: Real = std::f32::consts::FRAC_PI_2;

pub fn local_to_world(local: Planar, heading: Real) -> Planar {
    Rotation2::new(heading) * local
}

pub fn world_to_local(world: Planar, heading: Real) -> Planar {
    Rotation2::new(-heading) * world
}

/// Unsigned angle between two vectors; zero when either has no direction.
pub fn angle_between(a: Planar, b: Planar) -> Real {
    let denom = a.norm() * b.norm();
    if denom <= 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (a.dot(&b) / denom).clamp(-1.0, 1.0).acos()
}

pub fn lerp(a: Planar, b: Planar, t: Real) -> Planar {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_rotation_round_trips() {
        let local = Planar::new(0.0, 1.0);
        let world = local_to_world(local, HALF_PI);
        assert!((world.x + 1.0).abs() < 1.0e-6);
        assert!(world.y.abs() < 1.0e-6);
        let back = world_to_local(world, HALF_PI);
        assert!((back - local).norm() < 1.0e-6);
    }

    #[test]
    fn zero_vector_has_no_angle() {
        assert_eq!(angle_between(Planar::zeros(), Planar::new(0.0, 1.0)), 0.0);
        let angle = angle_between(Planar::new(1.0, 0.0), Planar::new(0.0, 2.0));
        assert!((angle - HALF_PI).abs() < 1.0e-6);
    }
}
