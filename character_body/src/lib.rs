//! Kinematic character body backed by Rapier's KCC.
//!
//! The controller hands the body one additive velocity per tick; the body sweeps
//! its capsule through the world and reports the velocity it actually achieved.
//!
//! Policy: collision/stepping must use Rapier KCC; do not reimplement step/slide logic.
#![forbid(unsafe_code)]

use locomotion_motor::MovementConfig;
use physics_rapier::{EntityId, PhysicsWorld};
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::math::{Isometry, UnitVector, Vector};
use rapier3d::prelude::{Capsule, Collider, ColliderHandle, QueryFilter, Real};

/// The physics-side collaborator of the locomotion controller.
pub trait CharacterBody {
    /// Feet position in world space.
    fn position(&self) -> Vector<Real>;
    /// Rotation about world +Z, in `[-pi, pi)`.
    fn heading(&self) -> Real;
    fn rotate_yaw(&mut self, delta: Real);
    /// Velocity observed over the last move.
    fn velocity(&self) -> Vector<Real>;
    /// Velocity to apply on the next move. Calls within one tick accumulate.
    fn add_velocity_for_tick(&mut self, velocity: Vector<Real>);
}

#[derive(Clone, Copy, Debug)]
pub struct BodyProfile {
    /// Full capsule height, tip to tip.
    pub capsule_height: Real,
    pub capsule_radius: Real,
    /// Maximum step height for auto-stepping in meters.
    pub step_height: Real,
    /// Minimum width of free space required after stepping.
    pub step_min_width: Real,
    /// Maximum climbable slope angle in radians.
    pub max_slope_angle: Real,
    /// Minimum slope angle where sliding begins (>= max_slope_angle).
    pub min_slope_slide_angle: Real,
    /// Distance to snap to ground in meters.
    pub ground_snap_distance: Real,
    /// Gap the KCC keeps between the capsule and the environment.
    pub offset: Real,
}

impl BodyProfile {
    pub fn from_movement(config: &MovementConfig) -> Self {
        Self {
            capsule_height: config.capsule_height,
            capsule_radius: config.capsule_radius,
            step_height: 0.3,
            step_min_width: 0.15,
            max_slope_angle: 45.0_f32.to_radians(),
            min_slope_slide_angle: 50.0_f32.to_radians(),
            ground_snap_distance: 0.1,
            offset: 0.02,
        }
    }

    fn capsule(&self) -> Capsule {
        let radius = self.capsule_radius.max(0.0);
        Capsule::new_z((self.capsule_height * 0.5 - radius).max(0.0), radius)
    }

    fn apply_to(&self, controller: &mut KinematicCharacterController) {
        controller.autostep = if self.step_height > 0.0 {
            Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.step_height),
                min_width: CharacterLength::Absolute(self.step_min_width),
                include_dynamic_bodies: false,
            })
        } else {
            None
        };
        controller.max_slope_climb_angle = self.max_slope_angle;
        controller.min_slope_slide_angle = self.min_slope_slide_angle.max(self.max_slope_angle);
        controller.snap_to_ground = if self.ground_snap_distance > 0.0 {
            Some(CharacterLength::Absolute(self.ground_snap_distance))
        } else {
            None
        };
        controller.offset = CharacterLength::Absolute(self.offset);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BodyMoveResult {
    pub translation: Vector<Real>,
    pub grounded: bool,
    pub hit_wall: bool,
    pub hit_ceiling: bool,
}

pub struct KinematicCharacter {
    entity: EntityId,
    exclude: Vec<EntityId>,
    profile: BodyProfile,
    controller: KinematicCharacterController,
    capsule: Capsule,
    position: Vector<Real>,
    heading: Real,
    pending_velocity: Vector<Real>,
    velocity: Vector<Real>,
    grounded: bool,
}

impl KinematicCharacter {
    pub fn new(entity: EntityId, profile: BodyProfile, position: Vector<Real>) -> Self {
        let mut controller = KinematicCharacterController::default();
        profile.apply_to(&mut controller);
        Self {
            entity,
            exclude: vec![entity],
            profile,
            controller,
            capsule: profile.capsule(),
            position,
            heading: 0.0,
            pending_velocity: Vector::zeros(),
            velocity: Vector::zeros(),
            grounded: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Colliders of these entities are ignored by the sweep.
    pub fn set_descendants(&mut self, descendants: &[EntityId]) {
        self.exclude.truncate(1);
        self.exclude.extend_from_slice(descendants);
    }

    /// Whether the last move ended supported by ground, as seen by the KCC.
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    fn shape_center(&self) -> Vector<Real> {
        self.position + Vector::z() * (self.profile.capsule_height * 0.5 + self.profile.offset)
    }

    /// Consumes the velocity accumulated for this tick and moves the capsule.
    pub fn step(&mut self, world: &PhysicsWorld, dt: Real) -> BodyMoveResult {
        let requested = std::mem::replace(&mut self.pending_velocity, Vector::zeros());
        if dt <= 0.0 {
            self.velocity = Vector::zeros();
            return BodyMoveResult::default();
        }

        let desired_translation = requested * dt;
        let up_vec = world.up();
        let up = UnitVector::new_normalize(up_vec);
        self.controller.up = up;
        let moving_up = desired_translation.dot(&up_vec) > 0.0;
        let original_snap = self.controller.snap_to_ground;
        if moving_up {
            self.controller.snap_to_ground = None;
        }

        let wall_dot = self.controller.max_slope_climb_angle.cos();
        let mut hit_wall = false;
        let mut hit_ceiling = false;
        let exclude = &self.exclude;
        let not_self = |_: ColliderHandle, collider: &Collider| {
            EntityId::of_collider(collider).map_or(true, |entity| !exclude.contains(&entity))
        };
        let center = self.shape_center();
        let output = self.controller.move_shape(
            dt,
            world.bodies(),
            world.colliders(),
            world.query_pipeline(),
            &self.capsule,
            &Isometry::translation(center.x, center.y, center.z),
            desired_translation,
            QueryFilter::default().predicate(&not_self),
            |collision| {
                let up_dot = collision.hit.normal1.dot(&up);
                if moving_up && up_dot < -0.1 {
                    hit_ceiling = true;
                } else if up_dot <= wall_dot {
                    hit_wall = true;
                }
            },
        );
        self.controller.snap_to_ground = original_snap;

        self.position += output.translation;
        self.velocity = output.translation / dt;
        self.grounded = output.grounded && !moving_up;
        BodyMoveResult {
            translation: output.translation,
            grounded: self.grounded,
            hit_wall,
            hit_ceiling,
        }
    }
}

impl CharacterBody for KinematicCharacter {
    fn position(&self) -> Vector<Real> {
        self.position
    }

    fn heading(&self) -> Real {
        self.heading
    }

    fn rotate_yaw(&mut self, delta: Real) {
        self.heading = wrap_angle(self.heading + delta);
    }

    fn velocity(&self) -> Vector<Real> {
        self.velocity
    }

    fn add_velocity_for_tick(&mut self, velocity: Vector<Real>) {
        self.pending_velocity += velocity;
    }
}

fn wrap_angle(angle: Real) -> Real {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}
