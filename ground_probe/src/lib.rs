//! Capsule overlap probes that decide whether the character stands on something.
#![forbid(unsafe_code)]

use locomotion_motor::MovementConfig;
use physics_rapier::{EntityId, OverlapHits, PhysicsWorld};
use rapier3d::math::{Isometry, Vector};
use rapier3d::prelude::{Capsule, Real};

/// Overlap service used by the probes. The capsule axis is world +Z.
pub trait OverlapQuery {
    fn overlap_capsule(
        &self,
        center: Vector<Real>,
        height: Real,
        radius: Real,
        exclude: &[EntityId],
    ) -> OverlapHits;
}

impl OverlapQuery for PhysicsWorld {
    fn overlap_capsule(
        &self,
        center: Vector<Real>,
        height: Real,
        radius: Real,
        exclude: &[EntityId],
    ) -> OverlapHits {
        let capsule = probe_capsule(height, radius);
        let position = Isometry::translation(center.x, center.y, center.z);
        self.intersecting_entities(&capsule, &position, exclude)
    }
}

/// `height` is the full tip-to-tip height.
pub fn probe_capsule(height: Real, radius: Real) -> Capsule {
    let radius = radius.max(0.0);
    Capsule::new_z((height * 0.5 - radius).max(0.0), radius)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundEvent {
    GroundHit,
    GroundApproaching,
    Ungrounded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroundQueryResult {
    pub grounded: bool,
    pub near_ground: bool,
    /// Entities under the grounded probe; empty when airborne or overridden.
    pub hit_entities: Vec<EntityId>,
}

#[derive(Clone, Debug)]
pub struct GroundednessDetector {
    exclude: Vec<EntityId>,
    result: GroundQueryResult,
    grounded_override: Option<bool>,
    near_ground_override: Option<bool>,
}

impl GroundednessDetector {
    /// `owner` and `descendants` never count as ground.
    pub fn new(owner: EntityId, descendants: &[EntityId]) -> Self {
        let mut exclude = Vec::with_capacity(descendants.len() + 1);
        exclude.push(owner);
        exclude.extend_from_slice(descendants);
        Self {
            exclude,
            result: GroundQueryResult::default(),
            grounded_override: None,
            near_ground_override: None,
        }
    }

    pub fn set_descendants(&mut self, descendants: &[EntityId]) {
        self.exclude.truncate(1);
        self.exclude.extend_from_slice(descendants);
    }

    pub fn grounded(&self) -> bool {
        self.result.grounded
    }

    pub fn near_ground(&self) -> bool {
        self.result.near_ground
    }

    pub fn hit_entities(&self) -> &[EntityId] {
        &self.result.hit_entities
    }

    pub fn result(&self) -> &GroundQueryResult {
        &self.result
    }

    /// Replaces the grounded probe result on the next `detect` only.
    pub fn override_grounded(&mut self, grounded: bool) {
        self.grounded_override = Some(grounded);
    }

    /// Replaces the near-ground probe result on the next `detect` only.
    pub fn override_near_ground(&mut self, near_ground: bool) {
        self.near_ground_override = Some(near_ground);
    }

    /// Probes around `position` (the character's feet) and returns the transition
    /// notification for this tick, if any.
    pub fn detect<Q: OverlapQuery + ?Sized>(
        &mut self,
        query: &Q,
        position: Vector<Real>,
        config: &MovementConfig,
    ) -> Option<GroundEvent> {
        let prev_grounded = self.result.grounded;
        let prev_near_ground = self.result.near_ground;
        let height = config.capsule_height;
        let radius = config.capsule_radius;
        let up = Vector::z();

        self.result.hit_entities.clear();
        self.result.grounded = match self.grounded_override.take() {
            Some(grounded) => grounded,
            None => {
                let center = position + up * config.grounded_probe_offset();
                let hits = query.overlap_capsule(center, height, radius, &self.exclude);
                let grounded = !hits.is_empty();
                self.result.hit_entities = hits.entities;
                grounded
            }
        };

        let near_ground_override = self.near_ground_override.take();
        self.result.near_ground = if self.result.grounded {
            true
        } else if let Some(near_ground) = near_ground_override {
            near_ground
        } else {
            let center = position + up * config.jump_hold_probe_offset();
            !query
                .overlap_capsule(center, height, radius, &self.exclude)
                .is_empty()
        };

        let event = if !prev_grounded && self.result.grounded {
            Some(GroundEvent::GroundHit)
        } else if !prev_near_ground && self.result.near_ground {
            Some(GroundEvent::GroundApproaching)
        } else if prev_grounded && !self.result.grounded {
            Some(GroundEvent::Ungrounded)
        } else {
            None
        };
        if let Some(event) = event {
            tracing::debug!(?event, "ground transition");
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Flat ground at z = 0 and a count of issued probes.
    struct FlatGround {
        owner_overlaps: bool,
        probes: Cell<usize>,
    }

    impl FlatGround {
        fn new() -> Self {
            Self {
                owner_overlaps: false,
                probes: Cell::new(0),
            }
        }
    }

    impl OverlapQuery for FlatGround {
        fn overlap_capsule(
            &self,
            center: Vector<Real>,
            height: Real,
            _radius: Real,
            exclude: &[EntityId],
        ) -> OverlapHits {
            self.probes.set(self.probes.get() + 1);
            let mut hits = OverlapHits::default();
            if center.z - height * 0.5 <= 0.0 {
                hits.entities.push(EntityId(100));
            }
            if self.owner_overlaps && !exclude.contains(&EntityId(1)) {
                hits.entities.push(EntityId(1));
            }
            hits
        }
    }

    fn feet(z: Real) -> Vector<Real> {
        Vector::new(0.0, 0.0, z)
    }

    #[test]
    fn standing_is_grounded_with_single_probe() {
        let config = MovementConfig::default();
        let ground = FlatGround::new();
        let mut detector = GroundednessDetector::new(EntityId(1), &[]);
        let event = detector.detect(&ground, feet(0.0), &config);
        assert_eq!(event, Some(GroundEvent::GroundHit));
        assert!(detector.grounded());
        assert!(detector.near_ground());
        assert_eq!(detector.hit_entities(), &[EntityId(100)]);
        assert_eq!(ground.probes.get(), 1);
    }

    #[test]
    fn secondary_probe_detects_near_ground() {
        let config = MovementConfig::default();
        let ground = FlatGround::new();
        let mut detector = GroundednessDetector::new(EntityId(1), &[]);
        let event = detector.detect(&ground, feet(0.3), &config);
        assert_eq!(event, Some(GroundEvent::GroundApproaching));
        assert!(!detector.grounded());
        assert!(detector.near_ground());
        assert!(detector.hit_entities().is_empty());
        assert_eq!(ground.probes.get(), 2);

        assert_eq!(detector.detect(&ground, feet(0.2), &config), None);
    }

    #[test]
    fn transitions_fire_once_in_priority_order() {
        let config = MovementConfig::default();
        let ground = FlatGround::new();
        let mut detector = GroundednessDetector::new(EntityId(1), &[]);
        let heights = [2.0, 0.0, 0.0, 0.3, 2.0, 0.3, 0.0];
        let events: Vec<_> = heights
            .iter()
            .map(|z| detector.detect(&ground, feet(*z), &config))
            .collect();
        assert_eq!(
            events,
            vec![
                None,
                Some(GroundEvent::GroundHit),
                None,
                Some(GroundEvent::Ungrounded),
                None,
                Some(GroundEvent::GroundApproaching),
                Some(GroundEvent::GroundHit),
            ]
        );
    }

    #[test]
    fn owner_and_descendants_are_ignored() {
        let config = MovementConfig::default();
        let ground = FlatGround {
            owner_overlaps: true,
            ..FlatGround::new()
        };
        let mut detector = GroundednessDetector::new(EntityId(1), &[EntityId(2)]);
        detector.detect(&ground, feet(2.0), &config);
        assert!(!detector.grounded());
        assert!(!detector.near_ground());
    }

    #[test]
    fn overrides_last_one_tick() {
        let config = MovementConfig::default();
        let ground = FlatGround::new();
        let mut detector = GroundednessDetector::new(EntityId(1), &[]);
        detector.override_grounded(true);
        assert_eq!(
            detector.detect(&ground, feet(2.0), &config),
            Some(GroundEvent::GroundHit)
        );
        assert_eq!(ground.probes.get(), 0);
        assert_eq!(
            detector.detect(&ground, feet(2.0), &config),
            Some(GroundEvent::Ungrounded)
        );

        detector.override_near_ground(true);
        detector.detect(&ground, feet(2.0), &config);
        assert!(detector.near_ground());
        detector.detect(&ground, feet(2.0), &config);
        assert!(!detector.near_ground());
    }

    #[test]
    fn rapier_floor_grounds_the_probe() {
        use rapier3d::prelude::ColliderBuilder;

        let config = MovementConfig::default();
        let mut world = PhysicsWorld::z_up();
        let (floor, _) = world.insert_static_collider(
            ColliderBuilder::cuboid(5.0, 5.0, 0.1)
                .translation(Vector::new(0.0, 0.0, -0.1))
                .build(),
        );
        let owner = world.allocate_entity();
        world.refresh_queries();

        let mut detector = GroundednessDetector::new(owner, &[]);
        detector.detect(&world, feet(0.0), &config);
        assert_eq!(
            detector.result(),
            &GroundQueryResult {
                grounded: true,
                near_ground: true,
                hit_entities: vec![floor],
            }
        );

        detector.detect(&world, feet(0.3), &config);
        assert!(!detector.grounded());
        assert!(detector.near_ground());

        detector.detect(&world, feet(1.5), &config);
        assert!(!detector.near_ground());
    }
}
