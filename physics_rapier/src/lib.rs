//! Rapier world setup shared by the ground probe and the character body.
//!
//! Colliders carry the id of the entity that owns them in `user_data` so overlap
//! queries can answer in entity terms and callers can exclude their own hierarchy.
#![forbid(unsafe_code)]

use rapier3d::prelude::*;

/// Scene entity identifier. Several colliders may share one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl EntityId {
    fn to_user_data(self) -> u128 {
        self.0 as u128 + 1
    }

    fn from_user_data(data: u128) -> Option<Self> {
        data.checked_sub(1).map(|raw| EntityId(raw as u64))
    }

    /// Owner of `collider`, if it was inserted through [`PhysicsWorld`].
    pub fn of_collider(collider: &Collider) -> Option<Self> {
        Self::from_user_data(collider.user_data)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    next_entity: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            next_entity: 1,
        }
    }

    /// Z-up world with standard gravity.
    pub fn z_up() -> Self {
        Self::new(vector![0.0, 0.0, -9.81])
    }

    /// Unit vector opposite gravity, +Z when gravity is disabled.
    pub fn up(&self) -> Vector<Real> {
        if self.gravity.norm_squared() > 1.0e-6 {
            -self.gravity.normalize()
        } else {
            Vector::z()
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    /// Rebuilds the query acceleration structure without advancing the simulation.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Inserts a collider owned by a freshly allocated entity.
    pub fn insert_static_collider(&mut self, collider: Collider) -> (EntityId, ColliderHandle) {
        let entity = self.allocate_entity();
        let handle = self.insert_entity_collider(entity, collider);
        (entity, handle)
    }

    pub fn insert_entity_collider(
        &mut self,
        entity: EntityId,
        mut collider: Collider,
    ) -> ColliderHandle {
        collider.user_data = entity.to_user_data();
        self.colliders.insert(collider)
    }

    pub fn entity_of(&self, handle: ColliderHandle) -> Option<EntityId> {
        self.colliders.get(handle).and_then(EntityId::of_collider)
    }

    /// Entities whose colliders intersect `shape` at `position`, in query order without
    /// duplicates. Colliders owned by an entity in `exclude` are ignored; untagged
    /// colliders are reported as hits without an entity and returned via `untagged`.
    pub fn intersecting_entities(
        &self,
        shape: &dyn Shape,
        position: &Isometry<Real>,
        exclude: &[EntityId],
    ) -> OverlapHits {
        let mut hits = OverlapHits::default();
        self.query_pipeline.intersections_with_shape(
            &self.bodies,
            &self.colliders,
            position,
            shape,
            QueryFilter::default(),
            |handle| {
                match self.entity_of(handle) {
                    Some(entity) if exclude.contains(&entity) => {}
                    Some(entity) => {
                        if !hits.entities.contains(&entity) {
                            hits.entities.push(entity);
                        }
                    }
                    None => hits.untagged += 1,
                }
                true
            },
        );
        hits
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlapHits {
    pub entities: Vec<EntityId>,
    pub untagged: usize,
}

impl OverlapHits {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.untagged == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::control::KinematicCharacterController;

    fn build_floor(world: &mut PhysicsWorld) -> EntityId {
        let floor = ColliderBuilder::cuboid(5.0, 5.0, 0.1)
            .translation(vector![0.0, 0.0, -0.1])
            .build();
        world.insert_static_collider(floor).0
    }

    #[test]
    fn tagged_collider_reports_its_entity() {
        let mut world = PhysicsWorld::z_up();
        let floor = build_floor(&mut world);
        world.refresh_queries();

        let probe = Capsule::new_z(0.5, 0.25);
        let touching = Isometry::translation(0.0, 0.0, 0.7);
        let hits = world.intersecting_entities(&probe, &touching, &[]);
        assert_eq!(hits.entities, vec![floor]);

        let clear = Isometry::translation(0.0, 0.0, 2.0);
        assert!(world.intersecting_entities(&probe, &clear, &[]).is_empty());
    }

    #[test]
    fn excluded_entities_are_filtered() {
        let mut world = PhysicsWorld::z_up();
        let floor = build_floor(&mut world);
        let owner = world.allocate_entity();
        world.insert_entity_collider(
            owner,
            ColliderBuilder::ball(0.2).translation(vector![0.0, 0.0, 0.5]).build(),
        );
        world.refresh_queries();

        let probe = Capsule::new_z(0.5, 0.25);
        let position = Isometry::translation(0.0, 0.0, 0.7);
        let all = world.intersecting_entities(&probe, &position, &[]);
        assert_eq!(all.entities.len(), 2);
        let filtered = world.intersecting_entities(&probe, &position, &[owner]);
        assert_eq!(filtered.entities, vec![floor]);
    }

    #[test]
    fn kcc_detects_ground_contact_z_up() {
        let mut world = PhysicsWorld::z_up();
        build_floor(&mut world);
        world.step(1.0 / 60.0);

        let controller = KinematicCharacterController {
            up: Vector::z_axis(),
            snap_to_ground: Some(rapier3d::control::CharacterLength::Absolute(0.2)),
            ..Default::default()
        };
        let capsule = Capsule::new_z(0.9, 0.4);
        let mut position = Isometry::translation(0.0, 0.0, 1.2);
        let output = controller.move_shape(
            1.0 / 60.0,
            world.bodies(),
            world.colliders(),
            world.query_pipeline(),
            &capsule,
            &position,
            vector![0.0, 0.0, -0.5],
            QueryFilter::default(),
            |_| {},
        );
        position.translation.vector += output.translation;
        assert!(output.grounded);
        assert!(position.translation.z >= 0.9);
    }
}
