//! First-person controller composition: input bindings, look, ground probes,
//! horizontal planning and vertical integration, run once per tick.
#![forbid(unsafe_code)]

pub mod bindings;
pub mod config;

use character_body::CharacterBody;
use ground_probe::{GroundEvent, GroundednessDetector, OverlapQuery};
use locomotion_motor::{
    limit_pitch_delta, LookDelta, MovementConfig, Planar, RotationSmoother, VelocityXYPlanner,
    VerticalInput, VerticalVelocityIntegrator,
};
use physics_rapier::EntityId;
use player_camera::CameraResolver;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

pub use bindings::{AxisSlot, AxisValues, BindingIssue, InputBindings, InputNames, InputPhase};
pub use config::ControllerConfig;

/// Payload-free notifications, delivered synchronously during the tick that
/// triggers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerEvent {
    GroundHit,
    GroundApproaching,
    Ungrounded,
    SprintCooldownStarted,
}

impl From<GroundEvent> for ControllerEvent {
    fn from(event: GroundEvent) -> Self {
        match event {
            GroundEvent::GroundHit => ControllerEvent::GroundHit,
            GroundEvent::GroundApproaching => ControllerEvent::GroundApproaching,
            GroundEvent::Ungrounded => ControllerEvent::Ungrounded,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerFrame {
    /// Velocity handed to the body for this tick.
    pub velocity: Vector<Real>,
    pub look: LookDelta,
    pub xy_updated: bool,
    pub jumped: bool,
    pub events: Vec<ControllerEvent>,
}

/// Read-only view of the controller state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerStatus {
    pub grounded: bool,
    pub near_ground: bool,
    pub heading: Real,
    pub air_time: Real,
    pub sprint_multiplier: Real,
    pub sprint_held_time: Real,
    pub sprint_cooldown: Real,
    pub sprint_pause: Real,
    pub stamina_percentage: Real,
    pub z_velocity: Real,
    pub jump_held: bool,
    /// World-frame horizontal velocity applied last tick.
    pub applied_xy: Planar,
    /// Local-frame horizontal target of the last planner update.
    pub target_xy: Planar,
}

/// Whether horizontal velocity may change this tick. `z_velocity` is the
/// controller's vertical velocity from the previous tick.
pub fn xy_update_allowed(
    config: &MovementConfig,
    grounded: bool,
    near_ground: bool,
    z_velocity: Real,
) -> bool {
    if grounded {
        return true;
    }
    if !config.update_xy_midair {
        return false;
    }
    let near_gate = config.update_xy_only_near_ground;
    let ascending_gate = config.update_xy_only_ascending;
    let ascending = z_velocity >= 0.0;
    (near_gate && near_ground && ascending_gate && ascending)
        || (near_gate && near_ground && !ascending_gate)
        || (ascending_gate && ascending && !near_gate)
        || (!near_gate && !ascending_gate)
}

type Listener = Box<dyn FnMut(ControllerEvent)>;

pub struct ControllerOrchestrator<C: CameraResolver> {
    config: ControllerConfig,
    bindings: InputBindings,
    binding_issues: Vec<BindingIssue>,
    axes: AxisValues,
    rotation: RotationSmoother,
    ground: GroundednessDetector,
    planner: VelocityXYPlanner,
    vertical: VerticalVelocityIntegrator,
    camera: C,
    camera_missing: bool,
    heading: Real,
    air_time: Real,
    script_target: Planar,
    script_sets_target: bool,
    listeners: Vec<Listener>,
}

impl<C: CameraResolver> ControllerOrchestrator<C> {
    /// `owner` is the character entity; its colliders never count as ground.
    pub fn new(config: ControllerConfig, owner: EntityId, camera: C) -> Self {
        let (bindings, binding_issues) = InputBindings::from_names(&config.input);
        report_binding_issues(&binding_issues);
        Self {
            bindings,
            binding_issues,
            axes: AxisValues::default(),
            rotation: RotationSmoother::new(),
            ground: GroundednessDetector::new(owner, &[]),
            planner: VelocityXYPlanner::new(),
            vertical: VerticalVelocityIntegrator::new(&config.movement),
            camera,
            camera_missing: false,
            heading: 0.0,
            air_time: 0.0,
            script_target: Planar::zeros(),
            script_sets_target: false,
            listeners: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn movement(&self) -> &MovementConfig {
        &self.config.movement
    }

    /// Replaces the config and refreshes everything derived from it.
    pub fn set_config(&mut self, config: ControllerConfig) {
        if config.input != self.config.input {
            let (bindings, issues) = InputBindings::from_names(&config.input);
            report_binding_issues(&issues);
            self.bindings = bindings;
            self.binding_issues = issues;
        }
        self.vertical.reconfigure(&config.movement);
        let held = self.planner.sprint().held_duration();
        self.planner
            .sprint_mut()
            .set_held_duration(held, &config.movement);
        self.config = config;
    }

    pub fn bindings(&self) -> &InputBindings {
        &self.bindings
    }

    pub fn binding_issues(&self) -> &[BindingIssue] {
        &self.binding_issues
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Child entities of the character, ignored by the ground probes.
    pub fn set_descendants(&mut self, descendants: &[EntityId]) {
        self.ground.set_descendants(descendants);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(ControllerEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Routes a named input event to its axis. Returns false when the name is not
    /// bound or the phase does not update that axis.
    pub fn apply_input(&mut self, name: &str, value: Real, phase: InputPhase) -> bool {
        let Some(slot) = self.bindings.slot(name) else {
            tracing::trace!(name, "input event not bound");
            return false;
        };
        if phase == InputPhase::Held && !slot.accepts_held() {
            return false;
        }
        self.axes.set(slot, value);
        true
    }

    pub fn input_value(&self, slot: AxisSlot) -> Real {
        self.axes.get(slot)
    }

    pub fn status(&self) -> ControllerStatus {
        let sprint = self.planner.sprint();
        ControllerStatus {
            grounded: self.ground.grounded(),
            near_ground: self.ground.near_ground(),
            heading: self.heading,
            air_time: self.air_time,
            sprint_multiplier: sprint.multiplier(),
            sprint_held_time: sprint.held_duration(),
            sprint_cooldown: sprint.cooldown(),
            sprint_pause: sprint.decrement_pause(),
            stamina_percentage: sprint.stamina_percentage(&self.config.movement),
            z_velocity: self.vertical.velocity(),
            jump_held: self.vertical.jump_held(),
            applied_xy: self.planner.applied(),
            target_xy: self.planner.prev_target(),
        }
    }

    pub fn ground_hit_entities(&self) -> &[EntityId] {
        self.ground.hit_entities()
    }

    pub fn set_grounded_for_tick(&mut self, grounded: bool) {
        self.ground.override_grounded(grounded);
    }

    pub fn set_ground_close_for_tick(&mut self, near_ground: bool) {
        self.ground.override_near_ground(near_ground);
    }

    pub fn set_sprint_held_time(&mut self, held: Real) {
        let movement = self.config.movement;
        self.planner.sprint_mut().set_held_duration(held, &movement);
    }

    pub fn set_z_velocity(&mut self, velocity: Real) {
        self.vertical.set_velocity(velocity);
    }

    /// Local-frame horizontal target used while scripted targeting is on.
    pub fn set_script_target_xy_velocity(&mut self, target: Planar) {
        self.script_target = target;
        self.sync_script_target();
    }

    pub fn script_target_xy_velocity(&self) -> Planar {
        self.script_target
    }

    pub fn set_script_sets_xy_target(&mut self, enabled: bool) {
        self.script_sets_target = enabled;
        self.sync_script_target();
    }

    pub fn script_sets_xy_target(&self) -> bool {
        self.script_sets_target
    }

    fn sync_script_target(&mut self) {
        let target = self.script_sets_target.then_some(self.script_target);
        self.planner.set_script_target(target);
    }

    pub fn tick<B, Q>(&mut self, body: &mut B, query: &Q, dt: Real) -> ControllerFrame
    where
        B: CharacterBody + ?Sized,
        Q: OverlapQuery + ?Sized,
    {
        let dt = dt.max(0.0);
        let movement = self.config.movement;
        let mut events = Vec::new();

        let look = self.rotation.update(
            self.axes.get(AxisSlot::Yaw),
            self.axes.get(AxisSlot::Pitch),
            &movement,
            dt,
        );
        body.rotate_yaw(look.yaw);
        match self.camera.active_camera() {
            Some(camera) => {
                let delta = limit_pitch_delta(camera.pitch(), look.pitch);
                camera.rotate_pitch(delta);
                if self.camera_missing {
                    tracing::debug!("active camera resolved");
                    self.camera_missing = false;
                }
            }
            None => {
                if !self.camera_missing {
                    tracing::debug!("no active camera, skipping pitch");
                    self.camera_missing = true;
                }
            }
        }
        self.heading = body.heading();

        if let Some(event) = self.ground.detect(query, body.position(), &movement) {
            self.emit(event.into(), &mut events);
        }
        let grounded = self.ground.grounded();
        let near_ground = self.ground.near_ground();
        self.air_time = if grounded { 0.0 } else { self.air_time + dt };

        let xy_updated =
            xy_update_allowed(&movement, grounded, near_ground, self.vertical.velocity());
        if xy_updated {
            let output = self.planner.step(
                &self.axes.move_axes(),
                grounded,
                self.heading,
                &movement,
                dt,
            );
            if output.sprint.cooldown_started {
                self.emit(ControllerEvent::SprintCooldownStarted, &mut events);
            }
        }

        let vertical = self.vertical.step(
            VerticalInput {
                grounded,
                jump: self.axes.get(AxisSlot::Jump),
                reported_velocity: body.velocity().z,
            },
            &movement,
            dt,
        );

        let applied = self.planner.applied();
        let velocity = Vector::new(applied.x, applied.y, vertical.velocity);
        body.add_velocity_for_tick(velocity);

        ControllerFrame {
            velocity,
            look,
            xy_updated,
            jumped: vertical.jumped,
            events,
        }
    }

    fn emit(&mut self, event: ControllerEvent, events: &mut Vec<ControllerEvent>) {
        tracing::debug!(?event, "controller notification");
        for listener in &mut self.listeners {
            listener(event);
        }
        events.push(event);
    }
}

fn report_binding_issues(issues: &[BindingIssue]) {
    if issues.is_empty() {
        return;
    }
    let summary = issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    tracing::warn!(count = issues.len(), "input bindings mismatch: {summary}");
}
