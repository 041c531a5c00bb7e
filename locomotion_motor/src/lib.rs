//! First-person locomotion math: look smoothing, sprint stamina, horizontal
//! velocity planning and vertical (jump/gravity) integration.
//!
//! Everything here is pure per-tick state; physics queries live in `ground_probe`
//! and `character_body`.
#![forbid(unsafe_code)]

pub mod config;
pub mod lerp;
pub mod planar;
pub mod planner;
pub mod rotation;
pub mod sprint;
pub mod vertical;

pub use config::{ConfigError, ConfigValidation, MovementConfig};
pub use lerp::{LerpContext, VelocityLerper};
pub use planar::Planar;
pub use planner::{planned_direction, MoveAxes, PlannerOutput, VelocityXYPlanner};
pub use rotation::{limit_pitch_delta, LookDelta, RotationSmoother};
pub use sprint::{SprintOutput, SprintRequest, SprintStaminaManager};
pub use vertical::{VerticalInput, VerticalOutput, VerticalPhase, VerticalVelocityIntegrator};
