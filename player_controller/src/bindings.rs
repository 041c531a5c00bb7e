//! Named input events mapped onto the controller's fixed axis slots.

use std::collections::BTreeMap;
use std::fmt;

use locomotion_motor::MoveAxes;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisSlot {
    Forward,
    Back,
    Left,
    Right,
    Yaw,
    Pitch,
    Sprint,
    Jump,
}

pub const AXIS_COUNT: usize = 8;

impl AxisSlot {
    pub const ALL: [AxisSlot; AXIS_COUNT] = [
        AxisSlot::Forward,
        AxisSlot::Back,
        AxisSlot::Left,
        AxisSlot::Right,
        AxisSlot::Yaw,
        AxisSlot::Pitch,
        AxisSlot::Sprint,
        AxisSlot::Jump,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Held events only refresh the look axes and sprint; the other axes keep
    /// their pressed value until released.
    pub fn accepts_held(self) -> bool {
        matches!(self, AxisSlot::Yaw | AxisSlot::Pitch | AxisSlot::Sprint)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AxisSlot::Forward => "forward",
            AxisSlot::Back => "back",
            AxisSlot::Left => "left",
            AxisSlot::Right => "right",
            AxisSlot::Yaw => "yaw",
            AxisSlot::Pitch => "pitch",
            AxisSlot::Sprint => "sprint",
            AxisSlot::Jump => "jump",
        }
    }
}

impl fmt::Display for AxisSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputPhase {
    #[default]
    Pressed,
    Held,
    Released,
}

/// Event names per axis, as found in the `[input]` config table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputNames {
    pub forward: String,
    pub back: String,
    pub left: String,
    pub right: String,
    pub yaw: String,
    pub pitch: String,
    pub sprint: String,
    pub jump: String,
    /// Keys that name no axis; reported as binding issues.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, toml::Value>,
}

impl Default for InputNames {
    fn default() -> Self {
        Self {
            forward: "Forward".to_string(),
            back: "Back".to_string(),
            left: "Left".to_string(),
            right: "Right".to_string(),
            yaw: "Yaw".to_string(),
            pitch: "Pitch".to_string(),
            sprint: "Sprint".to_string(),
            jump: "Jump".to_string(),
            unknown: BTreeMap::new(),
        }
    }
}

impl InputNames {
    pub fn name(&self, slot: AxisSlot) -> &str {
        match slot {
            AxisSlot::Forward => &self.forward,
            AxisSlot::Back => &self.back,
            AxisSlot::Left => &self.left,
            AxisSlot::Right => &self.right,
            AxisSlot::Yaw => &self.yaw,
            AxisSlot::Pitch => &self.pitch,
            AxisSlot::Sprint => &self.sprint,
            AxisSlot::Jump => &self.jump,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BindingIssue {
    #[error("no event name bound to the {0} axis")]
    Missing(AxisSlot),
    #[error("event `{name}` is bound to {first}; ignoring it for {second}")]
    Duplicate {
        name: String,
        first: AxisSlot,
        second: AxisSlot,
    },
    #[error("`{0}` does not name an input axis")]
    UnknownAxis(String),
}

/// Ordered event-name to slot table. Slots with a binding issue stay inert.
#[derive(Clone, Debug, Default)]
pub struct InputBindings {
    entries: Vec<(String, AxisSlot)>,
}

impl InputBindings {
    pub fn from_names(names: &InputNames) -> (Self, Vec<BindingIssue>) {
        let mut entries: Vec<(String, AxisSlot)> = Vec::with_capacity(AXIS_COUNT);
        let mut issues = Vec::new();
        for slot in AxisSlot::ALL {
            let name = names.name(slot).trim();
            if name.is_empty() {
                issues.push(BindingIssue::Missing(slot));
                continue;
            }
            if let Some((_, first)) = entries.iter().find(|(bound, _)| bound == name) {
                issues.push(BindingIssue::Duplicate {
                    name: name.to_string(),
                    first: *first,
                    second: slot,
                });
                continue;
            }
            entries.push((name.to_string(), slot));
        }
        issues.extend(names.unknown.keys().cloned().map(BindingIssue::UnknownAxis));
        (Self { entries }, issues)
    }

    pub fn slot(&self, name: &str) -> Option<AxisSlot> {
        self.entries
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, slot)| *slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Latest raw value per axis. Back and left hold negative magnitudes when pressed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisValues {
    values: [Real; AXIS_COUNT],
}

impl AxisValues {
    pub fn get(&self, slot: AxisSlot) -> Real {
        self.values[slot.index()]
    }

    pub fn set(&mut self, slot: AxisSlot, value: Real) {
        self.values[slot.index()] = value;
    }

    pub fn move_axes(&self) -> MoveAxes {
        MoveAxes {
            forward: self.get(AxisSlot::Forward),
            back: self.get(AxisSlot::Back),
            left: self.get(AxisSlot::Left),
            right: self.get(AxisSlot::Right),
            sprint: self.get(AxisSlot::Sprint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_bind_every_axis() {
        let (bindings, issues) = InputBindings::from_names(&InputNames::default());
        assert!(issues.is_empty());
        assert_eq!(bindings.len(), AXIS_COUNT);
        assert_eq!(bindings.slot("Sprint"), Some(AxisSlot::Sprint));
        assert_eq!(bindings.slot("sprint"), None);
    }

    #[test]
    fn mismatched_names_leave_slots_inert() {
        let names = InputNames {
            jump: String::new(),
            pitch: "Yaw".to_string(),
            ..Default::default()
        };
        let (bindings, issues) = InputBindings::from_names(&names);
        assert_eq!(bindings.len(), AXIS_COUNT - 2);
        assert_eq!(bindings.slot("Yaw"), Some(AxisSlot::Yaw));
        assert!(issues.contains(&BindingIssue::Missing(AxisSlot::Jump)));
        assert!(issues.contains(&BindingIssue::Duplicate {
            name: "Yaw".to_string(),
            first: AxisSlot::Yaw,
            second: AxisSlot::Pitch,
        }));
    }

    #[test]
    fn unknown_table_keys_are_reported() {
        let names: InputNames = toml::from_str("forward = \"W\"\ncrouch = \"C\"\n").expect("names");
        assert_eq!(names.forward, "W");
        assert_eq!(names.back, "Back");
        let (_, issues) = InputBindings::from_names(&names);
        assert_eq!(issues, vec![BindingIssue::UnknownAxis("crouch".to_string())]);
    }

    #[test]
    fn only_look_and_sprint_accept_held() {
        let held: Vec<_> = AxisSlot::ALL
            .into_iter()
            .filter(|slot| slot.accepts_held())
            .collect();
        assert_eq!(held, vec![AxisSlot::Yaw, AxisSlot::Pitch, AxisSlot::Sprint]);
    }
}
