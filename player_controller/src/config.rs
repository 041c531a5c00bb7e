//! Controller config file: `[movement]` tuning plus the `[input]` event names.

use std::fs;
use std::path::Path;

use locomotion_motor::{ConfigError, ConfigValidation, MovementConfig};
use serde::{Deserialize, Serialize};

use crate::bindings::{InputBindings, InputNames};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub movement: MovementConfig,
    pub input: InputNames,
}

impl ControllerConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Movement errors fail validation; binding issues are warnings because the
    /// controller still runs with the affected axes inert.
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = self.movement.validate();
        let (_, issues) = InputBindings::from_names(&self.input);
        validation
            .warnings
            .extend(issues.iter().map(|issue| issue.to_string()));
        validation
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse_toml(&text)?;
        let validation = config.movement.validate();
        if !validation.is_ok() {
            return Err(ConfigError::Invalid(validation.errors));
        }
        for warning in &validation.warnings {
            tracing::warn!(path = %path.display(), "{warning}");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_tables() {
        let text = r#"
[movement]
top_speed = 6.0
sprint_backwards = true

[input]
jump = "Space"
"#;
        let config = ControllerConfig::parse_toml(text).expect("config");
        assert_eq!(config.movement.top_speed, 6.0);
        assert!(config.movement.sprint_backwards);
        assert_eq!(config.movement.acceleration, 1.0);
        assert_eq!(config.input.jump, "Space");
        assert_eq!(config.input.forward, "Forward");
    }

    #[test]
    fn binding_issues_are_warnings() {
        let text = "[input]\nsprint = \"\"\n";
        let config = ControllerConfig::parse_toml(text).expect("config");
        let validation = config.validate();
        assert!(validation.is_ok());
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].contains("sprint"));
    }

    #[test]
    fn dump_parses_back() {
        let config = ControllerConfig::default();
        let text = config.to_toml().expect("toml");
        let parsed = ControllerConfig::parse_toml(&text).expect("parse");
        assert_eq!(parsed, config);
    }
}
