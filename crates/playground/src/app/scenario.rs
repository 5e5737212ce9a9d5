use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use interaction::{InteractableDefDatabase, Vec3};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {field}: {message}")]
    Invalid { field: String, message: String },
    #[error("object '{object}' references unknown def '{def}'")]
    UnknownDef { object: String, def: String },
    #[error("command at {at}s references unknown object '{object}'")]
    UnknownObject { at: f32, object: String },
    #[error("object name '{name}' is used more than once")]
    DuplicateObject { name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_fixed_dt")]
    pub(crate) fixed_dt: f32,
    pub(crate) duration_seconds: f32,
    #[serde(default)]
    pub(crate) ground: GroundSpec,
    pub(crate) avatar: AvatarSpec,
    #[serde(default)]
    pub(crate) objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub(crate) commands: Vec<ScheduledCommand>,
}

fn default_fixed_dt() -> f32 {
    1.0 / 60.0
}

/// Flat ground square centred on the origin; outside it objects fall freely.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GroundSpec {
    pub(crate) height: f32,
    pub(crate) half_extent: f32,
    pub(crate) gravity: f32,
    pub(crate) restitution: f32,
    pub(crate) friction: f32,
}

impl Default for GroundSpec {
    fn default() -> Self {
        Self {
            height: 0.0,
            half_extent: 10.0,
            gravity: -9.81,
            restitution: 0.3,
            friction: 0.8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AvatarSpec {
    pub(crate) position: Vec3,
    #[serde(default)]
    pub(crate) yaw_degrees: f32,
    #[serde(default = "default_camera_height")]
    pub(crate) camera_height: f32,
    #[serde(default)]
    pub(crate) bones: Vec<BoneSpec>,
}

fn default_camera_height() -> f32 {
    1.6
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BoneSpec {
    pub(crate) name: String,
    /// Offset from the avatar root, in root space.
    pub(crate) offset: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectSpec {
    pub(crate) name: String,
    pub(crate) def: String,
    pub(crate) position: Vec3,
    #[serde(default = "default_radius")]
    pub(crate) radius: f32,
    #[serde(default = "default_true")]
    pub(crate) rigidbody: bool,
    #[serde(default)]
    pub(crate) kinematic: bool,
    #[serde(default)]
    pub(crate) is_trigger: bool,
}

fn default_radius() -> f32 {
    0.25
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScheduledCommand {
    pub(crate) at: f32,
    #[serde(flatten)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Command {
    Grab { object: String },
    Release { object: String },
    Throw {
        object: String,
        direction: Vec3,
        force: f32,
    },
    Contact { object: String },
    TriggerEnter { object: String },
    TriggerExit { object: String },
    /// Walks the avatar root to `to` over `seconds`; zero teleports.
    MoveAvatar {
        to: Vec3,
        #[serde(default)]
        seconds: f32,
    },
    LookAt { target: Vec3 },
}

impl Command {
    pub(crate) fn object(&self) -> Option<&str> {
        match self {
            Self::Grab { object }
            | Self::Release { object }
            | Self::Throw { object, .. }
            | Self::Contact { object }
            | Self::TriggerEnter { object }
            | Self::TriggerExit { object } => Some(object),
            Self::MoveAvatar { .. } | Self::LookAt { .. } => None,
        }
    }

    pub(crate) fn as_token(&self) -> &'static str {
        match self {
            Self::Grab { .. } => "grab",
            Self::Release { .. } => "release",
            Self::Throw { .. } => "throw",
            Self::Contact { .. } => "contact",
            Self::TriggerEnter { .. } => "trigger_enter",
            Self::TriggerExit { .. } => "trigger_exit",
            Self::MoveAvatar { .. } => "move_avatar",
            Self::LookAt { .. } => "look_at",
        }
    }
}

pub(crate) fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenario(path, &raw)
}

/// Parses and orders commands by time. Commands sharing a time keep file order.
pub(crate) fn parse_scenario(path: &Path, raw: &str) -> Result<Scenario, ScenarioError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let mut scenario: Scenario =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ScenarioError::Parse {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })?;
    scenario.validate_shape()?;
    scenario
        .commands
        .sort_by(|left, right| left.at.total_cmp(&right.at));
    Ok(scenario)
}

impl Scenario {
    fn validate_shape(&self) -> Result<(), ScenarioError> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(invalid("$.fixed_dt", "must be a positive number"));
        }
        if !(self.duration_seconds.is_finite() && self.duration_seconds >= 0.0) {
            return Err(invalid("$.duration_seconds", "must be zero or positive"));
        }
        if !(self.ground.half_extent.is_finite() && self.ground.half_extent >= 0.0) {
            return Err(invalid("$.ground.half_extent", "must be zero or positive"));
        }
        for (index, object) in self.objects.iter().enumerate() {
            if !(object.radius.is_finite() && object.radius > 0.0) {
                return Err(invalid(
                    &format!("$.objects[{index}].radius"),
                    "must be a positive number",
                ));
            }
        }
        for (index, scheduled) in self.commands.iter().enumerate() {
            if !(scheduled.at.is_finite() && scheduled.at >= 0.0) {
                return Err(invalid(
                    &format!("$.commands[{index}].at"),
                    "must be zero or positive",
                ));
            }
        }
        Ok(())
    }

    /// Cross-checks names against each other and against compiled defs.
    pub(crate) fn validate_against(&self, defs: &InteractableDefDatabase) -> Result<(), ScenarioError> {
        let mut names = HashSet::<&str>::new();
        for object in &self.objects {
            if !names.insert(object.name.as_str()) {
                return Err(ScenarioError::DuplicateObject {
                    name: object.name.clone(),
                });
            }
            if defs.def_id_by_name(&object.def).is_none() {
                return Err(ScenarioError::UnknownDef {
                    object: object.name.clone(),
                    def: object.def.clone(),
                });
            }
        }
        for scheduled in &self.commands {
            let Some(object) = scheduled.command.object() else {
                continue;
            };
            if !names.contains(object) {
                return Err(ScenarioError::UnknownObject {
                    at: scheduled.at,
                    object: object.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ScenarioError {
    ScenarioError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction::compile_defs_str;

    fn parse(raw: &str) -> Result<Scenario, ScenarioError> {
        parse_scenario(Path::new("scenario.json"), raw)
    }

    fn defs() -> InteractableDefDatabase {
        compile_defs_str(
            Path::new("defs.xml"),
            "<InteractableDefs><InteractableDef><defName>ball</defName><grab/></InteractableDef></InteractableDefs>",
        )
        .expect("defs")
    }

    const MINIMAL: &str = r#"{
        "duration_seconds": 1.0,
        "avatar": { "position": { "x": 0, "y": 0, "z": 0 } },
        "objects": [
            { "name": "a", "def": "ball", "position": { "x": 0, "y": 0.25, "z": 1 } }
        ],
        "commands": [
            { "at": 0.5, "action": "release", "object": "a" },
            { "at": 0.1, "action": "grab", "object": "a" },
            { "at": 0.1, "action": "look_at", "target": { "x": 0, "y": 0, "z": 1 } }
        ]
    }"#;

    #[test]
    fn parses_with_defaults_and_orders_commands() {
        let scenario = parse(MINIMAL).expect("parse");
        assert!((scenario.fixed_dt - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(scenario.avatar.camera_height, 1.6);
        assert_eq!(scenario.ground.half_extent, 10.0);
        assert_eq!(scenario.objects[0].radius, 0.25);
        assert!(scenario.objects[0].rigidbody);

        let tokens = scenario
            .commands
            .iter()
            .map(|scheduled| scheduled.command.as_token())
            .collect::<Vec<_>>();
        assert_eq!(tokens, vec!["grab", "look_at", "release"]);
        scenario.validate_against(&defs()).expect("valid");
    }

    #[test]
    fn parse_errors_name_the_json_path() {
        let raw = MINIMAL.replace(r#""z": 1 }"#, r#""z": "far" }"#);
        let error = parse(&raw).expect_err("bad z");
        match error {
            ScenarioError::Parse { json_path, .. } => {
                assert_eq!(json_path, "objects[0].position.z");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = MINIMAL.replace(r#""duration_seconds""#, r#""speed": 1, "duration_seconds""#);
        assert!(matches!(parse(&raw), Err(ScenarioError::Parse { .. })));
    }

    #[test]
    fn shape_validation_rejects_bad_step() {
        let raw = MINIMAL.replace(r#""duration_seconds": 1.0"#, r#""duration_seconds": 1.0, "fixed_dt": 0"#);
        match parse(&raw).expect_err("bad dt") {
            ScenarioError::Invalid { field, .. } => assert_eq!(field, "$.fixed_dt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn references_are_checked_against_defs_and_objects() {
        let scenario = parse(&MINIMAL.replace(r#""def": "ball""#, r#""def": "crate""#)).expect("parse");
        assert!(matches!(
            scenario.validate_against(&defs()),
            Err(ScenarioError::UnknownDef { .. })
        ));

        let scenario =
            parse(&MINIMAL.replace(r#""action": "release", "object": "a""#, r#""action": "release", "object": "b""#))
                .expect("parse");
        assert!(matches!(
            scenario.validate_against(&defs()),
            Err(ScenarioError::UnknownObject { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let error = load_scenario(&temp.path().join("absent.json")).expect_err("missing");
        assert!(matches!(error, ScenarioError::Read { .. }));
    }
}
