use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::ExclusivityGroup;
use crate::math::Vec3;
use crate::scene::CollisionLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AimMode {
    /// Half-angle `atan(detection_radius / distance)` around camera forward.
    #[default]
    Cone,
    /// Camera ray must hit the object's collider sphere.
    Ray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThrowModel {
    #[default]
    Sampled,
    CameraDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    pub detection_radius: f32,
    pub min_grab_distance: f32,
    /// Zero means touch-only: contact reports grab, range/aim are never tracked.
    pub max_grab_distance: f32,
    pub aim_mode: AimMode,
    pub hand_anchor_name: String,
    pub fallback_anchor_offset: Vec3,
    pub grab_offset: Vec3,
    pub allow_multi_grab: bool,
    pub held_layer: CollisionLayer,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            detection_radius: 1.0,
            min_grab_distance: 0.0,
            max_grab_distance: 3.0,
            aim_mode: AimMode::Cone,
            hand_anchor_name: "RightHand".to_string(),
            fallback_anchor_offset: Vec3::new(0.35, 1.2, 0.45),
            grab_offset: Vec3::ZERO,
            allow_multi_grab: false,
            held_layer: CollisionLayer::IGNORE_RAYCAST,
        }
    }
}

impl GrabConfig {
    pub fn is_touch_only(&self) -> bool {
        self.max_grab_distance <= 0.0
    }

    pub fn is_distance_grab(&self) -> bool {
        self.max_grab_distance > self.min_grab_distance
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("grab.detection_radius", self.detection_radius)?;
        non_negative("grab.min_grab_distance", self.min_grab_distance)?;
        non_negative("grab.max_grab_distance", self.max_grab_distance)?;
        if !self.is_touch_only() && self.min_grab_distance > self.max_grab_distance {
            return Err(ConfigError::InvertedGrabRange {
                min: self.min_grab_distance,
                max: self.max_grab_distance,
            });
        }
        finite_vec("grab.fallback_anchor_offset", self.fallback_anchor_offset)?;
        finite_vec("grab.grab_offset", self.grab_offset)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    pub model: ThrowModel,
    pub throw_force: f32,
    pub upward_boost: f32,
    pub velocity_multiplier: f32,
    pub max_throw_velocity: f32,
    pub noise_floor: f32,
    pub sample_capacity: usize,
    pub impact_threshold: f32,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            model: ThrowModel::Sampled,
            throw_force: 10.0,
            upward_boost: 2.0,
            velocity_multiplier: 1.5,
            max_throw_velocity: 20.0,
            noise_floor: 0.01,
            sample_capacity: 5,
            impact_threshold: 2.0,
        }
    }
}

impl ThrowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("throw.throw_force", self.throw_force)?;
        finite("throw.upward_boost", self.upward_boost)?;
        non_negative("throw.velocity_multiplier", self.velocity_multiplier)?;
        non_negative("throw.max_throw_velocity", self.max_throw_velocity)?;
        non_negative("throw.noise_floor", self.noise_floor)?;
        non_negative("throw.impact_threshold", self.impact_threshold)?;
        if self.sample_capacity == 0 {
            return Err(ConfigError::ZeroSampleCapacity);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub floor_y: f32,
    pub max_spawn_distance: f32,
    /// Seconds between checks; zero checks every tick.
    pub check_interval: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            floor_y: -10.0,
            max_spawn_distance: 100.0,
            check_interval: 0.0,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("safety.floor_y", self.floor_y)?;
        non_negative("safety.max_spawn_distance", self.max_spawn_distance)?;
        non_negative("safety.check_interval", self.check_interval)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub cooldown: f32,
    pub trigger_once: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cooldown: 1.0,
            trigger_once: false,
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("trigger.cooldown", self.cooldown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractableConfig {
    pub exclusivity_group: ExclusivityGroup,
    pub grab: Option<GrabConfig>,
    pub throwable: Option<ThrowConfig>,
    pub safety: Option<SafetyConfig>,
    pub trigger: Option<TriggerConfig>,
}

impl InteractableConfig {
    pub fn grabbable() -> Self {
        Self {
            grab: Some(GrabConfig::default()),
            ..Self::default()
        }
    }

    pub fn throwable() -> Self {
        Self {
            grab: Some(GrabConfig::default()),
            throwable: Some(ThrowConfig::default()),
            ..Self::default()
        }
    }

    pub fn with_safety(mut self, safety: SafetyConfig) -> Self {
        self.safety = Some(safety);
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_group(mut self, group: ExclusivityGroup) -> Self {
        self.exclusivity_group = group;
        self
    }

    /// A throw capability cannot operate without a grab capability.
    pub fn missing_collaborator(&self) -> Option<&'static str> {
        if self.throwable.is_some() && self.grab.is_none() {
            return Some("throwable requires grab");
        }
        None
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(grab) = &self.grab {
            grab.validate()?;
        }
        if let Some(throwable) = &self.throwable {
            throwable.validate()?;
        }
        if let Some(safety) = &self.safety {
            safety.validate()?;
        }
        if let Some(trigger) = &self.trigger {
            trigger.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("min_grab_distance {min} exceeds max_grab_distance {max}")]
    InvertedGrabRange { min: f32, max: f32 },
    #[error("throw.sample_capacity must be at least 1")]
    ZeroSampleCapacity,
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn finite_vec(field: &'static str, value: Vec3) -> Result<(), ConfigError> {
    finite(field, value.x)?;
    finite(field, value.y)?;
    finite(field, value.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(InteractableConfig::throwable().validate(), Ok(()));
        assert_eq!(
            InteractableConfig::grabbable()
                .with_safety(SafetyConfig::default())
                .with_trigger(TriggerConfig::default())
                .validate(),
            Ok(())
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let grab = GrabConfig {
            min_grab_distance: 4.0,
            max_grab_distance: 2.0,
            ..GrabConfig::default()
        };
        assert!(matches!(
            grab.validate(),
            Err(ConfigError::InvertedGrabRange { .. })
        ));
    }

    #[test]
    fn touch_only_ignores_min_distance_ordering() {
        let grab = GrabConfig {
            min_grab_distance: 1.0,
            max_grab_distance: 0.0,
            ..GrabConfig::default()
        };
        assert!(grab.is_touch_only());
        assert!(!grab.is_distance_grab());
        assert_eq!(grab.validate(), Ok(()));
    }

    #[test]
    fn negative_and_non_finite_values_name_the_field() {
        let throwable = ThrowConfig {
            max_throw_velocity: -1.0,
            ..ThrowConfig::default()
        };
        assert_eq!(
            throwable.validate(),
            Err(ConfigError::Negative {
                field: "throw.max_throw_velocity",
                value: -1.0
            })
        );

        let safety = SafetyConfig {
            floor_y: f32::NAN,
            ..SafetyConfig::default()
        };
        assert!(matches!(
            safety.validate(),
            Err(ConfigError::NonFinite {
                field: "safety.floor_y",
                ..
            })
        ));
    }

    #[test]
    fn zero_sample_capacity_is_rejected() {
        let throwable = ThrowConfig {
            sample_capacity: 0,
            ..ThrowConfig::default()
        };
        assert_eq!(throwable.validate(), Err(ConfigError::ZeroSampleCapacity));
    }

    #[test]
    fn throw_without_grab_reports_missing_collaborator() {
        let config = InteractableConfig {
            throwable: Some(ThrowConfig::default()),
            ..InteractableConfig::default()
        };
        assert_eq!(config.missing_collaborator(), Some("throwable requires grab"));
        assert_eq!(InteractableConfig::throwable().missing_collaborator(), None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: InteractableConfig = serde_json::from_str(
            r#"{ "grab": { "max_grab_distance": 2.0 }, "throwable": { "model": "CameraDirection" } }"#,
        )
        .expect("parse");
        let grab = config.grab.expect("grab");
        assert_eq!(grab.max_grab_distance, 2.0);
        assert_eq!(grab.hand_anchor_name, "RightHand");
        let throwable = config.throwable.expect("throwable");
        assert_eq!(throwable.model, ThrowModel::CameraDirection);
        assert_eq!(throwable.sample_capacity, 5);
    }
}
