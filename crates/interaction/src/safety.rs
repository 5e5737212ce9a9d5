use crate::config::SafetyConfig;
use crate::math::{Pose, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyViolation {
    BelowFloor,
    TooFarFromSpawn,
}

impl SafetyViolation {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::BelowFloor => "below_floor",
            Self::TooFarFromSpawn => "too_far_from_spawn",
        }
    }
}

pub fn check(config: &SafetyConfig, position: Vec3, spawn: &Pose) -> Option<SafetyViolation> {
    if position.y < config.floor_y {
        return Some(SafetyViolation::BelowFloor);
    }
    if position.distance(spawn.position) > config.max_spawn_distance {
        return Some(SafetyViolation::TooFarFromSpawn);
    }
    None
}

/// Throttles checks to `check_interval` seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SafetyMonitor {
    elapsed_since_check: f32,
}

impl SafetyMonitor {
    /// Advances the throttle; true when a check is due this tick.
    pub fn advance(&mut self, config: &SafetyConfig, dt_seconds: f32) -> bool {
        if config.check_interval <= 0.0 {
            return true;
        }
        self.elapsed_since_check += dt_seconds;
        if self.elapsed_since_check < config.check_interval {
            return false;
        }
        self.elapsed_since_check = 0.0;
        true
    }
}
