use std::collections::VecDeque;

use crate::config::{ThrowConfig, ThrowModel};
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    velocity: Vec3,
    /// Distance covered during the tick the sample was taken over.
    tick_displacement: f32,
}

/// Fixed-capacity history of per-tick velocities sampled while held.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityTracker {
    capacity: usize,
    samples: VecDeque<Sample>,
    last_position: Option<Vec3>,
}

impl VelocityTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            last_position: None,
        }
    }

    /// Pushes the velocity observed over one tick of `dt_seconds`.
    pub fn push_sample(&mut self, velocity: Vec3, dt_seconds: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            velocity,
            tick_displacement: velocity.length() * dt_seconds,
        });
    }

    /// Records the displacement since the previous position as a velocity.
    pub fn record_position(&mut self, position: Vec3, dt_seconds: f32) {
        if let Some(last) = self.last_position {
            if dt_seconds > 0.0 {
                self.push_sample((position - last) * (1.0 / dt_seconds), dt_seconds);
            }
        }
        self.last_position = Some(position);
    }

    pub fn samples(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.samples.iter().map(|sample| sample.velocity)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_position = None;
    }

    /// Mean of the samples that moved more than `noise_floor` units in their
    /// tick, scaled, boosted, and clamped.
    pub fn estimate(&self, config: &ThrowConfig) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0u32;
        for sample in self
            .samples
            .iter()
            .filter(|sample| sample.tick_displacement > config.noise_floor)
        {
            sum += sample.velocity;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let average = sum * (1.0 / count as f32);
        let velocity = average * config.velocity_multiplier + Vec3::UP * config.upward_boost;
        Some(velocity.clamp_length(config.max_throw_velocity))
    }
}

pub fn camera_direction_velocity(forward: Vec3, config: &ThrowConfig) -> Option<Vec3> {
    if config.throw_force <= 0.0 {
        return None;
    }
    let forward = forward.try_normalize()?;
    let direction = (forward + Vec3::UP * (config.upward_boost / config.throw_force)).try_normalize()?;
    Some((direction * config.throw_force).clamp_length(config.max_throw_velocity))
}

pub fn manual_velocity(direction: Vec3, force: f32) -> Option<Vec3> {
    if !force.is_finite() {
        return None;
    }
    Some(direction.try_normalize()? * force)
}

/// Per-grab transient data. Dropped at release.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabSession {
    pub tracker: VelocityTracker,
    pub camera_forward: Vec3,
}

impl GrabSession {
    pub fn new(sample_capacity: usize, camera_forward: Vec3) -> Self {
        Self {
            tracker: VelocityTracker::new(sample_capacity),
            camera_forward,
        }
    }

    pub fn release_velocity(&self, config: &ThrowConfig) -> Option<Vec3> {
        match config.model {
            ThrowModel::Sampled => self.tracker.estimate(config),
            ThrowModel::CameraDirection => camera_direction_velocity(self.camera_forward, config),
        }
    }
}

/// Tracks the airborne phase between a throw and its first hard impact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrowState {
    thrown: bool,
}

impl ThrowState {
    pub fn is_thrown(&self) -> bool {
        self.thrown
    }

    pub fn mark_thrown(&mut self) {
        self.thrown = true;
    }

    pub fn clear(&mut self) {
        self.thrown = false;
    }

    /// True exactly once per throw, on the first collision above threshold.
    pub fn register_collision(&mut self, relative_speed: f32, threshold: f32) -> bool {
        if !self.thrown || relative_speed <= threshold {
            return false;
        }
        self.thrown = false;
        true
    }
}
