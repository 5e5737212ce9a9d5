use crate::config::TriggerConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriggerZone {
    cooldown_remaining: f32,
    fired_once: bool,
    occupied: bool,
}

impl TriggerZone {
    /// True when the enter should fire a trigger notification.
    pub fn enter(&mut self, config: &TriggerConfig) -> bool {
        self.occupied = true;
        if self.cooldown_remaining > 0.0 {
            return false;
        }
        if config.trigger_once && self.fired_once {
            return false;
        }
        self.fired_once = true;
        self.cooldown_remaining = config.cooldown;
        true
    }

    /// True if something was inside the zone.
    pub fn exit(&mut self) -> bool {
        std::mem::replace(&mut self.occupied, false)
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt_seconds).max(0.0);
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }
}
