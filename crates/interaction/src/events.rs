use crate::scene::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionEventKind {
    Grabbed,
    Released,
    EnterGrabRange,
    ExitGrabRange,
    AimEnter,
    AimExit,
    Thrown,
    Impact,
    SafetyRecovery,
    Triggered,
    TriggerExited,
}

impl InteractionEventKind {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Grabbed => "grabbed",
            Self::Released => "released",
            Self::EnterGrabRange => "enter_grab_range",
            Self::ExitGrabRange => "exit_grab_range",
            Self::AimEnter => "aim_enter",
            Self::AimExit => "aim_exit",
            Self::Thrown => "thrown",
            Self::Impact => "impact",
            Self::SafetyRecovery => "safety_recovery",
            Self::Triggered => "triggered",
            Self::TriggerExited => "trigger_exited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionEvent {
    pub object: ObjectId,
    pub kind: InteractionEventKind,
}

pub trait InteractionListener {
    fn on_event(&mut self, event: &InteractionEvent);
}

impl<F> InteractionListener for F
where
    F: FnMut(&InteractionEvent),
{
    fn on_event(&mut self, event: &InteractionEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionEventCounts {
    pub total: u32,
    pub grabbed: u32,
    pub released: u32,
    pub range: u32,
    pub aim: u32,
    pub thrown: u32,
    pub impact: u32,
    pub safety_recovery: u32,
    pub trigger: u32,
}

impl InteractionEventCounts {
    fn record(&mut self, kind: InteractionEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            InteractionEventKind::Grabbed => &mut self.grabbed,
            InteractionEventKind::Released => &mut self.released,
            InteractionEventKind::EnterGrabRange | InteractionEventKind::ExitGrabRange => {
                &mut self.range
            }
            InteractionEventKind::AimEnter | InteractionEventKind::AimExit => &mut self.aim,
            InteractionEventKind::Thrown => &mut self.thrown,
            InteractionEventKind::Impact => &mut self.impact,
            InteractionEventKind::SafetyRecovery => &mut self.safety_recovery,
            InteractionEventKind::Triggered | InteractionEventKind::TriggerExited => {
                &mut self.trigger
            }
        };
        *slot = slot.saturating_add(1);
    }
}

/// Ordered event log plus the observer list notified on every emit.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn InteractionListener>>,
    pending: Vec<InteractionEvent>,
    current_tick_counts: InteractionEventCounts,
    last_tick_counts: InteractionEventCounts,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .field("last_tick_counts", &self.last_tick_counts)
            .finish()
    }
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl InteractionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, object: ObjectId, kind: InteractionEventKind) {
        let event = InteractionEvent { object, kind };
        self.current_tick_counts.record(kind);
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[InteractionEvent] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        self.last_tick_counts = std::mem::take(&mut self.current_tick_counts);
    }

    pub fn last_tick_counts(&self) -> InteractionEventCounts {
        self.last_tick_counts
    }
}
