//! Notifications emitted by kernel components.
//!
//! Components receive an [`EventSink`] at construction and push
//! [`KernelEvent`]s into it directly; nothing is routed through global state.

use crate::agent::AgentId;
use crate::geometry::{Bounds, Cell};
use crate::hazard::HazardGeometry;
use std::sync::mpsc::Sender;

/// Something a collaborator may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum KernelEvent {
    /// A hazard was placed and entered its warning countdown
    HazardWarning(HazardGeometry),
    /// The hazard became active for `duration` ticks
    HazardActivated { geometry: HazardGeometry, duration: u32 },
    /// The hazard deactivated; listed agents earned a free shield
    HazardDeactivated { shielded: Vec<AgentId> },
    /// Cooldown finished, geometry discarded
    HazardCooldownEnded,
    /// A shrink event started toward `target`
    SafeZoneShrinkStarted { start_tick: u64, target: Bounds },
    /// The safe-zone rectangle actually changed
    SafeZoneBoundsChanged { previous: Bounds, current: Bounds },
    /// An agent received a fatal event and started dying
    AgentDied { agent: AgentId, position: Cell },
}

/// Receiver of kernel notifications
pub trait EventSink {
    fn emit(&self, event: KernelEvent);
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: KernelEvent) {}
}

impl EventSink for Sender<KernelEvent> {
    fn emit(&self, event: KernelEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.send(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&self, event: KernelEvent) {
        (**self).emit(event)
    }
}
