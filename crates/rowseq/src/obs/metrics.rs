use crate::obs::sink::{MetricsEvent, OpKind};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// EventState
///
/// Ephemeral, in-memory counters for collection operations. Reset with
/// `metrics_reset_all`; never persisted.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,

    // Rows touched
    pub rows_read: u64,
    pub rows_deleted: u64,
    pub rows_renumbered: u64,
}

impl EventState {
    pub(crate) fn apply(&mut self, event: MetricsEvent) {
        match event {
            MetricsEvent::Op { kind } => {
                let slot = match kind {
                    OpKind::Length => &mut self.ops.length_calls,
                    OpKind::Get => &mut self.ops.get_calls,
                    OpKind::Slice => &mut self.ops.slice_calls,
                    OpKind::Projection => &mut self.ops.projection_calls,
                    OpKind::Set => &mut self.ops.set_calls,
                    OpKind::Append => &mut self.ops.append_calls,
                    OpKind::Delete => &mut self.ops.delete_calls,
                    OpKind::Remove => &mut self.ops.remove_calls,
                    OpKind::Position => &mut self.ops.position_calls,
                };
                *slot = slot.saturating_add(1);
            }
            MetricsEvent::RowsRead { count } => {
                self.rows_read = self.rows_read.saturating_add(count);
            }
            MetricsEvent::RowsDeleted { count } => {
                self.rows_deleted = self.rows_deleted.saturating_add(count);
            }
            MetricsEvent::RowsRenumbered { count } => {
                self.rows_renumbered = self.rows_renumbered.saturating_add(count);
            }
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    pub length_calls: u64,
    pub get_calls: u64,
    pub slice_calls: u64,
    pub projection_calls: u64,
    pub set_calls: u64,
    pub append_calls: u64,
    pub delete_calls: u64,
    pub remove_calls: u64,
    pub position_calls: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Point-in-time snapshot of the counters.
#[must_use]
pub fn metrics_report() -> EventState {
    EVENT_STATE.with(|state| state.borrow().clone())
}

pub fn metrics_reset_all() {
    EVENT_STATE.with(|state| *state.borrow_mut() = EventState::default());
}
