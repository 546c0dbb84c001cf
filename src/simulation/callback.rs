use chrono::NaiveDateTime;

use crate::model::records::DispatchComparison;

use super::event::FleetEvent;

/// Observer of fleet activity. Hooks run inside the fleet's critical section,
/// so they must not call back into the fleet.
pub trait FleetCallback: Send {
    fn visit_event(&mut self, _event: &FleetEvent, _time: NaiveDateTime) {}
    fn visit_dispatch(&mut self, _comparison: &DispatchComparison) {}
}
