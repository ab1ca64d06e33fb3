//! Per-step elevator activity records
//!
//! Elevators describe what they did during a step as [`ElevatorActivity`]
//! values. The dispatcher stamps them with its clock and forwards them to an
//! [`ActivitySink`]. Nothing in the core reads them back.

use std::collections::BTreeMap;

use super::types::{ElevatorId, Floor, MotionState, Step, Steps};

/// One kind of thing an elevator did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorActivity {
    PickupAdded { floor: Floor },
    PickupsCleared,
    Moved { from: Floor, to: Floor },
    DoorOpened { floor: Floor },
    DoorClosed { floor: Floor, steps_waited: Steps },
    Broken,
}

/// An activity stamped with where and when it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityRecord {
    pub step: Step,
    pub elevator: ElevatorId,
    /// Motion state of the elevator right after the activity
    pub state: MotionState,
    pub activity: ElevatorActivity,
}

/// Destination for activity records
pub trait ActivitySink {
    fn record(&mut self, record: ActivityRecord);
}

/// Sink that drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardActivity;

impl ActivitySink for DiscardActivity {
    fn record(&mut self, _record: ActivityRecord) {}
}

/// In-memory activity history, grouped by elevator and step
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: BTreeMap<ElevatorId, BTreeMap<Step, Vec<ActivityRecord>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one elevator at one step, in the order they happened
    pub fn at(&self, elevator: ElevatorId, step: Step) -> &[ActivityRecord] {
        self.entries
            .get(&elevator)
            .and_then(|steps| steps.get(&step))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every record of one elevator, ordered by step
    pub fn for_elevator(&self, elevator: ElevatorId) -> impl Iterator<Item = &ActivityRecord> {
        self.entries
            .get(&elevator)
            .into_iter()
            .flat_map(|steps| steps.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|steps| steps.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivitySink for ActivityLog {
    fn record(&mut self, record: ActivityRecord) {
        self.entries
            .entry(record.elevator)
            .or_default()
            .entry(record.step)
            .or_default()
            .push(record);
    }
}
