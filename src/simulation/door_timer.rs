//! Door timers
//!
//! A door timer is created when an elevator opens its door and forces the
//! door closed once the boarding/alighting dwell has elapsed.

use super::types::{ElevatorId, Steps};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTimer {
    pub elevator: ElevatorId,
    pub remaining: Steps,
}

impl DoorTimer {
    pub fn new(elevator: ElevatorId, steps: Steps) -> Self {
        Self {
            elevator,
            remaining: steps,
        }
    }

    /// Count down one step
    ///
    /// Returns true once the countdown reaches zero. The caller then closes
    /// the door of the bound elevator and drops the timer.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}
