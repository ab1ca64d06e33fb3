//! Read-only elevator snapshots

use std::fmt;

use super::elevator::Elevator;
use super::types::{Direction, ElevatorId, Floor, MotionState, RequestId, Steps};

/// A pickup as seen from outside the elevator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupStatus {
    pub id: RequestId,
    pub floor: Floor,
    pub direction: Direction,
    pub boarded: bool,
}

/// Snapshot of one elevator between two steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorStatus {
    pub id: ElevatorId,
    pub floor: Floor,
    pub door_closed: bool,
    pub steps_since_door_opened: Steps,
    pub motion: MotionState,
    pub deliveries: Vec<Floor>,
    pub pickups: Vec<PickupStatus>,
}

impl From<&Elevator> for ElevatorStatus {
    fn from(elevator: &Elevator) -> Self {
        Self {
            id: elevator.id(),
            floor: elevator.current_floor(),
            door_closed: elevator.is_door_closed(),
            steps_since_door_opened: elevator.steps_since_door_opened(),
            motion: elevator.state(),
            deliveries: elevator.deliveries().iter().copied().collect(),
            pickups: elevator
                .pickups()
                .iter()
                .map(|pickup| PickupStatus {
                    id: pickup.id,
                    floor: pickup.floor,
                    direction: pickup.direction,
                    boarded: pickup.done,
                })
                .collect(),
        }
    }
}

impl fmt::Display for ElevatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Elevator {}: floor={}, state={}, door={}",
            self.id.0,
            self.floor,
            self.motion,
            if self.door_closed {
                "closed".to_string()
            } else {
                format!("open ({} steps)", self.steps_since_door_opened)
            }
        )?;
        write!(f, ", deliveries={:?}", self.deliveries)?;
        let pickups: Vec<String> = self
            .pickups
            .iter()
            .map(|pickup| {
                let arrow = match pickup.direction {
                    Direction::Up => "^",
                    Direction::Down => "v",
                };
                format!("{}{}", pickup.floor, arrow)
            })
            .collect();
        write!(f, ", pickups=[{}]", pickups.join(", "))
    }
}
