//! Elevator state machine for the simulation
//!
//! An elevator owns its motion state, its door, the floors it has promised to
//! deliver passengers to and the pickups the dispatcher assigned to it for the
//! current step. The cost estimator lives in `estimate.rs` and works on the
//! same state.

use std::collections::BTreeSet;

use log::{debug, error, trace, warn};
use sorted_vec::SortedVec;

use super::activity::ElevatorActivity;
use super::error::DispatchError;
use super::request::AssignedPickup;
use super::types::{Direction, ElevatorId, Floor, MotionState, Steps};

/// A single elevator car
#[derive(Debug, Clone)]
pub struct Elevator {
    pub(super) id: ElevatorId,
    pub(super) boarding_step_estimate: Steps,
    pub(super) alighting_step_estimate: Steps,
    /// Highest floor of the building
    pub(super) number_of_floors: Floor,
    pub(super) current_floor: Floor,
    pub(super) door_closed: bool,
    pub(super) steps_since_door_opened: Steps,
    pub(super) state: MotionState,
    pub(super) deliveries: BTreeSet<Floor>,
    /// Assigned pickups in assignment order
    pub(super) pickups: Vec<AssignedPickup>,
    pub(super) up_pickup_floors: SortedVec<Floor>,
    pub(super) down_pickup_floors: SortedVec<Floor>,
    /// Activities since the last drain, tagged with the state after each one
    activities: Vec<(MotionState, ElevatorActivity)>,
}

impl Elevator {
    pub fn new(
        id: ElevatorId,
        current_floor: Floor,
        boarding_step_estimate: Steps,
        alighting_step_estimate: Steps,
        number_of_floors: Floor,
    ) -> Self {
        Self {
            id,
            boarding_step_estimate,
            alighting_step_estimate,
            number_of_floors,
            current_floor,
            door_closed: true,
            steps_since_door_opened: 0,
            state: MotionState::Idle,
            deliveries: BTreeSet::new(),
            pickups: Vec::new(),
            up_pickup_floors: SortedVec::new(),
            down_pickup_floors: SortedVec::new(),
            activities: Vec::new(),
        }
    }

    pub fn id(&self) -> ElevatorId {
        self.id
    }

    pub fn current_floor(&self) -> Floor {
        self.current_floor
    }

    pub fn is_door_closed(&self) -> bool {
        self.door_closed
    }

    pub fn steps_since_door_opened(&self) -> Steps {
        self.steps_since_door_opened
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn deliveries(&self) -> &BTreeSet<Floor> {
        &self.deliveries
    }

    pub fn pickups(&self) -> &[AssignedPickup] {
        &self.pickups
    }

    /// Pickups boarded so far, i.e. marked done
    pub fn boarded(&self) -> impl Iterator<Item = &AssignedPickup> {
        self.pickups.iter().filter(|pickup| pickup.done)
    }

    /// True when the door has stayed open past the critical number of steps
    pub fn is_broken(&self, critical_door_open_steps: Steps) -> bool {
        self.steps_since_door_opened > critical_door_open_steps
    }

    /// True when the door opened during the step that just ran
    pub fn opened_door_this_step(&self) -> bool {
        !self.door_closed && self.steps_since_door_opened == 0
    }

    pub fn assign_pickup(&mut self, pickup: AssignedPickup) {
        match pickup.direction {
            Direction::Up => self.up_pickup_floors.insert(pickup.floor),
            Direction::Down => self.down_pickup_floors.insert(pickup.floor),
        };
        self.pickups.push(pickup);
        self.log_activity(ElevatorActivity::PickupAdded {
            floor: pickup.floor,
        });
    }

    pub fn clear_pickups(&mut self) {
        if self.pickups.is_empty() {
            return;
        }
        self.pickups.clear();
        self.up_pickup_floors.clear();
        self.down_pickup_floors.clear();
        self.log_activity(ElevatorActivity::PickupsCleared);
    }

    pub fn add_deliveries(&mut self, floors: impl IntoIterator<Item = Floor>) {
        self.deliveries.extend(floors);
    }

    /// Returns true if `floor` was a pending delivery
    pub fn remove_delivery(&mut self, floor: Floor) -> bool {
        self.deliveries.remove(&floor)
    }

    /// Drop every commitment after a breakdown
    ///
    /// Returns true if any delivery or pickup was discarded.
    pub fn notify_broken(&mut self) -> bool {
        let dropped_work = !self.deliveries.is_empty() || !self.pickups.is_empty();
        self.deliveries.clear();
        self.pickups.clear();
        self.up_pickup_floors.clear();
        self.down_pickup_floors.clear();
        self.state = MotionState::Idle;
        self.log_activity(ElevatorActivity::Broken);
        dropped_work
    }

    pub fn close_door(&mut self) {
        if self.door_closed {
            warn!(
                "{}",
                DispatchError::RedundantDoorOperation {
                    elevator: self.id,
                    open: false,
                }
            );
        }
        self.door_closed = true;
        let steps_waited = self.steps_since_door_opened;
        self.steps_since_door_opened = 0;
        self.log_activity(ElevatorActivity::DoorClosed {
            floor: self.current_floor,
            steps_waited,
        });
    }

    /// Advance one simulation step
    ///
    /// With the door closed the elevator first checks whether it should stop
    /// where it stands, otherwise it moves one floor and checks the new floor.
    /// With the door open it only counts the step.
    pub fn step(&mut self) {
        self.update_state();
        if self.door_closed {
            if self.state == MotionState::Idle {
                self.adopt_direction_of_pickup_here();
            }
            if !self.handle_floor() {
                self.move_one_floor();
                self.handle_floor();
            }
        } else {
            self.steps_since_door_opened = self.steps_since_door_opened.saturating_add(1);
        }
        self.update_state();
    }

    /// Hand over the activities recorded since the previous call
    pub fn take_activities(&mut self) -> Vec<(MotionState, ElevatorActivity)> {
        std::mem::take(&mut self.activities)
    }

    fn log_activity(&mut self, activity: ElevatorActivity) {
        trace!("Elevator {} [{}]: {:?}", self.id.0, self.state, activity);
        self.activities.push((self.state, activity));
    }

    fn open_door(&mut self) {
        if !self.door_closed {
            warn!(
                "{}",
                DispatchError::RedundantDoorOperation {
                    elevator: self.id,
                    open: true,
                }
            );
        }
        self.door_closed = false;
        self.log_activity(ElevatorActivity::DoorOpened {
            floor: self.current_floor,
        });
    }

    fn move_one_floor(&mut self) {
        let from = self.current_floor;
        let to = match self.state {
            MotionState::Up if from < self.number_of_floors => from + 1,
            MotionState::Down if from > 0 => from - 1,
            MotionState::Idle => return,
            state => {
                error!(
                    "{}",
                    DispatchError::MotionBoundaryViolation {
                        elevator: self.id,
                        floor: from,
                        state,
                    }
                );
                return;
            }
        };
        self.current_floor = to;
        self.log_activity(ElevatorActivity::Moved { from, to });
    }

    /// An idle elevator holding a pickup at its own floor turns toward it
    fn adopt_direction_of_pickup_here(&mut self) {
        let floor = self.current_floor;
        if let Some(pickup) = self
            .pickups
            .iter()
            .find(|pickup| !pickup.done && pickup.floor == floor)
        {
            debug!(
                "Elevator {} boards at its own floor {} going {}",
                self.id.0, floor, pickup.direction
            );
            self.state = pickup.direction.into();
        }
    }

    /// Open the door if the current floor needs a stop
    ///
    /// Boards every same-direction pickup here. Opposite-direction pickups
    /// here are boarded only when nothing is left further ahead.
    fn handle_floor(&mut self) -> bool {
        let Some(direction) = self.state.direction() else {
            return false;
        };
        let floor = self.current_floor;
        let is_delivery_floor = self.deliveries.contains(&floor);
        let nothing_ahead = !self.has_work_beyond(floor, direction);

        let mut same_direction_here = false;
        let mut opposite_direction_here = false;
        for pickup in self
            .pickups
            .iter()
            .filter(|pickup| !pickup.done && pickup.floor == floor)
        {
            if pickup.direction == direction {
                same_direction_here = true;
            } else {
                opposite_direction_here = true;
            }
        }
        let courtesy_stop = nothing_ahead && opposite_direction_here;

        if !(is_delivery_floor || same_direction_here || courtesy_stop) {
            return false;
        }

        self.open_door();
        for pickup in self
            .pickups
            .iter_mut()
            .filter(|pickup| !pickup.done && pickup.floor == floor)
        {
            if pickup.direction == direction || courtesy_stop {
                pickup.done = true;
            }
        }
        true
    }

    /// Re-derive the motion state from the remaining work
    fn update_state(&mut self) {
        if self.deliveries.is_empty() && self.pickups.is_empty() {
            self.state = MotionState::Idle;
            return;
        }

        let floor = self.current_floor;
        let higher_delivery = self.has_delivery_beyond(floor, Direction::Up);
        let lower_delivery = self.has_delivery_beyond(floor, Direction::Down);
        let higher_pickup = self.has_pickup_beyond(floor, Direction::Up);
        let lower_pickup = self.has_pickup_beyond(floor, Direction::Down);

        self.state = match self.state {
            MotionState::Up if higher_delivery || higher_pickup => MotionState::Up,
            MotionState::Up if lower_delivery || lower_pickup => MotionState::Down,
            MotionState::Down if lower_delivery || lower_pickup => MotionState::Down,
            MotionState::Down if higher_delivery || higher_pickup => MotionState::Up,
            MotionState::Idle if higher_delivery => MotionState::Up,
            MotionState::Idle if lower_delivery => MotionState::Down,
            MotionState::Idle if higher_pickup => MotionState::Up,
            MotionState::Idle if lower_pickup => MotionState::Down,
            unchanged => unchanged,
        };
    }

    fn has_work_beyond(&self, floor: Floor, direction: Direction) -> bool {
        self.has_delivery_beyond(floor, direction) || self.has_pickup_beyond(floor, direction)
    }

    fn has_delivery_beyond(&self, floor: Floor, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.deliveries.last().is_some_and(|&f| f > floor),
            Direction::Down => self.deliveries.first().is_some_and(|&f| f < floor),
        }
    }

    /// Any assigned pickup, whatever its direction, strictly beyond `floor`
    fn has_pickup_beyond(&self, floor: Floor, direction: Direction) -> bool {
        let by_direction = [&self.up_pickup_floors, &self.down_pickup_floors];
        match direction {
            Direction::Up => by_direction
                .iter()
                .any(|floors| floors.last().is_some_and(|&f| f > floor)),
            Direction::Down => by_direction
                .iter()
                .any(|floors| floors.first().is_some_and(|&f| f < floor)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::RequestId;

    fn pickup(id: u64, floor: Floor, direction: Direction, boarding_steps: Steps) -> AssignedPickup {
        AssignedPickup {
            id: RequestId(id),
            floor,
            direction,
            boarding_steps,
            done: false,
        }
    }

    #[test]
    fn test_idle_elevator_stays_put() {
        let mut elevator = Elevator::new(ElevatorId(0), 3, 3, 2, 10);
        elevator.step();
        assert_eq!(elevator.current_floor(), 3);
        assert_eq!(elevator.state(), MotionState::Idle);
        assert!(elevator.take_activities().is_empty());
    }

    #[test]
    fn test_moves_toward_pickup_and_opens_door() {
        let mut elevator = Elevator::new(ElevatorId(0), 0, 3, 2, 10);
        elevator.assign_pickup(pickup(0, 2, Direction::Up, 1));

        elevator.step();
        assert_eq!(elevator.current_floor(), 1);
        assert_eq!(elevator.state(), MotionState::Up);
        assert!(elevator.is_door_closed());

        elevator.step();
        assert_eq!(elevator.current_floor(), 2);
        assert!(!elevator.is_door_closed());
        assert!(elevator.opened_door_this_step());
        assert_eq!(elevator.boarded().count(), 1);
    }

    #[test]
    fn test_open_door_blocks_motion_and_counts_steps() {
        let mut elevator = Elevator::new(ElevatorId(0), 5, 3, 2, 10);
        elevator.add_deliveries([5, 8]);
        elevator.state = MotionState::Up;
        elevator.door_closed = false;

        elevator.step();
        elevator.step();
        assert_eq!(elevator.current_floor(), 5);
        assert_eq!(elevator.steps_since_door_opened(), 2);

        elevator.close_door();
        assert_eq!(elevator.steps_since_door_opened(), 0);
        let activities = elevator.take_activities();
        assert_eq!(
            activities.last().map(|(_, activity)| *activity),
            Some(ElevatorActivity::DoorClosed {
                floor: 5,
                steps_waited: 2
            })
        );
    }

    #[test]
    fn test_skips_opposite_pickup_while_work_remains_ahead() {
        let mut elevator = Elevator::new(ElevatorId(0), 2, 3, 2, 10);
        elevator.add_deliveries([6]);
        elevator.assign_pickup(pickup(0, 3, Direction::Down, 1));

        elevator.step();
        assert_eq!(elevator.current_floor(), 3);
        assert!(elevator.is_door_closed());
        assert_eq!(elevator.boarded().count(), 0);
    }

    #[test]
    fn test_courtesy_stop_for_opposite_pickup_at_end_of_run() {
        let mut elevator = Elevator::new(ElevatorId(0), 6, 3, 2, 10);
        elevator.state = MotionState::Up;
        elevator.assign_pickup(pickup(0, 7, Direction::Down, 4));

        elevator.step();
        assert_eq!(elevator.current_floor(), 7);
        assert!(!elevator.is_door_closed());
        assert_eq!(elevator.boarded().count(), 1);
    }

    #[test]
    fn test_idle_elevator_boards_pickup_at_its_own_floor() {
        let mut elevator = Elevator::new(ElevatorId(0), 4, 3, 2, 10);
        elevator.assign_pickup(pickup(0, 4, Direction::Down, 2));

        elevator.step();
        assert_eq!(elevator.current_floor(), 4);
        assert!(!elevator.is_door_closed());
        assert_eq!(elevator.state(), MotionState::Down);
        assert_eq!(elevator.boarded().count(), 1);
    }

    #[test]
    fn test_never_moves_past_top_floor() {
        let mut elevator = Elevator::new(ElevatorId(0), 10, 3, 2, 10);
        elevator.state = MotionState::Up;
        elevator.assign_pickup(pickup(0, 10, Direction::Down, 1));

        elevator.step();
        assert_eq!(elevator.current_floor(), 10);
        assert!(!elevator.is_door_closed());
    }

    #[test]
    fn test_motion_is_clamped_at_building_edges() {
        let mut elevator = Elevator::new(ElevatorId(0), 10, 3, 2, 10);
        elevator.add_deliveries([4]);
        elevator.state = MotionState::Up;
        elevator.move_one_floor();
        assert_eq!(elevator.current_floor(), 10);

        let mut elevator = Elevator::new(ElevatorId(1), 0, 3, 2, 10);
        elevator.add_deliveries([6]);
        elevator.state = MotionState::Down;
        elevator.move_one_floor();
        assert_eq!(elevator.current_floor(), 0);

        assert!(!elevator
            .take_activities()
            .iter()
            .any(|(_, activity)| matches!(activity, ElevatorActivity::Moved { .. })));
    }

    #[test]
    fn test_reverses_when_nothing_left_above() {
        let mut elevator = Elevator::new(ElevatorId(0), 5, 3, 2, 10);
        elevator.state = MotionState::Up;
        elevator.add_deliveries([1]);

        elevator.step();
        assert_eq!(elevator.state(), MotionState::Down);
        assert_eq!(elevator.current_floor(), 4);
    }

    #[test]
    fn test_breakdown_discards_backlog() {
        let mut elevator = Elevator::new(ElevatorId(0), 5, 3, 2, 10);
        elevator.add_deliveries([8]);
        elevator.assign_pickup(pickup(0, 2, Direction::Up, 1));
        elevator.door_closed = false;
        elevator.steps_since_door_opened = 10;

        assert!(elevator.is_broken(9));
        assert!(elevator.notify_broken());
        assert!(elevator.deliveries().is_empty());
        assert!(elevator.pickups().is_empty());
        assert_eq!(elevator.state(), MotionState::Idle);
        assert!(!elevator.notify_broken());
    }
}
