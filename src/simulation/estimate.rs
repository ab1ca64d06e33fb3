//! Pickup time estimation
//!
//! Predicts how many steps an elevator needs before it opens its door for a
//! new pickup, given everything it is already committed to. The prediction
//! only has to rank elevators against each other, so it models the remaining
//! path as at most three monotonic runs and charges a fixed dwell for every
//! committed stop on the way.
//!
//! When an already assigned caller travels the same way as a run, that
//! caller's destination is still unknown. The run is then assumed to reach the
//! edge of the building and one extra alighting dwell is charged for it.

use log::error;

use super::elevator::Elevator;
use super::error::DispatchError;
use super::types::{Direction, Floor, Steps};

/// Where a run turns around, and whether that turn was forced by an
/// assigned pickup with an unknown destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Turn {
    floor: Floor,
    pessimistic: bool,
}

/// Inclusive floor interval, `None` when empty
fn span(lo: i64, hi: i64) -> Option<(Floor, Floor)> {
    let lo = lo.max(0);
    if hi < lo {
        return None;
    }
    Some((lo as Floor, hi.min(Floor::MAX as i64) as Floor))
}

fn count_sorted(floors: &[Floor], lo: i64, hi: i64) -> usize {
    match span(lo, hi) {
        Some((lo, hi)) => {
            floors.partition_point(|&f| f <= hi) - floors.partition_point(|&f| f < lo)
        }
        None => 0,
    }
}

impl Elevator {
    /// Estimated steps until this elevator would board a caller at `floor`
    /// travelling in `direction`
    ///
    /// Returns `None` when the state falls outside every modelled case; the
    /// caller treats that as an unbounded cost.
    pub fn estimate_steps_until_pickup(&self, floor: Floor, direction: Direction) -> Option<Steps> {
        let current = self.current_floor;

        let Some(heading) = self.state.direction() else {
            return Some(current.abs_diff(floor));
        };

        let estimate = match (heading, direction) {
            (Direction::Up, Direction::Up) if floor > current => {
                Some(self.same_direction_ahead(floor, Direction::Up))
            }
            (Direction::Down, Direction::Down) if floor < current => {
                Some(self.same_direction_ahead(floor, Direction::Down))
            }
            (Direction::Up, Direction::Down) if floor > current => {
                Some(self.turn_after_request(floor, Direction::Up))
            }
            (Direction::Down, Direction::Up) if floor < current => {
                Some(self.turn_after_request(floor, Direction::Down))
            }
            (Direction::Up, Direction::Up) if floor < current => {
                Some(self.same_direction_behind(floor, Direction::Up))
            }
            (Direction::Down, Direction::Down) if floor > current => {
                Some(self.same_direction_behind(floor, Direction::Down))
            }
            (Direction::Up, Direction::Down) => Some(self.turn_before_request(floor, Direction::Up)),
            (Direction::Down, Direction::Up) => Some(self.turn_before_request(floor, Direction::Down)),
            _ => None,
        };

        if let Some(steps) = estimate {
            return Some(steps.saturating_add(self.door_surcharge()));
        }

        if floor == current {
            // Same floor, same direction.
            return Some(0);
        }

        error!(
            "{}",
            DispatchError::EstimationUnreachable {
                elevator: self.id,
                state: self.state,
                current_floor: current,
                request_floor: floor,
                request_direction: direction,
            }
        );
        None
    }

    /// Steps left before an open door lets the elevator move again
    fn door_surcharge(&self) -> Steps {
        if self.door_closed {
            return 0;
        }
        self.boarding_step_estimate
            .max(self.alighting_step_estimate)
            .saturating_sub(self.steps_since_door_opened)
    }

    fn dwell(&self, deliveries: usize, pickups: usize, forced_turns: usize) -> Steps {
        let stops = |count: usize, estimate: Steps| {
            Steps::try_from(count)
                .unwrap_or(Steps::MAX)
                .saturating_mul(estimate)
        };
        stops(deliveries + forced_turns, self.alighting_step_estimate)
            .saturating_add(stops(pickups, self.boarding_step_estimate))
    }

    /// Elevator and caller share a direction and the caller lies ahead
    fn same_direction_ahead(&self, floor: Floor, heading: Direction) -> Steps {
        let current = self.current_floor;
        let (lo, hi) = match heading {
            Direction::Up => (i64::from(current) + 1, i64::from(floor) - 1),
            Direction::Down => (i64::from(floor) + 1, i64::from(current) - 1),
        };
        let deliveries = self.deliveries_within(lo, hi);
        let pickups = self.pickups_within(heading, lo, hi);
        self.dwell(deliveries, pickups, 0)
            .saturating_add(current.abs_diff(floor))
    }

    /// Caller is ahead but wants the opposite way: finish the current run,
    /// then come back to it
    fn turn_after_request(&self, floor: Floor, heading: Direction) -> Steps {
        let current = self.current_floor;
        let turn = self.far_turn(current, heading, false, floor);
        let c = i64::from(current);
        let (deliveries, pickups) = match heading {
            Direction::Up => (
                self.deliveries_within(c + 1, i64::from(turn.floor)),
                self.pickups_within(Direction::Up, c + 1, i64::MAX)
                    + self.pickups_within(Direction::Down, i64::from(floor) + 1, i64::MAX),
            ),
            Direction::Down => (
                self.deliveries_within(i64::from(turn.floor), c - 1),
                self.pickups_within(Direction::Down, 0, c - 1)
                    + self.pickups_within(Direction::Up, 0, i64::from(floor) - 1),
            ),
        };
        self.dwell(deliveries, pickups, usize::from(turn.pessimistic))
            .saturating_add(current.abs_diff(turn.floor))
            .saturating_add(floor.abs_diff(turn.floor))
    }

    /// Caller is behind but wants the same way: finish the current run, sweep
    /// back past it, then turn once more to pick it up
    fn same_direction_behind(&self, floor: Floor, heading: Direction) -> Steps {
        let current = self.current_floor;
        let first = self.far_turn(current, heading, false, floor);
        let second = self.far_turn(first.floor, heading.opposite(), true, floor);
        let (lo, hi) = match heading {
            Direction::Up => (second.floor, first.floor),
            Direction::Down => (first.floor, second.floor),
        };
        let (lo, hi) = (i64::from(lo), i64::from(hi));
        let c = i64::from(current);
        let r = i64::from(floor);

        let deliveries = self.deliveries_within(lo, hi);
        let pickups = match heading {
            Direction::Up => {
                self.pickups_within(Direction::Up, c + 1, i64::MAX)
                    + self.pickups_within(Direction::Up, 0, r - 1)
                    + self.pickups_within(Direction::Down, lo, hi)
            }
            Direction::Down => {
                self.pickups_within(Direction::Down, 0, c - 1)
                    + self.pickups_within(Direction::Down, r + 1, i64::MAX)
                    + self.pickups_within(Direction::Up, lo, hi)
            }
        };
        let forced_turns = usize::from(first.pessimistic) + usize::from(second.pessimistic);
        self.dwell(deliveries, pickups, forced_turns)
            .saturating_add(current.abs_diff(first.floor))
            .saturating_add(first.floor.abs_diff(second.floor))
            .saturating_add(floor.abs_diff(second.floor))
    }

    /// Caller is level with or behind the elevator and wants the opposite way:
    /// finish the current run, then travel back to it
    fn turn_before_request(&self, floor: Floor, heading: Direction) -> Steps {
        let current = self.current_floor;
        let turn = self.far_turn(current, heading, false, floor);
        let c = i64::from(current);
        let r = i64::from(floor);
        let t = i64::from(turn.floor);
        let (deliveries, pickups) = match heading {
            Direction::Up => (
                self.deliveries_within(r + 1, t),
                self.pickups_within(Direction::Up, c + 1, i64::MAX)
                    + self.pickups_within(Direction::Down, r + 1, i64::MAX),
            ),
            Direction::Down => (
                self.deliveries_within(t, r - 1),
                self.pickups_within(Direction::Down, 0, c - 1)
                    + self.pickups_within(Direction::Up, 0, r - 1),
            ),
        };
        self.dwell(deliveries, pickups, usize::from(turn.pessimistic))
            .saturating_add(current.abs_diff(turn.floor))
            .saturating_add(turn.floor.abs_diff(floor))
    }

    /// Far end of a run leaving `start` in `heading`
    ///
    /// The building edge if an assigned caller going `heading` waits beyond
    /// `start` (at `start` too when `inclusive`); otherwise the furthest known
    /// commitment beyond `start`, or `fallback` when there is none.
    fn far_turn(&self, start: Floor, heading: Direction, inclusive: bool, fallback: Floor) -> Turn {
        let s = i64::from(start);
        let skip = if inclusive { 0 } else { 1 };
        let (edge, pessimistic) = match heading {
            Direction::Up => (
                self.number_of_floors,
                self.pickups_within(Direction::Up, s + skip, i64::MAX) > 0,
            ),
            Direction::Down => (0, self.pickups_within(Direction::Down, 0, s - skip) > 0),
        };
        if pessimistic {
            return Turn {
                floor: edge,
                pessimistic: true,
            };
        }

        let opposite = match heading {
            Direction::Up => &self.down_pickup_floors,
            Direction::Down => &self.up_pickup_floors,
        };
        let furthest = match heading {
            Direction::Up => {
                let delivery = self.deliveries.range(start.saturating_add(1)..).next_back().copied();
                let pickup = opposite.last().copied().filter(|&f| f > start);
                delivery.max(pickup)
            }
            Direction::Down => {
                let delivery = self.deliveries.range(..start).next().copied();
                let pickup = opposite.first().copied().filter(|&f| f < start);
                match (delivery, pickup) {
                    (Some(d), Some(p)) => Some(d.min(p)),
                    (d, p) => d.or(p),
                }
            }
        };
        Turn {
            floor: furthest.unwrap_or(fallback),
            pessimistic: false,
        }
    }

    fn deliveries_within(&self, lo: i64, hi: i64) -> usize {
        match span(lo, hi) {
            Some((lo, hi)) => self.deliveries.range(lo..=hi).count(),
            None => 0,
        }
    }

    fn pickups_within(&self, direction: Direction, lo: i64, hi: i64) -> usize {
        match direction {
            Direction::Up => count_sorted(&self.up_pickup_floors, lo, hi),
            Direction::Down => count_sorted(&self.down_pickup_floors, lo, hi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::request::AssignedPickup;
    use crate::simulation::types::{ElevatorId, MotionState, RequestId};

    /// Ten-floor building, boarding estimate 3, alighting estimate 2
    fn elevator_at(floor: Floor, state: MotionState) -> Elevator {
        let mut elevator = Elevator::new(ElevatorId(0), floor, 3, 2, 10);
        elevator.state = state;
        elevator
    }

    fn assign(elevator: &mut Elevator, floor: Floor, direction: Direction) {
        let id = RequestId(elevator.pickups().len() as u64);
        elevator.assign_pickup(AssignedPickup {
            id,
            floor,
            direction,
            boarding_steps: 1,
            done: false,
        });
    }

    #[test]
    fn test_idle_costs_plain_distance() {
        let elevator = elevator_at(2, MotionState::Idle);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Up), Some(3));
        assert_eq!(elevator.estimate_steps_until_pickup(0, Direction::Down), Some(2));
        assert_eq!(elevator.estimate_steps_until_pickup(2, Direction::Down), Some(0));
    }

    #[test]
    fn test_same_floor_same_direction_is_free() {
        let mut elevator = elevator_at(4, MotionState::Up);
        elevator.add_deliveries([9]);
        assert_eq!(elevator.estimate_steps_until_pickup(4, Direction::Up), Some(0));

        let elevator = elevator_at(4, MotionState::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(4, Direction::Down), Some(0));
    }

    #[test]
    fn test_up_up_ahead_charges_boarding_for_same_direction_pickup() {
        let mut elevator = elevator_at(2, MotionState::Up);
        assign(&mut elevator, 5, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(8));
    }

    #[test]
    fn test_up_up_ahead_charges_alighting_for_delivery() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([5]);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(7));
    }

    #[test]
    fn test_up_up_ahead_with_delivery_and_pickup() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([5]);
        assign(&mut elevator, 4, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(10));
    }

    #[test]
    fn test_up_up_ahead_ignores_opposite_pickup() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([5]);
        assign(&mut elevator, 4, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(7));
    }

    #[test]
    fn test_open_door_adds_remaining_dwell() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([6]);
        elevator.door_closed = false;
        elevator.steps_since_door_opened = 1;
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(9));

        elevator.steps_since_door_opened = 5;
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(7));
    }

    #[test]
    fn test_down_down_ahead() {
        let mut elevator = elevator_at(8, MotionState::Down);
        assign(&mut elevator, 7, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Down), Some(6));

        let mut elevator = elevator_at(8, MotionState::Down);
        elevator.add_deliveries([5]);
        assert_eq!(elevator.estimate_steps_until_pickup(4, Direction::Down), Some(6));

        let mut elevator = elevator_at(8, MotionState::Down);
        elevator.add_deliveries([5]);
        assign(&mut elevator, 4, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(2, Direction::Down), Some(11));

        let mut elevator = elevator_at(8, MotionState::Down);
        elevator.add_deliveries([5]);
        assign(&mut elevator, 4, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(3, Direction::Down), Some(7));
    }

    #[test]
    fn test_down_down_ahead_with_open_door() {
        let mut elevator = elevator_at(8, MotionState::Down);
        elevator.add_deliveries([6]);
        elevator.door_closed = false;
        elevator.steps_since_door_opened = 1;
        assert_eq!(elevator.estimate_steps_until_pickup(4, Direction::Down), Some(8));
    }

    #[test]
    fn test_up_down_ahead_turns_at_furthest_delivery() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([5]);
        assert_eq!(elevator.estimate_steps_until_pickup(8, Direction::Down), Some(8));

        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([9]);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Down), Some(13));
    }

    #[test]
    fn test_up_down_ahead_counts_down_pickups_on_way_back() {
        let mut elevator = elevator_at(2, MotionState::Up);
        elevator.add_deliveries([9]);
        assign(&mut elevator, 7, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Down), Some(16));

        let mut elevator = elevator_at(2, MotionState::Up);
        assign(&mut elevator, 5, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Down), Some(5));
    }

    #[test]
    fn test_up_down_ahead_pessimistic_boundary() {
        let mut elevator = elevator_at(2, MotionState::Up);
        assign(&mut elevator, 3, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Down), Some(16));

        let mut elevator = elevator_at(2, MotionState::Up);
        assign(&mut elevator, 3, Direction::Up);
        assign(&mut elevator, 4, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Down), Some(19));

        let mut elevator = elevator_at(2, MotionState::Up);
        assign(&mut elevator, 3, Direction::Up);
        assign(&mut elevator, 8, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Down), Some(19));
    }

    #[test]
    fn test_down_up_ahead_mirrors_up_down() {
        // 8 down to 1 (delivery), back up to 5.
        let mut elevator = elevator_at(8, MotionState::Down);
        elevator.add_deliveries([1]);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Up), Some(13));

        // A down caller below forces the run to floor 0.
        let mut elevator = elevator_at(8, MotionState::Down);
        assign(&mut elevator, 7, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(3, Direction::Up), Some(16));
    }

    #[test]
    fn test_up_up_behind_sweeps_both_ways() {
        // Up to 9 for the delivery, down to the requested floor 3, no turn
        // commitments below: 5 + 6 + 0 travel, one delivery.
        let mut elevator = elevator_at(4, MotionState::Up);
        elevator.add_deliveries([9]);
        assert_eq!(elevator.estimate_steps_until_pickup(3, Direction::Up), Some(13));
    }

    #[test]
    fn test_up_up_behind_pessimistic_on_both_turns() {
        // Up caller above forces floor 10, down caller below forces floor 0.
        // Travel 6 + 10 + 3, one delivery, boarding for both callers and two
        // forced turns.
        let mut elevator = elevator_at(4, MotionState::Up);
        elevator.add_deliveries([6]);
        assign(&mut elevator, 5, Direction::Up);
        assign(&mut elevator, 2, Direction::Down);
        assert_eq!(elevator.estimate_steps_until_pickup(3, Direction::Up), Some(31));
    }

    #[test]
    fn test_down_down_behind_sweeps_both_ways() {
        // Down to 1, up to 7 (the request itself), 3 + 6 + 0 travel, one delivery.
        let mut elevator = elevator_at(4, MotionState::Down);
        elevator.add_deliveries([1]);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Down), Some(11));
    }

    #[test]
    fn test_up_down_behind_returns_after_run() {
        // Up to 8, back down to 3: 3 + 5 travel, one delivery.
        let mut elevator = elevator_at(5, MotionState::Up);
        elevator.add_deliveries([8]);
        assert_eq!(elevator.estimate_steps_until_pickup(3, Direction::Down), Some(10));

        // Level with the elevator.
        let mut elevator = elevator_at(5, MotionState::Up);
        elevator.add_deliveries([8]);
        assert_eq!(elevator.estimate_steps_until_pickup(5, Direction::Down), Some(8));
    }

    #[test]
    fn test_huge_dwell_estimates_saturate() {
        let mut elevator = Elevator::new(ElevatorId(0), 2, 3, Steps::MAX, 10);
        elevator.state = MotionState::Up;
        elevator.add_deliveries([5]);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(Steps::MAX));
        assert_eq!(elevator.estimate_steps_until_pickup(1, Direction::Up), Some(Steps::MAX));
        assert_eq!(elevator.estimate_steps_until_pickup(8, Direction::Down), Some(Steps::MAX));

        let mut elevator = Elevator::new(ElevatorId(0), 2, Steps::MAX, 2, 10);
        elevator.state = MotionState::Up;
        elevator.add_deliveries([9]);
        elevator.door_closed = false;
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(Steps::MAX));
        assert_eq!(elevator.estimate_steps_until_pickup(1, Direction::Down), Some(Steps::MAX));
    }

    #[test]
    fn test_down_up_behind_returns_after_run() {
        // Down to 2, back up to 7: 3 + 5 travel, one delivery, one up caller.
        let mut elevator = elevator_at(5, MotionState::Down);
        elevator.add_deliveries([2]);
        assign(&mut elevator, 4, Direction::Up);
        assert_eq!(elevator.estimate_steps_until_pickup(7, Direction::Up), Some(13));
    }
}
