//! Dispatcher that ties the elevator bank together
//!
//! The dispatcher owns every elevator, the pool of pending pickup requests and
//! the active door timers. Callers hand it requests between steps and advance
//! the simulation one step at a time.

use log::{debug, error, info, warn};

use super::activity::{ActivityRecord, ActivitySink, DiscardActivity};
use super::door_timer::DoorTimer;
use super::elevator::Elevator;
use super::error::DispatchError;
use super::request::{AssignedPickup, PickupRequest};
use super::status::ElevatorStatus;
use super::types::{ElevatorId, Floor, RequestId, Step, Steps};

/// Construction parameters of a dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub number_of_elevators: usize,
    /// Highest floor; the building has floors `0..=number_of_floors`
    pub number_of_floors: Floor,
    /// An elevator whose door stays open longer than this is broken
    pub critical_door_open_steps: Steps,
    pub boarding_step_estimate: Steps,
    pub alighting_step_estimate: Steps,
    /// Dwell actually spent at a delivery stop
    pub real_alighting_steps: Steps,
    pub starting_floors: Vec<Floor>,
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        let positive = [
            ("number of elevators", self.number_of_elevators as u64),
            ("number of floors", u64::from(self.number_of_floors)),
            ("critical door open steps", u64::from(self.critical_door_open_steps)),
            ("boarding step estimate", u64::from(self.boarding_step_estimate)),
            ("alighting step estimate", u64::from(self.alighting_step_estimate)),
            ("real alighting steps", u64::from(self.real_alighting_steps)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(DispatchError::InvalidConfiguration(format!(
                "{} must be at least 1",
                name
            )));
        }
        if self.starting_floors.len() != self.number_of_elevators {
            return Err(DispatchError::InvalidConfiguration(format!(
                "expected {} starting floors, got {}",
                self.number_of_elevators,
                self.starting_floors.len()
            )));
        }
        if let Some((index, floor)) = self
            .starting_floors
            .iter()
            .enumerate()
            .find(|(_, &floor)| floor > self.number_of_floors)
        {
            return Err(DispatchError::InvalidConfiguration(format!(
                "elevator {} starts at floor {}, outside 0..={}",
                index, floor, self.number_of_floors
            )));
        }
        Ok(())
    }
}

/// A request waiting in the pool until it is boarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub request: PickupRequest,
}

/// Cost matrix cell picked by the assignment round
///
/// Scans requests in submission order and elevators by index, keeping the
/// first strictly smaller cost. Ties therefore go to the earlier request and
/// then to the lower elevator index.
fn cheapest_cell(costs: &[Vec<Option<Steps>>], assigned: &[bool]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, Steps)> = None;
    for (row, row_costs) in costs.iter().enumerate() {
        if assigned[row] {
            continue;
        }
        for (column, cost) in row_costs.iter().enumerate() {
            let Some(cost) = *cost else { continue };
            if best.map_or(true, |(_, _, lowest)| cost < lowest) {
                best = Some((row, column, cost));
            }
        }
    }
    best.map(|(row, column, _)| (row, column))
}

/// The elevator bank controller
pub struct Dispatcher<S = DiscardActivity> {
    config: DispatcherConfig,
    elevators: Vec<Elevator>,
    pending: Vec<PendingRequest>,
    door_timers: Vec<DoorTimer>,
    /// Number of steps run so far
    clock: Step,
    next_request_id: u64,
    sink: S,
}

impl Dispatcher {
    /// Create a dispatcher that keeps no activity history
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        Self::with_sink(config, DiscardActivity)
    }
}

impl<S: ActivitySink> Dispatcher<S> {
    /// Create a dispatcher that forwards elevator activity to `sink`
    pub fn with_sink(config: DispatcherConfig, sink: S) -> Result<Self, DispatchError> {
        config.validate()?;

        let elevators = config
            .starting_floors
            .iter()
            .enumerate()
            .map(|(index, &floor)| {
                Elevator::new(
                    ElevatorId(index),
                    floor,
                    config.boarding_step_estimate,
                    config.alighting_step_estimate,
                    config.number_of_floors,
                )
            })
            .collect();

        info!(
            "Created dispatcher with {} elevator(s) serving floors 0..={}",
            config.number_of_elevators, config.number_of_floors
        );

        Ok(Self {
            config,
            elevators,
            pending: Vec::new(),
            door_timers: Vec::new(),
            clock: 0,
            next_request_id: 0,
            sink,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Current value of the simulation clock
    pub fn clock(&self) -> Step {
        self.clock
    }

    pub fn elevators(&self) -> &[Elevator] {
        &self.elevators
    }

    /// Requests not boarded yet, in submission order
    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    pub fn door_timers(&self) -> &[DoorTimer] {
        &self.door_timers
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Queue a floor call for the next step
    pub fn pickup(&mut self, request: PickupRequest) -> Result<RequestId, DispatchError> {
        request.validate(self.config.number_of_floors)?;
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        debug!(
            "Queued request {} at floor {} going {} to {:?}",
            id.0, request.floor, request.direction, request.destination_floors
        );
        self.pending.push(PendingRequest { id, request });
        Ok(id)
    }

    /// Snapshot of every elevator
    pub fn status(&self) -> Vec<ElevatorStatus> {
        self.elevators.iter().map(ElevatorStatus::from).collect()
    }

    /// Advance the simulation by one step
    ///
    /// 1. forget last step's pickup assignments
    /// 2. assign every pending request afresh
    /// 3. step every elevator
    /// 4. reset broken elevators
    /// 5. count down door timers, closing doors that are due
    /// 6. start door timers for doors opened in this step
    /// 7. turn boarded pickups into deliveries
    /// 8. drop deliveries completed at the current floor
    /// 9. drop boarded requests from the pool
    pub fn step(&mut self) {
        self.clock += 1;
        debug!(
            "Step {}: {} pending request(s), {} door timer(s)",
            self.clock,
            self.pending.len(),
            self.door_timers.len()
        );

        self.clear_elevator_pickups();
        self.assign_pickup_requests();
        self.advance_elevators();
        self.check_for_broken_elevators();
        self.advance_door_timers();
        self.create_door_timers();
        self.update_deliveries_from_boarded_pickups();
        self.remove_completed_deliveries();
        self.remove_done_pickups();
        self.flush_activities();
    }

    fn clear_elevator_pickups(&mut self) {
        for elevator in &mut self.elevators {
            elevator.clear_pickups();
        }
    }

    fn estimate(&self, column: usize, pickup: &AssignedPickup) -> Option<Steps> {
        let elevator = &self.elevators[column];
        if elevator.is_broken(self.config.critical_door_open_steps) {
            return None;
        }
        elevator.estimate_steps_until_pickup(pickup.floor, pickup.direction)
    }

    /// Greedy assignment over a requests x elevators cost matrix
    ///
    /// After each assignment only the chosen elevator's column is recomputed,
    /// since no other elevator's commitments changed.
    fn assign_pickup_requests(&mut self) {
        let pickups: Vec<AssignedPickup> = self
            .pending
            .iter()
            .filter(|pending| !pending.request.done)
            .map(|pending| AssignedPickup::from_request(pending.id, &pending.request))
            .collect();
        if pickups.is_empty() {
            return;
        }

        let mut costs: Vec<Vec<Option<Steps>>> = pickups
            .iter()
            .map(|pickup| {
                (0..self.elevators.len())
                    .map(|column| self.estimate(column, pickup))
                    .collect()
            })
            .collect();
        let mut assigned = vec![false; pickups.len()];

        while let Some((row, column)) = cheapest_cell(&costs, &assigned) {
            let pickup = pickups[row];
            debug!(
                "Assigning request {} (floor {} going {}) to elevator {} at estimated cost {:?}",
                pickup.id.0, pickup.floor, pickup.direction, column, costs[row][column]
            );
            self.elevators[column].assign_pickup(pickup);
            assigned[row] = true;

            for (other, row_costs) in costs.iter_mut().enumerate() {
                if !assigned[other] {
                    row_costs[column] = self.estimate(column, &pickups[other]);
                }
            }
        }

        let unassigned = assigned.iter().filter(|&&done| !done).count();
        if unassigned > 0 {
            error!("{}", DispatchError::AssignmentExhausted { unassigned });
        }
    }

    fn advance_elevators(&mut self) {
        for elevator in &mut self.elevators {
            elevator.step();
            for boarded in elevator.boarded() {
                if let Some(pending) = self.pending.iter_mut().find(|p| p.id == boarded.id) {
                    pending.request.done = true;
                }
            }
        }
    }

    fn check_for_broken_elevators(&mut self) {
        let critical = self.config.critical_door_open_steps;
        for elevator in &mut self.elevators {
            if !elevator.is_broken(critical) {
                continue;
            }
            if elevator.notify_broken() {
                warn!(
                    "Elevator {} is broken, door open for {} steps at floor {}; discarding its backlog",
                    elevator.id().0,
                    elevator.steps_since_door_opened(),
                    elevator.current_floor()
                );
            } else {
                debug!("Elevator {} is still broken", elevator.id().0);
            }
        }
    }

    fn advance_door_timers(&mut self) {
        let mut due = Vec::new();
        self.door_timers.retain_mut(|timer| {
            if timer.tick() {
                due.push(timer.elevator);
                false
            } else {
                true
            }
        });
        for elevator in due {
            self.elevators[elevator.0].close_door();
        }
    }

    fn create_door_timers(&mut self) {
        for elevator in &self.elevators {
            if !elevator.opened_door_this_step() {
                continue;
            }
            let floor = elevator.current_floor();
            let delivery_stop = elevator.deliveries().contains(&floor);
            let boarding_steps: Option<Steps> = elevator
                .boarded()
                .filter(|pickup| pickup.floor == floor)
                .map(|pickup| pickup.boarding_steps)
                .reduce(Steps::saturating_add);

            let dwell = match (delivery_stop, boarding_steps) {
                (true, None) => self.config.real_alighting_steps,
                (false, Some(boarding)) => boarding,
                (true, Some(boarding)) => boarding.saturating_add(self.config.real_alighting_steps),
                (false, None) => {
                    error!(
                        "Elevator {} opened its door at floor {} with nothing to do",
                        elevator.id().0,
                        floor
                    );
                    continue;
                }
            };
            debug!(
                "Elevator {} holds its door at floor {} for {} step(s)",
                elevator.id().0,
                floor,
                dwell
            );
            self.door_timers.push(DoorTimer::new(elevator.id(), dwell));
        }
    }

    fn update_deliveries_from_boarded_pickups(&mut self) {
        let pending = &self.pending;
        for elevator in &mut self.elevators {
            let floors: Vec<Floor> = elevator
                .boarded()
                .filter_map(|boarded| pending.iter().find(|p| p.id == boarded.id))
                .flat_map(|p| p.request.destination_floors.iter().copied())
                .collect();
            elevator.add_deliveries(floors);
        }
    }

    fn remove_completed_deliveries(&mut self) {
        for elevator in &mut self.elevators {
            let floor = elevator.current_floor();
            if elevator.remove_delivery(floor) {
                debug!("Elevator {} delivered to floor {}", elevator.id().0, floor);
            }
        }
    }

    fn remove_done_pickups(&mut self) {
        self.pending.retain(|pending| !pending.request.done);
    }

    fn flush_activities(&mut self) {
        for elevator in &mut self.elevators {
            let id = elevator.id();
            for (state, activity) in elevator.take_activities() {
                self.sink.record(ActivityRecord {
                    step: self.clock,
                    elevator: id,
                    state,
                    activity,
                });
            }
        }
    }
}
