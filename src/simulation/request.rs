//! Pickup requests (floor calls)

use std::collections::BTreeSet;

use super::error::DispatchError;
use super::types::{Direction, Floor, RequestId, Steps};

/// A floor call together with the buttons the boarding passengers will press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupRequest {
    pub floor: Floor,
    pub direction: Direction,
    /// Steps the passengers need to board
    pub boarding_steps: Steps,
    pub destination_floors: BTreeSet<Floor>,
    /// Set once an elevator has boarded the passengers
    pub done: bool,
}

impl PickupRequest {
    pub fn new(
        floor: Floor,
        direction: Direction,
        boarding_steps: Steps,
        destination_floors: impl IntoIterator<Item = Floor>,
    ) -> Self {
        Self {
            floor,
            direction,
            boarding_steps,
            destination_floors: destination_floors.into_iter().collect(),
            done: false,
        }
    }

    /// Check the request against a building with floors `0..=number_of_floors`
    pub fn validate(&self, number_of_floors: Floor) -> Result<(), DispatchError> {
        if self.floor > number_of_floors {
            return Err(DispatchError::InvalidRequest(format!(
                "floor {} is outside 0..={}",
                self.floor, number_of_floors
            )));
        }
        if self.boarding_steps == 0 {
            return Err(DispatchError::InvalidRequest(
                "boarding steps must be at least 1".to_string(),
            ));
        }
        if self.destination_floors.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "at least one destination floor is required".to_string(),
            ));
        }
        if let Some(floor) = self
            .destination_floors
            .iter()
            .find(|&&floor| floor > number_of_floors)
        {
            return Err(DispatchError::InvalidRequest(format!(
                "destination floor {} is outside 0..={}",
                floor, number_of_floors
            )));
        }
        Ok(())
    }
}

/// The part of a pickup request an elevator keeps while it is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedPickup {
    pub id: RequestId,
    pub floor: Floor,
    pub direction: Direction,
    pub boarding_steps: Steps,
    pub done: bool,
}

impl AssignedPickup {
    pub fn from_request(id: RequestId, request: &PickupRequest) -> Self {
        Self {
            id,
            floor: request.floor,
            direction: request.direction,
            boarding_steps: request.boarding_steps,
            done: request.done,
        }
    }
}
