//! Error and anomaly types for the elevator simulation
//!
//! Only configuration and request validation errors are returned to callers.
//! The remaining variants describe anomalies the simulation recovers from on
//! its own; they are formatted into log messages and never propagated.

use std::fmt;

use super::types::{Direction, ElevatorId, Floor, MotionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Malformed constructor parameters
    InvalidConfiguration(String),
    /// Malformed pickup request
    InvalidRequest(String),
    /// The cost estimator hit a state/request combination it does not model
    EstimationUnreachable {
        elevator: ElevatorId,
        state: MotionState,
        current_floor: Floor,
        request_floor: Floor,
        request_direction: Direction,
    },
    /// Requests remain pending but no elevator can take them this step
    AssignmentExhausted { unassigned: usize },
    /// Opening an open door or closing a closed one
    RedundantDoorOperation { elevator: ElevatorId, open: bool },
    /// Moving past the ground floor or the top floor
    MotionBoundaryViolation {
        elevator: ElevatorId,
        floor: Floor,
        state: MotionState,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidConfiguration(reason) => {
                write!(f, "Invalid configuration: {}", reason)
            }
            DispatchError::InvalidRequest(reason) => write!(f, "Invalid pickup request: {}", reason),
            DispatchError::EstimationUnreachable {
                elevator,
                state,
                current_floor,
                request_floor,
                request_direction,
            } => write!(
                f,
                "Failed pickup time estimation for elevator {} ({} at floor {}) and request at floor {} going {}",
                elevator.0, state, current_floor, request_floor, request_direction
            ),
            DispatchError::AssignmentExhausted { unassigned } => write!(
                f,
                "{} pickup request(s) left unassigned, every elevator is broken",
                unassigned
            ),
            DispatchError::RedundantDoorOperation { elevator, open } => {
                if *open {
                    write!(f, "Elevator {} is trying to open a door that is already open", elevator.0)
                } else {
                    write!(f, "Elevator {} is trying to close a door that is already closed", elevator.0)
                }
            }
            DispatchError::MotionBoundaryViolation {
                elevator,
                floor,
                state,
            } => write!(
                f,
                "Elevator {} cannot move {} from floor {}",
                elevator.0, state, floor
            ),
        }
    }
}

impl std::error::Error for DispatchError {}
