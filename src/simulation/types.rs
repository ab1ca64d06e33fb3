//! Core types for the elevator simulation
//!
//! These are plain value types shared by every other simulation module.

use std::fmt;

/// A floor number, `0` is the ground floor
pub type Floor = u32;

/// A duration measured in simulation steps
pub type Steps = u32;

/// A value of the simulation clock
pub type Step = u64;

/// A wrapper type for elevator IDs
///
/// Elevator IDs are dense indices into the dispatcher's elevator bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElevatorId(pub usize);

/// A wrapper type for pickup request IDs
///
/// Handed out by the dispatcher when a request is submitted. Two requests with
/// identical fields still get different IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Direction a caller wants to travel in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// Motion state of an elevator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotionState {
    Up,
    Down,
    #[default]
    Idle,
}

impl MotionState {
    /// The travel direction, `None` while idle
    pub fn direction(self) -> Option<Direction> {
        match self {
            MotionState::Up => Some(Direction::Up),
            MotionState::Down => Some(Direction::Down),
            MotionState::Idle => None,
        }
    }
}

impl From<Direction> for MotionState {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MotionState::Up,
            Direction::Down => MotionState::Down,
        }
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionState::Up => write!(f, "UP"),
            MotionState::Down => write!(f, "DOWN"),
            MotionState::Idle => write!(f, "IDLE"),
        }
    }
}
