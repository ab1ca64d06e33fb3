//! Elevator Simulation Library
//!
//! A discrete-step simulation of an elevator bank and its dispatcher.

pub mod simulation;
