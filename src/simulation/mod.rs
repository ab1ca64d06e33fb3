//! Standalone elevator bank simulation
//!
//! This module contains the dispatch logic for a bank of elevators serving a
//! single building. It runs without any user interface and is driven one step
//! at a time through [`Dispatcher`].

mod activity;
mod dispatcher;
mod door_timer;
mod elevator;
mod error;
mod estimate;
mod request;
mod status;
mod types;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use activity::{ActivityLog, ActivityRecord, ActivitySink, DiscardActivity, ElevatorActivity};
pub use dispatcher::{Dispatcher, DispatcherConfig, PendingRequest};
#[allow(unused_imports)]
pub use door_timer::DoorTimer;
pub use elevator::Elevator;
pub use error::DispatchError;
pub use request::{AssignedPickup, PickupRequest};
#[allow(unused_imports)]
pub use status::{ElevatorStatus, PickupStatus};
#[allow(unused_imports)]
pub use types::{Direction, ElevatorId, Floor, MotionState, RequestId, Step, Steps};
