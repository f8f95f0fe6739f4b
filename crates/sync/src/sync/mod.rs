mod config;
mod mover;
mod queue;
mod reconciler;
mod rest;
mod timer;

pub use config::{ConfigError, SyncAxes, SyncConfig};
pub use mover::{
    LocationWriter, MoveOutcome, MoveRequest, interp_to, rotation_interp_to, shortest_slerp,
};
pub use queue::{DEFAULT_QUEUE_CAPACITY, InsertOutcome, StateQueue};
pub use reconciler::{FrameTime, Reconciler, SETTLE_ALPHA, TickOutcome};
pub use rest::{RestStateTracker, SampleOutcome};
pub use timer::SendTimer;
