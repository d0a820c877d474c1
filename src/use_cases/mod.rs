// Use cases: run tasks, run control and the published read surface.

pub mod context;
pub mod debugger;
pub mod executor;
pub mod interpreter;
pub mod physics_loop;
pub mod publisher;
pub mod runtime;
pub mod store;
pub mod types;

pub use runtime::{ControlError, Runtime};
pub use types::{Input, RunEnd, RunPhase, RunStatus, RuntimeSettings, Snapshot, StartOutcome};
