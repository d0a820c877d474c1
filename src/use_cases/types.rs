// Use-case level inputs/outputs for runs.

use crate::domain::{CommandId, Domain};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Paused,
}

/// What the interpreter is doing right now; published on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub run_id: u64,
    pub phase: RunPhase,
    pub domain: Option<Domain>,
    pub pc: Option<usize>,
    pub command_id: Option<CommandId>,
}

impl RunStatus {
    pub fn idle(run_id: u64) -> Self {
        Self {
            run_id,
            phase: RunPhase::Idle,
            domain: None,
            pc: None,
            command_id: None,
        }
    }
}

/// A published copy of one domain's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    pub frame: u64,
    /// False for idle publishes and the final frame of a run.
    pub live: bool,
    pub state: T,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeSettings {
    /// Fixed physics tick.
    pub tick_interval: Duration,
    /// Cadence of snapshot publishing during a run.
    pub publish_interval: Duration,
    /// Longest stretch of synchronous interpreter work before yielding.
    pub time_slice: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000 / 60),
            publish_interval: Duration::from_millis(50),
            time_slice: Duration::from_millis(12),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { run_id: u64 },
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Completed,
    Stopped,
    Aborted,
}

/// Host-driven input for the virtual board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Button { pin: u8, pressed: bool },
    Sensor { pin: u8, value: f64 },
}
