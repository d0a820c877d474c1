// Breakpoint and single-step gating for the interpreter.

use crate::domain::Command;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Default)]
struct DebugState {
    enabled: bool,
    // Sticky once a pause happens; cleared by resume or by disabling debugging.
    paused: bool,
    // True only while the interpreter is blocked waiting for a step token.
    waiting: bool,
}

/// Host-facing half of the debugger for one run.
///
/// Every transition happens under one lock, so a resume can never slip between the
/// interpreter's pause check and the moment it starts waiting.
#[derive(Debug)]
pub struct DebugController {
    state: Mutex<DebugState>,
    step_tx: mpsc::Sender<()>,
}

/// Interpreter-facing half; owns the receiving end of the step rendezvous.
#[derive(Debug)]
pub struct DebugGate {
    controller: Arc<DebugController>,
    step_rx: mpsc::Receiver<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Proceed,
    Cancelled,
}

/// Creates both halves with a single-slot channel between them.
pub fn debugger(enabled: bool) -> (Arc<DebugController>, DebugGate) {
    let (step_tx, step_rx) = mpsc::channel(1);
    let controller = Arc::new(DebugController {
        state: Mutex::new(DebugState {
            enabled,
            ..DebugState::default()
        }),
        step_tx,
    });
    let gate = DebugGate {
        controller: Arc::clone(&controller),
        step_rx,
    };
    (controller, gate)
}

impl DebugController {
    fn state(&self) -> MutexGuard<'_, DebugState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    /// Disabling releases a blocked interpreter and lets it run freely.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state();
        state.enabled = enabled;
        if !enabled {
            state.paused = false;
            self.release(&state);
        }
    }

    /// Requests a pause before the next leaf command.
    pub fn pause(&self) {
        self.state().paused = true;
    }

    /// Lets exactly one leaf command through. Returns false when nothing is waiting.
    pub fn step(&self) -> bool {
        let state = self.state();
        self.release(&state)
    }

    /// Clears the pause and releases the interpreter if it is blocked.
    pub fn resume(&self) -> bool {
        let mut state = self.state();
        state.paused = false;
        self.release(&state)
    }

    fn release(&self, state: &DebugState) -> bool {
        state.waiting && self.step_tx.try_send(()).is_ok()
    }
}

impl DebugGate {
    /// Decides whether `command` must wait, and if so arms the wait.
    pub fn begin_pause(&mut self, command: &Command) -> bool {
        let mut state = self.controller.state();
        if !state.enabled || !(command.has_breakpoint() || state.paused) {
            return false;
        }

        // Drop tokens that raced in after the previous wait ended.
        while self.step_rx.try_recv().is_ok() {}

        state.paused = true;
        state.waiting = true;
        true
    }

    /// Blocks until a step token arrives or the run is stopped.
    pub async fn wait(&mut self, stop: &mut watch::Receiver<bool>) -> GateOutcome {
        let outcome = tokio::select! {
            token = self.step_rx.recv() => match token {
                Some(()) => GateOutcome::Proceed,
                None => GateOutcome::Cancelled,
            },
            _ = stop.wait_for(|stopped| *stopped) => GateOutcome::Cancelled,
        };
        self.controller.state().waiting = false;
        outcome
    }
}
