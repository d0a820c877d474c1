// Program-counter interpreter: walks the command list, resolves control flow by scanning,
// and hands leaf commands to the executor one at a time.

use crate::domain::control::{self, BranchTarget};
use crate::domain::{Block, Program};
use crate::use_cases::context::RunContext;
use crate::use_cases::debugger::{DebugGate, GateOutcome};
use crate::use_cases::executor::{Executor, scale_delay};
use crate::use_cases::types::{RunEnd, RunPhase};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Times(u64),
    Forever,
}

/// Pushed when a loop opens; its body starts at `return_index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    pub return_index: usize,
    pub remaining: Remaining,
}

/// Result of resolving the command under the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// `pc` has moved; keep going.
    Next,
    /// `pc` has moved; give the host a turn first.
    Yield,
    /// The command at this index is a leaf for the executor.
    Leaf(usize),
}

/// Control-flow state of one run: program counter plus the loop-frame stack.
#[derive(Debug, Default)]
pub struct Cursor {
    pub pc: usize,
    pub loops: Vec<LoopFrame>,
}

impl Cursor {
    /// Resolves the command at `pc`. Control blocks move `pc`; leaves leave it in place.
    /// `condition` answers IF blocks against current state.
    pub fn advance(&mut self, program: &Program, condition: impl FnOnce(&Block) -> bool) -> Flow {
        let commands = program.commands();
        let Some(cmd) = commands.get(self.pc) else {
            return Flow::Next;
        };

        match &cmd.block {
            Block::Repeat { times } if *times <= 0 => {
                // Zero iterations: skip the body, close included.
                self.pc = control::matching_loop_end(commands, self.pc)
                    .map_or(commands.len(), |end| end + 1);
            }
            Block::Repeat { times } => {
                self.loops.push(LoopFrame {
                    return_index: self.pc,
                    remaining: Remaining::Times(*times as u64),
                });
                self.pc += 1;
            }
            Block::Forever => {
                self.loops.push(LoopFrame {
                    return_index: self.pc,
                    remaining: Remaining::Forever,
                });
                self.pc += 1;
            }
            Block::EndRepeat => match self.loops.last_mut() {
                None => self.pc += 1,
                Some(frame) => match frame.remaining {
                    Remaining::Forever => {
                        self.pc = frame.return_index + 1;
                        return Flow::Yield;
                    }
                    Remaining::Times(n) if n > 1 => {
                        frame.remaining = Remaining::Times(n - 1);
                        self.pc = frame.return_index + 1;
                    }
                    Remaining::Times(_) => {
                        self.loops.pop();
                        self.pc += 1;
                    }
                },
            },
            Block::If { .. } => {
                if condition(&cmd.block) {
                    self.pc += 1;
                } else {
                    self.pc = match control::branch_target(commands, self.pc) {
                        BranchTarget::Else(i) | BranchTarget::EndIf(i) => i + 1,
                        BranchTarget::Unclosed => commands.len(),
                    };
                }
            }
            Block::Else => {
                // Only reached by falling out of a taken branch.
                self.pc = control::matching_end_if(commands, self.pc)
                    .map_or(commands.len(), |end| end + 1);
            }
            Block::EndIf => self.pc += 1,
            _ => return Flow::Leaf(self.pc),
        }

        Flow::Next
    }
}

pub struct Interpreter {
    ctx: Arc<RunContext>,
    gate: DebugGate,
    executor: Executor,
    stop: watch::Receiver<bool>,
    cursor: Cursor,
}

impl Interpreter {
    pub fn new(ctx: Arc<RunContext>, gate: DebugGate) -> Self {
        let executor = Executor::new(ctx.domain, ctx.physics);
        let stop = ctx.stop_signal();
        Self {
            ctx,
            gate,
            executor,
            stop,
            cursor: Cursor::default(),
        }
    }

    pub async fn run(mut self) -> RunEnd {
        let program = Arc::clone(&self.ctx.program);
        let time_slice = self.ctx.settings.time_slice;
        let mut slice_start = Instant::now();
        let mut dispatched: u64 = 0;

        info!(commands = program.len(), "interpreter started");

        let end = loop {
            if *self.stop.borrow() {
                break RunEnd::Stopped;
            }
            if self.cursor.pc >= program.len() {
                break RunEnd::Completed;
            }

            let ctx = &self.ctx;
            let flow = self.cursor.advance(&program, |block| match block {
                Block::If { condition } => ctx
                    .store
                    .read(|world| condition.evaluate(world, ctx.domain, &ctx.physics.sprite)),
                _ => false,
            });

            match flow {
                Flow::Next => {}
                Flow::Yield => {
                    tokio::task::yield_now().await;
                    slice_start = Instant::now();
                }
                Flow::Leaf(pc) => {
                    if !self.dispatch(&program, pc).await {
                        break RunEnd::Stopped;
                    }
                    dispatched += 1;
                    self.cursor.pc = pc + 1;
                }
            }

            // Cap unbroken synchronous work so the host stays responsive.
            if slice_start.elapsed() >= time_slice {
                tokio::task::yield_now().await;
                slice_start = Instant::now();
            }
        };

        info!(?end, dispatched, pc = self.cursor.pc, "interpreter finished");
        end
    }

    /// Runs one leaf command. Returns false when the run was stopped meanwhile.
    async fn dispatch(&mut self, program: &Program, pc: usize) -> bool {
        let Some(cmd) = program.get(pc) else {
            return true;
        };

        if self.gate.begin_pause(cmd) {
            self.ctx.publisher.update_status(|s| {
                s.phase = RunPhase::Paused;
                s.pc = Some(pc);
                s.command_id = Some(cmd.id);
            });
            // Make the paused frame visible even between publisher ticks.
            self.ctx.publish_live();
            info!(pc, command_id = %cmd.id, "paused before command");

            if self.gate.wait(&mut self.stop).await == GateOutcome::Cancelled {
                return false;
            }
        }

        self.ctx.publisher.update_status(|s| {
            s.phase = RunPhase::Running;
            s.pc = Some(pc);
            s.command_id = Some(cmd.id);
        });
        debug!(pc, command_id = %cmd.id, block = ?cmd.block, "dispatch");

        // The stop flag is raised under the store lock, so checking it here is race-free.
        let outcome = self.ctx.store.write(|world| {
            (!self.ctx.is_stopped()).then(|| self.executor.apply(&cmd.block, world))
        });
        let Some(outcome) = outcome else {
            return false;
        };

        for effect in outcome.effects {
            if let Err(e) = self.ctx.effects.emit(effect) {
                warn!(pc, command_id = %cmd.id, error = %e, "effect sink failed; continuing");
            }
        }

        if let Some(delay) = outcome.delay {
            let scaled = scale_delay(delay, self.ctx.speed());
            tokio::select! {
                _ = tokio::time::sleep(scaled) => {}
                _ = self.stop.wait_for(|stopped| *stopped) => return false,
            }
            self.ctx.store.write(|world| {
                if !self.ctx.is_stopped() {
                    self.executor.settle(&cmd.block, world);
                }
            });
        }

        true
    }
}
