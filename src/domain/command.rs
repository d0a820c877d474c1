// Command blocks and programs as the interpreter sees them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::state::Value;

/// Host-assigned handle for a single block in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Fixed vocabulary of conditions an `IF` block can test.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    Never,
    ButtonPressed { pin: u8 },
    PinHigh { pin: u8 },
    SensorAbove { pin: u8, threshold: f64 },
    SensorBelow { pin: u8, threshold: f64 },
    TouchingEdge,
    TouchingEnemy,
    OnGround,
    VariableEquals { name: String, value: Value },
    VariableAbove { name: String, threshold: f64 },
    WidgetExists { widget: String },
}

/// Every block the runtime understands. Control-flow blocks never reach the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    // Control flow.
    Repeat { times: i64 },
    Forever,
    EndRepeat,
    If { condition: Condition },
    Else,
    EndIf,

    // Any domain.
    Wait { seconds: f64 },
    SetVariable { name: String, value: Value },
    ChangeVariable { name: String, by: f64 },
    PlaySound { sound: String },

    // Device.
    DigitalWrite { pin: u8, high: bool },
    AnalogWrite { pin: u8, value: u8 },
    ServoWrite { pin: u8, angle: f64 },
    PlayTone { frequency: f64, seconds: f64 },
    LcdPrint { text: String },
    LcdClear,

    // Entity.
    MoveX { amount: f32 },
    MoveY { amount: f32 },
    GoTo { x: f32, y: f32 },
    SetVelocity { vx: f32, vy: f32 },
    Turn { degrees: f32 },
    PointIn { degrees: f32 },
    Jump { strength: f32 },
    SetGravity { enabled: bool },
    Shoot { speed: f32 },
    SpawnEnemy { x: f32, y: f32, vx: f32 },
    SpawnCollectible { x: f32, y: f32 },
    Say { text: String, seconds: f64 },
    SetSize { scale: f32 },
    Show,
    Hide,
    ChangeScore { by: i64 },
    Shake { amount: f32 },

    // Screen.
    AddButton { widget: Option<String>, label: String },
    AddLabel { widget: Option<String>, text: String },
    AddInput { widget: Option<String>, placeholder: String },
    SetText { widget: String, text: String },
    SetBackground { color: String },
    SetTitle { text: String },
    ClearScreen,
    ShowAlert { message: String },
    Vibrate { seconds: f64 },

    /// Anything the runtime does not recognise. Executes as a no-op.
    Unknown { kind: String },
}

/// One authored block. Only the breakpoint flag changes after authoring.
#[derive(Debug)]
pub struct Command {
    pub id: CommandId,
    pub block: Block,
    breakpoint: AtomicBool,
}

impl Command {
    pub fn new(id: CommandId, block: Block) -> Self {
        Self {
            id,
            block,
            breakpoint: AtomicBool::new(false),
        }
    }

    pub fn with_breakpoint(self, enabled: bool) -> Self {
        self.breakpoint.store(enabled, Ordering::Relaxed);
        self
    }

    pub fn has_breakpoint(&self) -> bool {
        self.breakpoint.load(Ordering::Relaxed)
    }

    /// Flips the breakpoint and returns the new value.
    pub fn toggle_breakpoint(&self) -> bool {
        !self.breakpoint.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Clone for Command {
    fn clone(&self) -> Self {
        Self::new(self.id, self.block.clone()).with_breakpoint(self.has_breakpoint())
    }
}

/// Ordered command list. Order is the only control-flow structure there is.
#[derive(Debug, Clone, Default)]
pub struct Program {
    commands: Vec<Command>,
}

impl Program {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Builds a program from bare blocks, numbering ids from 1.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let commands = blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| Command::new(CommandId(i as u64 + 1), block))
            .collect();
        Self { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Command> {
        self.commands.get(pc)
    }

    pub fn find(&self, id: CommandId) -> Option<&Command> {
        self.commands.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_breakpoint_reports_new_state() {
        let cmd = Command::new(CommandId(7), Block::Show);
        assert!(!cmd.has_breakpoint());
        assert!(cmd.toggle_breakpoint());
        assert!(cmd.has_breakpoint());
        assert!(!cmd.toggle_breakpoint());
    }
}
