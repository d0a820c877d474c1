// Domain layer: command model, simulation state and rules.

pub mod command;
pub mod conditions;
pub mod control;
pub mod effects;
pub mod state;
pub mod systems;
pub mod tuning;

pub use command::{Block, Command, CommandId, Condition, Program};
pub use effects::{Effect, EffectError, EffectSink};
pub use state::{
    DeviceState, Domain, EntityState, InputPanel, Level, Platform, ScreenState, Value, World,
};
