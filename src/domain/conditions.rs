// Evaluation of the fixed IF-condition vocabulary against current state.

use crate::domain::command::Condition;
use crate::domain::state::{Domain, World};
use crate::domain::systems::contacts;
use crate::domain::tuning::sprite::SpriteTuning;

impl Condition {
    /// Reads state only. Variable conditions look at the running domain's variables; contact
    /// conditions use the same stage tuning as the physics loop.
    pub fn evaluate(&self, world: &World, domain: Domain, stage: &SpriteTuning) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::ButtonPressed { pin } => world.device.button_pressed(*pin),
            Condition::PinHigh { pin } => world.device.pin_high(*pin),
            Condition::SensorAbove { pin, threshold } => world.device.sensor(*pin) > *threshold,
            Condition::SensorBelow { pin, threshold } => world.device.sensor(*pin) < *threshold,
            Condition::TouchingEdge => contacts::touching_edge(&world.entity, stage),
            Condition::TouchingEnemy => contacts::touching_enemy(&world.entity, stage),
            Condition::OnGround => world.entity.sprite.on_ground,
            Condition::VariableEquals { name, value } => world
                .variables(domain)
                .get(name)
                .is_some_and(|v| v.loosely_equals(value)),
            Condition::VariableAbove { name, threshold } => world
                .variables(domain)
                .get(name)
                .is_some_and(|v| v.as_number() > *threshold),
            Condition::WidgetExists { widget } => {
                world.screen.widgets.iter().any(|w| &w.id == widget)
            }
        }
    }
}
