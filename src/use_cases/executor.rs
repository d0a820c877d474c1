// Single-command dispatch: one block, one state mutation.

use crate::domain::state::{Collectible, Enemy, Projectile, Widget, WidgetKind};
use crate::domain::systems::PhysicsConfig;
use crate::domain::{Block, Domain, Effect, Value, World};
use std::time::Duration;
use tracing::debug;

/// What the caller must do after a block has been applied.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    /// Pause to await before the next command, before speed scaling.
    pub delay: Option<Duration>,
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn effect(effect: Effect) -> Self {
        Self {
            delay: None,
            effects: vec![effect],
        }
    }

    fn with_delay(mut self, seconds: f64) -> Self {
        self.delay = seconds_to_delay(seconds);
        self
    }
}

// Non-positive and NaN waits are skipped; anything too long to represent saturates.
fn seconds_to_delay(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)).filter(|d| !d.is_zero())
}

/// Divides a delay by the speed multiplier, saturating instead of overflowing.
pub fn scale_delay(delay: Duration, speed: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() / speed).unwrap_or(Duration::MAX)
}

/// Applies leaf blocks to the world on behalf of one run.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    domain: Domain,
    cfg: PhysicsConfig,
}

impl Executor {
    pub fn new(domain: Domain, cfg: PhysicsConfig) -> Self {
        Self { domain, cfg }
    }

    pub fn apply(&self, block: &Block, world: &mut World) -> Outcome {
        match block {
            Block::Repeat { .. }
            | Block::Forever
            | Block::EndRepeat
            | Block::If { .. }
            | Block::Else
            | Block::EndIf => {
                debug!(?block, "control block reached the executor; ignoring");
                Outcome::none()
            }

            Block::Wait { seconds } => Outcome::none().with_delay(*seconds),
            Block::SetVariable { name, value } => {
                world
                    .variables_mut(self.domain)
                    .insert(name.clone(), value.clone());
                Outcome::none()
            }
            Block::ChangeVariable { name, by } => {
                let slot = world
                    .variables_mut(self.domain)
                    .entry(name.clone())
                    .or_default();
                *slot = Value::Number(slot.as_number() + by);
                Outcome::none()
            }
            Block::PlaySound { sound } => Outcome::effect(Effect::Sound {
                sound: sound.clone(),
            }),

            Block::DigitalWrite { pin, high } => {
                world.device.digital.insert(*pin, *high);
                Outcome::none()
            }
            Block::AnalogWrite { pin, value } => {
                world.device.analog.insert(*pin, *value);
                Outcome::none()
            }
            Block::ServoWrite { pin, angle } => {
                world.device.servos.insert(*pin, angle.clamp(0.0, 180.0));
                Outcome::none()
            }
            Block::PlayTone { frequency, seconds } => {
                world.device.tone = Some(*frequency);
                Outcome::effect(Effect::Tone {
                    frequency: *frequency,
                    seconds: *seconds,
                })
                .with_delay(*seconds)
            }
            Block::LcdPrint { text } => {
                world.device.lcd = text.clone();
                Outcome::none()
            }
            Block::LcdClear => {
                world.device.lcd.clear();
                Outcome::none()
            }

            Block::MoveX { amount } => {
                world.entity.sprite.x += amount;
                Outcome::none()
            }
            Block::MoveY { amount } => {
                world.entity.sprite.y += amount;
                Outcome::none()
            }
            Block::GoTo { x, y } => {
                world.entity.sprite.x = *x;
                world.entity.sprite.y = *y;
                Outcome::none()
            }
            Block::SetVelocity { vx, vy } => {
                world.entity.sprite.vx = *vx;
                world.entity.sprite.vy = *vy;
                Outcome::none()
            }
            Block::Turn { degrees } => {
                let sprite = &mut world.entity.sprite;
                sprite.rotation = (sprite.rotation + degrees).rem_euclid(360.0);
                Outcome::none()
            }
            Block::PointIn { degrees } => {
                world.entity.sprite.rotation = degrees.rem_euclid(360.0);
                Outcome::none()
            }
            Block::Jump { strength } => {
                let entity = &mut world.entity;
                if !entity.gravity || entity.sprite.on_ground {
                    entity.sprite.vy = -strength;
                    entity.sprite.on_ground = false;
                }
                Outcome::none()
            }
            Block::SetGravity { enabled } => {
                world.entity.gravity = *enabled;
                Outcome::none()
            }
            Block::Shoot { speed } => {
                let id = world.entity.next_id();
                let sprite = &world.entity.sprite;
                // 0 degrees faces right; y grows downwards on stage.
                let heading = sprite.rotation.to_radians();
                let (dir_x, dir_y) = (heading.cos(), -heading.sin());
                let spawn = self.cfg.sprite.radius * sprite.scale;
                let projectile = Projectile {
                    id,
                    x: sprite.x + dir_x * spawn,
                    y: sprite.y + dir_y * spawn,
                    vx: dir_x * speed,
                    vy: dir_y * speed,
                    ttl: self.cfg.projectile.life_time,
                };
                world.entity.projectiles.push(projectile);
                Outcome::none()
            }
            Block::SpawnEnemy { x, y, vx } => {
                let id = world.entity.next_id();
                world.entity.enemies.push(Enemy {
                    id,
                    x: *x,
                    y: *y,
                    vx: *vx,
                });
                Outcome::none()
            }
            Block::SpawnCollectible { x, y } => {
                let id = world.entity.next_id();
                world
                    .entity
                    .collectibles
                    .push(Collectible { id, x: *x, y: *y });
                Outcome::none()
            }
            Block::Say { text, seconds } => {
                world.entity.sprite.speech = (!text.is_empty()).then(|| text.clone());
                Outcome::effect(Effect::Speech { text: text.clone() }).with_delay(*seconds)
            }
            Block::SetSize { scale } => {
                world.entity.sprite.scale = scale.clamp(0.1, 10.0);
                Outcome::none()
            }
            Block::Show => {
                world.entity.sprite.visible = true;
                Outcome::none()
            }
            Block::Hide => {
                world.entity.sprite.visible = false;
                Outcome::none()
            }
            Block::ChangeScore { by } => {
                world.entity.score = world.entity.score.saturating_add(*by);
                Outcome::none()
            }
            Block::Shake { amount } => {
                world.entity.shake = amount.max(0.0);
                Outcome::none()
            }

            Block::AddButton { widget, label } => {
                add_widget(world, widget.as_deref(), WidgetKind::Button, label);
                Outcome::none()
            }
            Block::AddLabel { widget, text } => {
                add_widget(world, widget.as_deref(), WidgetKind::Label, text);
                Outcome::none()
            }
            Block::AddInput {
                widget,
                placeholder,
            } => {
                add_widget(world, widget.as_deref(), WidgetKind::Input, placeholder);
                Outcome::none()
            }
            Block::SetText { widget, text } => {
                match world.screen.widget_mut(widget) {
                    Some(w) => w.text = text.clone(),
                    None => debug!(widget, "set text on missing widget; ignoring"),
                }
                Outcome::none()
            }
            Block::SetBackground { color } => {
                world.screen.background = color.clone();
                Outcome::none()
            }
            Block::SetTitle { text } => {
                world.screen.title = text.clone();
                Outcome::none()
            }
            Block::ClearScreen => {
                world.screen.widgets.clear();
                Outcome::none()
            }
            Block::ShowAlert { message } => Outcome::effect(Effect::Alert {
                message: message.clone(),
            }),
            Block::Vibrate { seconds } => {
                Outcome::effect(Effect::Vibrate { seconds: *seconds }).with_delay(*seconds)
            }

            Block::Unknown { kind } => {
                debug!(kind, "unknown block; skipping");
                Outcome::none()
            }
        }
    }

    /// Undoes the transient part of a timed block once its delay has elapsed.
    pub fn settle(&self, block: &Block, world: &mut World) {
        match block {
            Block::PlayTone { .. } => world.device.tone = None,
            Block::Say { .. } => world.entity.sprite.speech = None,
            _ => {}
        }
    }
}

// Re-adding an existing id updates its text instead of duplicating the widget.
fn add_widget(world: &mut World, id: Option<&str>, kind: WidgetKind, text: &str) {
    let screen = &mut world.screen;
    let id = match id {
        Some(id) => id.to_string(),
        None => screen.next_widget_id(kind),
    };

    match screen.widget_mut(&id) {
        Some(existing) => {
            existing.kind = kind;
            existing.text = text.to_string();
        }
        None => screen.widgets.push(Widget {
            id,
            kind,
            text: text.to_string(),
        }),
    }
}
