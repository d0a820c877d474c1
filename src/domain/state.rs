// Domain-level simulation state for the three run domains.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::tuning::sprite::SpriteTuning;

/// Which simulated target a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Device,
    Entity,
    Screen,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::Device => "device",
            Domain::Entity => "entity",
            Domain::Screen => "screen",
        };
        f.write_str(name)
    }
}

/// Loosely typed value stored in a domain's variable map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Numeric view used by arithmetic and comparisons; non-numeric text is 0.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        }
    }

    /// Equality with numeric coercion, so `"3"` equals `3`.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => (self.as_number() - other.as_number()).abs() < f64::EPSILON,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

pub type Variables = BTreeMap<String, Value>;

/// Host-driven inputs of the virtual board. Survives run resets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputPanel {
    pub buttons: BTreeMap<u8, bool>,
    pub sensors: BTreeMap<u8, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub digital: BTreeMap<u8, bool>,
    pub analog: BTreeMap<u8, u8>,
    pub servos: BTreeMap<u8, f64>,
    pub lcd: String,
    /// Frequency of the tone currently sounding, if any.
    pub tone: Option<f64>,
    pub inputs: InputPanel,
    pub variables: Variables,
}

impl DeviceState {
    pub fn button_pressed(&self, pin: u8) -> bool {
        self.inputs.buttons.get(&pin).copied().unwrap_or(false)
    }

    /// Reading of an analog sensor (0..=1023); unwired pins read 0.
    pub fn sensor(&self, pin: u8) -> f64 {
        self.inputs.sensors.get(&pin).copied().unwrap_or(0.0)
    }

    pub fn pin_high(&self, pin: u8) -> bool {
        self.digital.get(&pin).copied().unwrap_or(false) || self.button_pressed(pin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Heading in degrees, 0 = facing right, counter-clockwise positive.
    pub rotation: f32,
    pub scale: f32,
    pub visible: bool,
    pub on_ground: bool,
    pub speech: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Seconds left before the projectile is culled.
    pub ttl: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstKind {
    EnemyDown,
    Pickup,
    Hurt,
}

/// Decorative particle trigger left for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleBurst {
    pub x: f32,
    pub y: f32,
    pub kind: BurstKind,
    pub ttl: f32,
}

/// Axis-aligned platform; the sprite can land on its top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Painted level layout. Survives run resets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub sprite: Sprite,
    pub gravity: bool,
    pub score: i64,
    pub health: i32,
    pub defeated: bool,
    /// Seconds of remaining invulnerability after an enemy hit.
    pub invincibility: f32,
    pub shake: f32,
    pub projectiles: Vec<Projectile>,
    pub enemies: Vec<Enemy>,
    pub collectibles: Vec<Collectible>,
    pub particles: Vec<ParticleBurst>,
    pub level: Level,
    pub variables: Variables,
    #[serde(skip)]
    next_id: u64,
}

impl EntityState {
    pub fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

impl Default for EntityState {
    fn default() -> Self {
        let tuning = SpriteTuning::default();
        Self {
            sprite: Sprite {
                x: tuning.spawn_x,
                y: tuning.spawn_y,
                vx: 0.0,
                vy: 0.0,
                rotation: 0.0,
                scale: 1.0,
                visible: true,
                on_ground: false,
                speech: None,
            },
            gravity: false,
            score: 0,
            health: tuning.max_health,
            defeated: false,
            invincibility: 0.0,
            shake: 0.0,
            projectiles: Vec::new(),
            enemies: Vec::new(),
            collectibles: Vec::new(),
            particles: Vec::new(),
            level: Level::default(),
            variables: Variables::new(),
            next_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Button,
    Label,
    Input,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub kind: WidgetKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenState {
    pub title: String,
    pub background: String,
    pub widgets: Vec<Widget>,
    pub variables: Variables,
    #[serde(skip)]
    widget_seq: u64,
}

impl ScreenState {
    /// Generated widget id such as `button-3`.
    pub fn next_widget_id(&mut self, kind: WidgetKind) -> String {
        self.widget_seq += 1;
        let prefix = match kind {
            WidgetKind::Button => "button",
            WidgetKind::Label => "label",
            WidgetKind::Input => "input",
        };
        format!("{prefix}-{}", self.widget_seq)
    }

    pub fn widget_mut(&mut self, id: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id == id)
    }
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            title: "My App".to_string(),
            background: "#ffffff".to_string(),
            widgets: Vec::new(),
            variables: Variables::new(),
            widget_seq: 0,
        }
    }
}

/// The authoritative simulation record for all three domains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    pub device: DeviceState,
    pub entity: EntityState,
    pub screen: ScreenState,
}

impl World {
    pub fn variables(&self, domain: Domain) -> &Variables {
        match domain {
            Domain::Device => &self.device.variables,
            Domain::Entity => &self.entity.variables,
            Domain::Screen => &self.screen.variables,
        }
    }

    pub fn variables_mut(&mut self, domain: Domain) -> &mut Variables {
        match domain {
            Domain::Device => &mut self.device.variables,
            Domain::Entity => &mut self.entity.variables,
            Domain::Screen => &mut self.screen.variables,
        }
    }

    /// Back to defaults, keeping the input panel and the painted level.
    pub fn reset_for_run(&mut self) {
        let inputs = std::mem::take(&mut self.device.inputs);
        let level = std::mem::take(&mut self.entity.level);
        *self = World::default();
        self.device.inputs = inputs;
        self.entity.level = level;
    }
}
