// Wire protocol: program decoding and the DTOs of the HTTP/WebSocket host surface.
//
// Program decoding is deliberately forgiving. Only the outer shape (an array of objects) is
// enforced; a missing `type` decodes as an unknown block and every parameter falls back to its
// default when missing or malformed.

use crate::domain::tuning::projectile::ProjectileTuning;
use crate::domain::{
    Block, Command, CommandId, Condition, DeviceState, Domain, Effect, EntityState, Level,
    Program, ScreenState, Value,
};
use crate::use_cases::{Input, RunStatus, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use thiserror::Error;

/// Highest pin number on the virtual board.
pub const MAX_PIN: u8 = 19;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("program must be a JSON array of commands")]
    NotAnArray,
    #[error("command {index} must be a JSON object")]
    NotAnObject { index: usize },
}

/// Decodes a program, assigning ids to commands that lack one (or reuse one).
pub fn decode_program(json: &Json) -> Result<Program, ProtocolError> {
    let items = json.as_array().ok_or(ProtocolError::NotAnArray)?;

    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let object = item
            .as_object()
            .ok_or(ProtocolError::NotAnObject { index })?;
        let kind = object.get("type").and_then(Json::as_str).unwrap_or_default();

        let empty = Map::new();
        let params = object
            .get("params")
            .and_then(Json::as_object)
            .unwrap_or(&empty);
        let id = object.get("id").and_then(Json::as_u64);
        let breakpoint = object
            .get("has_breakpoint")
            .or_else(|| object.get("hasBreakpoint"))
            .is_some_and(truthy);

        decoded.push((id, decode_block(kind, &Params(params)), breakpoint));
    }

    let mut next_id = decoded.iter().filter_map(|(id, ..)| *id).max().unwrap_or(0);
    let mut seen = HashSet::new();
    let commands = decoded
        .into_iter()
        .map(|(id, block, breakpoint)| {
            let id = match id {
                Some(id) if seen.insert(id) => id,
                _ => {
                    let id = fresh_id(&mut next_id, &seen);
                    seen.insert(id);
                    id
                }
            };
            Command::new(CommandId(id), block).with_breakpoint(breakpoint)
        })
        .collect();

    Ok(Program::new(commands))
}

// Counts up from the largest explicit id; once that runs out, reuses the lowest free one.
fn fresh_id(next_id: &mut u64, seen: &HashSet<u64>) -> u64 {
    match next_id.checked_add(1) {
        Some(id) => {
            *next_id = id;
            id
        }
        None => (1..).find(|id| !seen.contains(id)).unwrap_or_default(),
    }
}

/// Maps one `type` + params onto a block. Unrecognised types become `Block::Unknown`.
pub fn decode_block(kind: &str, p: &Params<'_>) -> Block {
    match kind.trim().to_ascii_uppercase().as_str() {
        "REPEAT" => Block::Repeat {
            times: p.int("times", 1),
        },
        "FOREVER" => Block::Forever,
        "END_REPEAT" | "END_FOREVER" | "END_LOOP" => Block::EndRepeat,
        "IF" => Block::If {
            condition: decode_condition(p),
        },
        "ELSE" => Block::Else,
        "END_IF" => Block::EndIf,

        "WAIT" => Block::Wait {
            seconds: p.number("seconds", 1.0).max(0.0),
        },
        "SET_VARIABLE" => Block::SetVariable {
            name: p.text("name", "var"),
            value: p.value("value"),
        },
        "CHANGE_VARIABLE" => Block::ChangeVariable {
            name: p.text("name", "var"),
            by: p.number("by", 1.0),
        },
        "PLAY_SOUND" => Block::PlaySound {
            sound: p.text("sound", "pop"),
        },

        "DIGITAL_WRITE" => Block::DigitalWrite {
            pin: p.pin("pin", 13),
            high: p.boolean("value", true),
        },
        "LED_ON" => Block::DigitalWrite {
            pin: p.pin("pin", 13),
            high: true,
        },
        "LED_OFF" => Block::DigitalWrite {
            pin: p.pin("pin", 13),
            high: false,
        },
        "ANALOG_WRITE" => Block::AnalogWrite {
            pin: p.pin("pin", 9),
            value: p.number("value", 128.0).round().clamp(0.0, 255.0) as u8,
        },
        "SERVO_WRITE" => Block::ServoWrite {
            pin: p.pin("pin", 9),
            angle: p.number("angle", 90.0).clamp(0.0, 180.0),
        },
        "PLAY_TONE" => Block::PlayTone {
            frequency: p.number("frequency", 440.0).max(0.0),
            seconds: p.number("seconds", 1.0).max(0.0),
        },
        "LCD_PRINT" => Block::LcdPrint {
            text: p.text("text", ""),
        },
        "LCD_CLEAR" => Block::LcdClear,

        "MOVE_X" => Block::MoveX {
            amount: p.number("amount", 10.0) as f32,
        },
        "MOVE_Y" => Block::MoveY {
            amount: p.number("amount", 10.0) as f32,
        },
        "GO_TO" => Block::GoTo {
            x: p.number("x", 240.0) as f32,
            y: p.number("y", 180.0) as f32,
        },
        "SET_VELOCITY" => Block::SetVelocity {
            vx: p.number("vx", 0.0) as f32,
            vy: p.number("vy", 0.0) as f32,
        },
        "TURN" => Block::Turn {
            degrees: p.number("degrees", 15.0) as f32,
        },
        "POINT_IN" => Block::PointIn {
            degrees: p.number("degrees", 0.0) as f32,
        },
        "JUMP" => Block::Jump {
            strength: p.number("strength", 300.0) as f32,
        },
        "SET_GRAVITY" => Block::SetGravity {
            enabled: p.boolean("enabled", true),
        },
        "SHOOT" => Block::Shoot {
            speed: p.number("speed", f64::from(ProjectileTuning::default().speed)) as f32,
        },
        "SPAWN_ENEMY" => Block::SpawnEnemy {
            x: p.number("x", 400.0) as f32,
            y: p.number("y", 300.0) as f32,
            vx: p.number("vx", -60.0) as f32,
        },
        "SPAWN_COLLECTIBLE" => Block::SpawnCollectible {
            x: p.number("x", 300.0) as f32,
            y: p.number("y", 300.0) as f32,
        },
        "SAY" => Block::Say {
            text: p.text("text", ""),
            seconds: p.number("seconds", 0.0).max(0.0),
        },
        "SET_SIZE" => Block::SetSize {
            scale: p.number("scale", 1.0).max(0.0) as f32,
        },
        "SHOW" => Block::Show,
        "HIDE" => Block::Hide,
        "CHANGE_SCORE" => Block::ChangeScore {
            by: p.int("by", 1),
        },
        "SHAKE" => Block::Shake {
            amount: p.number("amount", 8.0).max(0.0) as f32,
        },

        "ADD_BUTTON" => Block::AddButton {
            widget: p.opt_text("widget"),
            label: p.text("label", "Button"),
        },
        "ADD_LABEL" => Block::AddLabel {
            widget: p.opt_text("widget"),
            text: p.text("text", "Label"),
        },
        "ADD_INPUT" => Block::AddInput {
            widget: p.opt_text("widget"),
            placeholder: p.text("placeholder", ""),
        },
        "SET_TEXT" => Block::SetText {
            widget: p.text("widget", ""),
            text: p.text("text", ""),
        },
        "SET_BACKGROUND" => Block::SetBackground {
            color: p.text("color", "#ffffff"),
        },
        "SET_TITLE" => Block::SetTitle {
            text: p.text("text", "My App"),
        },
        "CLEAR_SCREEN" => Block::ClearScreen,
        "SHOW_ALERT" => Block::ShowAlert {
            message: p.text("message", ""),
        },
        "VIBRATE" => Block::Vibrate {
            seconds: p.number("seconds", 0.2).max(0.0),
        },

        _ => Block::Unknown {
            kind: kind.to_string(),
        },
    }
}

fn decode_condition(p: &Params<'_>) -> Condition {
    let name = p.text("condition", "always").to_ascii_lowercase();
    match name.as_str() {
        "always" | "true" => Condition::Always,
        "never" | "false" => Condition::Never,
        "button_pressed" => Condition::ButtonPressed { pin: p.pin("pin", 2) },
        "pin_high" => Condition::PinHigh { pin: p.pin("pin", 2) },
        "sensor_above" => Condition::SensorAbove {
            pin: p.pin("pin", 0),
            threshold: p.number("threshold", 512.0),
        },
        "sensor_below" => Condition::SensorBelow {
            pin: p.pin("pin", 0),
            threshold: p.number("threshold", 512.0),
        },
        "touching_edge" => Condition::TouchingEdge,
        "touching_enemy" => Condition::TouchingEnemy,
        "on_ground" => Condition::OnGround,
        "variable_equals" => Condition::VariableEquals {
            name: p.text("name", "var"),
            value: p.value("value"),
        },
        "variable_above" => Condition::VariableAbove {
            name: p.text("name", "var"),
            threshold: p.number("threshold", 0.0),
        },
        "widget_exists" => Condition::WidgetExists {
            widget: p.text("name", ""),
        },
        // Unknown conditions never hold.
        _ => Condition::Never,
    }
}

fn truthy(json: &Json) -> bool {
    match json {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Json::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "high" | "on" | "1"
        ),
        _ => false,
    }
}

/// Lenient reader over a command's `params` object.
pub struct Params<'a>(pub &'a Map<String, Json>);

impl Params<'_> {
    /// Finite number, or a string that parses as one.
    pub fn number(&self, key: &str, default: f64) -> f64 {
        let parsed = match self.0.get(key) {
            Some(Json::Number(n)) => n.as_f64(),
            Some(Json::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|n| n.is_finite()).unwrap_or(default)
    }

    pub fn int(&self, key: &str, default: i64) -> i64 {
        self.number(key, default as f64).trunc() as i64
    }

    pub fn boolean(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            None | Some(Json::Null) => default,
            Some(json) => truthy(json),
        }
    }

    pub fn text(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(Json::String(s)) => s.clone(),
            Some(Json::Number(n)) => n.to_string(),
            Some(Json::Bool(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }

    pub fn opt_text(&self, key: &str) -> Option<String> {
        Some(self.text(key, "")).filter(|s| !s.trim().is_empty())
    }

    /// Board pin; anything off the board falls back to `default`.
    pub fn pin(&self, key: &str, default: u8) -> u8 {
        let n = self.number(key, f64::from(default));
        if n.fract() == 0.0 && (0.0..=f64::from(MAX_PIN)).contains(&n) {
            n as u8
        } else {
            default
        }
    }

    pub fn value(&self, key: &str) -> Value {
        match self.0.get(key) {
            Some(Json::Number(n)) => n.as_f64().map(Value::Number).unwrap_or_default(),
            Some(Json::Bool(b)) => Value::Bool(*b),
            Some(Json::String(s)) => Value::Text(s.clone()),
            _ => Value::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub domain: Domain,
    pub program: Json,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub started: bool,
    pub run_id: Option<u64>,
    pub commands: usize,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub multiplier: f64,
}

#[derive(Debug, Serialize)]
pub struct SpeedResponse {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct DebugRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct BreakpointResponse {
    pub id: CommandId,
    pub has_breakpoint: bool,
}

/// Result of a control request that may have nothing to act on.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputRequest {
    Button { pin: u8, pressed: bool },
    Sensor { pin: u8, value: f64 },
}

impl From<InputRequest> for Input {
    fn from(input: InputRequest) -> Self {
        match input {
            InputRequest::Button { pin, pressed } => Input::Button { pin, pressed },
            InputRequest::Sensor { pin, value } => Input::Sensor { pin, value },
        }
    }
}

pub type LevelRequest = Level;

/// Run status plus the latest published frame of every domain.
#[derive(Debug, Clone, Serialize)]
pub struct StateDto {
    pub status: RunStatus,
    pub device: Snapshot<DeviceState>,
    pub entity: Snapshot<EntityState>,
    pub screen: Snapshot<ScreenState>,
}

/// Messages streamed to WebSocket observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    Frame(StateDto),
    Status(RunStatus),
    Effect(Effect),
}
