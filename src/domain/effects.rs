// Fire-and-forget side effects and the port the host renders them through.

use serde::Serialize;
use thiserror::Error;

use crate::domain::state::BurstKind;

/// Something the host may play or show; the runtime never waits on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Effect {
    Sound { sound: String },
    Tone { frequency: f64, seconds: f64 },
    Speech { text: String },
    Alert { message: String },
    Vibrate { seconds: f64 },
    ParticleBurst { x: f32, y: f32, kind: BurstKind },
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("effect sink rejected the effect: {0}")]
    Rejected(String),
    #[error("effect sink is closed")]
    Closed,
}

// Port for the host-provided effect renderer.
pub trait EffectSink: Send + Sync {
    fn emit(&self, effect: Effect) -> Result<(), EffectError>;
}

/// Sink for hosts that do not render effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardEffects;

impl EffectSink for DiscardEffects {
    fn emit(&self, _effect: Effect) -> Result<(), EffectError> {
        Ok(())
    }
}

// Broadcast fan-out; having no subscribers right now is not a failure.
impl EffectSink for tokio::sync::broadcast::Sender<Effect> {
    fn emit(&self, effect: Effect) -> Result<(), EffectError> {
        let _ = self.send(effect);
        Ok(())
    }
}
