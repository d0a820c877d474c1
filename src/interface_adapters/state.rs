use crate::domain::Effect;
use crate::use_cases::Runtime;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    // Owns the store and the single active run.
    pub runtime: Arc<Runtime>,
    // Effects emitted by runs, fanned out to every connected observer.
    pub effect_tx: broadcast::Sender<Effect>,
}
