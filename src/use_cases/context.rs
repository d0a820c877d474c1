// Per-run execution context handed to every run task.

use crate::domain::systems::PhysicsConfig;
use crate::domain::{Domain, EffectSink, Program};
use crate::use_cases::debugger::DebugController;
use crate::use_cases::publisher::Publisher;
use crate::use_cases::store::Store;
use crate::use_cases::types::RuntimeSettings;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything one run shares between its interpreter, physics loop and publisher.
pub struct RunContext {
    pub run_id: u64,
    pub domain: Domain,
    pub program: Arc<Program>,
    pub store: Store,
    pub publisher: Arc<Publisher>,
    pub debugger: Arc<DebugController>,
    pub effects: Arc<dyn EffectSink>,
    pub settings: RuntimeSettings,
    pub physics: PhysicsConfig,
    speed: watch::Receiver<f64>,
    stop_tx: watch::Sender<bool>,
}

pub struct RunContextParts {
    pub run_id: u64,
    pub domain: Domain,
    pub program: Arc<Program>,
    pub store: Store,
    pub publisher: Arc<Publisher>,
    pub debugger: Arc<DebugController>,
    pub effects: Arc<dyn EffectSink>,
    pub settings: RuntimeSettings,
    pub speed: watch::Receiver<f64>,
}

impl RunContext {
    pub fn new(parts: RunContextParts) -> Self {
        let (stop_tx, _stop_rx) = watch::channel(false);
        Self {
            run_id: parts.run_id,
            domain: parts.domain,
            program: parts.program,
            store: parts.store,
            publisher: parts.publisher,
            debugger: parts.debugger,
            effects: parts.effects,
            settings: parts.settings,
            physics: PhysicsConfig::default(),
            speed: parts.speed,
            stop_tx,
        }
    }

    /// Raises the stop flag while holding the store, so no task mutates state after it.
    pub fn request_stop(&self) {
        self.store.write(|_| {
            self.stop_tx.send_replace(true);
        });
    }

    /// Publishes a live frame unless the run has been stopped. The check and the copy share
    /// the store lock with `request_stop`, so no live frame can follow a stop.
    pub fn publish_live(&self) -> Option<u64> {
        self.store.read(|world| {
            (!self.is_stopped()).then(|| self.publisher.publish(world.clone(), true))
        })
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Current speed multiplier; wait durations are divided by it.
    pub fn speed(&self) -> f64 {
        *self.speed.borrow()
    }
}
