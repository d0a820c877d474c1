// Run control surface: start/stop, speed, debugging, and the read surface for renderers.

use crate::domain::control;
use crate::domain::{
    CommandId, DeviceState, Domain, EffectSink, EntityState, Level, Program, ScreenState, World,
};
use crate::use_cases::context::{RunContext, RunContextParts};
use crate::use_cases::debugger::{self, DebugGate};
use crate::use_cases::interpreter::Interpreter;
use crate::use_cases::physics_loop::physics_loop;
use crate::use_cases::publisher::{Publisher, publisher_task};
use crate::use_cases::store::Store;
use crate::use_cases::types::{
    Input, RunEnd, RunPhase, RunStatus, RuntimeSettings, Snapshot, StartOutcome,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span, warn};

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;

/// Errors returned by run control operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("no program has been loaded")]
    NoProgram,
    #[error("command {0} is not part of the loaded program")]
    UnknownCommand(CommandId),
}

/// Owns the authoritative store and at most one active run.
pub struct Runtime {
    settings: RuntimeSettings,
    store: Store,
    publisher: Arc<Publisher>,
    effects: Arc<dyn EffectSink>,
    speed_tx: watch::Sender<f64>,
    debug_enabled: AtomicBool,
    active: Mutex<Option<Arc<RunContext>>>,
    program: Mutex<Option<Arc<Program>>>,
    next_run_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Runtime {
    pub fn new(settings: RuntimeSettings, effects: Arc<dyn EffectSink>) -> Self {
        let world = World::default();
        let publisher = Arc::new(Publisher::new(&world));
        let (speed_tx, _speed_rx) = watch::channel(1.0);
        Self {
            settings,
            store: Store::new(world),
            publisher,
            effects,
            speed_tx,
            debug_enabled: AtomicBool::new(false),
            active: Mutex::new(None),
            program: Mutex::new(None),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Starts a run on the current tokio runtime. A second start while running is a no-op.
    pub fn start(self: &Arc<Self>, domain: Domain, program: Program) -> StartOutcome {
        let mut active = lock(&self.active);
        if let Some(ctx) = active.as_ref() {
            info!(run_id = ctx.run_id, "start ignored; a run is already active");
            return StartOutcome::AlreadyRunning;
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        for issue in control::audit(program.commands()) {
            warn!(run_id, %issue, "program structure issue; running leniently");
        }

        let program = Arc::new(program);
        *lock(&self.program) = Some(Arc::clone(&program));

        // Fresh defaults in both the store and the published snapshot.
        self.store.write(World::reset_for_run);
        self.publisher.publish_store(&self.store, true);

        let (controller, gate) = debugger::debugger(self.debug_enabled.load(Ordering::Acquire));
        let ctx = Arc::new(RunContext::new(RunContextParts {
            run_id,
            domain,
            program,
            store: self.store.clone(),
            publisher: Arc::clone(&self.publisher),
            debugger: controller,
            effects: Arc::clone(&self.effects),
            settings: self.settings,
            speed: self.speed_tx.subscribe(),
        }));

        self.publisher.set_status(RunStatus {
            run_id,
            phase: RunPhase::Running,
            domain: Some(domain),
            pc: None,
            command_id: None,
        });
        *active = Some(Arc::clone(&ctx));

        let span = info_span!("run", run_id, %domain);
        tokio::spawn(Arc::clone(self).supervise(ctx, gate).instrument(span));

        StartOutcome::Started { run_id }
    }

    async fn supervise(self: Arc<Self>, ctx: Arc<RunContext>, gate: DebugGate) {
        info!(commands = ctx.program.len(), "run started");

        let publisher = tokio::spawn(publisher_task(Arc::clone(&ctx)).in_current_span());
        let physics = (ctx.domain == Domain::Entity)
            .then(|| tokio::spawn(physics_loop(Arc::clone(&ctx)).in_current_span()));

        // A panic inside a command must not take the host down with it.
        let interpreter = Interpreter::new(Arc::clone(&ctx), gate);
        let end = match tokio::spawn(interpreter.run().in_current_span()).await {
            Ok(end) => end,
            Err(e) => {
                error!(error = %e, "interpreter task failed");
                RunEnd::Aborted
            }
        };

        ctx.request_stop();
        if let Err(e) = publisher.await {
            error!(error = %e, "publisher task failed");
        }
        if let Some(physics) = physics {
            if let Err(e) = physics.await {
                error!(error = %e, "physics task failed");
            }
        }

        // Exactly one final publish once every writer has exited.
        let frame = self.publisher.publish_store(&self.store, false);

        {
            let mut active = lock(&self.active);
            if active.as_ref().is_some_and(|a| a.run_id == ctx.run_id) {
                *active = None;
            }
        }
        self.publisher.set_status(RunStatus::idle(ctx.run_id));
        info!(?end, frame, "run finished");
    }

    /// Raises the stop flag of the active run. Returns false when idle.
    pub fn stop(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(ctx) => {
                info!(run_id = ctx.run_id, "stop requested");
                ctx.request_stop();
                true
            }
            None => false,
        }
    }

    /// Sets the speed multiplier, clamped to a sane range, and returns the value in effect.
    pub fn set_speed(&self, multiplier: f64) -> f64 {
        let speed = if multiplier.is_finite() {
            multiplier.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        };
        self.speed_tx.send_replace(speed);
        speed
    }

    pub fn speed(&self) -> f64 {
        *self.speed_tx.borrow()
    }

    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debug_enabled.store(enabled, Ordering::Release);
        if let Some(ctx) = lock(&self.active).as_ref() {
            ctx.debugger.set_enabled(enabled);
        }
    }

    /// Flips the breakpoint on a command of the loaded program and returns its new value.
    pub fn toggle_breakpoint(&self, id: CommandId) -> Result<bool, ControlError> {
        let program = lock(&self.program);
        let program = program.as_ref().ok_or(ControlError::NoProgram)?;
        let command = program.find(id).ok_or(ControlError::UnknownCommand(id))?;
        Ok(command.toggle_breakpoint())
    }

    /// Releases a paused interpreter through one leaf command.
    pub fn step(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|ctx| ctx.debugger.step())
    }

    /// Asks the active run to pause before its next leaf command (debugging must be on).
    pub fn pause(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(ctx) if ctx.debugger.is_enabled() => {
                ctx.debugger.pause();
                true
            }
            _ => false,
        }
    }

    pub fn resume(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(ctx) => {
                ctx.debugger.resume();
                true
            }
            None => false,
        }
    }

    pub fn set_input(&self, input: Input) {
        self.edit(|world| match input {
            Input::Button { pin, pressed } => {
                world.device.inputs.buttons.insert(pin, pressed);
            }
            Input::Sensor { pin, value } => {
                world.device.inputs.sensors.insert(pin, value.clamp(0.0, 1023.0));
            }
        });
    }

    pub fn load_level(&self, level: Level) {
        self.edit(|world| world.entity.level = level);
    }

    // While idle the snapshot mirrors the store, so edits are published right away.
    fn edit(&self, f: impl FnOnce(&mut World)) {
        let active = lock(&self.active);
        self.store.write(f);
        if active.is_none() {
            self.publisher.publish_store(&self.store, false);
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Reads the authoritative store directly, bypassing the publish cadence.
    pub fn inspect<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        self.store.read(f)
    }

    pub fn status(&self) -> watch::Receiver<RunStatus> {
        self.publisher.status()
    }

    pub fn device(&self) -> watch::Receiver<Snapshot<DeviceState>> {
        self.publisher.device()
    }

    pub fn entity(&self) -> watch::Receiver<Snapshot<EntityState>> {
        self.publisher.entity()
    }

    pub fn screen(&self) -> watch::Receiver<Snapshot<ScreenState>> {
        self.publisher.screen()
    }

    pub fn frames(&self) -> u64 {
        self.publisher.frames()
    }

    /// Resolves once no run is active.
    pub async fn wait_idle(&self) {
        let mut status = self.status();
        let _ = status
            .wait_for(|s| s.phase == RunPhase::Idle)
            .await;
    }
}
