use block_runtime::domain::effects::DiscardEffects;
use block_runtime::domain::state::BurstKind;
use block_runtime::domain::{
    CommandId, Domain, Effect, EffectError, EffectSink, Level, Platform, Program, Value,
};
use block_runtime::interface_adapters::protocol::decode_program;
use block_runtime::use_cases::{
    ControlError, Input, RunPhase, RunStatus, Runtime, RuntimeSettings, StartOutcome,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const PATIENCE: Duration = Duration::from_secs(3);

fn runtime_with(effects: Arc<dyn EffectSink>) -> Arc<Runtime> {
    Arc::new(Runtime::new(RuntimeSettings::default(), effects))
}

fn runtime() -> Arc<Runtime> {
    runtime_with(Arc::new(DiscardEffects))
}

fn program(json: serde_json::Value) -> Program {
    decode_program(&json).expect("valid program")
}

fn start(rt: &Arc<Runtime>, domain: Domain, json: serde_json::Value) -> u64 {
    match rt.start(domain, program(json)) {
        StartOutcome::Started { run_id } => run_id,
        StartOutcome::AlreadyRunning => panic!("runtime should be idle"),
    }
}

async fn wait_status(rt: &Runtime, pred: impl FnMut(&RunStatus) -> bool) -> RunStatus {
    let mut status = rt.status();
    let seen = tokio::time::timeout(PATIENCE, status.wait_for(pred))
        .await
        .expect("status should be reached in time")
        .expect("status channel should stay open")
        .clone();
    seen
}

async fn finish(rt: &Runtime) {
    tokio::time::timeout(PATIENCE, rt.wait_idle())
        .await
        .expect("run should finish in time");
}

fn sprite_x(rt: &Runtime) -> f32 {
    rt.inspect(|world| world.entity.sprite.x)
}

fn counter(rt: &Runtime) -> f64 {
    rt.inspect(|world| {
        world
            .screen
            .variables
            .get("n")
            .map(Value::as_number)
            .unwrap_or(0.0)
    })
}

#[tokio::test]
async fn repeat_three_moves_thirty() {
    let rt = runtime();
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "REPEAT", "params": {"times": 3}},
            {"type": "MOVE_X", "params": {"amount": 10}},
            {"type": "END_REPEAT"},
        ]),
    );
    finish(&rt).await;

    assert_eq!(sprite_x(&rt), start_x + 30.0);
    let published = rt.entity().borrow().clone();
    assert!(!published.live);
    assert_eq!(published.state.sprite.x, start_x + 30.0);
}

#[tokio::test]
async fn false_condition_runs_the_else_branch() {
    let rt = runtime();
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "IF", "params": {"condition": "never"}},
            {"type": "MOVE_X", "params": {"amount": 5}},
            {"type": "ELSE"},
            {"type": "MOVE_X", "params": {"amount": -5}},
            {"type": "END_IF"},
        ]),
    );
    finish(&rt).await;

    assert_eq!(sprite_x(&rt), start_x - 5.0);
}

#[tokio::test]
async fn forever_runs_until_stopped_and_state_freezes() {
    let rt = runtime();
    start(
        &rt,
        Domain::Screen,
        json!([
            {"type": "FOREVER"},
            {"type": "CHANGE_VARIABLE", "params": {"name": "n", "by": 1}},
            {"type": "END_FOREVER"},
        ]),
    );

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(rt.is_running());
    assert!(rt.stop());
    finish(&rt).await;

    let frozen = counter(&rt);
    assert!(frozen > 0.0);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(counter(&rt), frozen);

    let last = rt.screen().borrow().clone();
    assert!(!last.live);
    assert_eq!(
        last.state.variables.get("n").map(Value::as_number),
        Some(frozen)
    );
    assert!(!rt.stop());
}

#[tokio::test]
async fn start_while_running_is_a_no_op() {
    let rt = runtime();
    let first = start(
        &rt,
        Domain::Screen,
        json!([{"type": "FOREVER"}, {"type": "END_REPEAT"}]),
    );

    let again = rt.start(Domain::Entity, program(json!([{"type": "MOVE_X"}])));
    assert_eq!(again, StartOutcome::AlreadyRunning);
    assert_eq!(rt.status().borrow().run_id, first);

    rt.stop();
    finish(&rt).await;
}

#[tokio::test]
async fn breakpoint_then_step_applies_exactly_one_command() {
    let rt = runtime();
    rt.set_debug_enabled(true);
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "MOVE_X", "params": {"amount": 1}, "id": 1},
            {"type": "MOVE_X", "params": {"amount": 10}, "id": 2, "has_breakpoint": true},
            {"type": "MOVE_X", "params": {"amount": 100}, "id": 3},
        ]),
    );

    let paused = wait_status(&rt, |s| s.phase == RunPhase::Paused).await;
    assert_eq!(paused.command_id, Some(CommandId(2)));
    assert_eq!(sprite_x(&rt), start_x + 1.0);

    assert!(rt.step());
    let paused = wait_status(&rt, |s| {
        s.phase == RunPhase::Paused && s.command_id == Some(CommandId(3))
    })
    .await;
    assert_eq!(paused.pc, Some(2));
    assert_eq!(sprite_x(&rt), start_x + 11.0);

    assert!(rt.resume());
    finish(&rt).await;
    assert_eq!(sprite_x(&rt), start_x + 111.0);
}

#[tokio::test]
async fn stop_releases_a_paused_run() {
    let rt = runtime();
    rt.set_debug_enabled(true);
    start(
        &rt,
        Domain::Entity,
        json!([{"type": "MOVE_X", "has_breakpoint": true}]),
    );

    wait_status(&rt, |s| s.phase == RunPhase::Paused).await;
    assert!(rt.stop());
    finish(&rt).await;
    assert!(!rt.is_running());
}

#[tokio::test]
async fn toggling_a_passed_breakpoint_has_no_effect() {
    let rt = runtime();
    rt.set_debug_enabled(true);
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "MOVE_X", "id": 1},
            {"type": "WAIT", "params": {"seconds": 0.3}, "id": 2},
            {"type": "MOVE_X", "id": 3},
        ]),
    );

    wait_status(&rt, |s| s.command_id == Some(CommandId(2))).await;
    assert_eq!(rt.toggle_breakpoint(CommandId(1)), Ok(true));
    finish(&rt).await;

    assert_eq!(sprite_x(&rt), start_x + 20.0);
}

#[tokio::test]
async fn breakpoint_toggling_reports_unknown_targets() {
    let rt = runtime();
    assert_eq!(
        rt.toggle_breakpoint(CommandId(1)),
        Err(ControlError::NoProgram)
    );

    start(&rt, Domain::Device, json!([{"type": "LED_ON", "id": 4}]));
    finish(&rt).await;

    assert_eq!(
        rt.toggle_breakpoint(CommandId(9)),
        Err(ControlError::UnknownCommand(CommandId(9)))
    );
    assert_eq!(rt.toggle_breakpoint(CommandId(4)), Ok(true));
    assert_eq!(rt.toggle_breakpoint(CommandId(4)), Ok(false));
}

struct FailingSink {
    attempts: AtomicUsize,
}

impl EffectSink for FailingSink {
    fn emit(&self, _effect: Effect) -> Result<(), EffectError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(EffectError::Rejected("speaker unplugged".into()))
    }
}

#[tokio::test]
async fn failing_effect_sink_does_not_halt_the_run() {
    let sink = Arc::new(FailingSink {
        attempts: AtomicUsize::new(0),
    });
    let rt = runtime_with(sink.clone());
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "PLAY_SOUND"},
            {"type": "MOVE_X"},
            {"type": "PLAY_SOUND", "params": {"sound": "coin"}},
            {"type": "MOVE_X"},
        ]),
    );
    finish(&rt).await;

    assert_eq!(sink.attempts.load(Ordering::Relaxed), 2);
    assert_eq!(sprite_x(&rt), start_x + 20.0);
}

#[tokio::test]
async fn speed_scales_waits_and_is_clamped() {
    let rt = runtime();
    assert_eq!(rt.set_speed(100.0), 10.0);
    assert_eq!(rt.set_speed(f64::NAN), 1.0);
    assert_eq!(rt.set_speed(10.0), 10.0);

    let began = Instant::now();
    start(
        &rt,
        Domain::Screen,
        json!([{"type": "WAIT", "params": {"seconds": 1}}]),
    );
    finish(&rt).await;

    assert!(began.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn idle_inputs_publish_immediately_and_drive_conditions() {
    let rt = runtime();
    rt.set_input(Input::Button {
        pin: 2,
        pressed: true,
    });

    let device = rt.device().borrow().clone();
    assert!(!device.live);
    assert_eq!(device.state.inputs.buttons.get(&2), Some(&true));

    start(
        &rt,
        Domain::Device,
        json!([
            {"type": "IF", "params": {"condition": "button_pressed", "pin": 2}},
            {"type": "LED_ON", "params": {"pin": 13}},
            {"type": "ELSE"},
            {"type": "LED_ON", "params": {"pin": 12}},
            {"type": "END_IF"},
        ]),
    );
    finish(&rt).await;

    rt.inspect(|world| {
        assert_eq!(world.device.digital.get(&13), Some(&true));
        assert_eq!(world.device.digital.get(&12), None);
        assert!(world.device.button_pressed(2));
    });
}

#[tokio::test]
async fn run_start_resets_state_but_keeps_the_level() {
    let rt = runtime();
    rt.load_level(Level {
        platforms: vec![Platform {
            x: 0.0,
            y: 300.0,
            width: 480.0,
            height: 20.0,
        }],
    });

    start(
        &rt,
        Domain::Entity,
        json!([{"type": "CHANGE_SCORE", "params": {"by": 7}}]),
    );
    finish(&rt).await;
    assert_eq!(rt.inspect(|w| w.entity.score), 7);

    start(&rt, Domain::Entity, json!([]));
    finish(&rt).await;

    rt.inspect(|world| {
        assert_eq!(world.entity.score, 0);
        assert_eq!(world.entity.level.platforms.len(), 1);
    });
}

#[tokio::test]
async fn projectile_destroys_enemy_during_a_run() {
    let (effect_tx, mut effect_rx) = broadcast::channel::<Effect>(16);
    let rt = runtime_with(Arc::new(effect_tx));

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "SPAWN_ENEMY", "params": {"x": 340, "y": 180, "vx": 0}},
            {"type": "SHOOT"},
            {"type": "WAIT", "params": {"seconds": 1}},
        ]),
    );
    finish(&rt).await;

    rt.inspect(|world| {
        assert_eq!(world.entity.score, 10);
        assert!(world.entity.enemies.is_empty());
        assert!(world.entity.projectiles.is_empty());
    });

    let burst = std::iter::from_fn(|| effect_rx.try_recv().ok()).find(|e| {
        matches!(
            e,
            Effect::ParticleBurst {
                kind: BurstKind::EnemyDown,
                ..
            }
        )
    });
    assert!(burst.is_some());
}

#[tokio::test]
async fn stop_freezes_interpreter_and_physics_with_one_final_frame() {
    let rt = runtime();
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "SET_VELOCITY", "params": {"vx": 40, "vy": 0}},
            {"type": "SPAWN_ENEMY", "params": {"x": 60, "y": 60, "vx": 30}},
            {"type": "FOREVER"},
            {"type": "TURN", "params": {"degrees": 5}},
            {"type": "WAIT", "params": {"seconds": 0.01}},
            {"type": "END_FOREVER"},
        ]),
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(sprite_x(&rt) > start_x);

    // Nothing else runs on this thread until the next await.
    assert!(rt.stop());
    let at_stop = rt.frames();
    finish(&rt).await;
    assert_eq!(rt.frames(), at_stop + 1);

    let frozen = rt.inspect(|world| world.entity.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(rt.inspect(|world| world.entity.clone()), frozen);
    assert_eq!(rt.frames(), at_stop + 1);

    let last = rt.entity().borrow().clone();
    assert!(!last.live);
    assert_eq!(last.frame, at_stop + 1);
    assert_eq!(last.state, frozen);
}

#[tokio::test]
async fn huge_wait_at_low_speed_keeps_waiting() {
    let rt = runtime();
    assert_eq!(rt.set_speed(0.1), 0.1);

    start(
        &rt,
        Domain::Screen,
        json!([{"type": "WAIT", "params": {"seconds": 1e19}}]),
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rt.is_running());

    assert!(rt.stop());
    finish(&rt).await;
}

#[tokio::test]
async fn oversized_score_changes_do_not_abort_the_run() {
    let rt = runtime();
    let start_x = sprite_x(&rt);

    start(
        &rt,
        Domain::Entity,
        json!([
            {"type": "CHANGE_SCORE", "params": {"by": 1e19}},
            {"type": "CHANGE_SCORE", "params": {"by": 1}},
            {"type": "MOVE_X", "params": {"amount": 10}},
        ]),
    );
    finish(&rt).await;

    rt.inspect(|world| {
        assert_eq!(world.entity.score, i64::MAX);
        assert_eq!(world.entity.sprite.x, start_x + 10.0);
    });
}
