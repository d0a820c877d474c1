// Fixed-rate physics for the entity domain, racing the interpreter on the same store.

use crate::domain::Effect;
use crate::domain::state::BurstKind;
use crate::domain::systems::{TickEvent, tick_entity};
use crate::use_cases::context::RunContext;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub async fn physics_loop(ctx: Arc<RunContext>) {
    let mut tick: u64 = 0;
    let mut stop = ctx.stop_signal();

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(ctx.settings.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = ctx.settings.tick_interval.as_secs_f32();

    loop {
        tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => break,
            _ = interval.tick() => {}
        }

        // Frozen while the debugger holds the interpreter.
        if ctx.debugger.is_paused() {
            continue;
        }

        // The whole tick runs under one lock; the stop flag is checked inside it.
        let events = ctx.store.write(|world| {
            (!ctx.is_stopped()).then(|| tick_entity(&mut world.entity, dt, &ctx.physics))
        });
        let Some(events) = events else {
            break;
        };
        tick += 1;

        for event in events {
            report(&ctx, event);
        }
    }

    debug!(ticks = tick, "physics loop exited");
}

fn report(ctx: &RunContext, event: TickEvent) {
    let burst = match event {
        TickEvent::EnemyDown {
            enemy_id,
            projectile_id,
            x,
            y,
        } => {
            info!(enemy_id, projectile_id, "enemy destroyed");
            Effect::ParticleBurst {
                x,
                y,
                kind: BurstKind::EnemyDown,
            }
        }
        TickEvent::Hurt {
            enemy_id,
            health,
            x,
            y,
        } => {
            info!(enemy_id, health, "sprite hit");
            Effect::ParticleBurst {
                x,
                y,
                kind: BurstKind::Hurt,
            }
        }
        TickEvent::Pickup {
            collectible_id,
            x,
            y,
        } => {
            debug!(collectible_id, "collectible picked up");
            Effect::ParticleBurst {
                x,
                y,
                kind: BurstKind::Pickup,
            }
        }
    };

    if let Err(e) = ctx.effects.emit(burst) {
        warn!(error = %e, "failed to emit particle burst");
    }
}
