// Fixed-step rules for the entity domain. Each function runs a whole tick without suspending.

pub mod contacts;
pub mod movement;
pub mod projectiles;

use crate::domain::state::{BurstKind, EntityState, ParticleBurst};
use crate::domain::tuning::projectile::ProjectileTuning;
use crate::domain::tuning::sprite::SpriteTuning;

/// Gameplay-relevant things that happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    EnemyDown {
        enemy_id: u64,
        projectile_id: u64,
        x: f32,
        y: f32,
    },
    Hurt {
        enemy_id: u64,
        health: i32,
        x: f32,
        y: f32,
    },
    Pickup {
        collectible_id: u64,
        x: f32,
        y: f32,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsConfig {
    pub sprite: SpriteTuning,
    pub projectile: ProjectileTuning,
}

impl EntityState {
    pub(crate) fn push_burst(&mut self, x: f32, y: f32, kind: BurstKind, ttl: f32) {
        self.particles.push(ParticleBurst { x, y, kind, ttl });
    }
}

/// Advances the entity domain by `dt` seconds.
pub fn tick_entity(entity: &mut EntityState, dt: f32, cfg: &PhysicsConfig) -> Vec<TickEvent> {
    let mut events = Vec::new();

    // Age decorative state first so bursts spawned this tick keep their full lifetime.
    for burst in entity.particles.iter_mut() {
        burst.ttl -= dt;
    }
    entity.particles.retain(|b| b.ttl > 0.0);
    entity.shake = (entity.shake - cfg.sprite.shake_decay * dt).max(0.0);

    movement::tick_sprite(entity, dt, &cfg.sprite);
    movement::tick_enemies(entity, dt, &cfg.sprite);
    projectiles::tick_projectiles(entity, dt, &cfg.projectile, &cfg.sprite, &mut events);
    contacts::tick_contacts(entity, dt, &cfg.sprite, &cfg.projectile, &mut events);

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Enemy, Projectile};

    #[test]
    fn shot_enemy_is_removed_and_burst_fades() {
        let cfg = PhysicsConfig::default();
        let mut entity = EntityState::default();
        entity.enemies.push(Enemy {
            id: 1,
            x: 400.0,
            y: 100.0,
            vx: 0.0,
        });
        entity.projectiles.push(Projectile {
            id: 2,
            x: 380.0,
            y: 100.0,
            vx: 600.0,
            vy: 0.0,
            ttl: 2.0,
        });

        let mut kills = 0;
        for _ in 0..10 {
            kills += tick_entity(&mut entity, 1.0 / 60.0, &cfg)
                .iter()
                .filter(|e| matches!(e, TickEvent::EnemyDown { .. }))
                .count();
        }
        assert_eq!(kills, 1);
        assert_eq!(entity.score, cfg.projectile.kill_score);

        for _ in 0..60 {
            tick_entity(&mut entity, 1.0 / 60.0, &cfg);
        }
        assert!(entity.particles.is_empty());
    }
}
