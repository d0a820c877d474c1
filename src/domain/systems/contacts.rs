use crate::domain::state::{BurstKind, EntityState};
use crate::domain::systems::TickEvent;
use crate::domain::tuning::projectile::ProjectileTuning;
use crate::domain::tuning::sprite::SpriteTuning;

pub fn touching_edge(entity: &EntityState, cfg: &SpriteTuning) -> bool {
    let s = &entity.sprite;
    let r = cfg.radius * s.scale;
    s.x - r <= 0.0 || s.x + r >= cfg.stage_width || s.y - r <= 0.0 || s.y + r >= cfg.stage_height
}

pub fn touching_enemy(entity: &EntityState, cfg: &SpriteTuning) -> bool {
    let reach = cfg.radius * entity.sprite.scale + cfg.pickup_radius;
    entity
        .enemies
        .iter()
        .any(|e| within(entity.sprite.x, entity.sprite.y, e.x, e.y, reach))
}

fn within(ax: f32, ay: f32, bx: f32, by: f32, reach: f32) -> bool {
    let dx = ax - bx;
    let dy = ay - by;
    dx * dx + dy * dy <= reach * reach
}

/// Sprite vs enemy and sprite vs collectible.
pub fn tick_contacts(
    entity: &mut EntityState,
    dt: f32,
    cfg: &SpriteTuning,
    scoring: &ProjectileTuning,
    events: &mut Vec<TickEvent>,
) {
    entity.invincibility = (entity.invincibility - dt).max(0.0);
    if entity.defeated {
        return;
    }

    let (sx, sy) = (entity.sprite.x, entity.sprite.y);
    let reach = cfg.radius * entity.sprite.scale + cfg.pickup_radius;

    if entity.invincibility <= 0.0 {
        let attacker = entity
            .enemies
            .iter()
            .find(|e| within(sx, sy, e.x, e.y, reach))
            .map(|e| (e.id, e.x));

        if let Some((enemy_id, ex)) = attacker {
            entity.health -= 1;
            entity.invincibility = cfg.invincibility;

            let dir = if sx >= ex { 1.0 } else { -1.0 };
            entity.sprite.vx = dir * cfg.knockback;
            entity.sprite.vy = -cfg.knockback * 0.5;

            if entity.health <= 0 {
                entity.health = 0;
                entity.defeated = true;
                entity.sprite.vx = 0.0;
                entity.sprite.vy = 0.0;
            }

            events.push(TickEvent::Hurt {
                enemy_id,
                health: entity.health,
                x: sx,
                y: sy,
            });
            entity.push_burst(sx, sy, BurstKind::Hurt, cfg.burst_ttl);
        }
    }

    let picked: Vec<(u64, f32, f32)> = entity
        .collectibles
        .iter()
        .filter(|c| within(sx, sy, c.x, c.y, reach))
        .map(|c| (c.id, c.x, c.y))
        .collect();

    if picked.is_empty() {
        return;
    }

    entity
        .collectibles
        .retain(|c| !picked.iter().any(|(id, _, _)| *id == c.id));
    let earned = scoring.pickup_score.saturating_mul(picked.len() as i64);
    entity.score = entity.score.saturating_add(earned);
    for (id, x, y) in picked {
        events.push(TickEvent::Pickup {
            collectible_id: id,
            x,
            y,
        });
        entity.push_burst(x, y, BurstKind::Pickup, cfg.burst_ttl);
    }
}
