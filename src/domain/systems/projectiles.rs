use crate::domain::state::{BurstKind, EntityState};
use crate::domain::systems::TickEvent;
use crate::domain::tuning::projectile::ProjectileTuning;
use crate::domain::tuning::sprite::SpriteTuning;

pub fn tick_projectiles(
    entity: &mut EntityState,
    dt: f32,
    cfg: &ProjectileTuning,
    stage: &SpriteTuning,
    events: &mut Vec<TickEvent>,
) {
    // Integrate projectile movement and lifetimes.
    for p in entity.projectiles.iter_mut() {
        p.x += p.vx * dt;
        p.y += p.vy * dt;
        p.ttl -= dt;
    }

    // Cull expired and off-stage projectiles.
    entity.projectiles.retain(|p| {
        p.ttl > 0.0 && p.x >= 0.0 && p.x <= stage.stage_width && p.y >= 0.0 && p.y <= stage.stage_height
    });

    // Projectile vs enemy (naive O(P*E), fine at block-program scale).
    // Each projectile and each enemy take part in at most one hit.
    let hit_radius = cfg.radius + cfg.enemy_radius;
    let hit_radius_sq = hit_radius * hit_radius;
    let mut spent: Vec<u64> = Vec::new();
    let mut killed: Vec<u64> = Vec::new();
    let mut bursts: Vec<(f32, f32)> = Vec::new();

    for p in &entity.projectiles {
        let target = entity
            .enemies
            .iter()
            .filter(|e| !killed.contains(&e.id))
            .find(|e| {
                let dx = e.x - p.x;
                let dy = e.y - p.y;
                dx * dx + dy * dy <= hit_radius_sq
            });

        if let Some(e) = target {
            killed.push(e.id);
            spent.push(p.id);
            events.push(TickEvent::EnemyDown {
                enemy_id: e.id,
                projectile_id: p.id,
                x: e.x,
                y: e.y,
            });
            bursts.push((e.x, e.y));
        }
    }

    if killed.is_empty() {
        return;
    }

    entity.projectiles.retain(|p| !spent.contains(&p.id));
    entity.enemies.retain(|e| !killed.contains(&e.id));
    for (x, y) in bursts {
        entity.push_burst(x, y, BurstKind::EnemyDown, stage.burst_ttl);
    }
    let earned = cfg.kill_score.saturating_mul(killed.len() as i64);
    entity.score = entity.score.saturating_add(earned);
}
