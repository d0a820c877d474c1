use crate::domain::state::{EntityState, Platform};
use crate::domain::tuning::sprite::SpriteTuning;

/// Integrates the sprite for one tick: gravity, friction, platforms, then stage clamping.
pub fn tick_sprite(entity: &mut EntityState, dt: f32, cfg: &SpriteTuning) {
    if entity.defeated {
        return;
    }

    let gravity = entity.gravity;
    let s = &mut entity.sprite;
    let radius = cfg.radius * s.scale;
    let prev_bottom = s.y + radius;

    if gravity {
        s.vy += cfg.gravity * dt;
    }

    s.x += s.vx * dt;
    s.y += s.vy * dt;

    // friction only matters for platformer-style runs
    if gravity {
        let keep = if s.on_ground {
            cfg.ground_friction
        } else {
            cfg.air_friction
        };
        s.vx *= keep.powf(dt);
        if s.vx.abs() < 1.0 {
            s.vx = 0.0;
        }
    }

    s.on_ground = false;

    if s.vy >= 0.0 {
        if let Some(top) = landing_platform(&entity.level.platforms, s.x, prev_bottom, s.y + radius)
        {
            s.y = top - radius;
            s.vy = 0.0;
            s.on_ground = true;
        }
    }

    // ground
    if s.y + radius >= cfg.stage_height {
        s.y = cfg.stage_height - radius;
        s.vy = s.vy.min(0.0);
        s.on_ground = true;
    }

    // ceiling
    if s.y - radius < 0.0 {
        s.y = radius;
        s.vy = s.vy.max(0.0);
    }

    // walls
    if s.x - radius < 0.0 {
        s.x = radius;
        s.vx = s.vx.max(0.0);
    } else if s.x + radius > cfg.stage_width {
        s.x = cfg.stage_width - radius;
        s.vx = s.vx.min(0.0);
    }
}

/// Top edge of the platform the sprite's bottom crossed this tick, if any.
fn landing_platform(platforms: &[Platform], x: f32, prev_bottom: f32, bottom: f32) -> Option<f32> {
    platforms
        .iter()
        .filter(|p| x >= p.x && x <= p.x + p.width)
        .filter(|p| prev_bottom <= p.y && bottom >= p.y)
        .map(|p| p.y)
        .reduce(f32::min)
}

/// Enemies patrol horizontally and bounce off the stage walls.
pub fn tick_enemies(entity: &mut EntityState, dt: f32, cfg: &SpriteTuning) {
    for e in &mut entity.enemies {
        e.x += e.vx * dt;
        if e.x < 0.0 {
            e.x = 0.0;
            e.vx = e.vx.abs();
        } else if e.x > cfg.stage_width {
            e.x = cfg.stage_width;
            e.vx = -e.vx.abs();
        }
    }
}
