/// Gameplay tuning for the player sprite and the stage it lives on.
///
/// Keep this separate from runtime configuration (tick rates, slice lengths, etc.).

#[derive(Debug, Clone, Copy)]
pub struct SpriteTuning {
    /// Stage width in pixels; x grows to the right.
    pub stage_width: f32,

    /// Stage height in pixels; y grows downwards, the ground is the bottom edge.
    pub stage_height: f32,

    /// Where a fresh run places the sprite.
    pub spawn_x: f32,
    pub spawn_y: f32,

    /// Collision radius in pixels at scale 1.
    pub radius: f32,

    /// Downward acceleration in pixels per second squared.
    pub gravity: f32,

    /// Fraction of horizontal velocity kept per second while grounded.
    pub ground_friction: f32,

    /// Fraction of horizontal velocity kept per second while airborne.
    pub air_friction: f32,

    pub max_health: i32,

    /// Seconds of invulnerability after an enemy hit.
    pub invincibility: f32,

    /// Velocity applied away from the enemy on hit.
    pub knockback: f32,

    /// Enemy and collectible collision radius.
    pub pickup_radius: f32,

    /// Shake decay in amount per second.
    pub shake_decay: f32,

    /// Lifetime of a particle burst in seconds.
    pub burst_ttl: f32,
}

impl Default for SpriteTuning {
    fn default() -> Self {
        Self {
            stage_width: 480.0,
            stage_height: 360.0,
            spawn_x: 240.0,
            spawn_y: 180.0,
            radius: 16.0,
            gravity: 900.0,
            ground_friction: 0.02,
            air_friction: 0.6,
            max_health: 3,
            invincibility: 1.0,
            knockback: 220.0,
            pickup_radius: 14.0,
            shake_decay: 30.0,
            burst_ttl: 0.5,
        }
    }
}
