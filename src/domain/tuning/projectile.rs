/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Default projectile speed in pixels per second.
    pub speed: f32,

    /// Lifetime in seconds before the projectile is despawned.
    pub life_time: f32,

    /// Collision radius in pixels.
    pub radius: f32,

    /// Enemy collision radius in pixels.
    pub enemy_radius: f32,

    /// Score awarded per enemy destroyed by a projectile.
    pub kill_score: i64,

    /// Score awarded per collectible picked up.
    pub pickup_score: i64,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 300.0,
            life_time: 2.0,
            radius: 4.0,
            enemy_radius: 14.0,
            kill_score: 10,
            pickup_score: 5,
        }
    }
}
