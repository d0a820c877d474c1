// Gameplay tuning for the entity domain.

pub mod projectile;
pub mod sprite;
