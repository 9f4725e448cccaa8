//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, owned by the game state
//! - Fixed-capacity stores, no allocation while ticking

pub mod ai;
pub mod collision;
pub mod rng;
pub mod state;
pub mod store;
pub mod tick;
pub mod whirlpool;
pub mod worldgen;

pub use collision::{CollisionReport, check_collisions};
pub use rng::Lcg32;
pub use state::{
    EnemyBody, EnemyHard, EnemyKind, EnemySimple, GameState, Obstacle, ObstacleKind, Player,
    Projectile, Strategy, direction_quadrant,
};
pub use store::{FixedStore, Removed};
pub use tick::{Button, TickEvents, TickInput, tick};
pub use whirlpool::{Teleport, Whirlpool, WhirlpoolField};
pub use worldgen::{SegmentReport, generate_segment};
