//! Game state and entity types
//!
//! Everything the tick mutates lives in one [`GameState`] block made of
//! fixed-capacity stores. Entities are plain `Copy` records; removal from any
//! store is swap-remove.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::Lcg32;
use super::store::{FixedStore, Removed};
use super::whirlpool::WhirlpoolField;
use crate::consts::*;
use crate::settings::{Settings, WorldSettings};

/// Enemy behaviour mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Follow generated waypoints (hard) or wander (simple)
    #[default]
    Patrol,
    /// Steer straight at a visible player
    Attack,
    /// Lead a visible player and keep pursuing after losing sight
    Aggressive,
}

/// Enemy kind as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Simple = 0,
    Hard = 1,
}

impl EnemyKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(EnemyKind::Simple),
            1 => Some(EnemyKind::Hard),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn radius(self) -> f32 {
        match self {
            EnemyKind::Simple => COLLISION_RADIUS_ENEMY_SIMPLE,
            EnemyKind::Hard => COLLISION_RADIUS_ENEMY_HARD,
        }
    }

    /// Damage dealt to the player on ramming contact
    pub fn contact_damage(self) -> i16 {
        match self {
            EnemyKind::Simple => ENEMY_SIMPLE_TORPEDO_DAMAGE,
            EnemyKind::Hard => ENEMY_HARD_TORPEDO_DAMAGE,
        }
    }
}

/// Obstacle kind as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObstacleKind {
    #[default]
    Island = 0,
    ShoreLeft = 1,
    ShoreRight = 2,
}

impl ObstacleKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ObstacleKind::Island),
            1 => Some(ObstacleKind::ShoreLeft),
            2 => Some(ObstacleKind::ShoreRight),
            _ => None,
        }
    }
}

/// The player's ship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    /// Degrees, clamped to `±PLAYER_MAX_ANGLE`; positive turns right
    pub hull_angle: f32,
    pub base_speed: f32,
    pub health: i16,
    pub max_health: i16,
    pub shoot_cooldown: u16,
    pub score: u32,
    pub radius: f32,
}

impl Player {
    pub fn spawn() -> Self {
        Self {
            pos: Vec2::new(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT - PLAYER_SPAWN_BOTTOM_OFFSET),
            hull_angle: 0.0,
            base_speed: PLAYER_BASE_SPEED,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            shoot_cooldown: 0,
            score: 0,
            radius: COLLISION_RADIUS_PLAYER,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn take_damage(&mut self, amount: i16) {
        self.health = self.health.saturating_sub(amount);
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::spawn()
    }
}

/// Coarse facing used by the host to pick a sprite: 0 up, 1 right, 2 down, 3 left
pub fn direction_quadrant(vel: Vec2) -> u8 {
    if vel.x.abs() > vel.y.abs() * 0.7 {
        if vel.x > 0.0 { 1 } else { 3 }
    } else if vel.y < 0.0 {
        0
    } else {
        2
    }
}

/// Basic enemy boat: single aimed shots, wanders when the player is out of sight
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnemySimple {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians
    pub target_angle: f32,
    pub health: i8,
    pub max_health: i8,
    pub shoot_cooldown: u16,
    pub shoot_delay: u16,
    pub radius: f32,
    pub points: u16,
    /// Dormant enemies neither move nor collide until the player comes near
    pub active: bool,
    pub alive: bool,
    pub strategy: Strategy,
    pub wander_angle: f32,
    pub wander_timer: u16,
    /// Ticks left holding `target_angle` after a blocked move
    pub evade_timer: u16,
}

impl EnemySimple {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            target_angle: std::f32::consts::FRAC_PI_2,
            health: ENEMY_SIMPLE_HEALTH,
            max_health: ENEMY_SIMPLE_HEALTH,
            shoot_cooldown: ENEMY_SIMPLE_SHOOT_DELAY,
            shoot_delay: ENEMY_SIMPLE_SHOOT_DELAY,
            radius: COLLISION_RADIUS_ENEMY_SIMPLE,
            points: ENEMY_SIMPLE_POINTS,
            active: false,
            alive: true,
            strategy: Strategy::Attack,
            wander_angle: 0.0,
            wander_timer: 0,
            evade_timer: 0,
        }
    }
}

/// Armoured gunboat: 3-shot fans, waypoint patrols, leading pursuit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnemyHard {
    pub pos: Vec2,
    pub vel: Vec2,
    pub target_angle: f32,
    pub health: i8,
    pub max_health: i8,
    pub shoot_cooldown: u16,
    pub shoot_delay: u16,
    pub radius: f32,
    pub points: u16,
    pub active: bool,
    pub alive: bool,
    pub strategy: Strategy,
    /// Ticks left on the hit flash
    pub armor_timer: u16,
    /// Ticks left chasing the last known heading
    pub pursuit_timer: u16,
    pub pursuit_direction: f32,
    pub wander_angle: f32,
    pub wander_timer: u16,
    pub evade_timer: u16,
    pub patrol_points: [Vec2; ENEMY_HARD_PATROL_POINTS_MAX],
    pub patrol_count: u8,
    pub patrol_index: u8,
}

impl EnemyHard {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            target_angle: std::f32::consts::FRAC_PI_2,
            health: ENEMY_HARD_HEALTH,
            max_health: ENEMY_HARD_HEALTH,
            shoot_cooldown: ENEMY_HARD_SHOOT_DELAY,
            shoot_delay: ENEMY_HARD_SHOOT_DELAY,
            radius: COLLISION_RADIUS_ENEMY_HARD,
            points: ENEMY_HARD_POINTS,
            active: false,
            alive: true,
            strategy: Strategy::Aggressive,
            armor_timer: 0,
            pursuit_timer: 0,
            pursuit_direction: 0.0,
            wander_angle: 0.0,
            wander_timer: 0,
            evade_timer: 0,
            patrol_points: [Vec2::ZERO; ENEMY_HARD_PATROL_POINTS_MAX],
            patrol_count: 0,
            patrol_index: 0,
        }
    }

    /// Active patrol waypoints
    pub fn patrol_route(&self) -> &[Vec2] {
        &self.patrol_points[..usize::from(self.patrol_count)]
    }
}

/// Fields shared by both enemy kinds
pub trait EnemyBody {
    const KIND: EnemyKind;

    fn pos(&self) -> Vec2;
    fn vel(&self) -> Vec2;
    fn radius(&self) -> f32;
    fn health(&self) -> i8;
    fn is_alive(&self) -> bool;
    fn is_active(&self) -> bool;

    /// Only awake, living enemies collide, shoot or get reported
    fn is_engaged(&self) -> bool {
        self.is_alive() && self.is_active()
    }
}

macro_rules! impl_enemy_body {
    ($ty:ty, $kind:expr) => {
        impl EnemyBody for $ty {
            const KIND: EnemyKind = $kind;

            fn pos(&self) -> Vec2 {
                self.pos
            }
            fn vel(&self) -> Vec2 {
                self.vel
            }
            fn radius(&self) -> f32 {
                self.radius
            }
            fn health(&self) -> i8 {
                self.health
            }
            fn is_alive(&self) -> bool {
                self.alive
            }
            fn is_active(&self) -> bool {
                self.active
            }
        }
    };
}

impl_enemy_body!(EnemySimple, EnemyKind::Simple);
impl_enemy_body!(EnemyHard, EnemyKind::Hard);

/// A shell in flight
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Radians
    pub angle: f32,
    pub speed: f32,
    /// Ticks left to live
    pub lifetime: u16,
    pub radius: f32,
    pub is_player_shot: bool,
    pub active: bool,
}

impl Projectile {
    pub fn new(pos: Vec2, angle: f32, speed: f32, is_player_shot: bool) -> Self {
        Self {
            pos,
            angle,
            speed,
            lifetime: PROJECTILE_LIFETIME,
            radius: PROJECTILE_RADIUS,
            is_player_shot,
            active: true,
        }
    }
}

/// Static island or shore segment
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec2,
    pub radius: f32,
    pub kind: ObstacleKind,
    pub active: bool,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            kind,
            active: true,
        }
    }
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    pub player: Player,
    pub enemies_simple: FixedStore<EnemySimple, MAX_ENEMIES_SIMPLE>,
    pub enemies_hard: FixedStore<EnemyHard, MAX_ENEMIES_HARD>,
    pub projectiles: FixedStore<Projectile, MAX_PROJECTILES>,
    pub obstacles: FixedStore<Obstacle, MAX_OBSTACLES>,
    pub whirlpools: WhirlpoolField,
    pub camera_y: f32,
    /// Lowest Y procedural generation has reached
    pub world_top: f32,
    pub running: bool,
    pub frame_counter: u32,
    #[serde(skip)]
    pub rng: Lcg32,
    #[serde(skip)]
    pub world: WorldSettings,
    #[serde(skip)]
    seed: u32,
}

impl GameState {
    /// Fresh game: player at spawn, empty stores, camera on the player
    pub fn new(settings: &Settings) -> Self {
        let player = Player::spawn();
        let mut state = Self {
            player,
            enemies_simple: FixedStore::new(),
            enemies_hard: FixedStore::new(),
            projectiles: FixedStore::new(),
            obstacles: FixedStore::new(),
            whirlpools: WhirlpoolField::new(settings.whirlpool.clone()),
            camera_y: 0.0,
            world_top: player.pos.y - 2.0 * SCREEN_HEIGHT,
            running: true,
            frame_counter: 0,
            rng: Lcg32::new(settings.seed),
            world: settings.world.clone(),
            seed: settings.seed,
        };
        state.update_camera();
        log::info!(
            "Game initialized (seed {}, player at {:.0},{:.0})",
            settings.seed,
            state.player.pos.x,
            state.player.pos.y
        );
        state
    }

    /// Tear everything down and start over with the same configuration
    pub fn reset(&mut self) {
        let settings = Settings {
            seed: self.seed,
            world: self.world.clone(),
            whirlpool: self.whirlpools.cfg.clone(),
            ..Settings::default()
        };
        *self = Self::new(&settings);
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn update_camera(&mut self) {
        self.camera_y = self.player.pos.y - SCREEN_HEIGHT + CAMERA_OFFSET;
    }

    /// Spawn a dormant enemy with its kind's default stats.
    /// Returns false (and changes nothing) when that store is full.
    pub fn add_enemy(&mut self, kind: EnemyKind, pos: Vec2) -> bool {
        let added = match kind {
            EnemyKind::Simple => self.enemies_simple.push(EnemySimple::new(pos)).is_ok(),
            EnemyKind::Hard => self.enemies_hard.push(EnemyHard::new(pos)).is_ok(),
        };
        if !added {
            log::debug!("{kind:?} enemy store full, dropping spawn");
        }
        added
    }

    pub fn add_obstacle(&mut self, kind: ObstacleKind, pos: Vec2, radius: f32) -> bool {
        self.obstacles
            .push(Obstacle::new(kind, pos, radius))
            .is_ok()
    }

    pub fn add_whirlpool(&mut self, pos: Vec2) -> bool {
        self.whirlpools.add(pos)
    }

    pub fn spawn_projectile(&mut self, projectile: Projectile) -> bool {
        self.projectiles.push(projectile).is_ok()
    }

    /// Swap-remove an enemy. `Some(true)` means another enemy moved into
    /// `index`; `None` means the index was out of range.
    pub fn remove_enemy(&mut self, kind: EnemyKind, index: usize) -> Option<bool> {
        match kind {
            EnemyKind::Simple => self.enemies_simple.swap_remove(index).map(|r| r.swapped),
            EnemyKind::Hard => self.enemies_hard.swap_remove(index).map(|r| r.swapped),
        }
    }

    pub fn remove_projectile(&mut self, index: usize) -> Option<Removed<Projectile>> {
        self.projectiles.swap_remove(index)
    }

    pub fn remove_obstacle(&mut self, index: usize) -> Option<Removed<Obstacle>> {
        self.obstacles.swap_remove(index)
    }

    /// Drop every enemy, obstacle and whirlpool with `y > threshold_y`.
    /// Returns the number of entities removed.
    pub fn cleanup_old(&mut self, threshold_y: f32) -> usize {
        let removed = self.enemies_simple.retain(|e| e.pos.y <= threshold_y)
            + self.enemies_hard.retain(|e| e.pos.y <= threshold_y)
            + self.obstacles.retain(|o| o.pos.y <= threshold_y)
            + self.whirlpools.cleanup(threshold_y);
        if removed > 0 {
            log::debug!("Cleanup past y={threshold_y:.0} removed {removed} entities");
        }
        removed
    }

    /// Pressure release when an add would fail: evict everything shortly
    /// behind the player and nearly-expired projectiles, then the single
    /// farthest-behind entry of any store that is still full.
    pub fn emergency_cleanup(&mut self) -> usize {
        let behind = self.player.pos.y + EMERGENCY_BEHIND_MARGIN;
        let mut removed = self.cleanup_old(behind);
        removed += self
            .projectiles
            .retain(|p| p.lifetime >= EMERGENCY_PROJECTILE_LIFETIME);

        removed += evict_farthest_behind(&mut self.enemies_simple, |e| e.pos.y);
        removed += evict_farthest_behind(&mut self.enemies_hard, |e| e.pos.y);
        removed += evict_farthest_behind(&mut self.obstacles, |o| o.pos.y);
        removed += evict_farthest_behind(&mut self.projectiles, |p| p.pos.y);

        log::warn!("Emergency cleanup evicted {removed} entities");
        removed
    }

    pub fn total_enemies(&self) -> usize {
        self.enemies_simple.len() + self.enemies_hard.len()
    }
}

/// Evict the entry with the greatest Y, only if the store is full
fn evict_farthest_behind<T: Copy + Default, const N: usize>(
    store: &mut FixedStore<T, N>,
    y: impl Fn(&T) -> f32,
) -> usize {
    if !store.is_full() {
        return 0;
    }
    let victim = store
        .iter()
        .enumerate()
        .max_by(|a, b| y(a.1).total_cmp(&y(b.1)))
        .map(|(i, _)| i);
    match victim.and_then(|i| store.swap_remove(i)) {
        Some(_) => 1,
        None => 0,
    }
}
