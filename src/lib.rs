//! Sea Defenders - firmware core of a scrolling naval arcade game
//!
//! Core modules:
//! - `sim`: Fixed-capacity entity stores and the deterministic per-tick simulation
//! - `protocol`: Framed serial protocol (CRC-8, DMA ring parser, state snapshots)
//! - `settings`: Tunable configuration loaded from JSON
//! - `bench`: Main-loop frame timing and load report
//!
//! The world scrolls toward negative Y: the player advances by decreasing Y and
//! anything with a larger Y than the player is behind it.

pub mod bench;
pub mod protocol;
pub mod settings;
pub mod sim;

pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, all per-tick speeds are tuned for it)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Visible playfield
    pub const SCREEN_WIDTH: f32 = 1200.0;
    pub const SCREEN_HEIGHT: f32 = 800.0;
    /// Camera sits this far above the bottom edge of the player's screen
    pub const CAMERA_OFFSET: f32 = 200.0;
    /// Projectiles further than this outside the visible band are dropped
    pub const VISIBLE_BAND_MARGIN: f32 = 200.0;

    /// Store capacities
    pub const MAX_ENEMIES_SIMPLE: usize = 20;
    pub const MAX_ENEMIES_HARD: usize = 10;
    pub const MAX_PROJECTILES: usize = 40;
    pub const MAX_OBSTACLES: usize = 30;
    pub const MAX_WHIRLPOOLS: usize = 8;

    /// Player (hull angle is in degrees)
    pub const PLAYER_SPAWN_BOTTOM_OFFSET: f32 = 150.0;
    pub const PLAYER_BASE_SPEED: f32 = 3.0;
    pub const PLAYER_MAX_HEALTH: i16 = 100;
    pub const PLAYER_MAX_ANGLE: f32 = 45.0;
    pub const PLAYER_ROTATION_SPEED: f32 = 3.0;
    pub const PLAYER_AUTO_RETURN_SPEED: f32 = 1.5;
    pub const PLAYER_SIDE_SPEED_MULTIPLIER: f32 = 3.0;
    pub const PLAYER_EDGE_MARGIN: f32 = 150.0;
    pub const PLAYER_COLLISION_DAMAGE: i16 = 2;
    pub const PLAYER_COLLISION_PUSHBACK: f32 = 15.0;
    pub const PLAYER_SHOOT_COOLDOWN: u16 = 35;
    pub const PLAYER_MIN_ANGLE_FOR_SIDE_SHOT: f32 = 10.0;
    pub const PLAYER_SHOOT_ANGLE_OFFSET: f32 = 30.0;
    pub const COLLISION_RADIUS_PLAYER: f32 = 25.0;

    /// Projectiles
    pub const PROJECTILE_SPEED: f32 = 10.0;
    pub const PROJECTILE_LIFETIME: u16 = 150;
    pub const PROJECTILE_RADIUS: f32 = 5.0;
    pub const PROJECTILE_DAMAGE_TO_PLAYER: i16 = 10;

    /// Simple enemy
    pub const ENEMY_SIMPLE_HEALTH: i8 = 1;
    pub const ENEMY_SIMPLE_SHOOT_DELAY: u16 = 150;
    pub const COLLISION_RADIUS_ENEMY_SIMPLE: f32 = 20.0;
    pub const ENEMY_SIMPLE_POINTS: u16 = 100;
    pub const ENEMY_SIMPLE_BASE_SPEED: f32 = 1.5;
    pub const ENEMY_SIMPLE_TURN_SMOOTHNESS: f32 = 0.1;
    pub const ENEMY_SIMPLE_SEE_RANGE_X: f32 = 400.0;
    pub const ENEMY_SIMPLE_SEE_RANGE_Y: f32 = 500.0;
    pub const ENEMY_SIMPLE_PROJECTILE_SPEED: f32 = 6.0;
    pub const ENEMY_SIMPLE_TORPEDO_DAMAGE: i16 = 20;
    pub const ENEMY_SIMPLE_ATTACK_CHANCE: f32 = 0.6;
    /// Simple enemies are clamped this far from the screen edges
    pub const ENEMY_SIMPLE_EDGE_LIMIT: f32 = 120.0;

    /// Hard enemy
    pub const ENEMY_HARD_HEALTH: i8 = 3;
    pub const ENEMY_HARD_SHOOT_DELAY: u16 = 240;
    pub const COLLISION_RADIUS_ENEMY_HARD: f32 = 30.0;
    pub const ENEMY_HARD_POINTS: u16 = 300;
    pub const ENEMY_HARD_BASE_SPEED: f32 = 2.0;
    pub const ENEMY_HARD_TURN_SMOOTHNESS: f32 = 0.08;
    pub const ENEMY_HARD_SEE_RANGE_X: f32 = 500.0;
    pub const ENEMY_HARD_SEE_RANGE_Y: f32 = 600.0;
    pub const ENEMY_HARD_PROJECTILE_SPEED: f32 = 7.0;
    /// Angle between shots of the 3-shot fan (radians)
    pub const ENEMY_HARD_PROJECTILE_SPREAD: f32 = 0.26;
    pub const ENEMY_HARD_TORPEDO_DAMAGE: i16 = 35;
    pub const ENEMY_HARD_AGGRESSIVE_CHANCE: f32 = 0.5;
    pub const ENEMY_HARD_ARMOR_FLASH_DURATION: u16 = 20;
    pub const ENEMY_HARD_PURSUIT_TIMER: u16 = 120;
    pub const ENEMY_HARD_PATROL_POINTS_MAX: usize = 5;
    pub const ENEMY_HARD_MIN_PATROL_DISTANCE: f32 = 50.0;
    /// Hard enemies are clamped to the shore line
    pub const ENEMY_HARD_EDGE_LIMIT: f32 = SHORE_WIDTH;

    /// Patrol route tuning
    pub const PATROL_START_LEAD: f32 = 200.0;
    pub const PATROL_STEP_MIN: i32 = 400;
    pub const PATROL_STEP_MAX: i32 = 800;
    pub const PATROL_LATERAL_SPREAD: f32 = 300.0;
    pub const PATROL_EDGE_MARGIN: f32 = 300.0;
    /// Waypoints closer than this to the player are pushed away from it
    pub const PATROL_PLAYER_CLEARANCE: f32 = 300.0;

    /// Aggressive pursuit leads the player by this much per unit of hull turn
    pub const AGGRESSIVE_LEAD_X: f32 = 50.0;
    pub const AGGRESSIVE_LEAD_Y: f32 = 50.0;

    /// Wandering
    pub const WANDER_MAX_ANGLE_DEG: f32 = 30.0;
    pub const SIMPLE_WANDER_TICKS: (u16, u16) = (90, 180);
    pub const HARD_WANDER_TICKS: (u16, u16) = (180, 300);
    /// Ticks an enemy holds its escape heading after hitting an obstacle or edge
    pub const ENEMY_EVADE_TICKS: u16 = 30;

    /// Shores
    pub const SHORE_WIDTH: f32 = 150.0;
    pub const SHORE_EDGE_MARGIN: f32 = 200.0;

    /// Enemies wake up when the player comes within this distance
    pub const ENEMY_ACTIVATION_RANGE: f32 = SCREEN_HEIGHT;
    /// Objects further than this behind the player are deleted
    pub const ENEMY_DELETE_DISTANCE: f32 = 1000.0;
    /// Ticks between automatic clean-up passes
    pub const AUTO_CLEANUP_INTERVAL: u32 = 60;

    /// Emergency clean-up evicts enemies/obstacles this far behind the player
    pub const EMERGENCY_BEHIND_MARGIN: f32 = 300.0;
    /// ...and projectiles with less than this many ticks to live
    pub const EMERGENCY_PROJECTILE_LIFETIME: u16 = 90;

    /// Accepted ranges for host-supplied obstacles
    pub const OBSTACLE_MAX_RADIUS: f32 = 400.0;
    pub const WORLD_MAX_ABS_Y: f32 = 10_000_000.0;

    /// Whirlpool animation
    pub const WHIRLPOOL_ROTATION_SPEED: f32 = 8.0;
    pub const WHIRLPOOL_ANIMATION_SPEED: f32 = 0.1;
}

/// Normalized angle to [-π, π]
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}

/// Unit vector pointing along `angle` (radians, screen coordinates)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Circle-circle overlap. Exact tangency does not count.
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    distance(a, b) < radius_a + radius_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI) + PI).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tangent_circles_do_not_overlap() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert!(!circles_overlap(a, 5.0, b, 5.0));
        assert!(circles_overlap(a, 5.0, b, 5.01));
        assert!(circles_overlap(a, 1.0, a, 1.0));
    }
}
