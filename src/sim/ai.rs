//! Enemy AI
//!
//! Each awake enemy picks a strategic heading from its strategy, lets a local
//! obstacle-avoidance field override it when the repulsion is strong enough,
//! turns a fixed fraction toward the result, then moves and maybe fires.
//! Hitting an obstacle or a screen edge swings the boat onto an escape
//! heading that it holds for a short while before steering resumes.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use rand::Rng;

use super::collision::blocked_by_obstacle;
use super::rng::{Lcg32, chance, range_f32};
use super::state::{
    EnemyHard, EnemyKind, EnemySimple, GameState, Obstacle, Player, Projectile, Strategy,
};
use super::store::FixedStore;
use crate::consts::*;
use crate::{distance, heading, normalize_angle};

type Projectiles = FixedStore<Projectile, MAX_PROJECTILES>;

/// Repulsion below this magnitude leaves the strategic heading alone
pub const AVOIDANCE_THRESHOLD: f32 = 0.1;

/// Half-width of the inward cone an enemy turns into at a screen edge
const EDGE_ESCAPE_CONE_DEG: f32 = 60.0;

/// Ray-sampled potential field parameters for one enemy kind
#[derive(Debug, Clone, Copy)]
pub struct AvoidanceProfile {
    /// Ray offsets from the current heading (degrees)
    pub rays_deg: &'static [f32],
    pub look_ahead: f32,
    /// Added to obstacle radius when testing a sample point
    pub obstacle_margin: f32,
    pub strength: f32,
    /// Lower bound of `distance / 100` in the falloff
    pub min_falloff: f32,
    /// Sample points this close to the shore line get pushed back
    pub shore_band: f32,
    pub shore_push: f32,
}

pub const SIMPLE_AVOIDANCE: AvoidanceProfile = AvoidanceProfile {
    rays_deg: &[-30.0, 0.0, 30.0],
    look_ahead: 100.0,
    obstacle_margin: 20.0,
    strength: 1.0,
    min_falloff: 0.5,
    shore_band: 20.0,
    shore_push: 1.5,
};

pub const HARD_AVOIDANCE: AvoidanceProfile = AvoidanceProfile {
    rays_deg: &[-45.0, -22.0, 0.0, 22.0, 45.0],
    look_ahead: 150.0,
    obstacle_margin: 30.0,
    strength: 1.2,
    min_falloff: 0.3,
    shore_band: 30.0,
    shore_push: 2.0,
};

/// Summed repulsion from obstacles and shores sampled along the profile's rays
pub fn avoidance_vector(
    pos: Vec2,
    current_heading: f32,
    obstacles: &[Obstacle],
    profile: &AvoidanceProfile,
) -> Vec2 {
    let mut avoid = Vec2::ZERO;
    for offset in profile.rays_deg {
        let sample = pos + heading(current_heading + offset.to_radians()) * profile.look_ahead;

        for obstacle in obstacles.iter().filter(|o| o.active) {
            let away = sample - obstacle.pos;
            let dist = away.length();
            if dist < obstacle.radius + profile.obstacle_margin && dist > 0.0 {
                let falloff = (dist / 100.0).max(profile.min_falloff);
                avoid += away / dist * (profile.strength / falloff);
            }
        }

        if sample.x < SHORE_WIDTH + profile.shore_band {
            avoid.x += profile.shore_push;
        } else if sample.x > SCREEN_WIDTH - SHORE_WIDTH - profile.shore_band {
            avoid.x -= profile.shore_push;
        }
    }
    avoid
}

/// Avoidance wins whenever it is strong enough to matter
pub fn resolve_heading(strategic: f32, avoid: Vec2) -> f32 {
    if avoid.length() > AVOIDANCE_THRESHOLD {
        avoid.y.atan2(avoid.x)
    } else {
        strategic
    }
}

/// Rectangular line-of-sight window around the enemy
pub fn can_see(enemy: Vec2, player: Vec2, range: Vec2) -> bool {
    let d = (player - enemy).abs();
    d.x < range.x && d.y < range.y
}

/// Turn `vel` a fraction of the way toward `target_angle`, keeping `speed`
pub fn steer(vel: Vec2, target_angle: f32, smoothness: f32, speed: f32) -> Vec2 {
    let current = if vel == Vec2::ZERO {
        target_angle
    } else {
        vel.y.atan2(vel.x)
    };
    let turned = current + normalize_angle(target_angle - current) * smoothness;
    heading(turned) * speed
}

/// Per-enemy bookkeeping result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Keep,
    Despawn,
}

fn awake(pos: Vec2, player: &Player) -> bool {
    pos.y > player.pos.y - ENEMY_ACTIVATION_RANGE
}

fn too_far_behind(pos: Vec2, player: &Player) -> bool {
    pos.y > player.pos.y + ENEMY_DELETE_DISTANCE
}

/// Move every enemy one tick. Despawned enemies are swap-removed in place.
pub fn update_enemies(state: &mut GameState, step: f32) {
    let mut i = 0;
    while i < state.enemies_simple.len() {
        let GameState {
            player,
            enemies_simple,
            projectiles,
            obstacles,
            rng,
            ..
        } = &mut *state;
        let fate = update_simple(
            &mut enemies_simple[i],
            player,
            obstacles.as_slice(),
            projectiles,
            rng,
            step,
        );
        if fate == Fate::Despawn {
            state.remove_enemy(EnemyKind::Simple, i);
        } else {
            i += 1;
        }
    }

    let mut i = 0;
    while i < state.enemies_hard.len() {
        let GameState {
            player,
            enemies_hard,
            projectiles,
            obstacles,
            rng,
            ..
        } = &mut *state;
        let fate = update_hard(
            &mut enemies_hard[i],
            player,
            obstacles.as_slice(),
            projectiles,
            rng,
            step,
        );
        if fate == Fate::Despawn {
            state.remove_enemy(EnemyKind::Hard, i);
        } else {
            i += 1;
        }
    }
}

fn update_simple(
    enemy: &mut EnemySimple,
    player: &Player,
    obstacles: &[Obstacle],
    projectiles: &mut Projectiles,
    rng: &mut Lcg32,
    step: f32,
) -> Fate {
    if !enemy.alive {
        return Fate::Keep;
    }
    if !enemy.active {
        if !awake(enemy.pos, player) {
            return Fate::Keep;
        }
        enemy.active = true;
        enemy.strategy = if chance(rng, ENEMY_SIMPLE_ATTACK_CHANCE) {
            Strategy::Attack
        } else {
            Strategy::Patrol
        };
        enemy.vel = Vec2::new(0.0, ENEMY_SIMPLE_BASE_SPEED);
        enemy.target_angle = FRAC_PI_2;
    }
    if too_far_behind(enemy.pos, player) {
        return Fate::Despawn;
    }

    let sees = can_see(
        enemy.pos,
        player.pos,
        Vec2::new(ENEMY_SIMPLE_SEE_RANGE_X, ENEMY_SIMPLE_SEE_RANGE_Y),
    );
    let strategic = if enemy.strategy == Strategy::Attack && sees {
        let to_player = player.pos - enemy.pos;
        to_player.y.atan2(to_player.x)
    } else {
        simple_wander(enemy, rng)
    };
    if enemy.evade_timer > 0 {
        enemy.evade_timer -= 1;
    } else {
        let current = enemy.vel.y.atan2(enemy.vel.x);
        let avoid = avoidance_vector(enemy.pos, current, obstacles, &SIMPLE_AVOIDANCE);
        enemy.target_angle = resolve_heading(strategic, avoid);
        enemy.vel = steer(
            enemy.vel,
            enemy.target_angle,
            ENEMY_SIMPLE_TURN_SMOOTHNESS,
            ENEMY_SIMPLE_BASE_SPEED,
        );
    }

    let blocked = move_enemy(&mut enemy.pos, enemy.vel, enemy.radius, obstacles, rng, step);
    let clamped = clamp_to_edges(&mut enemy.pos, ENEMY_SIMPLE_EDGE_LIMIT, rng);
    if let Some(escape) = clamped.or(blocked) {
        enemy.target_angle = escape;
        enemy.vel = heading(escape) * ENEMY_SIMPLE_BASE_SPEED;
        enemy.evade_timer = ENEMY_EVADE_TICKS;
    }

    enemy.shoot_cooldown = enemy.shoot_cooldown.saturating_sub(1);
    if enemy.shoot_cooldown == 0 && sees && fire_aimed(enemy.pos, player.pos, projectiles) {
        enemy.shoot_cooldown = enemy.shoot_delay;
    }
    Fate::Keep
}

/// Periodic random re-aim around straight down-screen
fn simple_wander(enemy: &mut EnemySimple, rng: &mut Lcg32) -> f32 {
    if enemy.wander_timer == 0 {
        let (min, max) = SIMPLE_WANDER_TICKS;
        enemy.wander_timer = rng.random_range(min..=max);
        let limit = WANDER_MAX_ANGLE_DEG.to_radians();
        enemy.wander_angle = range_f32(rng, -limit, limit);
    } else {
        enemy.wander_timer -= 1;
    }
    FRAC_PI_2 + enemy.wander_angle
}

fn update_hard(
    enemy: &mut EnemyHard,
    player: &Player,
    obstacles: &[Obstacle],
    projectiles: &mut Projectiles,
    rng: &mut Lcg32,
    step: f32,
) -> Fate {
    if !enemy.alive {
        return Fate::Keep;
    }
    if !enemy.active {
        if !awake(enemy.pos, player) {
            return Fate::Keep;
        }
        enemy.active = true;
        enemy.strategy = if chance(rng, ENEMY_HARD_AGGRESSIVE_CHANCE) {
            Strategy::Aggressive
        } else {
            Strategy::Patrol
        };
        enemy.vel = Vec2::new(0.0, ENEMY_HARD_BASE_SPEED);
        enemy.target_angle = FRAC_PI_2;
        if enemy.strategy == Strategy::Patrol {
            generate_patrol_points(enemy, player.pos, rng);
        }
    }
    if too_far_behind(enemy.pos, player) {
        return Fate::Despawn;
    }
    enemy.armor_timer = enemy.armor_timer.saturating_sub(1);

    let sees = can_see(
        enemy.pos,
        player.pos,
        Vec2::new(ENEMY_HARD_SEE_RANGE_X, ENEMY_HARD_SEE_RANGE_Y),
    );
    let strategic = match enemy.strategy {
        Strategy::Patrol => patrol_heading(enemy, player.pos, rng),
        Strategy::Attack | Strategy::Aggressive => pursue_heading(enemy, player, sees, rng),
    };
    if enemy.evade_timer > 0 {
        enemy.evade_timer -= 1;
    } else {
        let current = enemy.vel.y.atan2(enemy.vel.x);
        let avoid = avoidance_vector(enemy.pos, current, obstacles, &HARD_AVOIDANCE);
        enemy.target_angle = resolve_heading(strategic, avoid);
        enemy.vel = steer(
            enemy.vel,
            enemy.target_angle,
            ENEMY_HARD_TURN_SMOOTHNESS,
            ENEMY_HARD_BASE_SPEED,
        );
    }

    let blocked = move_enemy(&mut enemy.pos, enemy.vel, enemy.radius, obstacles, rng, step);
    let clamped = clamp_to_edges(&mut enemy.pos, ENEMY_HARD_EDGE_LIMIT, rng);
    if let Some(escape) = clamped.or(blocked) {
        enemy.target_angle = escape;
        enemy.vel = heading(escape) * ENEMY_HARD_BASE_SPEED;
        enemy.evade_timer = ENEMY_EVADE_TICKS;
    }

    enemy.shoot_cooldown = enemy.shoot_cooldown.saturating_sub(1);
    if enemy.shoot_cooldown == 0 && sees && fire_fan(enemy.pos, player.pos, projectiles) {
        enemy.shoot_cooldown = enemy.shoot_delay;
    }
    Fate::Keep
}

/// Lead a visible player; keep the last heading while the pursuit timer runs
fn pursue_heading(enemy: &mut EnemyHard, player: &Player, sees: bool, rng: &mut Lcg32) -> f32 {
    if sees {
        let predicted = Vec2::new(
            player.pos.x + player.hull_angle / PLAYER_MAX_ANGLE * AGGRESSIVE_LEAD_X,
            player.pos.y - AGGRESSIVE_LEAD_Y,
        );
        let to = predicted - enemy.pos;
        let angle = to.y.atan2(to.x);
        enemy.pursuit_timer = ENEMY_HARD_PURSUIT_TIMER;
        enemy.pursuit_direction = angle;
        return angle;
    }
    if enemy.pursuit_timer > 0 {
        enemy.pursuit_timer -= 1;
        return enemy.pursuit_direction;
    }
    if enemy.wander_timer == 0 {
        let (min, max) = HARD_WANDER_TICKS;
        enemy.wander_timer = rng.random_range(min..=max);
        let limit = WANDER_MAX_ANGLE_DEG.to_radians();
        enemy.wander_angle = range_f32(rng, -limit, limit);
    } else {
        enemy.wander_timer -= 1;
    }
    FRAC_PI_2 + enemy.wander_angle
}

/// Head for the current waypoint, advancing (and regenerating) on arrival
fn patrol_heading(enemy: &mut EnemyHard, player: Vec2, rng: &mut Lcg32) -> f32 {
    if enemy.patrol_index >= enemy.patrol_count {
        generate_patrol_points(enemy, player, rng);
    }
    let mut waypoint = enemy.patrol_points[usize::from(enemy.patrol_index)];
    if distance(enemy.pos, waypoint) < ENEMY_HARD_MIN_PATROL_DISTANCE {
        enemy.patrol_index += 1;
        if enemy.patrol_index >= enemy.patrol_count {
            generate_patrol_points(enemy, player, rng);
        }
        waypoint = enemy.patrol_points[usize::from(enemy.patrol_index)];
    }
    let to = waypoint - enemy.pos;
    to.y.atan2(to.x)
}

/// Build a fresh route of 3-5 waypoints marching down-screen from the enemy,
/// each kept clear of the player
pub fn generate_patrol_points(enemy: &mut EnemyHard, player: Vec2, rng: &mut Lcg32) {
    let mut cursor = Vec2::new(enemy.pos.x, enemy.pos.y + PATROL_START_LEAD);
    let intermediate: usize = rng.random_range(2..=4);
    let count = (intermediate + 1).min(ENEMY_HARD_PATROL_POINTS_MAX);

    for slot in enemy.patrol_points.iter_mut().take(count) {
        let advance = rng.random_range(PATROL_STEP_MIN..=PATROL_STEP_MAX) as f32;
        let lateral = range_f32(rng, -PATROL_LATERAL_SPREAD, PATROL_LATERAL_SPREAD);
        let mut point = Vec2::new(
            (cursor.x + lateral).clamp(PATROL_EDGE_MARGIN, SCREEN_WIDTH - PATROL_EDGE_MARGIN),
            cursor.y + advance,
        );
        let from_player = point - player;
        let dist = from_player.length();
        if dist > 0.0 && dist < PATROL_PLAYER_CLEARANCE {
            point = player + from_player / dist * PATROL_PLAYER_CLEARANCE;
        }
        *slot = point;
        cursor = point;
    }
    enemy.patrol_count = count as u8;
    enemy.patrol_index = 0;
}

/// Move one step. On an obstacle hit the move is undone and an escape
/// heading 90-270 degrees off the direction of travel is returned.
fn move_enemy(
    pos: &mut Vec2,
    vel: Vec2,
    radius: f32,
    obstacles: &[Obstacle],
    rng: &mut Lcg32,
    step: f32,
) -> Option<f32> {
    let previous = *pos;
    *pos += vel * step;
    if blocked_by_obstacle(obstacles, *pos, radius).is_none() {
        return None;
    }
    *pos = previous;
    let current = vel.y.atan2(vel.x);
    Some(normalize_angle(current + range_f32(rng, 90.0, 270.0).to_radians()))
}

/// Hard-clamp to the shore margin, returning a heading inside the inward cone when clamped
fn clamp_to_edges(pos: &mut Vec2, limit: f32, rng: &mut Lcg32) -> Option<f32> {
    if pos.x < limit {
        pos.x = limit;
        Some(range_f32(rng, -EDGE_ESCAPE_CONE_DEG, EDGE_ESCAPE_CONE_DEG).to_radians())
    } else if pos.x > SCREEN_WIDTH - limit {
        pos.x = SCREEN_WIDTH - limit;
        let spread = range_f32(rng, -EDGE_ESCAPE_CONE_DEG, EDGE_ESCAPE_CONE_DEG);
        Some(normalize_angle((180.0 + spread).to_radians()))
    } else {
        None
    }
}

/// Single shot straight at the player. Returns false if no slot was free.
fn fire_aimed(from: Vec2, target: Vec2, projectiles: &mut Projectiles) -> bool {
    let to = target - from;
    let angle = to.y.atan2(to.x);
    projectiles
        .push(Projectile::new(from, angle, ENEMY_SIMPLE_PROJECTILE_SPEED, false))
        .is_ok()
}

/// 3-shot fan centred on the player; fires as many shots as fit
fn fire_fan(from: Vec2, target: Vec2, projectiles: &mut Projectiles) -> bool {
    if projectiles.is_full() {
        return false;
    }
    let to = target - from;
    let center = to.y.atan2(to.x);
    for offset in [-ENEMY_HARD_PROJECTILE_SPREAD, 0.0, ENEMY_HARD_PROJECTILE_SPREAD] {
        let shot = Projectile::new(from, center + offset, ENEMY_HARD_PROJECTILE_SPEED, false);
        if projectiles.push(shot).is_err() {
            break;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ObstacleKind;
    use crate::{Settings, circles_overlap};

    fn state() -> GameState {
        GameState::new(&Settings::default())
    }

    #[test]
    fn test_avoidance_overrides_when_blocked() {
        let rock = Obstacle::new(ObstacleKind::Island, Vec2::new(600.0, 100.0), 40.0);
        let avoid = avoidance_vector(Vec2::new(600.0, 0.0), FRAC_PI_2, &[rock], &SIMPLE_AVOIDANCE);
        assert!(avoid.length() > AVOIDANCE_THRESHOLD);
        // Pushed back up-screen, away from the rock
        assert!(avoid.y < 0.0);
        let heading = resolve_heading(FRAC_PI_2, avoid);
        assert!(heading < 0.0);
    }

    #[test]
    fn test_open_water_keeps_strategic_heading() {
        let avoid = avoidance_vector(Vec2::new(600.0, 0.0), FRAC_PI_2, &[], &HARD_AVOIDANCE);
        assert_eq!(avoid, Vec2::ZERO);
        assert_eq!(resolve_heading(1.0, avoid), 1.0);
    }

    #[test]
    fn test_shore_pushes_inward() {
        let avoid = avoidance_vector(Vec2::new(160.0, 0.0), FRAC_PI_2, &[], &SIMPLE_AVOIDANCE);
        assert!(avoid.x > 0.0);
    }

    #[test]
    fn test_steer_turns_by_fraction() {
        let vel = steer(Vec2::new(1.0, 0.0), FRAC_PI_2, 0.5, 2.0);
        let angle = vel.y.atan2(vel.x);
        assert!((angle - FRAC_PI_2 / 2.0).abs() < 1e-5);
        assert!((vel.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_can_see_is_strict_rectangle() {
        let range = Vec2::new(400.0, 500.0);
        assert!(can_see(Vec2::ZERO, Vec2::new(399.0, -499.0), range));
        assert!(!can_see(Vec2::ZERO, Vec2::new(400.0, 0.0), range));
    }

    #[test]
    fn test_dormant_enemy_wakes_near_player() {
        let mut state = state();
        let far = state.player.pos - Vec2::new(0.0, ENEMY_ACTIVATION_RANGE + 100.0);
        let near = state.player.pos - Vec2::new(200.0, 400.0);
        state.add_enemy(EnemyKind::Simple, far);
        state.add_enemy(EnemyKind::Simple, near);

        update_enemies(&mut state, 1.0);

        assert!(!state.enemies_simple[0].active);
        assert_eq!(state.enemies_simple[0].pos, far);
        assert!(state.enemies_simple[1].active);
        assert_ne!(state.enemies_simple[1].pos, near);
    }

    #[test]
    fn test_enemy_far_behind_despawns() {
        let mut state = state();
        let behind = state.player.pos + Vec2::new(0.0, ENEMY_DELETE_DISTANCE + 50.0);
        state.add_enemy(EnemyKind::Hard, behind);
        state.add_enemy(EnemyKind::Hard, state.player.pos - Vec2::new(0.0, 300.0));

        update_enemies(&mut state, 1.0);

        assert_eq!(state.enemies_hard.len(), 1);
        assert!(state.enemies_hard[0].pos.y < state.player.pos.y);
    }

    #[test]
    fn test_visible_simple_enemy_fires_when_ready() {
        let mut state = state();
        let at = state.player.pos - Vec2::new(0.0, 300.0);
        state.add_enemy(EnemyKind::Simple, at);
        state.enemies_simple[0].shoot_cooldown = 1;

        update_enemies(&mut state, 1.0);

        assert_eq!(state.projectiles.len(), 1);
        assert!(!state.projectiles[0].is_player_shot);
        assert_eq!(state.enemies_simple[0].shoot_cooldown, ENEMY_SIMPLE_SHOOT_DELAY);
    }

    #[test]
    fn test_hard_fan_fires_three() {
        let mut projectiles = Projectiles::new();
        assert!(fire_fan(Vec2::ZERO, Vec2::new(0.0, 100.0), &mut projectiles));
        assert_eq!(projectiles.len(), 3);
        let angles: Vec<f32> = projectiles.iter().map(|p| p.angle).collect();
        assert!((angles[1] - FRAC_PI_2).abs() < 1e-5);
        assert!((angles[2] - angles[0] - 2.0 * ENEMY_HARD_PROJECTILE_SPREAD).abs() < 1e-5);
    }

    #[test]
    fn test_firing_is_noop_when_projectiles_full() {
        let mut projectiles = Projectiles::new();
        while projectiles.push(Projectile::default()).is_ok() {}
        assert!(!fire_fan(Vec2::ZERO, Vec2::ONE, &mut projectiles));
        assert!(!fire_aimed(Vec2::ZERO, Vec2::ONE, &mut projectiles));
        assert_eq!(projectiles.len(), MAX_PROJECTILES);
    }

    #[test]
    fn test_blocked_move_reverts_and_reaims() {
        let rock = Obstacle::new(ObstacleKind::Island, Vec2::new(600.0, 30.0), 20.0);
        let mut pos = Vec2::new(600.0, 0.0);
        let mut rng = Lcg32::new(11);
        let escape = move_enemy(&mut pos, Vec2::new(0.0, 2.0), 20.0, &[rock], &mut rng, 1.0)
            .expect("move into the rock is blocked");
        assert_eq!(pos, Vec2::new(600.0, 0.0));
        let turned = normalize_angle(escape - FRAC_PI_2).abs();
        assert!(turned >= 90f32.to_radians() - 1e-4);

        let mut pos = Vec2::new(500.0, 0.0);
        assert_eq!(
            move_enemy(&mut pos, Vec2::new(0.0, 2.0), 20.0, &[rock], &mut rng, 1.0),
            None
        );
        assert_eq!(pos, Vec2::new(500.0, 2.0));
    }

    #[test]
    fn test_enemy_heading_into_island_gets_clear() {
        let mut state = state();
        let start = Vec2::new(600.0, -300.0);
        let island = Obstacle::new(ObstacleKind::Island, Vec2::new(600.0, -264.0), 15.0);
        assert!(state.add_obstacle(island.kind, island.pos, island.radius));
        state.add_enemy(EnemyKind::Simple, start);
        {
            let enemy = &mut state.enemies_simple[0];
            enemy.active = true;
            enemy.strategy = Strategy::Patrol;
            enemy.vel = Vec2::new(0.0, ENEMY_SIMPLE_BASE_SPEED);
        }

        let mut farthest = 0.0_f32;
        for _ in 0..120 {
            update_enemies(&mut state, 1.0);
            let enemy = &state.enemies_simple[0];
            assert!(!circles_overlap(enemy.pos, enemy.radius, island.pos, island.radius));
            farthest = farthest.max(distance(enemy.pos, start));
        }
        // One evasion alone carries it well away from the start point
        assert!(farthest > ENEMY_SIMPLE_BASE_SPEED * f32::from(ENEMY_EVADE_TICKS) * 0.8);
    }

    #[test]
    fn test_evasion_holds_heading_then_releases() {
        let mut state = state();
        state.add_enemy(EnemyKind::Simple, Vec2::new(ENEMY_SIMPLE_EDGE_LIMIT - 5.0, 0.0));
        {
            let enemy = &mut state.enemies_simple[0];
            enemy.active = true;
            enemy.strategy = Strategy::Patrol;
            enemy.vel = Vec2::new(-ENEMY_SIMPLE_BASE_SPEED, 0.0);
            enemy.target_angle = std::f32::consts::PI;
        }

        update_enemies(&mut state, 1.0);
        let enemy = state.enemies_simple[0];
        assert_eq!(enemy.evade_timer, ENEMY_EVADE_TICKS);
        assert!(enemy.vel.x > 0.0, "velocity turns inward at once");
        let held = enemy.target_angle;

        for _ in 0..ENEMY_EVADE_TICKS {
            update_enemies(&mut state, 1.0);
            assert_eq!(state.enemies_simple[0].target_angle, held);
        }
        assert_eq!(state.enemies_simple[0].evade_timer, 0);
        assert!(state.enemies_simple[0].pos.x > ENEMY_SIMPLE_EDGE_LIMIT);
    }

    #[test]
    fn test_edge_clamp_reaims_inward() {
        let mut rng = Lcg32::new(4);
        let mut pos = Vec2::new(10.0, 0.0);
        let target = clamp_to_edges(&mut pos, ENEMY_SIMPLE_EDGE_LIMIT, &mut rng).unwrap();
        assert_eq!(pos.x, ENEMY_SIMPLE_EDGE_LIMIT);
        assert!(target.cos() > 0.0);

        let mut pos = Vec2::new(SCREEN_WIDTH, 0.0);
        let target = clamp_to_edges(&mut pos, ENEMY_HARD_EDGE_LIMIT, &mut rng).unwrap();
        assert_eq!(pos.x, SCREEN_WIDTH - ENEMY_HARD_EDGE_LIMIT);
        assert!(target.cos() < 0.0);

        let mut pos = Vec2::new(SCREEN_WIDTH / 2.0, 0.0);
        assert_eq!(clamp_to_edges(&mut pos, ENEMY_HARD_EDGE_LIMIT, &mut rng), None);
    }

    #[test]
    fn test_pursuit_holds_last_heading_then_wanders() {
        let mut rng = Lcg32::new(5);
        let mut enemy = EnemyHard::new(Vec2::new(600.0, 0.0));
        let player = Player::spawn();

        let seen = pursue_heading(&mut enemy, &player, true, &mut rng);
        assert_eq!(enemy.pursuit_timer, ENEMY_HARD_PURSUIT_TIMER);
        assert_eq!(enemy.pursuit_direction, seen);

        for left in (0..ENEMY_HARD_PURSUIT_TIMER).rev() {
            assert_eq!(pursue_heading(&mut enemy, &player, false, &mut rng), seen);
            assert_eq!(enemy.pursuit_timer, left);
        }

        let wander = pursue_heading(&mut enemy, &player, false, &mut rng);
        assert_eq!(wander, FRAC_PI_2 + enemy.wander_angle);
        assert!(enemy.wander_angle.abs() <= WANDER_MAX_ANGLE_DEG.to_radians());
        assert!(enemy.wander_timer >= HARD_WANDER_TICKS.0);
    }

    #[test]
    fn test_patrol_advances_on_arrival_and_regenerates_at_end() {
        let mut rng = Lcg32::new(8);
        let player = Vec2::new(600.0, -5000.0);
        let mut enemy = EnemyHard::new(Vec2::new(600.0, -1000.0));
        generate_patrol_points(&mut enemy, player, &mut rng);
        let route = enemy.patrol_route().to_vec();

        patrol_heading(&mut enemy, player, &mut rng);
        assert_eq!(enemy.patrol_index, 0);

        enemy.pos = route[0] + Vec2::new(ENEMY_HARD_MIN_PATROL_DISTANCE - 1.0, 0.0);
        let angle = patrol_heading(&mut enemy, player, &mut rng);
        assert_eq!(enemy.patrol_index, 1);
        let to = route[1] - enemy.pos;
        assert!((angle - to.y.atan2(to.x)).abs() < 1e-5);

        let last = route.len() - 1;
        enemy.patrol_index = last as u8;
        enemy.pos = route[last];
        patrol_heading(&mut enemy, player, &mut rng);
        assert_eq!(enemy.patrol_index, 0);
        assert_ne!(enemy.patrol_route(), route.as_slice());
        // The fresh route starts from where the old one ended
        assert!(enemy.patrol_route()[0].y > route[last].y);
    }

    #[test]
    fn test_patrol_route_avoids_player() {
        let mut rng = Lcg32::new(21);
        let mut enemy = EnemyHard::new(Vec2::new(600.0, -1000.0));
        let player = Vec2::new(600.0, 0.0);
        for _ in 0..20 {
            generate_patrol_points(&mut enemy, player, &mut rng);
            let route = enemy.patrol_route();
            assert!((3..=ENEMY_HARD_PATROL_POINTS_MAX).contains(&route.len()));
            for point in route {
                assert!(distance(*point, player) >= PATROL_PLAYER_CLEARANCE - 1e-3);
            }
        }
    }
}
