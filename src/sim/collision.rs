//! Cross-entity collision resolution
//!
//! Every test is a strict circle-circle overlap (`distance < r1 + r2`).
//! Dormant enemies are invisible to collisions.

use glam::Vec2;

use super::state::{EnemyBody, EnemyKind, GameState, Obstacle, Projectile};
use crate::circles_overlap;
use crate::consts::*;

/// What happened during one collision pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Enemies destroyed by ramming the player
    pub rammed: u32,
    /// Player shots that hit an enemy
    pub enemy_hits: u32,
    /// Enemies destroyed by player fire
    pub kills: u32,
    /// Enemy shots that hit the player
    pub player_hits: u32,
    /// Projectiles absorbed by obstacles
    pub absorbed: u32,
}

/// First obstacle overlapping a circle
pub fn blocked_by_obstacle(obstacles: &[Obstacle], pos: Vec2, radius: f32) -> Option<usize> {
    obstacles
        .iter()
        .position(|o| o.active && circles_overlap(pos, radius, o.pos, o.radius))
}

/// First engaged enemy overlapping a circle
pub fn first_enemy_hit<E: EnemyBody>(enemies: &[E], pos: Vec2, radius: f32) -> Option<usize> {
    enemies
        .iter()
        .position(|e| e.is_engaged() && circles_overlap(pos, radius, e.pos(), e.radius()))
}

/// Resolve player/enemy contact and projectile hits for this tick
pub fn check_collisions(state: &mut GameState) -> CollisionReport {
    let mut report = CollisionReport::default();
    resolve_ramming(state, &mut report);
    resolve_projectiles(state, &mut report);
    report
}

fn resolve_ramming(state: &mut GameState, report: &mut CollisionReport) {
    for kind in [EnemyKind::Simple, EnemyKind::Hard] {
        while let Some(i) = ramming_enemy(state, kind) {
            state.remove_enemy(kind, i);
            state.player.take_damage(kind.contact_damage());
            report.rammed += 1;
        }
    }
}

fn ramming_enemy(state: &GameState, kind: EnemyKind) -> Option<usize> {
    let (pos, radius) = (state.player.pos, state.player.radius);
    match kind {
        EnemyKind::Simple => first_enemy_hit(state.enemies_simple.as_slice(), pos, radius),
        EnemyKind::Hard => first_enemy_hit(state.enemies_hard.as_slice(), pos, radius),
    }
}

fn resolve_projectiles(state: &mut GameState, report: &mut CollisionReport) {
    let mut i = 0;
    while i < state.projectiles.len() {
        let shot = state.projectiles[i];
        if projectile_hits(state, &shot, report) {
            state.remove_projectile(i);
        } else {
            i += 1;
        }
    }
}

/// Apply one projectile's effect. Returns true if it was consumed.
fn projectile_hits(state: &mut GameState, shot: &Projectile, report: &mut CollisionReport) -> bool {
    if shot.is_player_shot {
        if let Some(j) = first_enemy_hit(state.enemies_simple.as_slice(), shot.pos, shot.radius) {
            let enemy = &mut state.enemies_simple[j];
            enemy.health -= 1;
            report.enemy_hits += 1;
            if enemy.health <= 0 {
                state.player.score += u32::from(enemy.points);
                state.remove_enemy(EnemyKind::Simple, j);
                report.kills += 1;
            }
            return true;
        }
        if let Some(j) = first_enemy_hit(state.enemies_hard.as_slice(), shot.pos, shot.radius) {
            let enemy = &mut state.enemies_hard[j];
            enemy.health -= 1;
            enemy.armor_timer = ENEMY_HARD_ARMOR_FLASH_DURATION;
            report.enemy_hits += 1;
            if enemy.health <= 0 {
                state.player.score += u32::from(enemy.points);
                state.remove_enemy(EnemyKind::Hard, j);
                report.kills += 1;
            }
            return true;
        }
    } else if circles_overlap(shot.pos, shot.radius, state.player.pos, state.player.radius) {
        state.player.take_damage(PROJECTILE_DAMAGE_TO_PLAYER);
        report.player_hits += 1;
        return true;
    }

    if blocked_by_obstacle(state.obstacles.as_slice(), shot.pos, shot.radius).is_some() {
        report.absorbed += 1;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::state::ObstacleKind;

    fn state() -> GameState {
        GameState::new(&Settings::default())
    }

    fn wake_all(state: &mut GameState) {
        state.enemies_simple.iter_mut().for_each(|e| e.active = true);
        state.enemies_hard.iter_mut().for_each(|e| e.active = true);
    }

    #[test]
    fn test_shot_at_enemy_center_damages_it() {
        let mut state = state();
        let at = Vec2::new(400.0, -300.0);
        state.add_enemy(EnemyKind::Hard, at);
        wake_all(&mut state);
        state.spawn_projectile(Projectile::new(at, 0.0, 10.0, true));

        let report = check_collisions(&mut state);

        assert_eq!(report.enemy_hits, 1);
        assert_eq!(state.enemies_hard[0].health, ENEMY_HARD_HEALTH - 1);
        assert_eq!(state.enemies_hard[0].armor_timer, ENEMY_HARD_ARMOR_FLASH_DURATION);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_kill_awards_points() {
        let mut state = state();
        let at = Vec2::new(400.0, -300.0);
        state.add_enemy(EnemyKind::Simple, at);
        wake_all(&mut state);
        state.spawn_projectile(Projectile::new(at, 0.0, 10.0, true));

        let report = check_collisions(&mut state);

        assert_eq!(report.kills, 1);
        assert_eq!(state.player.score, u32::from(ENEMY_SIMPLE_POINTS));
        assert!(state.enemies_simple.is_empty());
    }

    #[test]
    fn test_dormant_enemy_ignores_shots() {
        let mut state = state();
        let at = Vec2::new(400.0, -300.0);
        state.add_enemy(EnemyKind::Simple, at);
        state.spawn_projectile(Projectile::new(at, 0.0, 10.0, true));

        check_collisions(&mut state);

        assert_eq!(state.enemies_simple[0].health, ENEMY_SIMPLE_HEALTH);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_ramming_removes_enemy_and_hurts_player() {
        let mut state = state();
        let at = state.player.pos;
        state.add_enemy(EnemyKind::Simple, at);
        state.add_enemy(EnemyKind::Hard, at + Vec2::new(10.0, 0.0));
        wake_all(&mut state);

        let report = check_collisions(&mut state);

        assert_eq!(report.rammed, 2);
        assert_eq!(state.total_enemies(), 0);
        assert_eq!(
            state.player.health,
            PLAYER_MAX_HEALTH - ENEMY_SIMPLE_TORPEDO_DAMAGE - ENEMY_HARD_TORPEDO_DAMAGE
        );
    }

    #[test]
    fn test_enemy_shot_hits_player() {
        let mut state = state();
        let at = state.player.pos;
        state.spawn_projectile(Projectile::new(at, 0.0, 6.0, false));

        check_collisions(&mut state);

        assert_eq!(state.player.health, PLAYER_MAX_HEALTH - PROJECTILE_DAMAGE_TO_PLAYER);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_obstacle_absorbs_every_overlapping_shot() {
        let mut state = state();
        let rock = Vec2::new(300.0, -100.0);
        state.add_obstacle(ObstacleKind::Island, rock, 40.0);
        for dx in [0.0, 5.0, 10.0] {
            state.spawn_projectile(Projectile::new(rock + Vec2::new(dx, 0.0), 0.0, 10.0, true));
        }
        state.spawn_projectile(Projectile::new(Vec2::new(900.0, -100.0), 0.0, 10.0, true));

        let report = check_collisions(&mut state);

        assert_eq!(report.absorbed, 3);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.projectiles[0].pos.x, 900.0);
    }
}
