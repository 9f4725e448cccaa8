//! Procedural world generation
//!
//! The world is generated one segment at a time above `world_top`, just
//! before the camera reaches it. Spawns are rolled row by row and rejected if
//! they would land on an obstacle, a shore or another enemy.

use glam::Vec2;
use rand::Rng;

use super::rng::{chance, range_f32};
use super::state::{EnemyKind, GameState};
use crate::consts::*;
use crate::distance;

/// Simple enemies spawn at least this far from either screen edge
pub const SIMPLE_SPAWN_MARGIN: f32 = 250.0;
/// Hard enemies spawn at least this far from either screen edge
pub const HARD_SPAWN_MARGIN: f32 = 300.0;

/// What one generated segment added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentReport {
    pub simple: u32,
    pub hard: u32,
    pub whirlpools: u32,
}

/// True once the camera's look-ahead screen has reached the frontier
pub fn needs_segment(state: &GameState) -> bool {
    state.camera_y - SCREEN_HEIGHT < state.world_top
}

/// Generate the next segment if the camera is close to the frontier
pub fn extend_world(state: &mut GameState) -> Option<SegmentReport> {
    needs_segment(state).then(|| generate_segment(state))
}

/// Populate `[world_top - segment_height, world_top)` and advance the frontier.
/// The frontier always moves, even if nothing could be placed.
pub fn generate_segment(state: &mut GameState) -> SegmentReport {
    let top = state.world_top - state.world.segment_height;
    let bottom = state.world_top;

    let mut report = SegmentReport::default();
    generate_enemies(state, top, bottom, &mut report);
    generate_whirlpools(state, top, bottom, &mut report);
    state.world_top = top;

    log::info!(
        "Generated segment y=[{:.0}, {:.0}): {} simple, {} hard, {} whirlpools",
        top,
        bottom,
        report.simple,
        report.hard,
        report.whirlpools
    );
    report
}

fn generate_enemies(state: &mut GameState, top: f32, bottom: f32, report: &mut SegmentReport) {
    let spawn_limit = state.player.pos.y - state.world.spawn_lead;
    let (step_min, step_max) = (state.world.step_min, state.world.step_max);
    let mut y = top;
    while y < bottom {
        if y < spawn_limit {
            if chance(&mut state.rng, state.world.simple_spawn_chance)
                && try_spawn(state, EnemyKind::Simple, y)
            {
                report.simple += 1;
            }
            if chance(&mut state.rng, state.world.hard_spawn_chance)
                && try_spawn(state, EnemyKind::Hard, y)
            {
                report.hard += 1;
            }
        }
        y += f32::from(state.rng.random_range(step_min..=step_max));
    }
}

fn try_spawn(state: &mut GameState, kind: EnemyKind, y: f32) -> bool {
    let margin = match kind {
        EnemyKind::Simple => SIMPLE_SPAWN_MARGIN,
        EnemyKind::Hard => HARD_SPAWN_MARGIN,
    };
    for _ in 0..state.world.placement_attempts {
        let pos = Vec2::new(range_f32(&mut state.rng, margin, SCREEN_WIDTH - margin), y);
        if can_place_enemy(state, pos, kind.radius()) {
            return state.add_enemy(kind, pos);
        }
    }
    false
}

/// Clear of shores, obstacles (plus clearance) and other enemies (plus spacing)
pub fn can_place_enemy(state: &GameState, pos: Vec2, radius: f32) -> bool {
    if pos.x < SHORE_EDGE_MARGIN || pos.x > SCREEN_WIDTH - SHORE_EDGE_MARGIN {
        return false;
    }
    let clearance = state.world.obstacle_clearance;
    if state
        .obstacles
        .iter()
        .any(|o| distance(pos, o.pos) < o.radius + radius + clearance)
    {
        return false;
    }
    let spacing = state.world.enemy_spacing;
    let crowded = state
        .enemies_simple
        .iter()
        .map(|e| (e.pos, e.radius))
        .chain(state.enemies_hard.iter().map(|e| (e.pos, e.radius)))
        .any(|(other, other_radius)| distance(pos, other) < radius + other_radius + spacing);
    !crowded
}

fn generate_whirlpools(state: &mut GameState, top: f32, bottom: f32, report: &mut SegmentReport) {
    let spawn_limit = state.player.pos.y - state.world.spawn_lead;
    let (step_min, step_max) = (state.world.whirlpool_step_min, state.world.whirlpool_step_max);
    let margin = state.whirlpools.cfg.edge_margin;
    let mut y = top;
    while y < bottom {
        if y < spawn_limit && chance(&mut state.rng, state.world.whirlpool_spawn_chance) {
            for _ in 0..state.world.placement_attempts {
                let pos = Vec2::new(range_f32(&mut state.rng, margin, SCREEN_WIDTH - margin), y);
                if state.whirlpools.is_clear(pos, state.obstacles.as_slice()) {
                    if state.add_whirlpool(pos) {
                        report.whirlpools += 1;
                    }
                    break;
                }
            }
        }
        y += f32::from(state.rng.random_range(step_min..=step_max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::state::ObstacleKind;

    fn state() -> GameState {
        GameState::new(&Settings::default())
    }

    #[test]
    fn test_segment_advances_frontier_and_respects_bounds() {
        let mut state = state();
        let before = state.world_top;
        let height = state.world.segment_height;
        let limit = state.player.pos.y - state.world.spawn_lead;

        generate_segment(&mut state);

        assert_eq!(state.world_top, before - height);
        for e in state.enemies_simple.iter() {
            assert!(e.pos.y >= before - height && e.pos.y < before.min(limit));
            assert!(!e.active && e.alive);
            assert!(e.pos.x >= SIMPLE_SPAWN_MARGIN && e.pos.x <= SCREEN_WIDTH - SIMPLE_SPAWN_MARGIN);
        }
        for e in state.enemies_hard.iter() {
            assert!(e.pos.y >= before - height && e.pos.y < before.min(limit));
            assert!(e.pos.x >= HARD_SPAWN_MARGIN && e.pos.x <= SCREEN_WIDTH - HARD_SPAWN_MARGIN);
        }
    }

    #[test]
    fn test_frontier_moves_even_when_stores_are_full() {
        let mut state = state();
        while state.add_enemy(EnemyKind::Simple, Vec2::new(600.0, 10_000.0)) {}
        while state.add_enemy(EnemyKind::Hard, Vec2::new(600.0, 10_000.0)) {}
        let before = state.world_top;
        let report = generate_segment(&mut state);
        assert_eq!(report.simple + report.hard, 0);
        assert_eq!(state.world_top, before - state.world.segment_height);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut a = state();
        let mut b = state();
        for _ in 0..3 {
            generate_segment(&mut a);
            generate_segment(&mut b);
        }
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_can_place_enemy_rejects_crowding() {
        let mut state = state();
        let spot = Vec2::new(600.0, -3000.0);
        assert!(can_place_enemy(&state, spot, COLLISION_RADIUS_ENEMY_SIMPLE));

        state.add_obstacle(ObstacleKind::Island, spot + Vec2::new(80.0, 0.0), 20.0);
        assert!(!can_place_enemy(&state, spot, COLLISION_RADIUS_ENEMY_SIMPLE));

        state.obstacles.clear();
        state.add_enemy(EnemyKind::Hard, spot + Vec2::new(0.0, 120.0));
        assert!(!can_place_enemy(&state, spot, COLLISION_RADIUS_ENEMY_SIMPLE));

        assert!(!can_place_enemy(&state, Vec2::new(100.0, -6000.0), COLLISION_RADIUS_ENEMY_SIMPLE));
    }

    #[test]
    fn test_needs_segment_tracks_camera() {
        let mut state = state();
        assert!(!needs_segment(&state));
        state.camera_y = state.world_top + SCREEN_HEIGHT - 1.0;
        assert!(needs_segment(&state));
        assert!(extend_world(&mut state).is_some());
        assert!(!needs_segment(&state));
    }
}
