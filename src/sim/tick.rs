//! Fixed timestep simulation tick
//!
//! Advances the world deterministically, in this order: player, enemies,
//! projectiles, periodic clean-up, whirlpools, collisions, camera, world
//! generation, game-over check.

use glam::Vec2;

use super::ai::update_enemies;
use super::collision::{CollisionReport, blocked_by_obstacle, check_collisions};
use super::state::{GameState, Player, Projectile};
use super::whirlpool::Teleport;
use super::worldgen::{SegmentReport, extend_world};
use crate::consts::*;
use crate::heading;

/// Buttons the input collaborator reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Shoot,
}

impl Button {
    fn bit(self) -> u8 {
        match self {
            Button::Left => 1 << 0,
            Button::Right => 1 << 1,
            Button::Shoot => 1 << 2,
        }
    }
}

/// Input for a single tick: level state plus rising edges
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    held: u8,
    previous: u8,
}

impl TickInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input with exactly these buttons held and no history
    pub fn holding(buttons: &[Button]) -> Self {
        let mut input = Self::new();
        for button in buttons {
            input.held |= button.bit();
        }
        input
    }

    /// Latch a new level-state sample; the previous sample becomes history
    pub fn advance(&mut self, left: bool, right: bool, shoot: bool) {
        self.previous = self.held;
        self.held = 0;
        for (down, button) in [(left, Button::Left), (right, Button::Right), (shoot, Button::Shoot)] {
            if down {
                self.held |= button.bit();
            }
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.held & button.bit() != 0
    }

    /// Held now but not on the previous sample
    pub fn just_pressed(&self, button: Button) -> bool {
        self.is_pressed(button) && self.previous & button.bit() == 0
    }
}

/// Notable things that happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    pub collisions: CollisionReport,
    pub teleport: Option<Teleport>,
    pub segment: Option<SegmentReport>,
    pub cleaned: usize,
    pub game_over: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> TickEvents {
    let mut events = TickEvents::default();
    if !state.running {
        return events;
    }
    let step = dt / SIM_DT;
    state.frame_counter = state.frame_counter.wrapping_add(1);

    update_player(state, input, step);
    if input.is_pressed(Button::Shoot) {
        player_shoot(state);
    }
    update_enemies(state, step);
    update_projectiles(state, step);

    if state.frame_counter % AUTO_CLEANUP_INTERVAL == 0 {
        events.cleaned = state.cleanup_old(state.player.pos.y + ENEMY_DELETE_DISTANCE);
    }

    let GameState {
        player,
        whirlpools,
        obstacles,
        world_top,
        rng,
        ..
    } = state;
    events.teleport = whirlpools.update(player, obstacles.as_slice(), *world_top, rng);

    events.collisions = check_collisions(state);
    state.update_camera();
    events.segment = extend_world(state);

    if state.player.is_dead() {
        state.running = false;
        events.game_over = true;
        log::info!(
            "Game over at frame {} with score {}",
            state.frame_counter,
            state.player.score
        );
    }
    events
}

/// Hull rotation, forward motion, side drift, edge clamp and obstacle bounce
pub fn update_player(state: &mut GameState, input: &TickInput, step: f32) {
    let player = &mut state.player;
    rotate_hull(player, input, step);

    let previous = player.pos;
    player.pos.y -= player.base_speed * step;
    player.pos.x += player.hull_angle / PLAYER_MAX_ANGLE * PLAYER_SIDE_SPEED_MULTIPLIER * step;
    player.pos.x = player
        .pos
        .x
        .clamp(PLAYER_EDGE_MARGIN, SCREEN_WIDTH - PLAYER_EDGE_MARGIN);

    if blocked_by_obstacle(state.obstacles.as_slice(), player.pos, player.radius).is_some() {
        player.take_damage(PLAYER_COLLISION_DAMAGE);
        player.pos = previous;
        player.pos.y += PLAYER_COLLISION_PUSHBACK;
    }

    player.shoot_cooldown = player.shoot_cooldown.saturating_sub(1);
}

fn rotate_hull(player: &mut Player, input: &TickInput, step: f32) {
    let left = input.is_pressed(Button::Left);
    let right = input.is_pressed(Button::Right);
    if left && !right {
        player.hull_angle -= PLAYER_ROTATION_SPEED * step;
    } else if right && !left {
        player.hull_angle += PLAYER_ROTATION_SPEED * step;
    } else {
        let back = PLAYER_AUTO_RETURN_SPEED * step;
        if player.hull_angle.abs() <= back {
            player.hull_angle = 0.0;
        } else {
            player.hull_angle -= back * player.hull_angle.signum();
        }
    }
    player.hull_angle = player.hull_angle.clamp(-PLAYER_MAX_ANGLE, PLAYER_MAX_ANGLE);
}

/// Fire forward, angled to the side when the hull is turned hard enough.
/// Returns false if still cooling down or out of projectile slots.
pub fn player_shoot(state: &mut GameState) -> bool {
    let player = &mut state.player;
    if player.shoot_cooldown > 0 {
        return false;
    }
    let mut angle = -90.0;
    if player.hull_angle > PLAYER_MIN_ANGLE_FOR_SIDE_SHOT {
        angle += PLAYER_SHOOT_ANGLE_OFFSET;
    } else if player.hull_angle < -PLAYER_MIN_ANGLE_FOR_SIDE_SHOT {
        angle -= PLAYER_SHOOT_ANGLE_OFFSET;
    }
    let shot = Projectile::new(player.pos, f32::to_radians(angle), PROJECTILE_SPEED, true);
    if state.projectiles.push(shot).is_err() {
        return false;
    }
    player.shoot_cooldown = PLAYER_SHOOT_COOLDOWN;
    true
}

/// Integrate projectiles and drop expired or off-band ones
pub fn update_projectiles(state: &mut GameState, step: f32) {
    let band_top = state.camera_y - VISIBLE_BAND_MARGIN;
    let band_bottom = state.camera_y + SCREEN_HEIGHT + VISIBLE_BAND_MARGIN;

    let mut i = 0;
    while i < state.projectiles.len() {
        let shot = &mut state.projectiles[i];
        shot.pos += heading(shot.angle) * shot.speed * step;
        shot.lifetime = shot.lifetime.saturating_sub(1);

        let gone = shot.lifetime == 0 || !in_band(shot.pos, band_top, band_bottom);
        if gone {
            state.remove_projectile(i);
        } else {
            i += 1;
        }
    }
}

fn in_band(pos: Vec2, top: f32, bottom: f32) -> bool {
    (0.0..=SCREEN_WIDTH).contains(&pos.x) && (top..=bottom).contains(&pos.y)
}
