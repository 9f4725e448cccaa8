//! Whirlpool hazards
//!
//! Touching an idle whirlpool teleports the player roughly one teleport
//! distance ahead, onto a target whirlpool. When no target exists one is
//! created on the spot, so a teleport never fails. Both ends go on cooldown.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::{Lcg32, range_f32};
use super::state::{Obstacle, Player};
use super::store::FixedStore;
use crate::consts::*;
use crate::settings::WhirlpoolSettings;
use crate::{circles_overlap, distance};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Whirlpool {
    pub pos: Vec2,
    pub radius: f32,
    /// Degrees
    pub rotation: f32,
    /// Radians
    pub animation_phase: f32,
    /// Consumed by a recent teleport
    pub used_recently: bool,
    pub cooldown_timer: u16,
}

impl Whirlpool {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            rotation: 0.0,
            animation_phase: 0.0,
            used_recently: false,
            cooldown_timer: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.used_recently
    }

    fn consume(&mut self, cooldown: u16) {
        self.used_recently = true;
        self.cooldown_timer = cooldown;
    }

    fn animate(&mut self) {
        self.rotation = (self.rotation + WHIRLPOOL_ROTATION_SPEED) % 360.0;
        self.animation_phase =
            (self.animation_phase + WHIRLPOOL_ANIMATION_SPEED) % std::f32::consts::TAU;
        if self.cooldown_timer > 0 {
            self.cooldown_timer -= 1;
            if self.cooldown_timer == 0 {
                self.used_recently = false;
            }
        }
    }
}

/// A completed teleport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teleport {
    pub from: Vec2,
    pub to: Vec2,
    /// The target had to be created for this jump
    pub created_target: bool,
}

/// Fixed-capacity whirlpool manager
#[derive(Debug, Clone, Serialize)]
pub struct WhirlpoolField {
    pub pools: FixedStore<Whirlpool, MAX_WHIRLPOOLS>,
    #[serde(skip)]
    pub cfg: WhirlpoolSettings,
}

impl WhirlpoolField {
    pub fn new(cfg: WhirlpoolSettings) -> Self {
        Self {
            pools: FixedStore::new(),
            cfg,
        }
    }

    pub fn add(&mut self, pos: Vec2) -> bool {
        let added = self.pools.push(Whirlpool::new(pos, self.cfg.radius)).is_ok();
        if !added {
            log::debug!("Whirlpool store full, dropping spawn at {:.0},{:.0}", pos.x, pos.y);
        }
        added
    }

    pub fn cleanup(&mut self, threshold_y: f32) -> usize {
        self.pools.retain(|w| w.pos.y <= threshold_y)
    }

    /// Minimum centre-to-centre spacing between whirlpools
    pub fn spacing(&self) -> f32 {
        self.cfg.min_distance * 2.5
    }

    /// Clear of every obstacle (plus clearance) and properly spaced from other whirlpools
    pub fn is_clear(&self, pos: Vec2, obstacles: &[Obstacle]) -> bool {
        let clearance = self.cfg.island_clearance;
        if obstacles
            .iter()
            .any(|o| distance(pos, o.pos) < o.radius + clearance)
        {
            return false;
        }
        let spacing = self.spacing();
        self.pools.iter().all(|w| distance(pos, w.pos) >= spacing)
    }

    /// Best idle whirlpool `[D, 2D)` ahead of `source` inside the generated world,
    /// closest to exactly `D` ahead
    pub fn find_target(&self, source: usize, world_top: f32) -> Option<usize> {
        let from = self.pools.get(source)?.pos;
        let d = self.cfg.teleport_distance;
        self.pools
            .iter()
            .enumerate()
            .filter(|(i, w)| *i != source && w.is_idle() && w.pos.y > world_top)
            .filter_map(|(i, w)| {
                let ahead = from.y - w.pos.y;
                (ahead >= d && ahead < 2.0 * d).then_some((i, (ahead - d).abs()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Create a target ahead of `source`, force-placing it if no random spot
    /// passes the checks. Returns `(target, source)` indices; `source` moves
    /// if room had to be made by evicting another whirlpool.
    pub fn create_target(
        &mut self,
        source: usize,
        world_top: f32,
        obstacles: &[Obstacle],
        rng: &mut Lcg32,
    ) -> (usize, usize) {
        let from = self.pools[source].pos;
        let d = self.cfg.teleport_distance;
        let margin = self.cfg.edge_margin;

        let mut spot = None;
        for _ in 0..self.cfg.placement_attempts {
            let candidate = Vec2::new(
                range_f32(rng, margin, SCREEN_WIDTH - margin),
                from.y - d - range_f32(rng, 0.0, self.cfg.spawn_spread),
            );
            if candidate.y > world_top && self.is_clear(candidate, obstacles) {
                spot = Some(candidate);
                break;
            }
        }

        let pos = match spot {
            Some(pos) => pos,
            None => {
                // Stay inside the generated world, but never at or behind the source
                let y = (from.y - d)
                    .max(world_top + self.cfg.radius)
                    .min(from.y - 2.0 * self.cfg.radius);
                let forced = Vec2::new(from.x.clamp(margin, SCREEN_WIDTH - margin), y);
                log::warn!(
                    "No clear whirlpool spot ahead of y={:.0}, forcing one at {:.0},{:.0}",
                    from.y,
                    forced.x,
                    forced.y
                );
                forced
            }
        };

        let source = if self.pools.is_full() {
            self.make_room(source)
        } else {
            source
        };
        let target = self.pools.len();
        // make_room guarantees a free slot
        let _ = self.pools.push(Whirlpool::new(pos, self.cfg.radius));
        (target, source)
    }

    /// Evict the farthest-behind whirlpool other than `source`
    fn make_room(&mut self, source: usize) -> usize {
        let victim = self
            .pools
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != source)
            .max_by(|a, b| a.1.pos.y.total_cmp(&b.1.pos.y))
            .map(|(i, _)| i);
        let Some(victim) = victim else {
            return source;
        };
        let last = self.pools.len() - 1;
        self.pools.swap_remove(victim);
        if source == last { victim } else { source }
    }

    /// Move the player next to `target` and put both ends on cooldown
    fn teleport(&mut self, source: usize, target: usize, player: &mut Player) -> Vec2 {
        let cooldown = self.cfg.cooldown_ticks;
        let to = self.pools[target].pos;
        player.pos = Vec2::new(to.x, to.y + self.cfg.player_offset);
        self.pools[source].consume(cooldown);
        self.pools[target].consume(cooldown);
        player.pos
    }

    /// Animate, release cooldowns, then teleport the player on the first idle
    /// contact. At most one teleport happens per tick.
    pub fn update(
        &mut self,
        player: &mut Player,
        obstacles: &[Obstacle],
        world_top: f32,
        rng: &mut Lcg32,
    ) -> Option<Teleport> {
        for pool in self.pools.iter_mut() {
            pool.animate();
        }

        let source = self
            .pools
            .iter()
            .position(|w| w.is_idle() && circles_overlap(player.pos, player.radius, w.pos, w.radius))?;
        let from = player.pos;

        let (target, source, created_target) = match self.find_target(source, world_top) {
            Some(target) => (target, source, false),
            None => {
                let (target, source) = self.create_target(source, world_top, obstacles, rng);
                (target, source, true)
            }
        };
        let to = self.teleport(source, target, player);
        log::info!(
            "Whirlpool teleport {:.0},{:.0} -> {:.0},{:.0}{}",
            from.x,
            from.y,
            to.x,
            to.y,
            if created_target { " (new target)" } else { "" }
        );
        Some(Teleport {
            from,
            to,
            created_target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ObstacleKind;

    fn field() -> WhirlpoolField {
        WhirlpoolField::new(WhirlpoolSettings::default())
    }

    fn player_at(pos: Vec2) -> Player {
        Player {
            pos,
            ..Player::spawn()
        }
    }

    #[test]
    fn test_teleport_to_existing_target() {
        let mut field = field();
        let d = field.cfg.teleport_distance;
        field.add(Vec2::new(600.0, 0.0));
        field.add(Vec2::new(500.0, -d - 100.0));
        // Too close to count as a target
        field.add(Vec2::new(900.0, -d / 2.0));

        let mut player = player_at(Vec2::new(600.0, 10.0));
        let mut rng = Lcg32::new(1);
        let jump = field.update(&mut player, &[], -10_000.0, &mut rng).unwrap();

        assert!(!jump.created_target);
        assert_eq!(player.pos, Vec2::new(500.0, -d - 100.0 + field.cfg.player_offset));
        assert!(field.pools[0].used_recently);
        assert!(field.pools[1].used_recently);
        assert!(!field.pools[2].used_recently);
        assert_eq!(field.pools[0].cooldown_timer, field.cfg.cooldown_ticks);
    }

    #[test]
    fn test_target_window_excludes_far_pools() {
        let mut field = field();
        let d = field.cfg.teleport_distance;
        field.add(Vec2::new(600.0, 0.0));
        field.add(Vec2::new(600.0, -2.0 * d));
        assert_eq!(field.find_target(0, -100_000.0), None);
        field.add(Vec2::new(600.0, -1.5 * d));
        assert_eq!(field.find_target(0, -100_000.0), Some(2));
        // Beyond the generated frontier
        assert_eq!(field.find_target(0, -1.2 * d), None);
    }

    #[test]
    fn test_missing_target_is_created() {
        let mut field = field();
        field.add(Vec2::new(600.0, 0.0));
        let mut player = player_at(Vec2::new(600.0, 0.0));
        let mut rng = Lcg32::new(3);
        let jump = field.update(&mut player, &[], -100_000.0, &mut rng).unwrap();

        assert!(jump.created_target);
        assert_eq!(field.pools.len(), 2);
        let ahead = 0.0 - field.pools[1].pos.y;
        assert!(ahead >= field.cfg.teleport_distance);
        assert!(ahead <= field.cfg.teleport_distance + field.cfg.spawn_spread);
    }

    #[test]
    fn test_forced_placement_when_full_evicts_farthest_behind() {
        let mut field = field();
        // Source is the last slot so eviction swaps it into the victim's place.
        for i in 0..MAX_WHIRLPOOLS - 1 {
            field.add(Vec2::new(600.0, 5000.0 + i as f32 * 500.0));
        }
        field.add(Vec2::new(600.0, 0.0));
        let source = MAX_WHIRLPOOLS - 1;
        let mut rng = Lcg32::new(5);
        // Frontier right in front of the source: every random spot is rejected.
        let world_top = -10.0;
        let (target, source) = field.create_target(source, world_top, &[], &mut rng);

        assert_eq!(field.pools.len(), MAX_WHIRLPOOLS);
        assert_eq!(field.pools[source].pos, Vec2::new(600.0, 0.0));
        // Too little generated world ahead, so the target sits just clear of the source
        assert_eq!(field.pools[target].pos.y, -2.0 * field.cfg.radius);
        assert!(field.pools[target].pos.y < field.pools[source].pos.y);
        // The farthest-behind pool (largest y) is gone.
        let evicted_y = 5000.0 + (MAX_WHIRLPOOLS - 2) as f32 * 500.0;
        assert!(field.pools.iter().all(|w| w.pos.y != evicted_y));
    }

    #[test]
    fn test_forced_target_is_ahead_of_source() {
        let mut field = field();
        field.add(Vec2::new(600.0, -500.0));
        let mut rng = Lcg32::new(9);
        let radius = field.cfg.radius;
        for world_top in [-600.0, -500.0, -400.0, 0.0] {
            field.pools.retain(|w| w.pos.y == -500.0);
            let (target, source) = field.create_target(0, world_top, &[], &mut rng);
            let (to, from) = (field.pools[target].pos, field.pools[source].pos);
            assert!(to.y <= from.y - 2.0 * radius, "frontier {world_top}: target at {to}");
            assert!(!circles_overlap(to, radius, from, radius));
        }

        // A distant frontier leaves room for the full teleport distance
        field.pools.retain(|w| w.pos.y == -500.0);
        let d = field.cfg.teleport_distance;
        let (target, _) = field.create_target(0, -100_000.0, &[], &mut rng);
        assert!(field.pools[target].pos.y <= -500.0 - d);
    }

    #[test]
    fn test_one_teleport_per_tick_with_overlapping_sources() {
        let mut field = field();
        let d = field.cfg.teleport_distance;
        field.add(Vec2::new(580.0, 0.0));
        field.add(Vec2::new(620.0, 0.0));
        field.add(Vec2::new(600.0, -d));
        let mut player = player_at(Vec2::new(600.0, 0.0));
        let mut rng = Lcg32::new(2);

        let jump = field.update(&mut player, &[], -100_000.0, &mut rng).unwrap();

        assert_eq!(jump.from, Vec2::new(600.0, 0.0));
        assert!(!jump.created_target);
        assert_eq!(player.pos, Vec2::new(600.0, -d + field.cfg.player_offset));
        let used: Vec<bool> = field.pools.iter().map(|w| w.used_recently).collect();
        assert_eq!(used, [true, false, true]);
        assert_eq!(field.pools.len(), 3);
    }

    #[test]
    fn test_cooldown_releases_whirlpool() {
        let mut field = field();
        field.add(Vec2::new(0.0, 0.0));
        field.pools[0].consume(2);
        let mut player = player_at(Vec2::new(600.0, 5000.0));
        let mut rng = Lcg32::new(1);
        field.update(&mut player, &[], 0.0, &mut rng);
        assert!(field.pools[0].used_recently);
        field.update(&mut player, &[], 0.0, &mut rng);
        assert!(field.pools[0].is_idle());
    }

    #[test]
    fn test_used_whirlpool_does_not_teleport() {
        let mut field = field();
        field.add(Vec2::new(600.0, 0.0));
        field.pools[0].consume(100);
        let mut player = player_at(Vec2::new(600.0, 0.0));
        let mut rng = Lcg32::new(1);
        assert!(field.update(&mut player, &[], -100_000.0, &mut rng).is_none());
        assert_eq!(player.pos, Vec2::new(600.0, 0.0));
    }

    #[test]
    fn test_is_clear_respects_islands() {
        let field = field();
        let island = Obstacle::new(ObstacleKind::Island, Vec2::new(600.0, 0.0), 50.0);
        assert!(!field.is_clear(Vec2::new(600.0, 100.0), &[island]));
        assert!(field.is_clear(Vec2::new(600.0, 200.0), &[island]));
    }
}
