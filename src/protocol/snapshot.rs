//! Outbound game-state and debug frames
//!
//! Game-state payload:
//! - player: x, y, hull_angle (f32), health (i16), score (u16, saturating), shoot_cooldown (u16)
//! - enemy count (u8), then per enemy: kind (u8), x, y (f32), health (i8), direction (u8)
//! - projectile count (u8), then per projectile: x, y (f32), is_player_shot (u8)
//! - whirlpool count (u8), then per whirlpool: x, y (f32), used (u8)
//! - camera_y (f32), frame_counter (u32)
//!
//! Lists are truncated to their caps in array order (simple enemies before hard
//! ones) and each count byte holds the number actually written.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::frame::{ByteReader, FrameError, FrameWriter, PacketType, validate_frame};
use crate::settings::ProtocolSettings;
use crate::sim::{EnemyBody, EnemyKind, GameState, direction_quadrant};

/// Hard upper bound for any per-category snapshot cap
pub const MAX_SNAPSHOT_RECORDS: usize = 16;
/// Fits the largest possible snapshot
pub const TX_BUFFER_SIZE: usize = 512;
pub const DEBUG_MESSAGE_LEN: usize = 32;

/// Per-category record caps for one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCaps {
    pub enemies: usize,
    pub projectiles: usize,
    pub whirlpools: usize,
}

impl From<&ProtocolSettings> for SnapshotCaps {
    fn from(cfg: &ProtocolSettings) -> Self {
        Self {
            enemies: usize::from(cfg.max_enemies).min(MAX_SNAPSHOT_RECORDS),
            projectiles: usize::from(cfg.max_projectiles).min(MAX_SNAPSHOT_RECORDS),
            whirlpools: usize::from(cfg.max_whirlpools).min(MAX_SNAPSHOT_RECORDS),
        }
    }
}

impl Default for SnapshotCaps {
    fn default() -> Self {
        Self::from(&ProtocolSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub pos: Vec2,
    pub hull_angle: f32,
    pub health: i16,
    pub score: u16,
    pub shoot_cooldown: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub kind: u8,
    pub pos: Vec2,
    pub health: i8,
    pub direction: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub pos: Vec2,
    pub is_player_shot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhirlpoolRecord {
    pub pos: Vec2,
    pub used: bool,
}

/// Host-side view of one game-state frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub player: PlayerRecord,
    pub enemies: Vec<EnemyRecord>,
    pub projectiles: Vec<ProjectileRecord>,
    pub whirlpools: Vec<WhirlpoolRecord>,
    pub camera_y: f32,
    pub frame_counter: u32,
}

fn put_enemy<E: EnemyBody>(w: &mut FrameWriter<'_>, enemy: &E) {
    w.put_u8(E::KIND.as_byte());
    w.put_vec2(enemy.pos());
    w.put_i8(enemy.health());
    w.put_u8(direction_quadrant(enemy.vel()));
}

/// Serialize `state` into `buf`, returning the frame length
pub fn encode_game_state(
    buf: &mut [u8],
    state: &GameState,
    caps: &SnapshotCaps,
) -> Result<usize, FrameError> {
    let mut w = FrameWriter::new(buf, PacketType::GameState);

    let player = &state.player;
    w.put_vec2(player.pos);
    w.put_f32(player.hull_angle);
    w.put_i16(player.health);
    w.put_u16(u16::try_from(player.score).unwrap_or(u16::MAX));
    w.put_u16(player.shoot_cooldown);

    let count_at = w.position();
    w.put_u8(0);
    let mut written = 0;
    for enemy in state.enemies_simple.iter().filter(|e| e.is_engaged()) {
        if written == caps.enemies {
            break;
        }
        put_enemy(&mut w, enemy);
        written += 1;
    }
    for enemy in state.enemies_hard.iter().filter(|e| e.is_engaged()) {
        if written == caps.enemies {
            break;
        }
        put_enemy(&mut w, enemy);
        written += 1;
    }
    w.patch_u8(count_at, written as u8);

    let count_at = w.position();
    w.put_u8(0);
    let mut written = 0;
    for shot in state
        .projectiles
        .iter()
        .filter(|p| p.active)
        .take(caps.projectiles)
    {
        w.put_vec2(shot.pos);
        w.put_u8(u8::from(shot.is_player_shot));
        written += 1;
    }
    w.patch_u8(count_at, written);

    let count_at = w.position();
    w.put_u8(0);
    let mut written = 0;
    for pool in state.whirlpools.pools.iter().take(caps.whirlpools) {
        w.put_vec2(pool.pos);
        w.put_u8(u8::from(pool.used_recently));
        written += 1;
    }
    w.patch_u8(count_at, written);

    w.put_f32(state.camera_y);
    w.put_u32(state.frame_counter);
    w.finish()
}

/// Decode a game-state frame received from the device
pub fn decode_game_state(frame: &[u8]) -> Result<GameStateSnapshot, FrameError> {
    let ty = validate_frame(frame)?;
    if ty != PacketType::GameState {
        return Err(FrameError::UnknownType(ty.as_byte()));
    }
    let mut r = ByteReader::new(&frame[2..frame.len() - 2]);
    decode_payload(&mut r).ok_or(FrameError::Truncated)
}

fn decode_payload(r: &mut ByteReader<'_>) -> Option<GameStateSnapshot> {
    let player = PlayerRecord {
        pos: r.vec2()?,
        hull_angle: r.f32()?,
        health: r.i16()?,
        score: r.u16()?,
        shoot_cooldown: r.u16()?,
    };

    let count = r.u8()?;
    let mut enemies = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        enemies.push(EnemyRecord {
            kind: r.u8()?,
            pos: r.vec2()?,
            health: r.i8()?,
            direction: r.u8()?,
        });
    }

    let count = r.u8()?;
    let mut projectiles = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        projectiles.push(ProjectileRecord {
            pos: r.vec2()?,
            is_player_shot: r.u8()? != 0,
        });
    }

    let count = r.u8()?;
    let mut whirlpools = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        whirlpools.push(WhirlpoolRecord {
            pos: r.vec2()?,
            used: r.u8()? != 0,
        });
    }

    Some(GameStateSnapshot {
        player,
        enemies,
        projectiles,
        whirlpools,
        camera_y: r.f32()?,
        frame_counter: r.u32()?,
    })
}

impl EnemyRecord {
    pub fn enemy_kind(&self) -> Option<EnemyKind> {
        EnemyKind::from_byte(self.kind)
    }
}

/// Why a debug frame was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DebugCode {
    ForcedReset = 1,
    /// Periodic load report from the main loop
    Stats = 2,
    /// Snapshot sends dropped because the transmitter was busy
    SkippedSends = 3,
}

/// Diagnostic telemetry sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEvent {
    pub code: DebugCode,
    /// Packet type the parser was looking at, 0 if none
    pub packet_type: u8,
    /// Event-specific value, saturating: bytes dropped for a forced reset,
    /// slow frames for a load report
    pub detail: u8,
    pub message: String,
}

/// Debug frame: code, packet type, detail, then a zero-padded 32-byte message
pub fn encode_debug(buf: &mut [u8], event: &DebugEvent) -> Result<usize, FrameError> {
    let mut w = FrameWriter::new(buf, PacketType::Debug);
    w.put_u8(event.code as u8);
    w.put_u8(event.packet_type);
    w.put_u8(event.detail);
    let mut message = [0u8; DEBUG_MESSAGE_LEN];
    let text = event.message.as_bytes();
    let n = text.len().min(DEBUG_MESSAGE_LEN);
    message[..n].copy_from_slice(&text[..n]);
    w.put_bytes(&message);
    w.finish()
}

/// Host-side decoder for debug frames
pub fn decode_debug(frame: &[u8]) -> Result<DebugEvent, FrameError> {
    let ty = validate_frame(frame)?;
    if ty != PacketType::Debug {
        return Err(FrameError::UnknownType(ty.as_byte()));
    }
    let mut r = ByteReader::new(&frame[2..frame.len() - 2]);
    let code = match r.u8().ok_or(FrameError::Truncated)? {
        1 => DebugCode::ForcedReset,
        2 => DebugCode::Stats,
        3 => DebugCode::SkippedSends,
        other => return Err(FrameError::UnknownType(other)),
    };
    let packet_type = r.u8().ok_or(FrameError::Truncated)?;
    let detail = r.u8().ok_or(FrameError::Truncated)?;
    let raw = frame
        .get(5..5 + DEBUG_MESSAGE_LEN)
        .ok_or(FrameError::Truncated)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(DebugEvent {
        code,
        packet_type,
        detail,
        message: String::from_utf8_lossy(&raw[..end]).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::{EnemyKind, Projectile};

    fn state() -> GameState {
        GameState::new(&Settings::default())
    }

    fn encode(state: &GameState, caps: &SnapshotCaps) -> Vec<u8> {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let len = encode_game_state(&mut buf, state, caps).unwrap();
        buf[..len].to_vec()
    }

    #[test]
    fn test_empty_snapshot() {
        let state = state();
        let frame = encode(&state, &SnapshotCaps::default());
        // 2 header + 18 player + 3 counts + 8 camera/frame + 2 trailer
        assert_eq!(frame.len(), 33);
        let snap = decode_game_state(&frame).unwrap();
        assert_eq!(snap.player.pos, state.player.pos);
        assert_eq!(snap.player.health, state.player.health);
        assert!(snap.enemies.is_empty());
        assert_eq!(snap.camera_y, state.camera_y);
    }

    #[test]
    fn test_enemy_list_truncates_in_array_order() {
        let mut state = state();
        for i in 0..5 {
            state.add_enemy(EnemyKind::Simple, Vec2::new(300.0 + i as f32, -100.0));
        }
        for i in 0..4 {
            state.add_enemy(EnemyKind::Hard, Vec2::new(700.0 + i as f32, -200.0));
        }
        // A dormant one is never reported
        state.add_enemy(EnemyKind::Simple, Vec2::new(1.0, 1.0));
        for e in state.enemies_simple.iter_mut().take(5) {
            e.active = true;
        }
        for e in state.enemies_hard.iter_mut() {
            e.active = true;
        }

        let snap = decode_game_state(&encode(&state, &SnapshotCaps::default())).unwrap();

        assert_eq!(snap.enemies.len(), 6);
        assert!(snap.enemies[..5].iter().all(|e| e.kind == 0));
        assert_eq!(snap.enemies[5].kind, 1);
        assert_eq!(snap.enemies[5].pos, Vec2::new(700.0, -200.0));
        assert_eq!(snap.enemies[5].health, crate::consts::ENEMY_HARD_HEALTH);
        assert_eq!(snap.enemies[5].enemy_kind(), Some(EnemyKind::Hard));
    }

    #[test]
    fn test_round_trip_within_caps() {
        let mut state = state();
        state.player.score = 70_000;
        for i in 0..12 {
            state.spawn_projectile(Projectile::new(
                Vec2::new(i as f32 * 10.0, -50.0),
                0.0,
                5.0,
                i % 2 == 0,
            ));
        }
        state.add_whirlpool(Vec2::new(400.0, -900.0));
        state.whirlpools.pools[0].used_recently = true;
        state.frame_counter = 1234;

        let caps = SnapshotCaps::default();
        let snap = decode_game_state(&encode(&state, &caps)).unwrap();

        assert_eq!(snap.player.score, u16::MAX);
        assert_eq!(snap.projectiles.len(), caps.projectiles);
        for (record, shot) in snap.projectiles.iter().zip(state.projectiles.iter()) {
            assert_eq!(record.pos, shot.pos);
            assert_eq!(record.is_player_shot, shot.is_player_shot);
        }
        assert_eq!(snap.whirlpools, vec![WhirlpoolRecord { pos: Vec2::new(400.0, -900.0), used: true }]);
        assert_eq!(snap.frame_counter, 1234);
    }

    #[test]
    fn test_corrupt_snapshot_is_rejected() {
        let state = state();
        let mut frame = encode(&state, &SnapshotCaps::default());
        frame[4] ^= 0xFF;
        assert!(matches!(
            decode_game_state(&frame),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_debug_frame_round_trip() {
        let event = DebugEvent {
            code: DebugCode::ForcedReset,
            packet_type: 0,
            detail: 200,
            message: "Buffer overflow reset".into(),
        };
        let mut buf = [0u8; 64];
        let len = encode_debug(&mut buf, &event).unwrap();
        assert_eq!(len, 2 + 3 + DEBUG_MESSAGE_LEN + 2);
        assert_eq!(decode_debug(&buf[..len]).unwrap(), event);
    }
}
