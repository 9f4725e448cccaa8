//! Sea Defenders host harness
//!
//! Runs the firmware main loop against an in-memory serial link. A scripted
//! host feeds the same command frames the PC side would send, and every
//! outbound snapshot is decoded back to check the wire format end to end.
//!
//! Usage: `sea-defenders [settings.json] [ticks]`

use std::time::Instant;

use sea_defenders::Settings;
use sea_defenders::bench::{FrameStats, Phase};
use sea_defenders::consts::*;
use sea_defenders::protocol::{
    CaptureUart, ProtocolContext, SoftDma, decode_debug, decode_game_state, encode_add_enemy,
    encode_add_obstacle, encode_add_whirlpool, encode_cleanup, encode_init_game,
};
use sea_defenders::sim::{EnemyKind, GameState, ObstacleKind, TickInput, tick};

const DEFAULT_TICKS: u32 = 1800;
/// Host sends a clean-up command this often
const HOST_CLEANUP_INTERVAL: u32 = 300;
/// Host spawns a wave of enemies this often
const HOST_WAVE_INTERVAL: u32 = 240;

/// Device side: simulation plus its serial endpoint
struct Game {
    state: GameState,
    link: ProtocolContext<SoftDma, CaptureUart>,
    input: TickInput,
    load: FrameStats,
    snapshots_decoded: u32,
    snapshots_bad: u32,
}

impl Game {
    fn new(settings: &Settings) -> Self {
        Self {
            state: GameState::new(settings),
            link: ProtocolContext::soft(&settings.protocol),
            input: TickInput::new(),
            load: FrameStats::new(),
            snapshots_decoded: 0,
            snapshots_bad: 0,
        }
    }

    /// One pass of the main loop: receive, input, update, send, report
    fn frame(&mut self, buttons: (bool, bool, bool)) {
        let start = Instant::now();
        self.load.time(Phase::Receive, || self.link.poll(&mut self.state));

        let (left, right, shoot) = buttons;
        self.input.advance(left, right, shoot);
        let events = self
            .load
            .time(Phase::Update, || tick(&mut self.state, &self.input, SIM_DT));
        if let Some(teleport) = events.teleport {
            log::debug!(
                "Teleported {:.0},{:.0} -> {:.0},{:.0}",
                teleport.from.x,
                teleport.from.y,
                teleport.to.x,
                teleport.to.y
            );
        }

        let sent = self
            .load
            .time(Phase::Send, || self.link.send_game_state(&self.state));
        if let Err(err) = sent {
            log::debug!("Snapshot not sent: {err}");
        }
        for frame in self.link.tx_mut().take_frames() {
            match decode_game_state(&frame) {
                Ok(_) => self.snapshots_decoded += 1,
                Err(err) => {
                    self.snapshots_bad += 1;
                    log::warn!("Host could not decode snapshot: {err}");
                }
            }
        }
        self.link.complete_transmit();
        self.load.end_frame(start.elapsed(), &self.state);

        if self.link.report(&self.load, self.load.total_frames).is_some() {
            for frame in self.link.tx_mut().take_frames() {
                match decode_debug(&frame) {
                    Ok(event) => log::debug!("Device says {:?}: {}", event.code, event.message),
                    Err(err) => log::warn!("Host could not decode debug frame: {err}"),
                }
            }
            self.link.complete_transmit();
        }
    }
}

/// Commands the host PC would send on a given frame
fn host_script(frame: u32, player_y: f32) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    if frame == 0 {
        out.push(encode_init_game());
        let ahead = player_y - SCREEN_HEIGHT;
        out.push(encode_add_obstacle(ObstacleKind::ShoreLeft, 0.0, ahead, SHORE_WIDTH));
        out.push(encode_add_obstacle(
            ObstacleKind::ShoreRight,
            SCREEN_WIDTH,
            ahead,
            SHORE_WIDTH,
        ));
        out.push(encode_add_obstacle(ObstacleKind::Island, 420.0, ahead - 400.0, 60.0));
        out.push(encode_add_whirlpool(800.0, ahead - 900.0));
    }
    if frame > 0 && frame % HOST_WAVE_INTERVAL == 0 {
        let ahead = player_y - SCREEN_HEIGHT - 200.0;
        let lane = (frame / HOST_WAVE_INTERVAL) as f32 % 3.0;
        out.push(encode_add_enemy(EnemyKind::Simple, 350.0 + lane * 150.0, ahead));
        out.push(encode_add_enemy(EnemyKind::Simple, 850.0 - lane * 150.0, ahead - 150.0));
        if lane == 2.0 {
            out.push(encode_add_enemy(EnemyKind::Hard, 600.0, ahead - 300.0));
        }
    }
    if frame > 0 && frame % HOST_CLEANUP_INTERVAL == 0 {
        out.push(encode_cleanup(player_y + ENEMY_DELETE_DISTANCE));
    }
    out
}

/// Scripted pilot: weave left and right, fire in bursts
fn pilot(frame: u32) -> (bool, bool, bool) {
    let phase = frame % 240;
    let left = (20..80).contains(&phase);
    let right = (140..200).contains(&phase);
    let shoot = frame % 40 < 20;
    (left, right, shoot)
}

fn load_settings(path: Option<&str>) -> Result<Settings, sea_defenders::settings::SettingsError> {
    match path {
        Some(path) => Settings::load(path),
        None => Ok(Settings::default()),
    }
}

fn main() {
    env_logger::init();
    log::info!("Sea Defenders (host harness) starting...");

    let args: Vec<String> = std::env::args().collect();
    let settings = match load_settings(args.get(1).map(String::as_str)) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Failed to load settings: {err}");
            std::process::exit(1);
        }
    };
    let ticks = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TICKS);

    let mut game = Game::new(&settings);
    for frame in 0..ticks {
        for bytes in host_script(frame, game.state.player.pos.y) {
            game.link.feed(&bytes);
        }
        game.frame(pilot(frame));
        if !game.state.running {
            log::info!("Player sunk, host restarting the game");
            game.link.feed(&encode_init_game());
        }
    }

    let stats = game.link.stats();
    log::info!(
        "Ran {ticks} ticks: score {}, health {}, frame {}, {} enemies, {} projectiles",
        game.state.player.score,
        game.state.player.health,
        game.state.frame_counter,
        game.state.total_enemies(),
        game.state.projectiles.len()
    );
    log::info!(
        "Snapshots: {} decoded, {} bad",
        game.snapshots_decoded,
        game.snapshots_bad
    );
    match serde_json::to_string(stats) {
        Ok(json) => log::info!("Protocol stats: {json}"),
        Err(err) => log::warn!("Could not serialize stats: {err}"),
    }
    log::info!(
        "Frame time: avg {:.2}ms, max {}us, {} slow of {}",
        game.load.avg_frame_ms,
        game.load.max_frame_us,
        game.load.slow_frames,
        game.load.total_frames
    );
}
