//! Game settings and tunables
//!
//! Everything a board build or the host harness may want to tweak without a
//! recompile. Loaded from JSON; every field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Procedural world generation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Height of one generated segment
    pub segment_height: f32,
    /// Spawns only happen this far ahead of the player
    pub spawn_lead: f32,
    /// Random step between enemy spawn rows
    pub step_min: u16,
    pub step_max: u16,
    pub simple_spawn_chance: f32,
    pub hard_spawn_chance: f32,
    /// Random step between whirlpool spawn rows
    pub whirlpool_step_min: u16,
    pub whirlpool_step_max: u16,
    pub whirlpool_spawn_chance: f32,
    /// Attempts to find a valid spot per spawn
    pub placement_attempts: u8,
    /// Extra gap kept between a new enemy and any obstacle
    pub obstacle_clearance: f32,
    /// Extra gap kept between two enemies
    pub enemy_spacing: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            segment_height: 2000.0,
            spawn_lead: 1500.0,
            step_min: 100,
            step_max: 300,
            simple_spawn_chance: 0.3,
            hard_spawn_chance: 0.15,
            whirlpool_step_min: 200,
            whirlpool_step_max: 400,
            whirlpool_spawn_chance: 0.1,
            placement_attempts: 10,
            obstacle_clearance: 50.0,
            enemy_spacing: 100.0,
        }
    }
}

/// Whirlpool teleport tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhirlpoolSettings {
    pub radius: f32,
    /// Nominal jump distance; targets are searched in `[D, 2D)` ahead
    pub teleport_distance: f32,
    /// Extra random distance when a fresh target has to be created
    pub spawn_spread: f32,
    /// Ticks a whirlpool stays consumed after a teleport
    pub cooldown_ticks: u16,
    /// Attempts before a target is force-placed
    pub placement_attempts: u8,
    /// Whirlpools keep `min_distance * 2.5` from each other
    pub min_distance: f32,
    /// Gap kept between a whirlpool and any obstacle
    pub island_clearance: f32,
    /// Whirlpools never spawn closer than this to a screen edge
    pub edge_margin: f32,
    /// The player lands this far behind the target whirlpool
    pub player_offset: f32,
}

impl Default for WhirlpoolSettings {
    fn default() -> Self {
        Self {
            radius: 45.0,
            teleport_distance: 1200.0,
            spawn_spread: 500.0,
            cooldown_ticks: 180,
            placement_attempts: 10,
            min_distance: 170.0,
            island_clearance: 75.0,
            edge_margin: 300.0,
            player_offset: 100.0,
        }
    }
}

/// Serial protocol tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Size of the DMA receive ring
    pub rx_buffer_size: usize,
    /// Ring occupancy (percent) above which the read cursor is forced forward
    pub high_water_percent: u8,
    /// Per-snapshot caps
    pub max_enemies: u8,
    pub max_projectiles: u8,
    pub max_whirlpools: u8,
    /// Report forced resyncs, skipped sends and load to the host with debug frames
    pub debug_telemetry: bool,
    /// Frames between load reports, 0 disables them
    pub stats_interval: u32,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            rx_buffer_size: 512,
            high_water_percent: 90,
            max_enemies: 6,
            max_projectiles: 10,
            max_whirlpools: 3,
            debug_telemetry: false,
            stats_interval: 600,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the world RNG
    pub seed: u32,
    pub world: WorldSettings,
    pub whirlpool: WhirlpoolSettings,
    pub protocol: ProtocolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 12345,
            world: WorldSettings::default(),
            whirlpool: WhirlpoolSettings::default(),
            protocol: ProtocolSettings::default(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Reject combinations the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field, reason| Err(SettingsError::Invalid { field, reason });

        if !(self.world.segment_height > 0.0) {
            return invalid("world.segment_height", "must be positive");
        }
        if self.world.step_min == 0 || self.world.step_min > self.world.step_max {
            return invalid("world.step_min", "must be non-zero and <= step_max");
        }
        if self.world.whirlpool_step_min == 0
            || self.world.whirlpool_step_min > self.world.whirlpool_step_max
        {
            return invalid(
                "world.whirlpool_step_min",
                "must be non-zero and <= whirlpool_step_max",
            );
        }
        if !(self.whirlpool.teleport_distance > 0.0) {
            return invalid("whirlpool.teleport_distance", "must be positive");
        }
        if !(self.whirlpool.radius > 0.0) {
            return invalid("whirlpool.radius", "must be positive");
        }
        // A zero cooldown would leave both ends of a teleport consumed forever
        if self.whirlpool.cooldown_ticks == 0 {
            return invalid("whirlpool.cooldown_ticks", "must be at least one tick");
        }
        if self.protocol.rx_buffer_size < crate::protocol::MAX_INBOUND_FRAME_LEN {
            return invalid("protocol.rx_buffer_size", "must hold the largest frame");
        }
        if self.protocol.high_water_percent == 0 || self.protocol.high_water_percent > 100 {
            return invalid("protocol.high_water_percent", "must be within 1..=100");
        }
        let caps = [
            (self.protocol.max_enemies, "protocol.max_enemies"),
            (self.protocol.max_projectiles, "protocol.max_projectiles"),
            (self.protocol.max_whirlpools, "protocol.max_whirlpools"),
        ];
        for (cap, field) in caps {
            if usize::from(cap) > crate::protocol::MAX_SNAPSHOT_RECORDS {
                return invalid(field, "exceeds the snapshot record limit");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "seed": 7, "protocol": { "high_water_percent": 75 } }"#)
            .unwrap();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.protocol.high_water_percent, 75);
        assert_eq!(settings.protocol.rx_buffer_size, 512);
        assert_eq!(settings.world, WorldSettings::default());
    }

    #[test]
    fn test_rejects_inverted_steps() {
        let err = Settings::from_json(r#"{ "world": { "step_min": 500, "step_max": 100 } }"#)
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "world.step_min", .. }));
    }

    #[test]
    fn test_rejects_bad_high_water() {
        let mut settings = Settings::default();
        settings.protocol.high_water_percent = 0;
        assert!(settings.validate().is_err());
        settings.protocol.high_water_percent = 101;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_whirlpool_cooldown() {
        let result = Settings::from_json(r#"{"whirlpool": {"cooldown_ticks": 0}}"#);
        assert!(matches!(
            result,
            Err(SettingsError::Invalid {
                field: "whirlpool.cooldown_ticks",
                ..
            })
        ));

        let mut settings = Settings::default();
        settings.whirlpool.cooldown_ticks = 1;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Json(_))
        ));
    }
}
