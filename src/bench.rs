//! Frame timing and load statistics
//!
//! The main loop charges the wall time of each phase to a [`FrameStats`] and
//! closes the frame with its total. Frame time is smoothed with an
//! exponential moving average; frames over [`SLOW_FRAME`] are counted. The
//! one-line [`FrameStats::report_message`] fits the 32-byte debug message.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::sim::GameState;

/// Frames slower than this count as slow
pub const SLOW_FRAME: Duration = Duration::from_millis(20);

/// Weight of the newest sample in the average frame time
const AVERAGE_WEIGHT: f32 = 0.05;

/// Main-loop phases that get timed separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Draining the receive ring
    Receive,
    /// Simulation tick, collisions included
    Update,
    /// Encoding and starting the snapshot transfer
    Send,
}

/// Microseconds spent in each phase of the last frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTimes {
    pub receive_us: u32,
    pub update_us: u32,
    pub send_us: u32,
}

impl PhaseTimes {
    fn slot(&mut self, phase: Phase) -> &mut u32 {
        match phase {
            Phase::Receive => &mut self.receive_us,
            Phase::Update => &mut self.update_us,
            Phase::Send => &mut self.send_us,
        }
    }
}

fn micros(elapsed: Duration) -> u32 {
    u32::try_from(elapsed.as_micros()).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    /// Phase breakdown of the last closed frame
    pub phases: PhaseTimes,
    /// Phase times of the frame in progress
    #[serde(skip)]
    pending: PhaseTimes,
    pub frame_us: u32,
    pub max_frame_us: u32,
    /// Smoothed frame time in milliseconds
    pub avg_frame_ms: f32,
    pub total_frames: u32,
    pub slow_frames: u32,
    pub enemies: usize,
    pub projectiles: usize,
    pub obstacles: usize,
    pub whirlpools: usize,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work`, charging its wall time to `phase`
    pub fn time<R>(&mut self, phase: Phase, work: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = work();
        self.record(phase, start.elapsed());
        out
    }

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        let slot = self.pending.slot(phase);
        *slot = slot.saturating_add(micros(elapsed));
    }

    /// Close the frame that took `total` and snapshot the entity counts
    pub fn end_frame(&mut self, total: Duration, state: &GameState) {
        let frame_us = micros(total);
        let frame_ms = frame_us as f32 / 1000.0;

        self.phases = std::mem::take(&mut self.pending);
        self.frame_us = frame_us;
        self.max_frame_us = self.max_frame_us.max(frame_us);
        self.avg_frame_ms = if self.total_frames == 0 {
            frame_ms
        } else {
            self.avg_frame_ms * (1.0 - AVERAGE_WEIGHT) + frame_ms * AVERAGE_WEIGHT
        };
        self.total_frames = self.total_frames.saturating_add(1);
        if total > SLOW_FRAME {
            self.slow_frames = self.slow_frames.saturating_add(1);
            log::debug!("Slow frame {}: {frame_ms:.1}ms", self.total_frames);
        }

        self.enemies = state.total_enemies();
        self.projectiles = state.projectiles.len();
        self.obstacles = state.obstacles.len();
        self.whirlpools = state.whirlpools.pools.len();
    }

    /// Frames per second implied by the average frame time, 0 before any frame
    pub fn fps(&self) -> u32 {
        if self.avg_frame_ms > 0.0 {
            (1000.0 / self.avg_frame_ms) as u32
        } else {
            0
        }
    }

    /// `FPS:ff E:ee P:pp T:ttms`, every field two digits and capped at 99
    pub fn report_message(&self) -> String {
        let two = |n: usize| n.min(99);
        format!(
            "FPS:{:02} E:{:02} P:{:02} T:{:02}ms",
            two(self.fps() as usize),
            two(self.enemies),
            two(self.projectiles),
            two(self.avg_frame_ms as usize)
        )
    }
}
