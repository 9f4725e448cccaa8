//! Protocol codec
//!
//! Chases the DMA write cursor through the receive ring, extracting fixed-size
//! frames and applying them to the game state. Never blocks: partial frames
//! wait for the next poll, corrupt ones cost a single byte of resync, and a
//! ring that fills past the high-water mark is fast-forwarded.

use serde::Serialize;

use super::frame::{
    Command, FrameError, MAX_INBOUND_FRAME_LEN, MIN_FRAME_LEN, PacketType, PayloadError,
    START_BYTE, decode_command, validate_frame,
};
use super::link::{CaptureUart, DmaReceiver, SoftDma, Transmitter, TxBusy, TxError};
use super::snapshot::{
    DebugCode, DebugEvent, SnapshotCaps, TX_BUFFER_SIZE, encode_debug, encode_game_state,
};
use crate::bench::FrameStats;
use crate::settings::ProtocolSettings;
use crate::sim::GameState;

/// A skipped-sends notice goes out each time this many more sends were dropped
pub const SKIP_REPORT_STEP: u32 = 100;

/// Running counters, never reset except by constructing a new context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolStats {
    pub frames_accepted: u32,
    pub unknown_types: u32,
    pub missing_end: u32,
    pub checksum_mismatches: u32,
    pub payload_rejected: u32,
    /// Valid commands dropped because the target store was full
    pub dropped_full: u32,
    pub forced_resets: u32,
    pub bytes_discarded: u32,
    pub frames_sent: u32,
    pub sends_skipped: u32,
}

/// Outcome of a single parser step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Read cursor has caught up with the DMA cursor
    Idle,
    /// Skipped one byte while hunting for a start byte
    Skipped,
    /// A frame has started but is not complete yet
    Pending,
    /// Dropped the start byte of a bad frame
    Resync(FrameError),
    /// Applied a command frame
    Applied(PacketType),
    /// Consumed a well-formed frame whose payload was rejected
    Rejected(PayloadError),
}

/// Bytes from `from` up to (not including) `to` in a ring of `len`
fn ring_distance(from: usize, to: usize, len: usize) -> usize {
    if to >= from { to - from } else { len - from + to }
}

/// Protocol endpoint bound to one DMA receiver and one transmitter
#[derive(Debug)]
pub struct ProtocolContext<R, T> {
    rx: R,
    tx: T,
    busy: TxBusy,
    read_pos: usize,
    high_water: usize,
    caps: SnapshotCaps,
    debug_telemetry: bool,
    stats_interval: u32,
    /// `sends_skipped` as of the last skipped-sends notice
    skips_reported: u32,
    stats: ProtocolStats,
    tx_buf: [u8; TX_BUFFER_SIZE],
}

impl ProtocolContext<SoftDma, CaptureUart> {
    /// In-memory link sized from the settings
    pub fn soft(cfg: &ProtocolSettings) -> Self {
        let busy = TxBusy::new();
        let rx = SoftDma::new(cfg.rx_buffer_size);
        let tx = CaptureUart::new(busy.clone());
        Self::new(rx, tx, busy, cfg)
    }

    /// Transmit-complete interrupt of the capture UART
    pub fn complete_transmit(&mut self) {
        self.tx.complete();
    }
}

impl<T> ProtocolContext<SoftDma, T> {
    /// Bytes arriving over the wire
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.feed(bytes);
    }
}

impl<R: DmaReceiver, T: Transmitter> ProtocolContext<R, T> {
    pub fn new(rx: R, tx: T, busy: TxBusy, cfg: &ProtocolSettings) -> Self {
        let size = rx.buffer().len();
        let high_water = size * usize::from(cfg.high_water_percent.min(100)) / 100;
        let read_pos = rx.write_pos();
        log::info!(
            "Protocol ready: {size}-byte ring, high water {high_water} bytes, caps {}/{}/{}",
            cfg.max_enemies,
            cfg.max_projectiles,
            cfg.max_whirlpools
        );
        Self {
            rx,
            tx,
            busy,
            read_pos,
            high_water,
            caps: SnapshotCaps::from(cfg),
            debug_telemetry: cfg.debug_telemetry,
            stats_interval: cfg.stats_interval,
            skips_reported: 0,
            stats: ProtocolStats::default(),
            tx_buf: [0; TX_BUFFER_SIZE],
        }
    }

    pub fn stats(&self) -> &ProtocolStats {
        &self.stats
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub fn rx(&self) -> &R {
        &self.rx
    }

    pub fn tx(&self) -> &T {
        &self.tx
    }

    pub fn tx_mut(&mut self) -> &mut T {
        &mut self.tx
    }

    pub fn busy(&self) -> &TxBusy {
        &self.busy
    }

    /// Unread bytes in the ring
    pub fn occupancy(&self) -> usize {
        ring_distance(self.read_pos, self.rx.write_pos(), self.rx.buffer().len())
    }

    /// Drain every complete frame currently in the ring. Returns how many
    /// command frames were applied.
    pub fn poll(&mut self, state: &mut GameState) -> usize {
        self.relieve_pressure();
        let mut applied = 0;
        loop {
            match self.step(state) {
                Step::Idle | Step::Pending => break,
                Step::Applied(_) => applied += 1,
                Step::Skipped | Step::Resync(_) | Step::Rejected(_) => {}
            }
        }
        self.relieve_pressure();
        applied
    }

    /// Advance the parser by one byte or one frame
    pub fn step(&mut self, state: &mut GameState) -> Step {
        let size = self.rx.buffer().len();
        let write = self.rx.write_pos();
        if size == 0 || self.read_pos == write {
            return Step::Idle;
        }

        let read = self.read_pos;
        let mut scratch = [0u8; MAX_INBOUND_FRAME_LEN];
        let frame_len = {
            let ring = self.rx.buffer();
            if ring[read] != START_BYTE {
                self.read_pos = (read + 1) % size;
                return Step::Skipped;
            }
            let available = ring_distance(read, write, size);
            if available < MIN_FRAME_LEN {
                return Step::Pending;
            }
            let ty_byte = ring[(read + 1) % size];
            let Some(frame_len) = PacketType::from_byte(ty_byte).and_then(PacketType::inbound_len)
            else {
                return self.resync(FrameError::UnknownType(ty_byte));
            };
            if available < frame_len {
                return Step::Pending;
            }
            for (i, slot) in scratch.iter_mut().take(frame_len).enumerate() {
                *slot = ring[(read + i) % size];
            }
            frame_len
        };
        let frame = &scratch[..frame_len];

        let ty = match validate_frame(frame) {
            Ok(ty) => ty,
            Err(err) => return self.resync(err),
        };
        self.read_pos = (read + frame_len) % size;

        match decode_command(frame) {
            Ok(command) => {
                self.apply(state, command);
                self.stats.frames_accepted += 1;
                Step::Applied(ty)
            }
            Err(err) => {
                self.stats.payload_rejected += 1;
                log::debug!("Rejected {ty:?} payload: {err}");
                Step::Rejected(err)
            }
        }
    }

    /// Drop the start byte under the cursor and keep scanning
    fn resync(&mut self, err: FrameError) -> Step {
        match err {
            FrameError::UnknownType(_) => self.stats.unknown_types += 1,
            FrameError::MissingEnd => self.stats.missing_end += 1,
            FrameError::ChecksumMismatch { .. } => self.stats.checksum_mismatches += 1,
            FrameError::MissingStart | FrameError::Truncated | FrameError::Overflow(_) => {}
        }
        log::debug!("Resync at {}: {err}", self.read_pos);
        let size = self.rx.buffer().len();
        self.read_pos = (self.read_pos + 1) % size;
        Step::Resync(err)
    }

    fn apply(&mut self, state: &mut GameState, command: Command) {
        match command {
            Command::AddEnemy { kind, pos } => {
                if !state.add_enemy(kind, pos) {
                    self.stats.dropped_full += 1;
                }
            }
            Command::AddObstacle { kind, pos, radius } => {
                if !state.add_obstacle(kind, pos, radius) {
                    state.emergency_cleanup();
                    if !state.add_obstacle(kind, pos, radius) {
                        self.stats.dropped_full += 1;
                    }
                }
            }
            Command::AddWhirlpool { pos } => {
                if !state.add_whirlpool(pos) {
                    self.stats.dropped_full += 1;
                }
            }
            Command::Cleanup { threshold_y } => {
                state.cleanup_old(threshold_y);
            }
            Command::InitGame => state.reset(),
        }
    }

    /// Fast-forward to the DMA cursor if the backlog is above the high-water mark
    fn relieve_pressure(&mut self) -> bool {
        let used = self.occupancy();
        if used <= self.high_water {
            return false;
        }
        self.read_pos = self.rx.write_pos();
        self.stats.forced_resets += 1;
        self.stats.bytes_discarded = self
            .stats
            .bytes_discarded
            .saturating_add(u32::try_from(used).unwrap_or(u32::MAX));
        log::warn!("Receive ring {used} bytes deep, discarding backlog");

        if self.debug_telemetry {
            let event = DebugEvent {
                code: DebugCode::ForcedReset,
                packet_type: 0,
                detail: u8::try_from(used).unwrap_or(u8::MAX),
                message: "Buffer overflow reset".into(),
            };
            let _ = self.send_debug(&event);
        }
        true
    }

    /// Serialize and start sending a snapshot. Dropped if the previous
    /// transfer has not completed.
    pub fn send_game_state(&mut self, state: &GameState) -> Result<usize, TxError> {
        if !self.busy.try_claim() {
            self.stats.sends_skipped += 1;
            log::debug!("Transmitter busy, skipping frame {}", state.frame_counter);
            return Err(TxError::Busy);
        }
        let len = match encode_game_state(&mut self.tx_buf, state, &self.caps) {
            Ok(len) => len,
            Err(err) => {
                self.busy.release();
                self.stats.sends_skipped += 1;
                return Err(TxError::Encode(err));
            }
        };
        self.transmit(len)
    }

    /// Periodic diagnostics, called once per main-loop frame with the
    /// transmitter idle. Sends at most one debug frame: a skipped-sends notice
    /// when due, otherwise the load report every `stats_interval` frames.
    /// Returns the code that went out.
    pub fn report(&mut self, load: &FrameStats, frame: u32) -> Option<DebugCode> {
        let report_due = self.stats_interval > 0 && frame % self.stats_interval == 0;
        if report_due {
            log::info!("Frame {frame}: {}", load.report_message());
        }
        if !self.debug_telemetry {
            return None;
        }

        let skipped = self.stats.sends_skipped;
        let event = if skipped >= self.skips_reported.saturating_add(SKIP_REPORT_STEP) {
            DebugEvent {
                code: DebugCode::SkippedSends,
                packet_type: 0,
                detail: 0,
                message: format!("Skipped {skipped} pkts"),
            }
        } else if report_due {
            DebugEvent {
                code: DebugCode::Stats,
                packet_type: 0,
                detail: u8::try_from(load.slow_frames).unwrap_or(u8::MAX),
                message: load.report_message(),
            }
        } else {
            return None;
        };

        match self.send_debug(&event) {
            Ok(_) => {
                if event.code == DebugCode::SkippedSends {
                    self.skips_reported = skipped;
                }
                Some(event.code)
            }
            Err(err) => {
                log::debug!("{:?} report not sent: {err}", event.code);
                None
            }
        }
    }

    fn send_debug(&mut self, event: &DebugEvent) -> Result<usize, TxError> {
        if !self.busy.try_claim() {
            return Err(TxError::Busy);
        }
        match encode_debug(&mut self.tx_buf, event) {
            Ok(len) => self.transmit(len),
            Err(err) => {
                self.busy.release();
                Err(TxError::Encode(err))
            }
        }
    }

    /// Hand `tx_buf[..len]` to the transmitter; the busy flag is already claimed
    fn transmit(&mut self, len: usize) -> Result<usize, TxError> {
        match self.tx.start(&self.tx_buf[..len]) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                Ok(len)
            }
            Err(err) => {
                self.busy.release();
                self.stats.sends_skipped += 1;
                log::debug!("Transmit failed: {err}");
                Err(err)
            }
        }
    }
}
