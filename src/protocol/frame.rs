//! Wire framing
//!
//! `START(0xAA) | TYPE | payload | CRC8 | END(0x55)`, little-endian fields.
//! The CRC covers `TYPE..payload end`. Inbound frames have one fixed length
//! per type; the outbound game-state frame is variable but capped.

use glam::Vec2;
use thiserror::Error;

use super::crc::crc8;
use crate::consts::{OBSTACLE_MAX_RADIUS, SCREEN_WIDTH, WORLD_MAX_ABS_Y};
use crate::sim::{EnemyKind, ObstacleKind};

pub const START_BYTE: u8 = 0xAA;
pub const END_BYTE: u8 = 0x55;
/// START, TYPE, CRC, END
pub const MIN_FRAME_LEN: usize = 4;
/// Largest inbound frame; sizes the parser's scratch buffer
pub const MAX_INBOUND_FRAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    GameState = 0x01,
    AddEnemy = 0x02,
    AddObstacle = 0x03,
    Cleanup = 0x04,
    InitGame = 0x05,
    AddWhirlpool = 0x06,
    Debug = 0x07,
}

impl PacketType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(PacketType::GameState),
            0x02 => Some(PacketType::AddEnemy),
            0x03 => Some(PacketType::AddObstacle),
            0x04 => Some(PacketType::Cleanup),
            0x05 => Some(PacketType::InitGame),
            0x06 => Some(PacketType::AddWhirlpool),
            0x07 => Some(PacketType::Debug),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Total frame length for host-to-device packets
    pub fn inbound_len(self) -> Option<usize> {
        match self {
            PacketType::AddEnemy => Some(13),
            PacketType::AddObstacle => Some(17),
            PacketType::AddWhirlpool => Some(12),
            PacketType::Cleanup => Some(8),
            PacketType::InitGame => Some(4),
            PacketType::GameState | PacketType::Debug => None,
        }
    }
}

/// Framing or integrity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame does not begin with a start byte")]
    MissingStart,
    #[error("unknown packet type 0x{0:02x}")]
    UnknownType(u8),
    #[error("frame does not end with an end byte")]
    MissingEnd,
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{actual:02x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("frame truncated")]
    Truncated,
    #[error("frame does not fit in {0} bytes")]
    Overflow(usize),
}

/// Well-framed packet whose contents are unusable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid kind byte {0}")]
    InvalidKind(u8),
    #[error("value out of range")]
    OutOfRange,
    #[error("payload shorter than its packet type requires")]
    Truncated,
}

/// Decoded host command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    AddEnemy { kind: EnemyKind, pos: Vec2 },
    AddObstacle { kind: ObstacleKind, pos: Vec2, radius: f32 },
    AddWhirlpool { pos: Vec2 },
    Cleanup { threshold_y: f32 },
    InitGame,
}

impl Command {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Command::AddEnemy { .. } => PacketType::AddEnemy,
            Command::AddObstacle { .. } => PacketType::AddObstacle,
            Command::AddWhirlpool { .. } => PacketType::AddWhirlpool,
            Command::Cleanup { .. } => PacketType::Cleanup,
            Command::InitGame => PacketType::InitGame,
        }
    }
}

/// Check start, end and checksum of one complete frame
pub fn validate_frame(frame: &[u8]) -> Result<PacketType, FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::Truncated);
    }
    if frame[0] != START_BYTE {
        return Err(FrameError::MissingStart);
    }
    let ty = PacketType::from_byte(frame[1]).ok_or(FrameError::UnknownType(frame[1]))?;
    let len = frame.len();
    if frame[len - 1] != END_BYTE {
        return Err(FrameError::MissingEnd);
    }
    let expected = crc8(&frame[1..len - 2]);
    let actual = frame[len - 2];
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(ty)
}

/// Little-endian cursor over a payload
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn i8(&mut self) -> Option<i8> {
        self.take().map(i8::from_le_bytes)
    }

    pub fn u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    pub fn i16(&mut self) -> Option<i16> {
        self.take().map(i16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    pub fn f32(&mut self) -> Option<f32> {
        self.take().map(f32::from_le_bytes)
    }

    pub fn vec2(&mut self) -> Option<Vec2> {
        Some(Vec2::new(self.f32()?, self.f32()?))
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

/// Builds one frame into a caller-provided buffer
#[derive(Debug)]
pub struct FrameWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    overflow: bool,
}

impl<'a> FrameWriter<'a> {
    /// Start a frame: writes START and TYPE
    pub fn new(buf: &'a mut [u8], ty: PacketType) -> Self {
        let mut writer = Self {
            buf,
            len: 0,
            overflow: false,
        };
        writer.put_u8(START_BYTE);
        writer.put_u8(ty.as_byte());
        writer
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.len
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        match self.buf.get_mut(self.len..self.len + bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                self.len += bytes.len();
            }
            None => self.overflow = true,
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.put_bytes(&[v]);
    }

    pub fn put_i8(&mut self, v: i8) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_u16(&mut self, v: u16) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_i16(&mut self, v: i16) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_vec2(&mut self, v: Vec2) {
        self.put_f32(v.x);
        self.put_f32(v.y);
    }

    /// Overwrite a byte written earlier (count fields)
    pub fn patch_u8(&mut self, at: usize, v: u8) {
        if at < self.len {
            self.buf[at] = v;
        }
    }

    /// Append CRC and END. Returns the total frame length.
    pub fn finish(mut self) -> Result<usize, FrameError> {
        if self.overflow {
            return Err(FrameError::Overflow(self.buf.len()));
        }
        let crc = crc8(&self.buf[1..self.len]);
        self.put_u8(crc);
        self.put_u8(END_BYTE);
        if self.overflow {
            return Err(FrameError::Overflow(self.buf.len()));
        }
        Ok(self.len)
    }
}

fn finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Decode the payload of a validated inbound frame
pub fn decode_command(frame: &[u8]) -> Result<Command, PayloadError> {
    let ty = frame
        .get(1)
        .copied()
        .and_then(PacketType::from_byte)
        .ok_or(PayloadError::Truncated)?;
    let payload = frame
        .get(2..frame.len().saturating_sub(2))
        .ok_or(PayloadError::Truncated)?;
    let mut r = ByteReader::new(payload);

    let command = match ty {
        PacketType::AddEnemy => {
            let kind_byte = r.u8().ok_or(PayloadError::Truncated)?;
            let kind = EnemyKind::from_byte(kind_byte).ok_or(PayloadError::InvalidKind(kind_byte))?;
            let pos = r.vec2().ok_or(PayloadError::Truncated)?;
            if !finite(pos) {
                return Err(PayloadError::OutOfRange);
            }
            Command::AddEnemy { kind, pos }
        }
        PacketType::AddObstacle => {
            let kind_byte = r.u8().ok_or(PayloadError::Truncated)?;
            let kind =
                ObstacleKind::from_byte(kind_byte).ok_or(PayloadError::InvalidKind(kind_byte))?;
            let pos = r.vec2().ok_or(PayloadError::Truncated)?;
            let radius = r.f32().ok_or(PayloadError::Truncated)?;
            let in_world = finite(pos)
                && (-SCREEN_WIDTH..=2.0 * SCREEN_WIDTH).contains(&pos.x)
                && pos.y.abs() <= WORLD_MAX_ABS_Y;
            if !in_world || !(radius > 0.0 && radius <= OBSTACLE_MAX_RADIUS) {
                return Err(PayloadError::OutOfRange);
            }
            Command::AddObstacle { kind, pos, radius }
        }
        PacketType::AddWhirlpool => {
            let pos = r.vec2().ok_or(PayloadError::Truncated)?;
            if !finite(pos) {
                return Err(PayloadError::OutOfRange);
            }
            Command::AddWhirlpool { pos }
        }
        PacketType::Cleanup => {
            let threshold_y = r.f32().ok_or(PayloadError::Truncated)?;
            if threshold_y.is_nan() {
                return Err(PayloadError::OutOfRange);
            }
            Command::Cleanup { threshold_y }
        }
        PacketType::InitGame => Command::InitGame,
        PacketType::GameState | PacketType::Debug => {
            return Err(PayloadError::InvalidKind(ty.as_byte()));
        }
    };
    Ok(command)
}

/// Encode a host command as a complete frame
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = [0u8; MAX_INBOUND_FRAME_LEN];
    let mut w = FrameWriter::new(&mut buf, command.packet_type());
    match *command {
        Command::AddEnemy { kind, pos } => {
            w.put_u8(kind.as_byte());
            w.put_vec2(pos);
        }
        Command::AddObstacle { kind, pos, radius } => {
            w.put_u8(kind as u8);
            w.put_vec2(pos);
            w.put_f32(radius);
        }
        Command::AddWhirlpool { pos } => w.put_vec2(pos),
        Command::Cleanup { threshold_y } => w.put_f32(threshold_y),
        Command::InitGame => {}
    }
    // Every command fits the inbound maximum
    let len = w.finish().unwrap_or(0);
    buf[..len].to_vec()
}

pub fn encode_add_enemy(kind: EnemyKind, x: f32, y: f32) -> Vec<u8> {
    encode_command(&Command::AddEnemy {
        kind,
        pos: Vec2::new(x, y),
    })
}

pub fn encode_add_obstacle(kind: ObstacleKind, x: f32, y: f32, radius: f32) -> Vec<u8> {
    encode_command(&Command::AddObstacle {
        kind,
        pos: Vec2::new(x, y),
        radius,
    })
}

pub fn encode_add_whirlpool(x: f32, y: f32) -> Vec<u8> {
    encode_command(&Command::AddWhirlpool {
        pos: Vec2::new(x, y),
    })
}

pub fn encode_cleanup(threshold_y: f32) -> Vec<u8> {
    encode_command(&Command::Cleanup { threshold_y })
}

pub fn encode_init_game() -> Vec<u8> {
    encode_command(&Command::InitGame)
}
