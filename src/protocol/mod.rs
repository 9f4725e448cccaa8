//! Serial protocol between the device and the host PC
//!
//! - `crc`: CRC-8/0x07 checksum
//! - `frame`: packet table, validation, command decoding and host-side encoders
//! - `snapshot`: outbound game-state and debug frames
//! - `codec`: DMA ring parser and busy-gated transmit path
//! - `link`: hardware collaborator traits and in-memory implementations

pub mod codec;
pub mod crc;
pub mod frame;
pub mod link;
pub mod snapshot;

pub use codec::{ProtocolContext, ProtocolStats, Step};
pub use crc::crc8;
pub use frame::{
    Command, END_BYTE, FrameError, MAX_INBOUND_FRAME_LEN, MIN_FRAME_LEN, PacketType,
    PayloadError, START_BYTE, decode_command, encode_add_enemy, encode_add_obstacle,
    encode_add_whirlpool, encode_cleanup, encode_command, encode_init_game, validate_frame,
};
pub use link::{CaptureUart, DmaReceiver, SoftDma, Transmitter, TxBusy, TxError};
pub use snapshot::{
    DEBUG_MESSAGE_LEN, DebugCode, DebugEvent, GameStateSnapshot, MAX_SNAPSHOT_RECORDS,
    SnapshotCaps, TX_BUFFER_SIZE, decode_debug, decode_game_state, encode_game_state,
};
