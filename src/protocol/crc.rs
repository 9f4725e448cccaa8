//! CRC-8 (polynomial 0x07, init 0x00, no reflection)

pub const CRC8_POLY: u8 = 0x07;

/// Bit-at-a-time CRC-8 over `data`
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}
