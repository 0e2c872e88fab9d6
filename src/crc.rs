use crate::consts::{CRC_CCITT_INIT, CRC_CCITT_POLY};

/// Feeds one bit into the reflected CRC-16/CCITT accumulator.
pub(crate) fn crc_ccitt_update_bit(crc: u16, bit: bool) -> u16 {
    let lsb = crc & 0x0001 != 0;
    let crc = crc >> 1;
    if lsb != bit { crc ^ CRC_CCITT_POLY } else { crc }
}

/// Feeds one byte into the accumulator, least significant bit first.
pub(crate) fn crc_ccitt_update(crc: u16, data: &u8) -> u16 {
    (0..8).fold(crc, |crc, i| crc_ccitt_update_bit(crc, (*data >> i) & 0x01 != 0))
}

/// Frame check sequence for `bytes`: the complemented accumulator, sent low byte first.
pub(crate) fn fcs(bytes: &[u8]) -> u16 {
    !bytes.iter().fold(CRC_CCITT_INIT, crc_ccitt_update)
}
