//! Constants used across the APRS transmit path.
//!
//! This module defines protocol-wide constants (AX.25 framing bytes, the CRC
//! polynomial) and the reference board's defaults (crystal, correction, power,
//! APRS identity and regional frequencies).
//!
//! ## Key Concepts
//!
//! - **Flags**: `0x7E` delimits frames and doubles as the transmitter lead-in.
//! - **Addresses**: six ASCII characters plus an SSID byte, each shifted left by one.
//! - **Buffers**: sized so that the longest position or status frame fits without
//!   allocation.
//! - **Frequencies**: regional APRS channels in Hz, selected by [`crate::geofence`].
//!
//! The board defaults are only used by the `Default` impls in [`crate::config`].

/// HDLC/AX.25 frame delimiter.
pub const AX25_FLAG: u8 = 0x7e;

/// AX.25 control field for an unnumbered information (UI) frame.
pub const AX25_CONTROL_UI: u8 = 0x03;

/// AX.25 protocol identifier: no layer 3.
pub const AX25_PID_NO_LAYER3: u8 = 0xf0;

/// Reflected CRC-16/CCITT polynomial.
pub const CRC_CCITT_POLY: u16 = 0x8408;

/// Initial value of the frame check accumulator.
pub const CRC_CCITT_INIT: u16 = 0xffff;

/// Accumulator value after a frame *including* its complemented FCS has been fed
/// through the CRC. Receivers use it as the "frame is good" check.
pub const CRC_CCITT_GOOD: u16 = 0xf0b8;

/// Consecutive one bits after which a zero is stuffed.
pub const AX25_MAX_ONES: u8 = 5;

/// Data type identifier for an uncompressed position report without messaging.
pub const APRS_TYPE_POSITION: u8 = b'!';

/// Data type identifier for a status report.
pub const APRS_TYPE_STATUS: u8 = b'>';

/// Length of a formatted latitude, e.g. `4903.50N`.
pub const APRS_LATITUDE_LEN: usize = 8;

/// Length of a formatted longitude, e.g. `07201.75W`.
pub const APRS_LONGITUDE_LEN: usize = 9;

/// Maximum callsign length in an AX.25 address.
pub const AX25_CALLSIGN_LEN: usize = 6;

/// Encoded length of one AX.25 address.
pub const AX25_ADDRESS_LEN: usize = AX25_CALLSIGN_LEN + 1;

/// Largest AX.25 information field: type identifier plus payload.
pub const AX25_MAX_INFO_LEN: usize = 256;

/// Largest frame body (addresses through information field, FCS excluded).
///
/// Destination, source and one digipeater, then control and PID.
pub const AX25_MAX_FRAME_LEN: usize = 3 * AX25_ADDRESS_LEN + 2 + AX25_MAX_INFO_LEN;

/// Largest frame including the two FCS bytes.
pub const AX25_MAX_FRAME_WITH_FCS_LEN: usize = AX25_MAX_FRAME_LEN + 2;

/// Longest comment a position report can carry.
pub const APRS_MAX_POSITION_COMMENT_LEN: usize =
    AX25_MAX_INFO_LEN - 1 - APRS_LATITUDE_LEN - 1 - APRS_LONGITUDE_LEN - 1;

/// Longest comment a status report can carry.
pub const APRS_MAX_STATUS_COMMENT_LEN: usize = AX25_MAX_INFO_LEN - 1;

/// Number of flags sent before the frame, giving the transmitter time to ramp up
/// and the receiver time to lock.
pub const APRS_FLAGS_AT_BEGINNING: u8 = 100;

/// Number of flags sent after the FCS.
pub const APRS_FLAGS_AT_END: u8 = 3;

/// Nominal Bell-202 mark tone.
pub const AFSK_MARK_HZ: u32 = 1_200;

/// Space tone as generated by the two-cycle square wave.
pub const AFSK_SPACE_HZ: u32 = 2_400;

/// Calibrated mark half period for DIO2 modulation, in microseconds.
pub const DIO2_MARK_DELAY_US: u32 = 412;

/// Calibrated space half period for DIO2 modulation, in microseconds.
pub const DIO2_SPACE_DELAY_US: u32 = 206;

/// Calibrated mark half period for fast-hop modulation, in microseconds.
pub const FHOP_MARK_DELAY_US: u32 = 390;

/// Calibrated space half period for fast-hop modulation, in microseconds.
pub const FHOP_SPACE_DELAY_US: u32 = 195;

/// SX1278 reference crystal.
pub const SX1278_CRYSTAL_HZ: u32 = 32_000_000;

/// Frequency correction of the reference board with DIO2 modulation.
pub const SX1278_DIO2_CORRECTION_HZ: i32 = -47_078;

/// Frequency correction of the reference board with fast-hop modulation.
pub const SX1278_FHOP_CORRECTION_HZ: i32 = -55_800;

/// Default transmit power.
pub const SX1278_TX_POWER_DBM: u8 = 17;

/// Default FSK deviation.
pub const SX1278_DEVIATION_HZ: u32 = 3_000;

/// Offset added to the raw internal temperature reading, in kelvin.
pub const SX1278_TEMP_OFFSET: i16 = 15;

/// Default destination callsign (APRS software identifier).
pub const APRS_DESTINATION_CALLSIGN: &str = "APMON1";

/// Default digipeater path.
pub const APRS_DIGIPEATER_CALLSIGN: &str = "WIDE1";

/// SSID of the default digipeater path.
pub const APRS_DIGIPEATER_SSID: u8 = 1;

/// Source SSID used for position packets.
pub const APRS_POSITION_SSID: u8 = 11;

/// Source SSID used for image packets.
pub const APRS_IMAGE_SSID: u8 = 7;

/// Source SSID used for trail cache packets.
pub const APRS_CACHE_SSID: u8 = 9;

/// Primary symbol table.
pub const APRS_SYMBOL_OVERLAY: u8 = b'/';

/// Balloon symbol.
pub const APRS_SYMBOL: u8 = b'O';

/// Frequency used without a fix or outside every region.
pub const APRS_FREQUENCY_DEFAULT: u32 = 144_800_000;

/// IARU region 1.
pub const APRS_FREQUENCY_REGION1: u32 = 144_800_000;

/// IARU region 2.
pub const APRS_FREQUENCY_REGION2: u32 = 144_390_000;

/// Brazil.
pub const APRS_FREQUENCY_BRAZIL: u32 = 145_570_000;

/// China.
pub const APRS_FREQUENCY_CHINA: u32 = 144_640_000;

/// Japan.
pub const APRS_FREQUENCY_JAPAN: u32 = 144_660_000;

/// Thailand.
pub const APRS_FREQUENCY_THAILAND: u32 = 145_525_000;

/// New Zealand.
pub const APRS_FREQUENCY_NEWZEALAND: u32 = 144_575_000;

/// Australia.
pub const APRS_FREQUENCY_AUSTRALIA: u32 = 145_175_000;

/// Capacity of the position trail in bytes. Must be even.
pub const CACHE_LENGTH: usize = 250;

/// Store key of the trail buffer.
pub const CACHE_BUF_KEY: &str = "c_buf";

/// Store key of the trail element count.
pub const CACHE_COUNT_KEY: &str = "c_id";

/// Separator between the trail and its pair count.
pub const CACHE_END_FLAG: u8 = b'|';

/// Offset of printable Base91 digits.
pub const BASE91_OFFSET: u8 = 33;
