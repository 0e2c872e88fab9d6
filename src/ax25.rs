//! AX.25 UI frames carrying APRS payloads.
//!
//! A frame is built per transmission from borrowed strings, validated, and
//! serialized into a fixed-capacity buffer. The encoder in
//! [`crate::encoding`] then clocks the bytes out; the FCS is accumulated bit by
//! bit on the way, so [`Frame::encode`] only produces the frame body.
//!
//! Layout:
//!
//! ```text
//! | dest (7) | source (7) | [digi (7)] | 0x03 | 0xF0 | type | payload | FCS (2) |
//! ```
//!
//! Every address byte is shifted left by one. The low bit of the last address
//! byte marks the end of the header.

use heapless::Vec;

use crate::consts::{
    APRS_LATITUDE_LEN, APRS_LONGITUDE_LEN, APRS_MAX_POSITION_COMMENT_LEN,
    APRS_MAX_STATUS_COMMENT_LEN, APRS_TYPE_POSITION, APRS_TYPE_STATUS, AX25_ADDRESS_LEN,
    AX25_CALLSIGN_LEN, AX25_CONTROL_UI, AX25_MAX_FRAME_LEN, AX25_MAX_FRAME_WITH_FCS_LEN,
    AX25_PID_NO_LAYER3,
};
use crate::crc::fcs;
use crate::error::FrameError;

/// Callsign plus SSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Address {
    call: [u8; AX25_CALLSIGN_LEN],
    len: u8,
    ssid: u8,
}

impl Address {
    /// Builds an address from a 1 to 6 character callsign and a 4-bit SSID.
    ///
    /// Callsigns are sent as given; APRS expects them in upper case.
    pub const fn new(callsign: &str, ssid: u8) -> Result<Self, FrameError> {
        let bytes = callsign.as_bytes();
        if bytes.is_empty() || bytes.len() > AX25_CALLSIGN_LEN {
            return Err(FrameError::InvalidCallsign);
        }
        if ssid > 15 {
            return Err(FrameError::InvalidSsid(ssid));
        }
        let mut call = [b' '; AX25_CALLSIGN_LEN];
        let mut i = 0;
        while i < bytes.len() {
            if !bytes[i].is_ascii_graphic() {
                return Err(FrameError::InvalidCallsign);
            }
            call[i] = bytes[i];
            i += 1;
        }
        Ok(Self {
            call,
            len: bytes.len() as u8,
            ssid,
        })
    }

    /// The callsign without padding.
    pub fn callsign(&self) -> &str {
        core::str::from_utf8(&self.call[..usize::from(self.len)]).unwrap_or("")
    }

    /// The SSID.
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// The same callsign with another SSID.
    pub fn with_ssid(self, ssid: u8) -> Result<Self, FrameError> {
        if ssid > 15 {
            return Err(FrameError::InvalidSsid(ssid));
        }
        Ok(Self { ssid, ..self })
    }

    /// On-air form: the space-padded callsign, then `0b011SSSSx`, each shifted
    /// left by one. `last` sets the end-of-header bit.
    pub fn encode(&self, last: bool) -> [u8; AX25_ADDRESS_LEN] {
        let mut out = [0u8; AX25_ADDRESS_LEN];
        for (dst, &c) in out.iter_mut().zip(self.call.iter()) {
            *dst = c << 1;
        }
        out[AX25_CALLSIGN_LEN] = 0x60 | (self.ssid << 1) | u8::from(last);
        out
    }
}

/// Information field of an APRS frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Uncompressed position without messaging: `!DDMM.mmN/DDDMM.mmWOcomment`.
    Position {
        /// Formatted latitude, 8 bytes.
        latitude: &'a str,
        /// Symbol table identifier.
        symbol_table: u8,
        /// Formatted longitude, 9 bytes.
        longitude: &'a str,
        /// Symbol code.
        symbol: u8,
        /// Free text sent verbatim.
        comment: &'a [u8],
    },
    /// Status report: `>comment`.
    Status {
        /// Free text sent verbatim.
        comment: &'a [u8],
    },
}

impl Payload<'_> {
    /// The APRS data type identifier.
    pub fn type_marker(&self) -> u8 {
        match self {
            Payload::Position { .. } => APRS_TYPE_POSITION,
            Payload::Status { .. } => APRS_TYPE_STATUS,
        }
    }

    /// Length of the information field, type identifier included.
    pub fn info_len(&self) -> usize {
        match self {
            Payload::Position { comment, .. } => {
                1 + APRS_LATITUDE_LEN + 1 + APRS_LONGITUDE_LEN + 1 + comment.len()
            }
            Payload::Status { comment } => 1 + comment.len(),
        }
    }

    fn validate(&self) -> Result<(), FrameError> {
        let (comment, max) = match self {
            Payload::Position {
                latitude,
                longitude,
                comment,
                ..
            } => {
                if latitude.len() != APRS_LATITUDE_LEN || longitude.len() != APRS_LONGITUDE_LEN {
                    return Err(FrameError::InvalidCoordinate);
                }
                (comment, APRS_MAX_POSITION_COMMENT_LEN)
            }
            Payload::Status { comment } => (comment, APRS_MAX_STATUS_COMMENT_LEN),
        };
        if comment.len() > max {
            return Err(FrameError::CommentTooLong(comment.len()));
        }
        Ok(())
    }
}

/// One AX.25 UI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Destination address.
    pub destination: Address,
    /// Source address.
    pub source: Address,
    /// Optional digipeater, sent after the source.
    pub digipeater: Option<Address>,
    /// Information field.
    pub payload: Payload<'a>,
}

impl Frame<'_> {
    /// Checks coordinate lengths and that the information field fits.
    pub fn validate(&self) -> Result<(), FrameError> {
        self.payload.validate()
    }

    /// Serializes everything between the opening flags and the FCS.
    pub fn encode(&self) -> Result<Vec<u8, AX25_MAX_FRAME_LEN>, FrameError> {
        self.validate()?;
        let mut out = Vec::new();
        self.write_body(&mut out)?;
        Ok(out)
    }

    /// Serialized body followed by its FCS, low byte first.
    ///
    /// Used for logging and for feeding a modem that does its own bit stuffing;
    /// the transmitter computes the FCS on the fly instead.
    pub fn to_bytes(&self) -> Result<Vec<u8, AX25_MAX_FRAME_WITH_FCS_LEN>, FrameError> {
        self.validate()?;
        let mut out = Vec::new();
        self.write_body(&mut out)?;
        let fcs = fcs(&out);
        extend(&mut out, &fcs.to_le_bytes(), 0)?;
        Ok(out)
    }

    fn write_body<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), FrameError> {
        let overflow = match self.payload {
            Payload::Position { comment, .. } | Payload::Status { comment } => comment.len(),
        };

        extend(out, &self.destination.encode(false), overflow)?;
        extend(out, &self.source.encode(self.digipeater.is_none()), overflow)?;
        if let Some(digipeater) = &self.digipeater {
            extend(out, &digipeater.encode(true), overflow)?;
        }
        extend(
            out,
            &[AX25_CONTROL_UI, AX25_PID_NO_LAYER3, self.payload.type_marker()],
            overflow,
        )?;

        match self.payload {
            Payload::Position {
                latitude,
                symbol_table,
                longitude,
                symbol,
                comment,
            } => {
                extend(out, latitude.as_bytes(), overflow)?;
                extend(out, &[symbol_table], overflow)?;
                extend(out, longitude.as_bytes(), overflow)?;
                extend(out, &[symbol], overflow)?;
                extend(out, comment, overflow)
            }
            Payload::Status { comment } => extend(out, comment, overflow),
        }
    }
}

fn extend<const N: usize>(
    out: &mut Vec<u8, N>,
    bytes: &[u8],
    comment_len: usize,
) -> Result<(), FrameError> {
    out.extend_from_slice(bytes)
        .map_err(|_| FrameError::CommentTooLong(comment_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_fcs(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xffff;
        for &byte in data {
            crc ^= u16::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0x8408 } else { crc >> 1 };
            }
        }
        !crc
    }

    fn position<'a>(comment: &'a [u8]) -> Frame<'a> {
        Frame {
            destination: Address::new("APMON1", 0).unwrap(),
            source: Address::new("TEST", 0).unwrap(),
            digipeater: None,
            payload: Payload::Position {
                latitude: "4903.50N",
                symbol_table: b'/',
                longitude: "07201.75W",
                symbol: b'O',
                comment,
            },
        }
    }

    #[test]
    fn test_address_encoding() {
        let dest = Address::new("APMON1", 0).unwrap();
        assert_eq!(
            dest.encode(false),
            [0x82, 0xa0, 0x9a, 0x9e, 0x9c, 0x62, 0x60]
        );
        let source = Address::new("TEST", 0).unwrap();
        assert_eq!(source.encode(true), [0xa8, 0x8a, 0xa6, 0xa8, 0x40, 0x40, 0x61]);
        let digi = Address::new("WIDE1", 1).unwrap();
        assert_eq!(digi.encode(true)[6], 0x63);
        assert_eq!(Address::new("DL9AS", 11).unwrap().encode(false)[6], 0x76);
    }

    #[test]
    fn test_address_validation() {
        assert_eq!(Address::new("", 0), Err(FrameError::InvalidCallsign));
        assert_eq!(Address::new("TOOLONG", 0), Err(FrameError::InvalidCallsign));
        assert_eq!(Address::new("A B", 0), Err(FrameError::InvalidCallsign));
        assert_eq!(Address::new("DL9AS", 16), Err(FrameError::InvalidSsid(16)));

        let address = Address::new("DL9AS", 11).unwrap();
        assert_eq!(address.callsign(), "DL9AS");
        assert_eq!(address.with_ssid(9).unwrap().ssid(), 9);
        assert_eq!(address.with_ssid(20), Err(FrameError::InvalidSsid(20)));
    }

    #[test]
    fn test_position_frame_is_byte_exact() {
        let mut expected: std::vec::Vec<u8> = vec![
            0x82, 0xa0, 0x9a, 0x9e, 0x9c, 0x62, 0x60, // APMON1-0
            0xa8, 0x8a, 0xa6, 0xa8, 0x40, 0x40, 0x61, // TEST-0, end of header
            0x03, 0xf0, b'!',
        ];
        expected.extend_from_slice(b"4903.50N/07201.75WOhello");
        let fcs = reference_fcs(&expected);
        expected.push(fcs as u8);
        expected.push((fcs >> 8) as u8);

        assert_eq!(position(b"hello").to_bytes().unwrap().as_slice(), &expected[..]);
    }

    #[test]
    fn test_digipeater_moves_end_of_header() {
        let mut frame = position(b"");
        frame.digipeater = Some(Address::new("WIDE1", 1).unwrap());
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes[13], 0x60);
        assert_eq!(&bytes[14..21], &[0xae, 0x92, 0x88, 0x8a, 0x62, 0x40, 0x63]);
        assert_eq!(&bytes[21..24], &[0x03, 0xf0, b'!']);
    }

    #[test]
    fn test_status_frame() {
        let frame = Frame {
            destination: Address::new("APMON1", 3).unwrap(),
            source: Address::new("TEST", 7).unwrap(),
            digipeater: None,
            payload: Payload::Status { comment: b"\x00img" },
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes[6], 0x66);
        assert_eq!(bytes[13], 0x6f);
        assert_eq!(&bytes[14..], b"\x03\xf0>\x00img");
    }

    #[test]
    fn test_validation_rejects_bad_payloads() {
        let mut frame = position(b"");
        frame.payload = Payload::Position {
            latitude: "4903.5N",
            symbol_table: b'/',
            longitude: "07201.75W",
            symbol: b'O',
            comment: b"",
        };
        assert_eq!(frame.encode(), Err(FrameError::InvalidCoordinate));

        let long = [b'x'; 237];
        assert_eq!(position(&long[..236]).encode().map(|b| b.len()), Ok(14 + 2 + 256));
        assert_eq!(position(&long).encode(), Err(FrameError::CommentTooLong(237)));

        let status = [b'x'; 256];
        frame.payload = Payload::Status { comment: &status[..255] };
        assert_eq!(frame.encode().map(|b| b.len()), Ok(14 + 2 + 256));
        frame.payload = Payload::Status { comment: &status };
        assert_eq!(frame.encode(), Err(FrameError::CommentTooLong(256)));
    }
}
