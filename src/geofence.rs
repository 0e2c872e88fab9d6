//! Regional APRS frequency selection.
//!
//! APRS runs on different 2 m channels around the world. [`classify`] maps a
//! position to the channel of the first region in [`REGIONS`] that contains it,
//! falling back to [`APRS_FREQUENCY_DEFAULT`].
//!
//! Coordinates are signed hundredths of a degree (north and east positive), as
//! produced by the GNSS layer. Polygons are coarse hand-drawn outlines; national
//! regions come first so they win over the continental ones that overlap them.

use crate::consts::{
    APRS_FREQUENCY_AUSTRALIA, APRS_FREQUENCY_BRAZIL, APRS_FREQUENCY_CHINA,
    APRS_FREQUENCY_DEFAULT, APRS_FREQUENCY_JAPAN, APRS_FREQUENCY_NEWZEALAND,
    APRS_FREQUENCY_REGION1, APRS_FREQUENCY_REGION2, APRS_FREQUENCY_THAILAND,
};

/// A named polygon and the channel used inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Region {
    /// Short lowercase name.
    pub name: &'static str,
    /// Vertices as (latitude, longitude) in hundredths of a degree.
    pub vertices: &'static [(i16, i16)],
    /// APRS channel.
    pub frequency_hz: u32,
}

impl Region {
    /// Crossing-number point-in-polygon test.
    ///
    /// Casts a ray along the latitude axis and counts the edges it crosses.
    /// Arithmetic is integer with truncating division, so points within a
    /// hundredth of an edge may land on either side.
    pub fn contains(&self, latitude: i16, longitude: i16) -> bool {
        let (lat, lon) = (i32::from(latitude), i32::from(longitude));
        let mut inside = false;
        let mut j = match self.vertices.len() {
            0 => return false,
            n => n - 1,
        };
        for (i, &(lat_i, lon_i)) in self.vertices.iter().enumerate() {
            let (lat_i, lon_i) = (i32::from(lat_i), i32::from(lon_i));
            let (lat_j, lon_j) = (
                i32::from(self.vertices[j].0),
                i32::from(self.vertices[j].1),
            );
            if (lon_i > lon) != (lon_j > lon)
                && lat < (lat_j - lat_i) * (lon - lon_i) / (lon_j - lon_i) + lat_i
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Regions in priority order.
pub static REGIONS: [Region; 8] = [
    Region {
        name: "australia",
        vertices: &[
            (-764, 12441),
            (-1513, 10990),
            (-3352, 11008),
            (-4086, 11439),
            (-4256, 13864),
            (-4073, 14919),
            (-3590, 15385),
            (-2414, 16035),
            (-1249, 15754),
            (-283, 14321),
        ],
        frequency_hz: APRS_FREQUENCY_AUSTRALIA,
    },
    Region {
        name: "newzealand",
        vertices: &[
            (-5163, 16698),
            (-4893, 17366),
            (-4460, 17859),
            (-3979, 17999),
            (-3330, 17771),
            (-3016, 16435),
            (-4729, 15591),
        ],
        frequency_hz: APRS_FREQUENCY_NEWZEALAND,
    },
    Region {
        name: "thailand",
        vertices: &[
            (772, 9743),
            (667, 10507),
            (781, 11360),
            (1715, 11175),
            (2138, 10859),
            (2429, 10200),
            (2847, 9760),
            (2738, 9233),
            (2413, 8890),
        ],
        frequency_hz: APRS_FREQUENCY_THAILAND,
    },
    Region {
        name: "japan",
        vertices: &[
            (4174, 13782),
            (3885, 13677),
            (3663, 13395),
            (3557, 13026),
            (3236, 12859),
            (3041, 13457),
            (3229, 14740),
            (3844, 15452),
            (4555, 15162),
            (5330, 14749),
            (5449, 14213),
        ],
        frequency_hz: APRS_FREQUENCY_JAPAN,
    },
    Region {
        name: "china",
        vertices: &[
            (1730, 11093),
            (1747, 9792),
            (2307, 8157),
            (3488, 7313),
            (4508, 7665),
            (5128, 8966),
            (5095, 10144),
            (5073, 11690),
            (5073, 12446),
            (4420, 13185),
            (2468, 12306),
        ],
        frequency_hz: APRS_FREQUENCY_CHINA,
    },
    Region {
        name: "brazil",
        vertices: &[
            (-3566, -4470),
            (-3349, -6368),
            (-2152, -7915),
            (-236, -7686),
            (1144, -6649),
            (1023, -4276),
            (-148, -2870),
        ],
        frequency_hz: APRS_FREQUENCY_BRAZIL,
    },
    Region {
        name: "region2",
        vertices: &[
            (732, -7910),
            (-1086, -6539),
            (-2066, -7102),
            (-1565, -11285),
            (3485, -14942),
            (6004, -16664),
            (7083, -16875),
            (8171, -15364),
            (8408, -8754),
            (8375, -5977),
            (6125, -6047),
            (3456, -4535),
        ],
        frequency_hz: APRS_FREQUENCY_REGION2,
    },
    Region {
        name: "region1",
        vertices: &[
            (2829, 6029),
            (4458, -17),
            (7411, 1423),
            (7876, 10212),
            (6160, -17806),
        ],
        frequency_hz: APRS_FREQUENCY_REGION1,
    },
];

/// First region containing the position, if any. `(0, 0)` never matches.
pub fn region_at(latitude: i16, longitude: i16) -> Option<&'static Region> {
    if latitude == 0 && longitude == 0 {
        return None;
    }
    REGIONS.iter().find(|r| r.contains(latitude, longitude))
}

/// Transmit frequency for a position.
///
/// `(0, 0)` is what the GNSS layer reports without a fix and selects the
/// default channel, as does a position outside every region.
pub fn classify(latitude: i16, longitude: i16) -> u32 {
    match region_at(latitude, longitude) {
        Some(region) => {
            debug!("position in {}", region.name);
            region.frequency_hz
        }
        None => APRS_FREQUENCY_DEFAULT,
    }
}
