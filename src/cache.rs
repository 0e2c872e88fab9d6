//! Persistent position trail.
//!
//! The trail is a breadcrumb of coarse positions kept across resets and sent as
//! a status packet, so a ground station that missed earlier packets can still
//! reconstruct the flight path.
//!
//! Each point is two printable bytes: latitude mapped to 0..=90 in 2° steps and
//! longitude mapped to 0..=90 in 4° steps, both offset by 33 like Base91
//! digits. A point is only recorded if it differs from both of the last two
//! recorded points, which suppresses oscillation on a grid boundary.
//!
//! ## Storage
//!
//! [`TrailCache`] is a fixed array plus a logical byte count. Below capacity,
//! bytes are appended; once full, the array is shifted left by one and the new
//! byte lands at the end, so the array always holds the newest bytes in
//! chronological order. The count keeps growing past capacity, which tells the
//! receiver how many points were recorded in total.
//!
//! Persistence goes through [`KeyValueStore`]: the whole array under
//! [`CACHE_BUF_KEY`] and the count under [`CACHE_COUNT_KEY`].

use heapless::Vec;

use crate::consts::{BASE91_OFFSET, CACHE_BUF_KEY, CACHE_COUNT_KEY, CACHE_END_FLAG, CACHE_LENGTH};

/// Largest payload: the trail, the end flag and two count digits.
pub const CACHE_PAYLOAD_LEN: usize = CACHE_LENGTH + 3;

/// Largest value [`base91_pair`] can represent.
pub const BASE91_PAIR_MAX: u16 = 90 * 91 - 1;

const MAX_COUNT: u16 = u16::MAX - 1;

/// Non-volatile key-value storage, such as a flash-backed preferences store.
pub trait KeyValueStore {
    /// Error reported by the store.
    type Error;

    /// Reads the value under `key` into `buf` and returns the number of bytes
    /// read. A missing key reads zero bytes.
    fn get_bytes(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Writes `bytes` under `key`.
    fn put_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Reads a `u16` under `key`, `None` if missing.
    fn get_u16(&mut self, key: &str) -> Result<Option<u16>, Self::Error>;

    /// Writes a `u16` under `key`.
    fn put_u16(&mut self, key: &str, value: u16) -> Result<(), Self::Error>;
}

/// A quantized position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TrailPoint {
    /// `round((lat + 90) / 2) + 33`.
    pub latitude: u8,
    /// `round((lon + 180) / 4) + 33`.
    pub longitude: u8,
}

impl TrailPoint {
    /// Quantizes a position given in hundredths of a degree.
    ///
    /// Degrees are truncated before scaling.
    pub fn quantize(latitude: i16, longitude: i16) -> Self {
        let lat = (i32::from(latitude) / 100).clamp(-90, 90);
        let lon = (i32::from(longitude) / 100).clamp(-180, 180);
        Self {
            latitude: libm::round(0.5 * f64::from(lat + 90)) as u8 + BASE91_OFFSET,
            longitude: libm::round(0.25 * f64::from(lon + 180)) as u8 + BASE91_OFFSET,
        }
    }

    fn bytes(&self) -> [u8; 2] {
        [self.latitude, self.longitude]
    }
}

/// Two printable Base91-style digits of `n`: quotient and remainder by 90.
///
/// Values above [`BASE91_PAIR_MAX`] are clamped.
pub fn base91_pair(n: u16) -> [u8; 2] {
    let n = n.min(BASE91_PAIR_MAX);
    [(n / 90) as u8 + BASE91_OFFSET, (n % 90) as u8 + BASE91_OFFSET]
}

/// Bounded FIFO of trail bytes with a running count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailCache<const N: usize = CACHE_LENGTH> {
    buf: [u8; N],
    count: u16,
}

impl<const N: usize> Default for TrailCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TrailCache<N> {
    const VALID_CAPACITY: () = assert!(N > 0 && N % 2 == 0 && N <= CACHE_LENGTH);

    /// An empty trail.
    pub fn new() -> Self {
        let () = Self::VALID_CAPACITY;
        Self {
            buf: [0; N],
            count: 0,
        }
    }

    /// Reads the trail from `store`.
    ///
    /// A store error, an odd count or a buffer shorter than the count says
    /// yields an empty trail; the next [`TrailCache::store`] overwrites it.
    pub fn load<S: KeyValueStore>(store: &mut S) -> Self {
        let mut cache = Self::new();
        let count = match store.get_u16(CACHE_COUNT_KEY) {
            Ok(count) => count.unwrap_or(0),
            Err(_) => {
                warn!("trail count unreadable, starting empty");
                return cache;
            }
        };
        if count % 2 != 0 {
            warn!("odd trail count {}, starting empty", count);
            return cache;
        }
        let filled = usize::from(count).min(N);
        match store.get_bytes(CACHE_BUF_KEY, &mut cache.buf) {
            Ok(read) if read >= filled => {
                cache.count = count;
                debug!("trail loaded: {} bytes of {}", filled, count);
                cache
            }
            _ => {
                warn!("trail buffer short or unreadable, starting empty");
                Self::new()
            }
        }
    }

    /// Writes the whole array and the count to `store`.
    pub fn store<S: KeyValueStore>(&self, store: &mut S) -> Result<(), S::Error> {
        store.put_bytes(CACHE_BUF_KEY, &self.buf)?;
        store.put_u16(CACHE_COUNT_KEY, self.count)
    }

    /// Appends one byte, evicting the oldest if full, and returns the new count.
    pub fn push(&mut self, byte: u8) -> u16 {
        let index = usize::from(self.count);
        if index >= N {
            self.buf.copy_within(1.., 0);
            self.buf[N - 1] = byte;
        } else {
            self.buf[index] = byte;
        }
        self.count = self.count.saturating_add(1).min(MAX_COUNT);
        self.count
    }

    /// Total bytes pushed since the trail was created.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Bytes currently held.
    pub fn len(&self) -> usize {
        usize::from(self.count).min(N)
    }

    /// No point recorded yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The array is full and the next push evicts.
    pub fn is_full(&self) -> bool {
        usize::from(self.count) >= N
    }

    /// Held bytes, oldest first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Records `point` unless it equals one of the last two recorded points.
    /// Returns whether it was recorded.
    pub fn record(&mut self, point: TrailPoint) -> bool {
        let new = point.bytes();
        let held = self.as_bytes();
        let duplicate = held.rchunks_exact(2).take(2).any(|pair| pair == new);
        if duplicate {
            trace!("trail point {} {} suppressed", point.latitude, point.longitude);
            return false;
        }
        let _ = self.push(new[0]);
        let count = self.push(new[1]);
        debug!("trail point {} {} recorded, count {}", point.latitude, point.longitude, count);
        true
    }

    /// Quantizes and records a position in hundredths of a degree.
    ///
    /// Positions with either coordinate at zero are treated as "no fix" and
    /// skipped.
    pub fn record_position(&mut self, latitude: i16, longitude: i16) -> bool {
        if latitude == 0 || longitude == 0 {
            return false;
        }
        self.record(TrailPoint::quantize(latitude, longitude))
    }

    /// Status payload: held bytes, `|`, then the point count as two digits.
    pub fn payload(&self) -> Vec<u8, CACHE_PAYLOAD_LEN> {
        let mut out = Vec::new();
        let _ = out.extend_from_slice(self.as_bytes());
        let _ = out.push(CACHE_END_FLAG);
        let _ = out.extend_from_slice(&base91_pair(self.count / 2));
        out
    }
}
