//! Differential varint coding of numeric sequences.
//!
//! A sequence is written as its first value (relative to an optional base) followed by
//! the differences between neighbours, each as a zig-zag varint. Decoding runs the prefix
//! sums back. Coordinates are fixed-point with five decimals; rounding happens once per
//! value on the way in, so every decoded value is within half a unit of least precision of
//! its source and errors never accumulate along a sequence.
use prost::encoding::{decode_varint, encode_varint};

use crate::error::{Error, Result};

/// Multiplier for fixed-point coordinates.
pub const COORD_SCALE: f64 = 100_000.0;

/// Granularity of stop times and transfer times, in seconds.
pub const TIME_GRANULARITY: u32 = 5;

pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn to_fixed(degrees: f64) -> i32 {
    (degrees * COORD_SCALE).round() as i32
}

pub fn from_fixed(value: i32) -> f64 {
    value as f64 / COORD_SCALE
}

/// Seconds to 5-second units, rounded to the nearest unit.
pub fn pack_time(seconds: u32) -> u32 {
    (seconds + TIME_GRANULARITY / 2) / TIME_GRANULARITY
}

/// Seconds to 5-second units, rounded up.
pub fn pack_duration(seconds: u32) -> u32 {
    seconds.div_ceil(TIME_GRANULARITY)
}

pub fn unpack_time(units: u32) -> u32 {
    units * TIME_GRANULARITY
}

/// Seconds to whole minutes, rounded to the nearest minute.
pub fn pack_minutes(seconds: u32) -> u32 {
    (seconds + 30) / 60
}

/// Writes successive differences of pushed values.
pub struct DeltaEncoder {
    buf: Vec<u8>,
    last: i64,
}

impl DeltaEncoder {
    pub fn new(base: i64) -> Self {
        DeltaEncoder {
            buf: vec![],
            last: base,
        }
    }

    pub fn push(&mut self, value: i64) {
        encode_varint(zigzag(value - self.last), &mut self.buf);
        self.last = value;
    }

    /// The last value pushed, or the base when nothing was pushed.
    pub fn last(&self) -> i64 {
        self.last
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads back values written by [`DeltaEncoder`].
pub struct DeltaDecoder<'a> {
    data: &'a [u8],
    last: i64,
}

impl<'a> DeltaDecoder<'a> {
    pub fn new(data: &'a [u8], base: i64) -> Self {
        DeltaDecoder { data, last: base }
    }

    pub fn last(&self) -> i64 {
        self.last
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Iterator for DeltaDecoder<'_> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        Some(match decode_varint(&mut self.data) {
            Ok(diff) => {
                self.last += unzigzag(diff);
                Ok(self.last)
            }
            Err(err) => Err(Error::from(err)),
        })
    }
}

pub fn encode(values: &[i64]) -> Vec<u8> {
    encode_from(0, values)
}

pub fn encode_from(base: i64, values: &[i64]) -> Vec<u8> {
    let mut encoder = DeltaEncoder::new(base);
    for value in values {
        encoder.push(*value);
    }
    encoder.finish()
}

pub fn decode(data: &[u8], count: usize) -> Result<Vec<i64>> {
    decode_from(0, data, count)
}

/// Decodes exactly `count` values; a shorter or longer payload is a format error.
pub fn decode_from(base: i64, data: &[u8], count: usize) -> Result<Vec<i64>> {
    let mut decoder = DeltaDecoder::new(data, base);
    let mut values = Vec::with_capacity(count);
    while values.len() < count {
        match decoder.next() {
            Some(value) => values.push(value?),
            None => {
                return Err(Error::Format(format!(
                    "expected {} values in a sequence, found {}",
                    count,
                    values.len()
                )))
            }
        }
    }
    if !decoder.is_empty() {
        return Err(Error::Format(format!(
            "trailing bytes after {} sequence values",
            count
        )));
    }
    Ok(values)
}

/// Decodes values until the payload is exhausted.
pub fn decode_all_from(base: i64, data: &[u8]) -> Result<Vec<i64>> {
    DeltaDecoder::new(data, base).collect()
}

/// Encodes a sequence with gaps. A gap is written as 0, a present value as its zig-zag
/// difference to the previous present value plus one.
pub fn encode_sparse(base: i64, values: &[Option<i64>]) -> Vec<u8> {
    let mut buf = vec![];
    let mut last = base;
    for value in values {
        match value {
            Some(value) => {
                encode_varint(zigzag(value - last) + 1, &mut buf);
                last = *value;
            }
            None => encode_varint(0, &mut buf),
        }
    }
    buf
}

pub fn decode_sparse(base: i64, mut data: &[u8]) -> Result<Vec<Option<i64>>> {
    let mut values = vec![];
    let mut last = base;
    while !data.is_empty() {
        let raw = decode_varint(&mut data)?;
        if raw == 0 {
            values.push(None);
        } else {
            last += unzigzag(raw - 1);
            values.push(Some(last));
        }
    }
    Ok(values)
}

/// Plain (non-differential) unsigned varints.
pub fn encode_unsigned(values: &[u32]) -> Vec<u8> {
    let mut buf = vec![];
    for value in values {
        encode_varint(u64::from(*value), &mut buf);
    }
    buf
}

pub fn decode_unsigned(mut data: &[u8]) -> Result<Vec<u32>> {
    let mut values = vec![];
    while !data.is_empty() {
        let value = decode_varint(&mut data)?;
        let value = u32::try_from(value)
            .map_err(|_| Error::Format(format!("value {} does not fit 32 bits", value)))?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_maps_small_magnitudes_to_small_codes() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        for value in [0, 1, -1, 1234567, -7654321, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(value)), value);
        }
    }

    #[test]
    fn empty_and_single_sequences() {
        assert!(encode(&[]).is_empty());
        assert_eq!(decode(&[], 0).unwrap(), Vec::<i64>::new());
        let data = encode(&[-42]);
        assert_eq!(decode(&data, 1).unwrap(), vec![-42]);
    }

    #[test]
    fn mixed_sequence_with_base() {
        let values = vec![1_400_000, 1_400_013, 1_399_990, 1_399_990, -5, 2_000_000];
        let data = encode_from(1_399_000, &values);
        assert_eq!(decode_from(1_399_000, &data, values.len()).unwrap(), values);
        assert_eq!(decode_all_from(1_399_000, &data).unwrap(), values);
    }

    #[test]
    fn neighbouring_values_take_one_byte_each() {
        let values: Vec<i64> = (0..100).map(|i| 5_000_000 + i * 3).collect();
        let data = encode_from(5_000_000, &values);
        assert_eq!(data.len(), 100);
    }

    #[test]
    fn wrong_count_is_a_format_error() {
        let data = encode(&[1, 2, 3]);
        assert!(matches!(decode(&data, 4), Err(Error::Format(_))));
        assert!(matches!(decode(&data, 2), Err(Error::Format(_))));
    }

    #[test]
    fn sparse_sequence_keeps_gaps_and_zero_differences() {
        let values = vec![Some(5760), Some(5760), None, Some(5784), None, None];
        let data = encode_sparse(0, &values);
        assert_eq!(decode_sparse(0, &data).unwrap(), values);
        // Two bytes for the first value, one for the repeated one, then the gap marker.
        assert_eq!(data[2], 1);
        assert_eq!(data[3], 0);
    }

    #[test]
    fn unsigned_values() {
        let values = vec![0, 1, 300, u32::MAX];
        assert_eq!(decode_unsigned(&encode_unsigned(&values)).unwrap(), values);
    }

    #[test]
    fn time_rounding() {
        assert_eq!(pack_time(8 * 3600), 5760);
        assert_eq!(unpack_time(5760), 28800);
        assert_eq!(pack_time(12), 2);
        assert_eq!(pack_time(13), 3);
        assert_eq!(pack_duration(61), 13);
        assert_eq!(pack_duration(60), 12);
        assert_eq!(pack_minutes(8 * 3600 + 29), 480);
        assert_eq!(pack_minutes(8 * 3600 + 30), 481);
    }

    #[test]
    fn coordinate_drift_stays_within_one_unit() {
        let mut degrees = vec![];
        let mut value = 14.0;
        for i in 0..10_000 {
            value += 0.000_003_7 * ((i % 7) as f64 - 3.0);
            degrees.push(value);
        }
        let fixed: Vec<i64> = degrees.iter().map(|d| to_fixed(*d) as i64).collect();
        let decoded = decode_from(0, &encode(&fixed), fixed.len()).unwrap();
        for (source, packed) in degrees.iter().zip(decoded) {
            let error = (source - from_fixed(packed as i32)).abs();
            assert!(error <= 1.0 / COORD_SCALE, "drift {} too large", error);
        }
    }
}
