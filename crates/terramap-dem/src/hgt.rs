//! Raw SRTM `.hgt` decoding.
//!
//! An `.hgt` file is `side * side` big-endian `i16` samples, row-major from
//! the north-west corner, with no header. `i16::MIN` marks a void (missing)
//! sample.

use crate::grid::Grid;
use crate::{DemError, Result};
use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

/// Sentinel marking a missing sample.
pub const VOID: i16 = i16::MIN;

/// Decode a raw tile into a `side x side` grid.
///
/// Voids take the value of the last valid sample before them in scan
/// order. A void run at the very start of the file has nothing to copy
/// and is left at 0.
pub fn decode_hgt(name: &str, bytes: &[u8], side: usize) -> Result<Grid> {
    let expected = 2 * side * side;
    if bytes.len() != expected {
        return Err(DemError::Decode {
            tile: name.to_string(),
            expected,
            actual: bytes.len(),
        });
    }

    let mut samples = vec![0i16; side * side];
    BigEndian::read_i16_into(bytes, &mut samples);

    let (data, voids) = fill_voids(&samples);
    if voids > 0 {
        debug!("{}: filled {} void samples", name, voids);
    }

    Grid::from_vec(side, side, data)
}

/// Forward-fill voids. Returns the samples and the number of voids seen.
fn fill_voids(samples: &[i16]) -> (Vec<f32>, usize) {
    let mut last = 0.0f32;
    let mut voids = 0;
    let data = samples
        .iter()
        .map(|&s| {
            if s == VOID {
                voids += 1;
            } else {
                last = f32::from(s);
            }
            last
        })
        .collect();
    (data, voids)
}

/// Encode samples as `.hgt` bytes.
pub fn encode_hgt(samples: &[i16]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * 2];
    BigEndian::write_i16_into(samples, &mut bytes);
    bytes
}
