//! LSB bitstream codec over interleaved 8-bit samples.
//!
//! Works on the raw sample buffer of an RGB (3 channels) or RGBA (4
//! channels) image. Only the R, G and B samples carry data; alpha is never
//! touched.
//!
//! ```text
//!  pixel 0         pixel 1         pixel 2
//!  R   G   B  (A)  R   G   B  (A)  R   G   B  (A)  ...
//!  b7  b6  b5      b4  b3  b2      b1  b0  b7' ...
//!  └── payload[0], MSB first ──┘   └── payload[1] ...
//!
//!  payload ‖ 0xFF 0xFE
//! ```
//!
//! Extraction stops at the first point where the last two decoded bytes are
//! `FF FE`. A raw payload containing that pair is cut short there; text
//! payloads (base64, UTF-8) never contain `0xFF`.

use crate::error::{Error, Result};

/// End-of-data marker appended after the payload
pub const EOF_MARKER: [u8; 2] = [0xFF, 0xFE];

/// Bits needed to embed `payload_len` bytes plus the marker
pub fn required_bits(payload_len: usize) -> usize {
    8 * (payload_len + EOF_MARKER.len())
}

/// LSB slots offered by `pixel_count` pixels
pub fn capacity_bits(pixel_count: usize) -> usize {
    3 * pixel_count
}

fn check_channels(channels: usize) -> Result<()> {
    match channels {
        3 | 4 => Ok(()),
        n => Err(Error::UnsupportedFormat(format!(
            "expected 3 or 4 channels per pixel, got {}",
            n
        ))),
    }
}

fn color_slots(samples: &[u8], channels: usize) -> impl Iterator<Item = &u8> {
    samples
        .chunks_exact(channels)
        .flat_map(|px| px.iter().take(3))
}

fn color_slots_mut(samples: &mut [u8], channels: usize) -> impl Iterator<Item = &mut u8> {
    samples
        .chunks_exact_mut(channels)
        .flat_map(|px| px.iter_mut().take(3))
}

/// Write `payload` and the marker into the sample LSBs
///
/// Capacity is checked before any sample is modified. Samples past the
/// end of the payload are left as they were.
pub fn embed(samples: &mut [u8], channels: usize, payload: &[u8]) -> Result<()> {
    check_channels(channels)?;

    let available = capacity_bits(samples.len() / channels);
    let required = required_bits(payload.len());
    if available < required {
        return Err(Error::Capacity {
            required,
            available,
        });
    }

    let bits = payload
        .iter()
        .chain(EOF_MARKER.iter())
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1));

    for (slot, bit) in color_slots_mut(samples, channels).zip(bits) {
        *slot = (*slot & !1) | bit;
    }

    tracing::debug!(
        "Embedded {} payload bytes ({} of {} bits)",
        payload.len(),
        required,
        available
    );
    Ok(())
}

/// Read the payload back out of the sample LSBs
pub fn extract(samples: &[u8], channels: usize) -> Result<Vec<u8>> {
    check_channels(channels)?;

    let mut out = Vec::new();
    let mut byte = 0u8;
    let mut filled = 0;

    for slot in color_slots(samples, channels) {
        byte = (byte << 1) | (slot & 1);
        filled += 1;

        if filled == 8 {
            out.push(byte);
            byte = 0;
            filled = 0;

            if out.ends_with(&EOF_MARKER) {
                out.truncate(out.len() - EOF_MARKER.len());
                return Ok(out);
            }
        }
    }

    Err(Error::PayloadNotFound("no end-of-data marker".into()))
}
