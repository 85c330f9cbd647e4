//! PS-ADPCM block codec
//!
//! The PlayStation SPU encodes audio as a stream of 16-byte blocks, each
//! carrying 28 packed 4-bit residuals plus a shift/filter byte and a loop
//! flag byte. Decoding is differential: every sample depends on the two
//! previously decoded samples, so the predictor state must be carried
//! across blocks (and rebuilt when seeking).
//!
//! [`decode_block`] is a pure function over `(block, predictor)` — no I/O,
//! no allocation — which makes it trivially deterministic and testable.

use bitflags::bitflags;

/// Size of one encoded ADPCM block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Number of PCM samples produced by one block.
pub const SAMPLES_PER_BLOCK: usize = 28;

/// Fixed predictor filter table: `(coeff1, coeff2)` pairs, scaled by 64.
///
/// Filter indices above 4 are clamped to 4 rather than rejected; real-world
/// VAG data occasionally carries garbage in the upper filter bit.
const FILTER_COEFFS: [(i32, i32); 5] = [(0, 0), (60, 0), (115, -52), (98, -55), (122, -60)];

bitflags! {
    /// Loop/end flags carried in byte 1 of every block.
    ///
    /// Unknown bits are preserved verbatim so callers see exactly what the
    /// stream contained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoopFlags: u8 {
        /// End marker. Together with a clear [`LoopFlags::REGION`] bit this
        /// means unconditional end-of-stream.
        const END = 0x01;
        /// Block lies inside the loop region.
        const REGION = 0x02;
        /// Loop start point.
        const START = 0x04;
    }
}

impl LoopFlags {
    /// Whether this block terminates the stream unconditionally.
    ///
    /// END with REGION set is a loop point, not a stop; END alone stops
    /// playback even if more bytes remain in the file.
    #[must_use]
    pub fn is_stream_end(self) -> bool {
        self.contains(LoopFlags::END) && !self.contains(LoopFlags::REGION)
    }
}

/// The two most recent decoded samples, required to decode the next block.
///
/// Initialized to zero at session open or seek-to-zero and mutated in place
/// by every block decode. Never shared across files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictorState {
    /// Most recent decoded sample.
    pub prev1: i32,
    /// Second most recent decoded sample.
    pub prev2: i32,
}

impl PredictorState {
    /// Reset to the zero state used at stream start.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Decode one 16-byte PS-ADPCM block into 28 PCM samples.
///
/// The predictor is updated after every individual sample (not per block),
/// and the block's loop flag byte is returned verbatim.
///
/// Malformed shift/filter fields are clamped to their table bounds instead
/// of rejected, so a corrupt block yields wrong-but-bounded audio rather
/// than a decode failure.
pub fn decode_block(
    block: &[u8; BLOCK_SIZE],
    predictor: &mut PredictorState,
    out: &mut [i16; SAMPLES_PER_BLOCK],
) -> LoopFlags {
    let raw_shift = block[0] & 0x0F;
    let raw_filter = (block[0] >> 4) & 0x07;

    if raw_shift > 12 || raw_filter > 4 {
        log::debug!("clamped malformed block header: shift={raw_shift} filter={raw_filter}");
    }
    let shift = i32::from(raw_shift.min(12));
    let filter = usize::from(raw_filter.min(4));
    let (coeff1, coeff2) = FILTER_COEFFS[filter];

    for (i, sample_out) in out.iter_mut().enumerate() {
        let byte = block[2 + i / 2];
        let nibble = if i % 2 == 0 { byte & 0x0F } else { byte >> 4 };
        // Sign-extend the 4-bit two's-complement nibble to i32 (-8..=7)
        let nibble = (i32::from(nibble) << 28) >> 28;

        let predicted = (predictor.prev1 * coeff1 + predictor.prev2 * coeff2 + 32) >> 6;
        let sample =
            ((nibble << (12 - shift)) + predicted).clamp(i32::from(i16::MIN), i32::from(i16::MAX));

        *sample_out = sample as i16;
        predictor.prev2 = predictor.prev1;
        predictor.prev1 = sample;
    }

    LoopFlags::from_bits_retain(block[1])
}
