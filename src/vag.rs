//! VAG container header parsing
//!
//! The on-disk format is an optional 48-byte `VAGp` header followed by a
//! stream of 16-byte ADPCM blocks. Headerless raw streams are also valid
//! input; they play at the default sample rate.
//!
//! Header layout (all integers big-endian):
//! - bytes 0..4: magic `"VAGp"`
//! - bytes 4..8: version
//! - bytes 12..16: payload size in bytes
//! - bytes 16..20: sample rate in Hz
//! - bytes 32..48: NUL-padded sample name
//!
//! Chiptune metadata is frequently malformed in the wild, so implausible
//! sample rates are clamped to the default instead of failing the open.

use crate::adpcm::BLOCK_SIZE;

/// Magic bytes identifying a VAG container.
pub const VAG_MAGIC: &[u8; 4] = b"VAGp";

/// Size of the VAG container header in bytes.
pub const HEADER_SIZE: usize = 48;

/// Sample rate used for headerless streams and implausible header values.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Highest sample rate accepted from a header before falling back.
pub const MAX_SAMPLE_RATE: u32 = 96_000;

/// Smallest input that can be opened: one full ADPCM block.
pub const MIN_FILE_SIZE: usize = BLOCK_SIZE;

/// Parsed VAG container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VagHeader {
    /// Format version from the header.
    pub version: u32,
    /// Payload size in bytes as declared by the header.
    pub data_size: u32,
    /// Sample rate in Hz, already clamped to a plausible value.
    pub sample_rate: u32,
    /// Sample name, trimmed of NUL padding.
    pub name: String,
}

impl VagHeader {
    /// Parse a VAG header from the start of `data`.
    ///
    /// Returns `None` when the magic is absent or the buffer is shorter
    /// than a full header; callers treat that as a headerless raw stream.
    pub fn parse(data: &[u8]) -> Option<VagHeader> {
        if data.len() < HEADER_SIZE || !has_magic(data) {
            return None;
        }

        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let data_size = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);
        let raw_rate = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);

        let name_bytes = &data[32..48];
        let name_end = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..name_end])
            .trim()
            .to_string();

        Some(VagHeader {
            version,
            data_size,
            sample_rate: effective_sample_rate(raw_rate),
            name,
        })
    }
}

/// Check for the `VAGp` magic at the start of a buffer.
///
/// Safe on arbitrarily short buffers.
#[must_use]
pub fn has_magic(data: &[u8]) -> bool {
    data.len() >= VAG_MAGIC.len() && &data[..VAG_MAGIC.len()] == VAG_MAGIC
}

/// Clamp a header sample rate to a plausible playback rate.
///
/// Zero and out-of-range values fall back to [`DEFAULT_SAMPLE_RATE`].
#[must_use]
pub fn effective_sample_rate(raw: u32) -> u32 {
    if raw == 0 || raw > MAX_SAMPLE_RATE {
        log::warn!("implausible sample rate {raw} Hz, using {DEFAULT_SAMPLE_RATE} Hz");
        DEFAULT_SAMPLE_RATE
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn header_bytes(sample_rate: u32, name: &str) -> [u8; HEADER_SIZE] {
        let mut h = [0u8; HEADER_SIZE];
        h[..4].copy_from_slice(VAG_MAGIC);
        h[4..8].copy_from_slice(&3u32.to_be_bytes());
        h[12..16].copy_from_slice(&0u32.to_be_bytes());
        h[16..20].copy_from_slice(&sample_rate.to_be_bytes());
        let name_bytes = name.as_bytes();
        h[32..32 + name_bytes.len()].copy_from_slice(name_bytes);
        h
    }

    #[test]
    fn test_parse_valid_header() {
        let bytes = header_bytes(44_100, "AMBIENT01");
        let header = VagHeader::parse(&bytes).unwrap();
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.name, "AMBIENT01");
        assert_eq!(header.version, 3);
    }

    #[test]
    fn test_zero_rate_falls_back_to_default() {
        let bytes = header_bytes(0, "");
        let header = VagHeader::parse(&bytes).unwrap();
        assert_eq!(header.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_excessive_rate_falls_back_to_default() {
        let bytes = header_bytes(192_000, "");
        let header = VagHeader::parse(&bytes).unwrap();
        assert_eq!(header.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_max_rate_is_accepted() {
        let bytes = header_bytes(MAX_SAMPLE_RATE, "");
        let header = VagHeader::parse(&bytes).unwrap();
        assert_eq!(header.sample_rate, MAX_SAMPLE_RATE);
    }

    #[test]
    fn test_truncated_header_is_not_a_header() {
        let bytes = header_bytes(44_100, "X");
        assert!(VagHeader::parse(&bytes[..40]).is_none());
        assert!(VagHeader::parse(&[]).is_none());
    }

    #[test]
    fn test_missing_magic_is_not_a_header() {
        let mut bytes = header_bytes(44_100, "X");
        bytes[0] = b'W';
        assert!(VagHeader::parse(&bytes).is_none());
    }

    #[test]
    fn test_magic_check_on_short_buffers() {
        assert!(!has_magic(&[]));
        assert!(!has_magic(b"VAG"));
        assert!(has_magic(b"VAGp"));
        assert!(!has_magic(b"VAGX"));
    }
}
