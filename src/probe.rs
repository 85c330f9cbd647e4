//! Format probing
//!
//! Classifies a candidate file from a bounded byte prefix plus its URL,
//! without any I/O of its own. Hosts call this for every registered format
//! handler before committing to a full open, so the result is ternary:
//! a magic-byte match short-circuits other handlers, while an
//! extension-only match merely nominates this handler as a candidate.

use crate::adpcm::BLOCK_SIZE;
use crate::vag;

/// Outcome of probing a candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Magic bytes matched; this handler should open the file.
    Supported,
    /// Extension matched but no reliable magic; the host tries candidate
    /// handlers in registration order until one opens successfully.
    Unsure,
    /// Not our format.
    Unsupported,
}

/// File extensions handled by this decoder, lowercase, without dots.
pub const EXTENSIONS: &[&str] = &["vag"];

/// Static capability advertisement for the host's handler registry.
#[must_use]
pub fn supported_extensions() -> &'static str {
    "vag"
}

/// Probe a candidate file.
///
/// Never reads past `prefix.len()` and never panics; truncated input is
/// simply `Unsupported`. Side-effect free and safe to call concurrently
/// with open sessions for other files.
#[must_use]
pub fn probe(prefix: &[u8], url: Option<&str>, total_size: u64) -> ProbeResult {
    // Too small to hold even one ADPCM block
    if total_size < BLOCK_SIZE as u64 {
        return ProbeResult::Unsupported;
    }

    if vag::has_magic(prefix) {
        return ProbeResult::Supported;
    }

    // Headerless raw streams carry no magic; extension is the only hint
    if let Some(ext) = url.and_then(url_extension) {
        if EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) {
            return ProbeResult::Unsure;
        }
    }

    ProbeResult::Unsupported
}

/// Extract the extension of a URL or path, if any.
fn url_extension(url: &str) -> Option<&str> {
    let name = url.rsplit(['/', '\\']).next().unwrap_or(url);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_match_is_supported() {
        let mut prefix = [0u8; 64];
        prefix[..4].copy_from_slice(b"VAGp");
        assert_eq!(probe(&prefix, None, 1024), ProbeResult::Supported);
        // Magic wins even with a foreign extension
        assert_eq!(
            probe(&prefix, Some("weird.bin"), 1024),
            ProbeResult::Supported
        );
    }

    #[test]
    fn test_extension_only_match_is_unsure() {
        assert_eq!(
            probe(&[0u8; 16], Some("music/boss.vag"), 1024),
            ProbeResult::Unsure
        );
        assert_eq!(
            probe(&[0u8; 16], Some("C:\\sfx\\HIT.VAG"), 1024),
            ProbeResult::Unsure
        );
    }

    #[test]
    fn test_no_match_is_unsupported() {
        assert_eq!(probe(&[0u8; 16], Some("song.ym"), 1024), ProbeResult::Unsupported);
        assert_eq!(probe(&[0u8; 16], None, 1024), ProbeResult::Unsupported);
        assert_eq!(probe(&[0u8; 16], Some("noext"), 1024), ProbeResult::Unsupported);
        assert_eq!(probe(&[0u8; 16], Some(".vag"), 1024), ProbeResult::Unsupported);
    }

    #[test]
    fn test_tiny_files_are_unsupported() {
        let mut prefix = [0u8; 8];
        prefix[..4].copy_from_slice(b"VAGp");
        assert_eq!(probe(&prefix, Some("x.vag"), 8), ProbeResult::Unsupported);
        assert_eq!(probe(&[], Some("x.vag"), 0), ProbeResult::Unsupported);
    }

    #[test]
    fn test_probe_never_reads_past_prefix() {
        // Prefix lengths that bracket the magic length and a huge one
        for len in [0usize, 1, 3, 4, 1_000_000] {
            let prefix = vec![0u8; len];
            let _ = probe(&prefix, Some("a.vag"), 1 << 20);
            let _ = probe(&prefix, None, 1 << 20);
        }
    }
}
