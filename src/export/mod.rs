//! Audio export
//!
//! Offline rendering of a streaming decoder to a file, for hosts and tools
//! that want decoded output without a playback loop.

mod wav;

pub use wav::export_to_wav;
