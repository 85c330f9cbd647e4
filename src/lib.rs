//! PlayStation VAG / PS-ADPCM streaming decoder
//!
//! A self-contained decoder for the PlayStation SPU ADPCM format ("VAG"),
//! wrapped in the streaming session contract that playback-plugin hosts
//! expect: probing, pull-based decode with partial-buffer semantics,
//! seek-by-replay, metadata tagging, and a lock-free scope-capture buffer
//! for real-time waveform visualization.
//!
//! # Features
//! - Bit-exact PS-ADPCM block decoding (16-byte blocks, 28 samples each)
//! - Optional 48-byte `VAGp` container header, headerless raw streams
//! - Pull-based decode sessions with sample-accurate seeking
//! - Predictor-state checkpoints to bound seek-by-replay cost
//! - Lock-free per-channel scope capture for oscilloscope/VU displays
//! - WAV export for any decoder implementing the streaming contract
//!
//! # Quick start
//! ## Decode a single block
//! ```
//! use vagstream::adpcm::{decode_block, PredictorState, SAMPLES_PER_BLOCK};
//! let block = [0x10u8, 0x00, 0x21, 0x43, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
//! let mut predictor = PredictorState::default();
//! let mut samples = [0i16; SAMPLES_PER_BLOCK];
//! let flags = decode_block(&block, &mut predictor, &mut samples);
//! assert!(!flags.is_stream_end());
//! ```
//!
//! ## Stream a whole file
//! ```no_run
//! use std::sync::Arc;
//! use vagstream::session::{ReadStatus, VagSession};
//! let data: Arc<[u8]> = std::fs::read("song.vag").unwrap().into();
//! let mut session = VagSession::new();
//! session.open(data, 2).unwrap();
//! let mut buffer = vec![0i16; 4096];
//! loop {
//!     let result = session.read(&mut buffer);
//!     if result.status != ReadStatus::Ok {
//!         break;
//!     }
//!     // ... hand result.frames_produced frames to the audio device
//! }
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod adpcm; // PS-ADPCM block codec (core)
pub mod engine; // Streaming decoder contract & engine leases
pub mod export; // WAV export
pub mod plugin; // Host-facing plugin surface
pub mod probe; // Format probing
pub mod scope; // Scope capture ring buffer
pub mod seek; // Seek strategies & checkpoints
pub mod session; // Decode session state machine
pub mod vag; // VAG container header

/// Error types for decoder operations
#[derive(thiserror::Error, Debug)]
pub enum VagError {
    /// Error while parsing file or header data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error from filesystem or loader service
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation invoked outside its valid session state
    #[error("Invalid session state: {0}")]
    State(String),

    /// Operation not supported by this decoder
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for VagError {
    fn from(msg: String) -> Self {
        VagError::Other(msg)
    }
}

impl From<&str> for VagError {
    fn from(msg: &str) -> Self {
        VagError::Other(msg.to_string())
    }
}

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, VagError>;

// Public API exports
pub use adpcm::{decode_block, LoopFlags, PredictorState};
pub use engine::{EngineLease, ExclusiveEngine, StreamDecoder};
pub use export::export_to_wav;
pub use plugin::{
    read_metadata, FileLoader, FsLoader, HostServices, PluginSession, TagSink, TrackTags,
};
pub use probe::{probe, supported_extensions, ProbeResult};
pub use scope::ScopeCapture;
pub use seek::SeekStrategy;
pub use session::{AudioFormat, ReadResult, ReadStatus, SampleFormat, SessionState, VagSession};
pub use vag::VagHeader;
