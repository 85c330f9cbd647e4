//! Decode session state machine
//!
//! A [`VagSession`] owns the codec state for one input file: the shared
//! byte buffer, the block cursor, the ADPCM predictor, and a one-block
//! carry buffer that lets `read` honor arbitrary frame counts even though
//! the codec only produces whole 28-sample blocks.
//!
//! Lifecycle: `Created → Opened → (reads) → Finished`, with `Error` on
//! invalid input or misuse and `Closed → Opened` legal via reopen (the
//! allocation is reused). All operations are synchronous; the host drives
//! `read` from its own audio-producing context.

use std::sync::Arc;

use crate::adpcm::{decode_block, PredictorState, BLOCK_SIZE, SAMPLES_PER_BLOCK};
use crate::engine::StreamDecoder;
use crate::scope::ScopeCapture;
use crate::seek::{CheckpointTable, SeekStrategy};
use crate::vag::{self, VagHeader, DEFAULT_SAMPLE_RATE, HEADER_SIZE, MIN_FILE_SIZE};
use crate::{Result, VagError};

/// PCM sample encoding of a session's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit integer samples.
    S16,
    /// 32-bit float samples.
    F32,
}

/// Output format of an open session. Immutable once opened; may differ
/// between files but never mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample encoding.
    pub sample_format: SampleFormat,
    /// Interleaved output channels (1 or 2).
    pub channel_count: u8,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Outcome classification of one `read` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Frames were produced; more may follow.
    Ok,
    /// End of stream; no frames produced.
    Finished,
    /// Invalid state or unusable destination; no frames produced.
    Error,
}

/// Result of one `read` call.
///
/// Invariant: `status == Ok` implies `frames_produced > 0`, and
/// `frames_produced == 0` implies `status` is `Finished` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Output format of the session.
    pub format: AudioFormat,
    /// Whole frames written to the destination.
    pub frames_produced: u32,
    /// Outcome classification.
    pub status: ReadStatus,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Allocated, no file opened yet.
    #[default]
    Created,
    /// Open and readable.
    Opened,
    /// End of stream reported; reads keep returning `Finished`.
    Finished,
    /// Open failed; the session holds no input.
    Error,
    /// Closed; may be reopened with a new file.
    Closed,
}

/// Streaming decode session for one PS-ADPCM input.
pub struct VagSession {
    state: SessionState,
    input: Option<Arc<[u8]>>,
    header: Option<VagHeader>,
    body_start: usize,
    total_blocks: usize,
    block_cursor: usize,
    predictor: PredictorState,
    format: AudioFormat,
    // Decoded-but-undelivered samples from the current block
    carry: [i16; SAMPLES_PER_BLOCK],
    carry_pos: usize,
    carry_len: usize,
    // Unconditional END flag seen; ignore any remaining bytes
    ended: bool,
    checkpoints: CheckpointTable,
    scope: Option<Arc<ScopeCapture>>,
}

impl VagSession {
    /// Create a session in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Created,
            input: None,
            header: None,
            body_start: 0,
            total_blocks: 0,
            block_cursor: 0,
            predictor: PredictorState::default(),
            format: AudioFormat {
                sample_format: SampleFormat::S16,
                channel_count: 1,
                sample_rate: DEFAULT_SAMPLE_RATE,
            },
            carry: [0; SAMPLES_PER_BLOCK],
            carry_pos: 0,
            carry_len: 0,
            ended: false,
            checkpoints: CheckpointTable::default(),
            scope: None,
        }
    }

    /// Change the predictor checkpoint spacing (in blocks).
    ///
    /// Purely a seek-cost tuning knob; discards snapshots recorded so far.
    pub fn set_checkpoint_interval(&mut self, blocks: usize) {
        self.checkpoints = CheckpointTable::new(blocks);
    }

    /// Attach a scope-capture buffer that mirrors every delivered sample.
    pub fn set_scope(&mut self, scope: Arc<ScopeCapture>) {
        self.scope = Some(scope);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Output format. Meaningful once the session is opened.
    #[must_use]
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Container header of the open file, if it had one.
    #[must_use]
    pub fn header(&self) -> Option<&VagHeader> {
        self.header.as_ref()
    }

    /// Total duration in milliseconds, derived from the block count.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u32> {
        if self.input.is_none() {
            return None;
        }
        let samples = (self.total_blocks * SAMPLES_PER_BLOCK) as u64;
        Some((samples * 1000 / u64::from(self.format.sample_rate)) as u32)
    }

    /// Open an input buffer for decoding.
    ///
    /// The buffer stays owned by the host's loader; the session only holds
    /// a reference and never copies the file bytes. `output_channels` (1 or
    /// 2) fixes the delivery format; a mono source is duplicated left=right
    /// for stereo delivery.
    ///
    /// Any previous stream state is discarded, so `Closed → Opened` reopen
    /// reuses the session allocation.
    pub fn open(&mut self, input: Arc<[u8]>, output_channels: u8) -> Result<()> {
        self.input = None;
        self.header = None;
        self.state = SessionState::Error;

        if input.len() < MIN_FILE_SIZE {
            return Err(VagError::ParseError(format!(
                "input too small: {} bytes, need at least {MIN_FILE_SIZE}",
                input.len()
            )));
        }

        let header = VagHeader::parse(&input);
        if header.is_none() && vag::has_magic(&input) {
            return Err(VagError::ParseError("truncated VAG header".into()));
        }
        let body_start = if header.is_some() { HEADER_SIZE } else { 0 };
        let total_blocks = (input.len() - body_start) / BLOCK_SIZE;
        if total_blocks == 0 {
            return Err(VagError::ParseError("no ADPCM blocks after header".into()));
        }

        let sample_rate = header
            .as_ref()
            .map_or(DEFAULT_SAMPLE_RATE, |h| h.sample_rate);

        self.format = AudioFormat {
            sample_format: SampleFormat::S16,
            channel_count: output_channels.clamp(1, 2),
            sample_rate,
        };
        self.header = header;
        self.body_start = body_start;
        self.total_blocks = total_blocks;
        self.block_cursor = 0;
        self.predictor.reset();
        self.carry_pos = 0;
        self.carry_len = 0;
        self.ended = false;
        self.checkpoints.clear();
        self.input = Some(input);
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Decode up to `out.len() / channel_count` frames into `out`,
    /// interleaved.
    ///
    /// Stops early at end of stream (unconditional END flag, or fewer than
    /// 16 bytes remaining — partial tail blocks are never decoded). Decoded
    /// samples are mirrored into the attached scope capture.
    pub fn read(&mut self, out: &mut [i16]) -> ReadResult {
        let format = self.format;
        match self.state {
            SessionState::Opened => {}
            SessionState::Finished => {
                return ReadResult {
                    format,
                    frames_produced: 0,
                    status: ReadStatus::Finished,
                }
            }
            _ => {
                return ReadResult {
                    format,
                    frames_produced: 0,
                    status: ReadStatus::Error,
                }
            }
        }

        let channels = usize::from(format.channel_count);
        let max_frames = out.len() / channels;
        if max_frames == 0 {
            return ReadResult {
                format,
                frames_produced: 0,
                status: ReadStatus::Error,
            };
        }

        let mut frames = 0usize;
        while frames < max_frames {
            if self.carry_pos >= self.carry_len && !self.fill_carry() {
                break;
            }
            let sample = self.carry[self.carry_pos];
            self.carry_pos += 1;

            let base = frames * channels;
            out[base..base + channels].fill(sample);
            if let Some(scope) = &self.scope {
                let value = f32::from(sample) / 32768.0;
                for channel in 0..channels {
                    scope.write(channel, value);
                }
            }
            frames += 1;
        }

        if frames > 0 {
            ReadResult {
                format,
                frames_produced: frames as u32,
                status: ReadStatus::Ok,
            }
        } else {
            self.state = SessionState::Finished;
            ReadResult {
                format,
                frames_produced: 0,
                status: ReadStatus::Finished,
            }
        }
    }

    /// Seek to a time in milliseconds using replay-from-start.
    ///
    /// The predictor history feeding every block decode must be rebuilt, so
    /// the session resets to the nearest checkpoint and decodes (discarding
    /// output) up to the target sample. Seeking past the end clamps to the
    /// end; the following `read` reports `Finished`. Returns the position
    /// actually reached, or `None` outside a seekable state.
    pub fn seek_ms(&mut self, ms: u32) -> Option<u32> {
        if !matches!(self.state, SessionState::Opened | SessionState::Finished) {
            return None;
        }

        let rate = u64::from(self.format.sample_rate);
        let total_samples = (self.total_blocks * SAMPLES_PER_BLOCK) as u64;
        let target = (u64::from(ms) * rate / 1000).min(total_samples);
        let target_block = (target / SAMPLES_PER_BLOCK as u64) as usize;
        let remainder = (target % SAMPLES_PER_BLOCK as u64) as usize;

        let (start_block, predictor) = self.checkpoints.nearest(target_block);
        self.predictor = predictor;
        self.block_cursor = start_block;
        self.carry_pos = 0;
        self.carry_len = 0;
        self.ended = false;
        self.state = SessionState::Opened;

        // Decode and discard whole blocks up to the target block
        while self.block_cursor < target_block {
            if !self.fill_carry() {
                break;
            }
            self.carry_pos = self.carry_len;
        }
        // Drop the in-block remainder for sample accuracy
        if remainder > 0 && self.block_cursor == target_block && self.fill_carry() {
            self.carry_pos = remainder;
        }

        let position =
            (self.block_cursor * SAMPLES_PER_BLOCK - (self.carry_len - self.carry_pos)) as u64;
        Some((position * 1000 / rate) as u32)
    }

    /// Release the input buffer reference.
    ///
    /// Scope-capture contents are left intact for post-mortem inspection.
    /// The session may be reopened with a new file afterwards.
    pub fn close(&mut self) {
        self.input = None;
        self.header = None;
        self.state = SessionState::Closed;
    }

    /// Decode the next block into the carry buffer.
    ///
    /// Returns `false` at end of stream: END flag already seen, no input,
    /// or fewer than 16 bytes remaining (partial tail blocks are ignored).
    fn fill_carry(&mut self) -> bool {
        if self.ended {
            return false;
        }
        let Some(input) = self.input.clone() else {
            return false;
        };
        if self.block_cursor >= self.total_blocks {
            let leftover = input.len() - self.body_start - self.total_blocks * BLOCK_SIZE;
            if leftover > 0 {
                log::debug!("ignoring {leftover} trailing bytes (partial block)");
            }
            return false;
        }

        self.checkpoints.record(self.block_cursor, self.predictor);

        let offset = self.body_start + self.block_cursor * BLOCK_SIZE;
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&input[offset..offset + BLOCK_SIZE]);

        let flags = decode_block(&block, &mut self.predictor, &mut self.carry);
        self.carry_pos = 0;
        self.carry_len = SAMPLES_PER_BLOCK;
        self.block_cursor += 1;
        if flags.is_stream_end() {
            self.ended = true;
        }
        true
    }
}

impl Default for VagSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder for VagSession {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_frames(&mut self, out: &mut [i16]) -> ReadResult {
        self.read(out)
    }

    fn seek_strategy(&self) -> Option<SeekStrategy> {
        Some(SeekStrategy::ReplayFromStart)
    }

    fn seek_ms(&mut self, ms: u32) -> Option<u32> {
        VagSession::seek_ms(self, ms)
    }

    fn duration_ms(&self) -> Option<u32> {
        VagSession::duration_ms(self)
    }
}
