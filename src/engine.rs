//! Streaming decoder contract and engine leases
//!
//! [`StreamDecoder`] is the seam every adapter satisfies, whether it decodes
//! directly (the PS-ADPCM session in this crate) or delegates to a wrapped
//! synthesis/tracker engine. It is object-safe so hosts and helpers like the
//! WAV exporter can hold `&mut dyn StreamDecoder`.
//!
//! [`ExclusiveEngine`] models the single-instance-at-a-time constraint some
//! wrapped emulation libraries impose through process-global state: instead
//! of an implicit singleton, ownership is an explicit lease that at most one
//! session holds at a time.

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};

use crate::seek::SeekStrategy;
use crate::session::{AudioFormat, ReadResult};

/// Pull-based streaming decoder contract.
///
/// Implementations decode into caller-provided buffers; `read_frames` calls
/// are strictly sequential per decoder. Optional capabilities (seeking,
/// duration, subsongs) keep their conservative defaults unless the backing
/// format supports them.
pub trait StreamDecoder: Send {
    /// Output format, fixed for the lifetime of the open stream.
    fn format(&self) -> AudioFormat;

    /// Decode up to `out.len() / channel_count` frames into `out`,
    /// interleaved. See [`ReadResult`] for the partial-buffer semantics.
    fn read_frames(&mut self, out: &mut [i16]) -> ReadResult;

    /// Repositioning policy, if this decoder can seek at all.
    fn seek_strategy(&self) -> Option<SeekStrategy> {
        None
    }

    /// Seek to a time in milliseconds.
    ///
    /// Returns the position actually reached (clamped to the end of the
    /// stream), or `None` when seeking is unsupported or the decoder is not
    /// in a seekable state. Callers treat `None` as "ignore and keep playing".
    fn seek_ms(&mut self, _ms: u32) -> Option<u32> {
        None
    }

    /// Total stream duration in milliseconds, if known.
    fn duration_ms(&self) -> Option<u32> {
        None
    }

    /// Number of subsongs in the open file.
    fn subsong_count(&self) -> usize {
        1
    }

    /// Switch to a subsong by 0-based index. Returns `true` on success.
    fn set_subsong(&mut self, _index: usize) -> bool {
        false
    }
}

/// Wrapper granting exclusive, one-at-a-time access to a wrapped engine.
///
/// Emulation libraries with process-global state cannot back two sessions
/// concurrently. Holding the engine behind a lease makes that constraint a
/// type-level fact instead of a runtime surprise.
pub struct ExclusiveEngine<T> {
    slot: Mutex<T>,
}

impl<T> ExclusiveEngine<T> {
    /// Wrap an engine instance.
    pub fn new(engine: T) -> Self {
        Self {
            slot: Mutex::new(engine),
        }
    }

    /// Try to acquire the engine. Returns `None` while another session
    /// holds the lease; never blocks.
    pub fn try_lease(&self) -> Option<EngineLease<'_, T>> {
        self.slot.try_lock().map(|guard| EngineLease { guard })
    }
}

/// Exclusive handle to a leased engine. Dropping it releases the engine.
pub struct EngineLease<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for EngineLease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for EngineLease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
