//! Scope capture ring buffer
//!
//! A fixed-capacity circular buffer of recent output samples, per channel,
//! feeding real-time oscilloscope/VU visualization. Single producer (the
//! decode path) and single consumer (a visualization poll thread) run
//! concurrently without locks: the write cursor is atomic and the sample
//! cells are relaxed `AtomicU32` stores of f32 bit patterns, so a reader
//! can observe a torn *sample* (stale vs fresh) but never torn *state*.
//!
//! Correctness here means "no crash, no out-of-bounds access, eventually
//! fresh data" — not linearizable reads.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Samples retained per channel. Power of two for mask-based wrapping.
pub const SCOPE_CAPACITY: usize = 1024;

/// Maximum channels a capture instance can carry.
pub const MAX_SCOPE_CHANNELS: usize = 8;

const POS_MASK: u32 = (SCOPE_CAPACITY - 1) as u32;

/// One channel's storage: a monotonically increasing write cursor plus
/// the sample cells it indexes through the wrap mask.
struct ScopeChannel {
    write_pos: AtomicU32,
    samples: Vec<AtomicU32>,
}

impl ScopeChannel {
    fn new() -> Self {
        Self {
            write_pos: AtomicU32::new(0),
            samples: (0..SCOPE_CAPACITY).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn clear(&self) {
        for cell in &self.samples {
            cell.store(0, Ordering::Relaxed);
        }
        self.write_pos.store(0, Ordering::Relaxed);
    }
}

/// Per-session capture buffer for waveform visualization.
///
/// Created disabled; enabling is lazy (first consumer request) and is the
/// only reset path, so disabling and re-enabling always yields a clean
/// buffer. Disabled captures make `write` a cheap no-op on the decode path.
pub struct ScopeCapture {
    enabled: AtomicBool,
    channels: Vec<ScopeChannel>,
}

impl ScopeCapture {
    /// Create a disabled capture with `channel_count` channels
    /// (clamped to [`MAX_SCOPE_CHANNELS`]).
    #[must_use]
    pub fn new(channel_count: u8) -> Self {
        let count = usize::from(channel_count).clamp(1, MAX_SCOPE_CHANNELS);
        Self {
            enabled: AtomicBool::new(false),
            channels: (0..count).map(|_| ScopeChannel::new()).collect(),
        }
    }

    /// Number of capture channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Whether capture is currently enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable capture.
    ///
    /// Enabling clears all buffers and resets all write cursors before the
    /// flag flips, so the consumer never sees stale pre-disable samples.
    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            for channel in &self.channels {
                channel.clear();
            }
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Record one sample for a channel.
    ///
    /// No-op when disabled or the channel is out of range. The sample is
    /// clamped to [-1, 1] before storage.
    pub fn write(&self, channel: usize, sample: f32) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        let Some(ch) = self.channels.get(channel) else {
            return;
        };
        let clamped = sample.clamp(-1.0, 1.0);
        let pos = ch.write_pos.load(Ordering::Relaxed);
        ch.samples[(pos & POS_MASK) as usize].store(clamped.to_bits(), Ordering::Relaxed);
        // Cursor bump is the publication point for the new sample
        ch.write_pos.store(pos.wrapping_add(1), Ordering::Release);
    }

    /// Copy the most recent samples for a channel into `out`, oldest first.
    ///
    /// Returns the number of samples written: at most `out.len()`, at most
    /// [`SCOPE_CAPACITY`], and at most the number of samples produced since
    /// enable. Returns 0 when disabled or the channel is out of range.
    pub fn read(&self, channel: usize, out: &mut [f32]) -> usize {
        if !self.enabled.load(Ordering::Acquire) {
            return 0;
        }
        let Some(ch) = self.channels.get(channel) else {
            return 0;
        };

        let pos = ch.write_pos.load(Ordering::Acquire);
        // The raw cursor doubles as the total-written count. It wraps at
        // 2^32 samples (~27 h at 44.1 kHz), momentarily under-reporting
        // availability; tolerable for a visualization buffer, and every
        // enable resets the cursor anyway.
        let available = (pos as usize).min(SCOPE_CAPACITY);
        let count = out.len().min(available);
        let start = pos.wrapping_sub(count as u32);

        for (i, slot) in out[..count].iter_mut().enumerate() {
            let idx = (start.wrapping_add(i as u32) & POS_MASK) as usize;
            *slot = f32::from_bits(ch.samples[idx].load(Ordering::Relaxed));
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_capture_is_inert() {
        let scope = ScopeCapture::new(1);
        scope.write(0, 0.5);
        let mut out = [0.0f32; 8];
        assert_eq!(scope.read(0, &mut out), 0);
    }

    #[test]
    fn test_write_read_in_order() {
        let scope = ScopeCapture::new(1);
        scope.set_enabled(true);
        for i in 0..10 {
            scope.write(0, i as f32 / 16.0);
        }
        let mut out = [0.0f32; 4];
        let n = scope.read(0, &mut out);
        assert_eq!(n, 4);
        // Most recent 4, oldest first
        assert_eq!(out, [6.0 / 16.0, 7.0 / 16.0, 8.0 / 16.0, 9.0 / 16.0]);
    }

    #[test]
    fn test_partial_fill_limits_read() {
        let scope = ScopeCapture::new(1);
        scope.set_enabled(true);
        scope.write(0, 0.25);
        let mut out = [9.0f32; 16];
        let n = scope.read(0, &mut out);
        assert_eq!(n, 1);
        assert_eq!(out[0], 0.25);
    }

    #[test]
    fn test_wraparound_keeps_most_recent_in_order() {
        let scope = ScopeCapture::new(1);
        scope.set_enabled(true);
        // 2000 writes into a 1024-slot buffer
        for i in 0..2000 {
            scope.write(0, (i as f32) / 4000.0);
        }
        let mut out = vec![0.0f32; SCOPE_CAPACITY];
        let n = scope.read(0, &mut out);
        assert_eq!(n, SCOPE_CAPACITY);
        for (i, &s) in out.iter().enumerate() {
            let expected = ((2000 - SCOPE_CAPACITY + i) as f32) / 4000.0;
            assert_eq!(s, expected, "sample {i}");
        }
    }

    #[test]
    fn test_samples_are_clamped() {
        let scope = ScopeCapture::new(1);
        scope.set_enabled(true);
        scope.write(0, 7.5);
        scope.write(0, -42.0);
        scope.write(0, f32::NAN);
        let mut out = [0.0f32; 3];
        let n = scope.read(0, &mut out);
        assert_eq!(n, 3);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], -1.0);
        // NaN clamps to NaN; it must at least not escape the store path
        assert!(out[2].is_nan() || (-1.0..=1.0).contains(&out[2]));
    }

    #[test]
    fn test_reenable_clears_buffer() {
        let scope = ScopeCapture::new(1);
        scope.set_enabled(true);
        scope.write(0, 0.9);
        scope.set_enabled(false);
        scope.set_enabled(true);
        let mut out = [0.0f32; 4];
        assert_eq!(scope.read(0, &mut out), 0);
    }

    #[test]
    fn test_invalid_channel_is_ignored() {
        let scope = ScopeCapture::new(2);
        scope.set_enabled(true);
        scope.write(5, 0.5);
        let mut out = [0.0f32; 4];
        assert_eq!(scope.read(5, &mut out), 0);
        assert_eq!(scope.channel_count(), 2);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        use std::sync::Arc;
        let scope = Arc::new(ScopeCapture::new(1));
        scope.set_enabled(true);

        let producer = {
            let scope = Arc::clone(&scope);
            std::thread::spawn(move || {
                for i in 0..50_000 {
                    scope.write(0, ((i % 100) as f32) / 100.0);
                }
            })
        };
        let consumer = {
            let scope = Arc::clone(&scope);
            std::thread::spawn(move || {
                let mut out = vec![0.0f32; SCOPE_CAPACITY];
                for _ in 0..200 {
                    let n = scope.read(0, &mut out);
                    for &s in &out[..n] {
                        assert!((-1.0..=1.0).contains(&s));
                    }
                }
            })
        };
        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
