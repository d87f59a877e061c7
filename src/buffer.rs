//! # PCM Sample Buffer
//!
//! The decoded track lives in a single immutable [`SampleBuffer`], created
//! once at player construction and shared read-only for the engine's whole
//! lifetime. [`SampleView`] is the zero-copy tail slice handed to the audio
//! sink on every arm.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Trailing window kept playable when an arm offset lands past the end of
/// the buffer, expressed in whole seconds of audio.
const TAIL_WINDOW_SECS: u64 = 1;

/// Immutable mono PCM audio at a fixed sample rate.
///
/// Samples are normalized `f32` amplitudes in `[-1.0, 1.0]`, one channel.
/// The buffer is never mutated after construction, so views into it may be
/// taken concurrently without synchronization.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap decoded samples at the given sample rate.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate` is zero; decoders always report a fixed
    /// positive rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// The full decoded sample array.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples (equals frames; the buffer is mono).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the track decoded to no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fixed sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total duration of the track.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Convert a track-time offset to a sample index, rounding down.
    fn offset_to_samples(&self, offset: Duration) -> usize {
        (offset.as_secs_f64() * self.sample_rate as f64) as usize
    }
}

/// A read-only slice of a [`SampleBuffer`] from a start index to the end.
///
/// This is what the engine hands to the audio sink on each arm. It shares
/// the underlying buffer rather than copying the tail.
#[derive(Debug, Clone)]
pub struct SampleView {
    buffer: SampleBuffer,
    start: usize,
}

impl SampleView {
    /// Slice `buffer` at a track-time offset, clamping so the sink is never
    /// handed an empty window.
    ///
    /// An offset at or past the last sample is pulled back by a fixed
    /// one-second window (floored at the start of the buffer), so seeking to
    /// the very end still leaves a minimal playable tail.
    pub fn at_offset(buffer: &SampleBuffer, offset: Duration) -> Self {
        let len = buffer.len();
        let mut start = buffer.offset_to_samples(offset);

        if start >= len {
            let window = buffer.sample_rate as usize * TAIL_WINDOW_SECS as usize;
            let clamped = len.saturating_sub(window);
            debug!(
                requested = start,
                clamped, "arm offset past end of buffer, clamping to trailing window"
            );
            start = clamped;
        }

        Self {
            buffer: buffer.clone(),
            start,
        }
    }

    /// The samples covered by this view.
    pub fn samples(&self) -> &[f32] {
        &self.buffer.samples()[self.start..]
    }

    /// Start index into the full buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of samples in the view.
    pub fn len(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Returns `true` if the view covers no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate of the underlying buffer.
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    /// Playable duration of the view.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / self.buffer.sample_rate() as f64)
    }
}
