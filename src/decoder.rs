//! # Sample Source Contract
//!
//! The host platform has no native decoder for AMR, so decoding happens
//! once, up front, through this trait. The engine makes exactly one call at
//! construction and keeps the resulting [`SampleBuffer`] for its lifetime.

use crate::buffer::SampleBuffer;
use crate::error::Result;

/// Decodes a raw encoded byte buffer into mono PCM samples.
///
/// From the engine's viewpoint this is a pure, synchronous mapping from
/// bytes to a fixed sample array. A failure must be reported as
/// [`crate::PlayerError::Decode`]; the engine then exposes a
/// permanently-errored player instead of a live one; no partial engine is
/// ever constructed.
pub trait SampleSource: Send + Sync {
    /// Decode `data` into a sample buffer at the codec's fixed sample rate.
    fn decode(&self, data: &[u8]) -> Result<SampleBuffer>;
}
