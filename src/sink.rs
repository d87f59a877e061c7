//! # Audio Sink Contract
//!
//! Abstraction over the platform's low-level audio-output primitive. The
//! engine only needs one capability from the host: wrap a PCM slice into a
//! one-shot schedulable source that can be started at "now", stopped early,
//! and reports completion exactly once.

use tokio::sync::oneshot;

use crate::buffer::SampleView;
use crate::error::Result;

/// A one-shot playback unit produced by [`AudioSink::create_source`].
///
/// Sources are single-use: once stopped or played through, a source is spent
/// and the engine arms a fresh one. Implementations back this with whatever
/// hardware-schedulable buffer the platform provides.
pub trait BufferSource: Send {
    /// Schedule playback of the wrapped samples starting at the device "now".
    ///
    /// Called at most once per source.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the schedule request.
    fn start(&mut self) -> Result<()>;

    /// Stop playback early.
    ///
    /// Stopping a source that has already finished, or that was never
    /// started, is a defined no-op; it must not fail or panic. A stop of a
    /// started source must still fire the completion signal.
    fn stop(&mut self);
}

/// A freshly created source together with its completion signal.
///
/// Each source gets its own one-shot channel, arena-style: when a source is
/// superseded without ever starting, the implementation simply drops the
/// sender and the engine observes the closed channel.
pub struct SourceHandle {
    /// Control half of the source.
    pub source: Box<dyn BufferSource>,
    /// Resolves exactly once when the source has fully stopped, whether it
    /// played through naturally or was stopped explicitly after starting.
    pub completed: oneshot::Receiver<()>,
}

/// The platform's audio-output capability.
///
/// Implementations allocate a hardware-backed buffer for the given view and
/// return it wrapped as a schedulable [`BufferSource`]. The view borrows the
/// engine's immutable sample buffer, so creation involves no PCM copy unless
/// the platform requires one.
pub trait AudioSink: Send + Sync {
    /// Wrap a PCM slice into a new one-shot schedulable source.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PlayerError::SinkUnavailable`] if the output device
    /// cannot be used.
    fn create_source(&self, view: SampleView) -> Result<SourceHandle>;
}
