//! # Buffer Cursor
//!
//! Owns the single live armed source. Every transition that leaves a source
//! non-playable (stop, seek, natural end) re-arms a fresh one, so `play()`
//! never pays a decode or slice cost on the hot path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::buffer::{SampleBuffer, SampleView};
use crate::error::Result;
use crate::sink::{AudioSink, BufferSource, SourceHandle};

/// The one live schedulable source, plus the per-source signalling state.
struct ArmedSource {
    source: Box<dyn BufferSource>,
    /// Set before an explicit stop so the completion watcher can tell a
    /// user-initiated halt from a natural end. Must be set before calling
    /// `stop()` on the source.
    halt: Arc<AtomicBool>,
    /// Resolved by the watcher once the source has fully stopped; consumed
    /// by the transition that disarmed it.
    stopped_rx: Option<oneshot::Receiver<()>>,
    started: bool,
}

/// Everything the completion watcher task needs for one armed source.
pub(crate) struct WatcherParts {
    /// Arm generation, used to ignore stale natural-end completions.
    pub(crate) generation: u64,
    /// The sink's completion signal for this source.
    pub(crate) completed: oneshot::Receiver<()>,
    /// Shared halt flag (see [`ArmedSource::halt`]).
    pub(crate) halt: Arc<AtomicBool>,
    /// Sender half of the "source has fully stopped" signal.
    pub(crate) stopped_tx: oneshot::Sender<()>,
}

/// Slices the sample buffer and keeps exactly one armed source alive.
pub(crate) struct BufferCursor {
    sink: Arc<dyn AudioSink>,
    buffer: SampleBuffer,
    armed: Option<ArmedSource>,
    generation: u64,
}

impl BufferCursor {
    pub(crate) fn new(sink: Arc<dyn AudioSink>, buffer: SampleBuffer) -> Self {
        Self {
            sink,
            buffer,
            armed: None,
            generation: 0,
        }
    }

    /// Build and store a fresh source sliced at `offset`.
    ///
    /// Any previously armed source must already have been taken via
    /// [`BufferCursor::disarm`]. Returns the parts the caller hands to a
    /// completion watcher.
    pub(crate) fn arm(&mut self, offset: Duration) -> Result<WatcherParts> {
        self.generation += 1;
        let view = SampleView::at_offset(&self.buffer, offset);
        debug!(
            generation = self.generation,
            offset_ms = offset.as_millis() as u64,
            samples = view.len(),
            "arming buffer source"
        );

        let SourceHandle { source, completed } = self.sink.create_source(view)?;
        let halt = Arc::new(AtomicBool::new(false));
        let (stopped_tx, stopped_rx) = oneshot::channel();

        self.armed = Some(ArmedSource {
            source,
            halt: Arc::clone(&halt),
            stopped_rx: Some(stopped_rx),
            started: false,
        });

        Ok(WatcherParts {
            generation: self.generation,
            completed,
            halt,
            stopped_tx,
        })
    }

    /// Take the current armed source out of service.
    ///
    /// A started source is told to halt (flag first, then stop) and its
    /// stopped signal is returned for the caller to await. A source that was
    /// never started is simply dropped; its watcher unwinds when the sink
    /// drops the completion sender.
    pub(crate) fn disarm(&mut self) -> Option<oneshot::Receiver<()>> {
        match self.armed.take() {
            Some(mut armed) if armed.started => {
                armed.halt.store(true, Ordering::Release);
                armed.source.stop();
                armed.stopped_rx.take()
            }
            _ => None,
        }
    }

    /// Start the armed source. Starting an already-started source is a no-op.
    pub(crate) fn start_armed(&mut self) -> Result<()> {
        let armed = self
            .armed
            .as_mut()
            .ok_or_else(|| crate::PlayerError::PlaybackFailed("no source armed".into()))?;
        if !armed.started {
            armed.source.start()?;
            armed.started = true;
        }
        Ok(())
    }

    /// Generation of the currently armed source.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` while a source is armed.
    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
