//! # Playback Clock
//!
//! Tracks elapsed playback time across play/pause/seek cycles using
//! wall-clock timestamps instead of a running counter. Exactly one of two
//! modes holds at any time: running (a start instant is recorded) or frozen
//! (only an accumulated offset is kept).

use std::time::Duration;

use tokio::time::Instant;

/// Software clock mapping wall-clock time to track position.
#[derive(Debug)]
pub(crate) struct PlaybackClock {
    /// Set while the clock is running; backdated by the accumulated offset
    /// so `now - started_at` is the absolute track position.
    started_at: Option<Instant>,
    /// Frozen track position while not running.
    accumulated: Duration,
}

impl PlaybackClock {
    pub(crate) fn new() -> Self {
        Self {
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Start (or resume) the clock from the accumulated offset.
    pub(crate) fn start(&mut self) {
        self.started_at = Some(Instant::now() - self.accumulated);
    }

    /// Stop the clock, folding the elapsed time into the frozen offset.
    ///
    /// Returns the frozen position. Freezing an already-frozen clock keeps
    /// the current offset.
    pub(crate) fn freeze(&mut self) -> Duration {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated = Instant::now().duration_since(started_at);
        }
        self.accumulated
    }

    /// Reset to position zero and stop running.
    pub(crate) fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    /// Freeze the clock at an explicit position (seek while not running, or
    /// the first half of a seek during playback).
    pub(crate) fn set_offset(&mut self, offset: Duration) {
        self.started_at = None;
        self.accumulated = offset;
    }

    /// The frozen offset. Meaningful only while not running.
    pub(crate) fn offset(&self) -> Duration {
        self.accumulated
    }

    /// Current track position: live elapsed time while running, the frozen
    /// offset otherwise. Never negative.
    pub(crate) fn position(&self) -> Duration {
        match self.started_at {
            Some(started_at) => Instant::now().duration_since(started_at),
            None => self.accumulated,
        }
    }

    /// Returns `true` while the clock is running.
    pub(crate) fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}
