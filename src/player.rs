//! # Playback Engine
//!
//! The public player: a three-state machine composing the playback clock,
//! the buffer cursor, and the event bus. The control surface mirrors a
//! media element: play, pause, seek, stop, fractional-second time getters,
//! progress ticks, and an end-of-stream notification.
//!
//! ## Concurrency
//!
//! Engine state lives behind a single `parking_lot::Mutex` that is never
//! held across an await. Transitions that retire a started source await its
//! "fully stopped" signal after releasing the lock, which serializes
//! disarm/arm pairs and guarantees at most one source is ever connected to
//! the output. A per-source watcher task listens for the sink's completion
//! signal and routes it either into the natural-end transition or into the
//! stopped signal the disarming transition is waiting on; the halt flag is
//! set before the source is stopped, so the watcher can always tell which
//! case occurred.

use std::sync::{Arc, Weak};
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::PlaybackClock;
use crate::config::{EndCallback, PlayerOptions};
use crate::cursor::{BufferCursor, WatcherParts};
use crate::decoder::SampleSource;
use crate::error::{MediaError, PlayerError, Result};
use crate::events::{EventBus, ListenerId, PlayerEvent, PlayerEventKind};
use crate::sink::AudioSink;

/// Playback lifecycle state.
///
/// `Stopped` and `Paused` differ only in whether the clock holds a nonzero
/// frozen offset; both have a ready, unstarted source armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing, position zero.
    Stopped,
    /// Actively playing; the clock is running.
    Playing,
    /// Not playing, frozen at a mid-track offset.
    Paused,
}

/// Outcome of attempting to start the armed source.
enum StartOutcome {
    Started,
    AlreadyPlaying,
    /// Frozen offset is at or past the end; the caller delegates to `stop`.
    PastEnd,
}

/// Mutable engine state, guarded by [`PlayerShared::engine`].
struct Engine {
    state: PlaybackState,
    /// Set on the first successful `play()`.
    played: bool,
    /// Set when the track plays through to its natural end; cleared by
    /// `play()` and by any seek to a nonzero offset.
    reached_end: bool,
    clock: PlaybackClock,
    cursor: BufferCursor,
}

struct PlayerShared {
    duration: Duration,
    events: EventBus,
    on_end: Option<EndCallback>,
    engine: Mutex<Engine>,
    /// Back-reference handed to watcher and timer tasks so they never keep
    /// the engine alive.
    weak: Weak<PlayerShared>,
    /// Instance-scoped timer tasks (progress tick, ready notification),
    /// aborted when the engine is dropped.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlayerShared {
    // ========================================================================
    // Transitions
    // ========================================================================

    async fn play(&self) -> Result<()> {
        match self.begin_playback()? {
            StartOutcome::AlreadyPlaying => return Ok(()),
            StartOutcome::PastEnd => {
                debug!("play at end of track, delegating to stop");
                return self.stop().await;
            }
            StartOutcome::Started => {}
        }
        self.emit_time_update();
        Ok(())
    }

    /// Start the armed source and the clock under the lock.
    fn begin_playback(&self) -> Result<StartOutcome> {
        let mut engine = self.engine.lock();
        if engine.state == PlaybackState::Playing {
            return Ok(StartOutcome::AlreadyPlaying);
        }
        if engine.clock.offset() >= self.duration {
            return Ok(StartOutcome::PastEnd);
        }
        engine.cursor.start_armed()?;
        engine.clock.start();
        engine.state = PlaybackState::Playing;
        engine.played = true;
        engine.reached_end = false;
        debug!("playback started");
        Ok(StartOutcome::Started)
    }

    async fn pause(&self) -> Result<()> {
        let halted = {
            let mut engine = self.engine.lock();
            if engine.state != PlaybackState::Playing {
                None
            } else {
                let offset = engine.clock.freeze();
                let stopped = engine.cursor.disarm();
                let parts = engine.cursor.arm(offset)?;
                engine.state = PlaybackState::Paused;
                debug!(offset_ms = offset.as_millis() as u64, "playback paused");
                Some((stopped, parts))
            }
        };

        if let Some((stopped, parts)) = halted {
            self.spawn_watcher(parts);
            if let Some(rx) = stopped {
                let _ = rx.await;
            }
        }
        // A pause outside Playing still re-emits a time update.
        self.emit_time_update();
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        let target = position.min(self.duration);
        let (was_playing, stopped, parts) = {
            let mut engine = self.engine.lock();
            let was_playing = engine.state == PlaybackState::Playing;
            let stopped = engine.cursor.disarm();
            let parts = engine.cursor.arm(target)?;
            engine.clock.set_offset(target);
            if target > Duration::ZERO {
                engine.reached_end = false;
                engine.state = PlaybackState::Paused;
            } else {
                engine.state = PlaybackState::Stopped;
            }
            debug!(
                target_ms = target.as_millis() as u64,
                was_playing, "seek applied"
            );
            (was_playing, stopped, parts)
        };

        self.spawn_watcher(parts);
        if let Some(rx) = stopped {
            let _ = rx.await;
        }

        if was_playing {
            match self.begin_playback()? {
                StartOutcome::PastEnd => return self.stop().await,
                StartOutcome::Started | StartOutcome::AlreadyPlaying => {}
            }
        }
        self.emit_time_update();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let (stopped, parts) = {
            let mut engine = self.engine.lock();
            engine.clock.reset();
            let stopped = engine.cursor.disarm();
            let parts = engine.cursor.arm(Duration::ZERO)?;
            engine.state = PlaybackState::Stopped;
            debug!("playback stopped");
            (stopped, parts)
        };

        self.spawn_watcher(parts);
        if let Some(rx) = stopped {
            let _ = rx.await;
        }
        self.emit_time_update();
        Ok(())
    }

    /// Natural-end transition: the source played through unassisted.
    ///
    /// The engine is returned to a stopped, replayable state (clock reset,
    /// fresh source armed at zero) before any notification or callback runs,
    /// so an end callback that immediately replays works.
    fn finish_naturally(&self, generation: u64, stopped_tx: oneshot::Sender<()>) {
        let rearmed = {
            let mut engine = self.engine.lock();
            if engine.cursor.generation() != generation {
                // A newer source superseded this one; nothing to do.
                None
            } else {
                engine.state = PlaybackState::Stopped;
                engine.clock.reset();
                engine.reached_end = true;
                debug!("track played to natural end");
                match engine.cursor.arm(Duration::ZERO) {
                    Ok(parts) => Some(Some(parts)),
                    Err(err) => {
                        warn!(%err, "failed to re-arm after natural end");
                        Some(None)
                    }
                }
            }
        };

        let _ = stopped_tx.send(());

        if let Some(parts) = rearmed {
            if let Some(parts) = parts {
                self.spawn_watcher(parts);
            }
            self.emit_time_update();
            self.events.emit(PlayerEvent {
                kind: PlayerEventKind::Ended,
                position: Duration::ZERO,
            });
            if let Some(on_end) = &self.on_end {
                on_end();
            }
        }
    }

    // ========================================================================
    // Background tasks
    // ========================================================================

    fn spawn_watcher(&self, parts: WatcherParts) {
        let WatcherParts {
            generation,
            completed,
            halt,
            stopped_tx,
        } = parts;
        let weak = self.weak.clone();
        tokio::spawn(async move {
            // Err means the source was dropped without ever starting; either
            // way the source is fully stopped once this resolves.
            let finished = completed.await.is_ok();
            let natural = finished && !halt.load(Ordering::Acquire);
            match weak.upgrade() {
                Some(player) if natural => player.finish_naturally(generation, stopped_tx),
                _ => {
                    let _ = stopped_tx.send(());
                }
            }
        });
    }

    fn spawn_timers(self: &Arc<Self>, tick_interval: Duration, ready_delay: Duration) {
        let weak = Arc::downgrade(self);
        let tick = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(player) = weak.upgrade() else { break };
                let position = {
                    let engine = player.engine.lock();
                    engine.clock.is_running().then(|| engine.clock.position())
                };
                if let Some(position) = position {
                    player.events.emit(PlayerEvent {
                        kind: PlayerEventKind::TimeUpdate,
                        position,
                    });
                }
            }
        });

        let weak = Arc::downgrade(self);
        // Anchor the delay at construction time; a sleep created inside the
        // task would not start counting until the task is first polled.
        let delay = tokio::time::sleep(ready_delay);
        let ready = tokio::spawn(async move {
            delay.await;
            if let Some(player) = weak.upgrade() {
                player.events.emit(PlayerEvent {
                    kind: PlayerEventKind::LoadedData,
                    position: Duration::ZERO,
                });
            }
        });

        self.tasks.lock().extend([tick, ready]);
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    fn current_position(&self) -> Duration {
        let engine = self.engine.lock();
        match engine.state {
            PlaybackState::Playing => engine.clock.position(),
            PlaybackState::Paused => engine.clock.offset(),
            PlaybackState::Stopped => Duration::ZERO,
        }
    }

    fn state(&self) -> PlaybackState {
        self.engine.lock().state
    }

    fn ended(&self) -> bool {
        let engine = self.engine.lock();
        engine.played
            && engine.reached_end
            && engine.state != PlaybackState::Playing
            && engine.clock.offset() == Duration::ZERO
    }

    fn emit_time_update(&self) {
        self.events.emit(PlayerEvent {
            kind: PlayerEventKind::TimeUpdate,
            position: self.current_position(),
        });
    }
}

impl Drop for PlayerShared {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

// ============================================================================
// Public Player Handle
// ============================================================================

#[derive(Clone)]
struct ErroredPlayer {
    error: MediaError,
    // Listeners may still be registered; nothing ever fires them.
    events: EventBus,
}

#[derive(Clone)]
enum Repr {
    Live(Arc<PlayerShared>),
    Errored(ErroredPlayer),
}

/// A media-element-style player over a block of pre-decoded PCM audio.
///
/// Cheap to clone; clones share the same engine. Construction must happen
/// inside a Tokio runtime, which hosts the engine's tick timer and
/// completion watchers.
///
/// A decode failure does not fail construction: it yields a permanently
/// errored player whose mutating calls return [`PlayerError::Errored`] and
/// whose [`AmrPlayer::error`] carries a decode descriptor. Only an
/// unavailable audio sink makes construction itself fail.
#[derive(Clone)]
pub struct AmrPlayer {
    repr: Repr,
}

impl AmrPlayer {
    /// Decode `data` through `decoder` and build the engine on `sink`.
    ///
    /// The whole track is decoded once, up front. On success the engine is
    /// constructed already armed at offset zero, its progress-tick timer
    /// running, and a one-shot "data ready" notification scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SinkUnavailable`] (or whatever the sink
    /// reports) if the audio output cannot be used. Decode failures are not
    /// errors here; see the type-level docs.
    pub fn new(
        sink: impl AudioSink + 'static,
        decoder: &dyn SampleSource,
        data: Bytes,
        options: PlayerOptions,
    ) -> Result<Self> {
        let buffer = match decoder.decode(&data) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(%err, "decode failed, constructing errored player");
                return Ok(Self {
                    repr: Repr::Errored(ErroredPlayer {
                        error: MediaError::decode("Could not decode AMR audio"),
                        events: EventBus::new(),
                    }),
                });
            }
        };

        let duration = buffer.duration();
        debug!(
            samples = buffer.len(),
            sample_rate = buffer.sample_rate(),
            duration_ms = duration.as_millis() as u64,
            "decoded track"
        );

        let sink: Arc<dyn AudioSink> = Arc::new(sink);
        let shared = Arc::new_cyclic(|weak| PlayerShared {
            duration,
            events: EventBus::new(),
            on_end: options.on_end.clone(),
            engine: Mutex::new(Engine {
                state: PlaybackState::Stopped,
                played: false,
                reached_end: false,
                clock: PlaybackClock::new(),
                cursor: BufferCursor::new(sink, buffer),
            }),
            weak: weak.clone(),
            tasks: Mutex::new(Vec::new()),
        });

        // Arm eagerly so the first play() has no setup latency. A sink
        // failure here is fatal: no partial engine is ever exposed.
        let parts = shared.engine.lock().cursor.arm(Duration::ZERO)?;
        shared.spawn_watcher(parts);
        shared.spawn_timers(options.config.tick_interval, options.config.ready_delay);

        Ok(Self {
            repr: Repr::Live(shared),
        })
    }

    fn live(&self) -> Result<&Arc<PlayerShared>> {
        match &self.repr {
            Repr::Live(shared) => Ok(shared),
            Repr::Errored(_) => Err(PlayerError::Errored),
        }
    }

    // ========================================================================
    // Control surface
    // ========================================================================

    /// Start or resume playback. A no-op when already playing; at or past
    /// the end of the track it behaves as [`AmrPlayer::stop`].
    pub async fn play(&self) -> Result<()> {
        self.live()?.play().await
    }

    /// Pause playback, freezing the clock at the current position.
    ///
    /// Suspends until the outgoing source has fully stopped and a
    /// replacement is armed at the frozen offset. Pausing a player that is
    /// not playing only re-emits a time update.
    pub async fn pause(&self) -> Result<()> {
        self.live()?.pause().await
    }

    /// Seek to an absolute track position. Out-of-range positions clamp
    /// into `[0, duration]`.
    ///
    /// Seeking during playback restarts playback from the new position.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.live()?.seek(position).await
    }

    /// Stop playback and reset the position to zero.
    pub async fn stop(&self) -> Result<()> {
        self.live()?.stop().await
    }

    /// Set the playback position in fractional seconds; equivalent to
    /// [`AmrPlayer::seek`]. Out-of-range and non-finite values clamp into
    /// `[0, duration]`, with `NaN` treated as zero.
    pub async fn set_current_time(&self, seconds: f64) -> Result<()> {
        // Clamp before the Duration conversion; from_secs_f64 rejects NaN
        // and values past its range.
        let seconds = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.duration())
        };
        self.seek(Duration::from_secs_f64(seconds)).await
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    /// Track duration in fractional seconds. Zero for an errored player.
    pub fn duration(&self) -> f64 {
        match &self.repr {
            Repr::Live(shared) => shared.duration.as_secs_f64(),
            Repr::Errored(_) => 0.0,
        }
    }

    /// Current playback position in fractional seconds.
    pub fn current_time(&self) -> f64 {
        match &self.repr {
            Repr::Live(shared) => shared.current_position().as_secs_f64(),
            Repr::Errored(_) => 0.0,
        }
    }

    /// Current lifecycle state. An errored player reports `Stopped`.
    pub fn playback_state(&self) -> PlaybackState {
        match &self.repr {
            Repr::Live(shared) => shared.state(),
            Repr::Errored(_) => PlaybackState::Stopped,
        }
    }

    /// Returns `true` whenever playback is not active.
    ///
    /// An errored player reports the fixed literal `false`; callers must
    /// treat such a player as permanently errored regardless of this flag.
    pub fn paused(&self) -> bool {
        match &self.repr {
            Repr::Live(shared) => shared.state() != PlaybackState::Playing,
            Repr::Errored(_) => false,
        }
    }

    /// Returns `true` after the track has played through to its natural
    /// end: the player has been played at least once, is not playing now,
    /// and the clock sits at zero because the end was reached (not because
    /// of an explicit mid-play stop).
    ///
    /// An errored player reports the fixed literal `false`.
    pub fn ended(&self) -> bool {
        match &self.repr {
            Repr::Live(shared) => shared.ended(),
            Repr::Errored(_) => false,
        }
    }

    /// The permanent error descriptor, or `None` for a live player.
    pub fn error(&self) -> Option<MediaError> {
        match &self.repr {
            Repr::Live(_) => None,
            Repr::Errored(errored) => Some(errored.error.clone()),
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register a listener for one notification kind.
    ///
    /// Listeners of the same kind run in registration order. Listeners on an
    /// errored player are accepted but never invoked.
    pub fn add_listener(
        &self,
        kind: PlayerEventKind,
        callback: impl Fn(&PlayerEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        match &self.repr {
            Repr::Live(shared) => shared.events.subscribe(kind, callback),
            Repr::Errored(errored) => errored.events.subscribe(kind, callback),
        }
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) {
        match &self.repr {
            Repr::Live(shared) => shared.events.unsubscribe(id),
            Repr::Errored(errored) => errored.events.unsubscribe(id),
        }
    }
}

impl std::fmt::Debug for AmrPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Live(shared) => f
                .debug_struct("AmrPlayer")
                .field("state", &shared.state())
                .field("duration_secs", &shared.duration.as_secs_f64())
                .finish(),
            Repr::Errored(errored) => f
                .debug_struct("AmrPlayer")
                .field("error", &errored.error)
                .finish(),
        }
    }
}
