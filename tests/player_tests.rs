//! End-to-end scenarios for the playback engine, driven by a mock audio
//! sink and decoder under Tokio's paused test clock.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use amr_player::{
    AmrPlayer, AudioSink, BufferSource, MediaErrorCode, PlayerError, PlayerEventKind,
    PlayerOptions, Result, SampleBuffer, SampleSource, SampleView, SourceHandle,
};

// ============================================================================
// Mock AudioSink Implementation
// ============================================================================

/// Sink whose sources "play" by sleeping for the slice duration on the
/// Tokio clock, then firing their completion signal.
#[derive(Clone, Default)]
struct MockSink {
    /// Slice length (in samples) of every source created, in order.
    created_views: Arc<Mutex<Vec<usize>>>,
    /// Number of sources actually started.
    started: Arc<Mutex<usize>>,
    fail_create: bool,
}

impl MockSink {
    fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    fn last_view_len(&self) -> usize {
        *self.created_views.lock().last().expect("no source created")
    }
}

impl AudioSink for MockSink {
    fn create_source(&self, view: SampleView) -> Result<SourceHandle> {
        if self.fail_create {
            return Err(PlayerError::SinkUnavailable("no output device".into()));
        }
        self.created_views.lock().push(view.len());
        let (tx, rx) = oneshot::channel();
        Ok(SourceHandle {
            source: Box::new(MockSource {
                play_duration: view.duration(),
                sender: Arc::new(Mutex::new(Some(tx))),
                playout: None,
                started: false,
                started_counter: Arc::clone(&self.started),
            }),
            completed: rx,
        })
    }
}

struct MockSource {
    play_duration: Duration,
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    playout: Option<tokio::task::JoinHandle<()>>,
    started: bool,
    started_counter: Arc<Mutex<usize>>,
}

impl BufferSource for MockSource {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        *self.started_counter.lock() += 1;
        let sender = Arc::clone(&self.sender);
        // Anchor the playout deadline at start() time; a sleep created inside
        // the task would not start counting until the task is first polled,
        // which on the paused test clock is after the test's advance().
        let playout_sleep = tokio::time::sleep(self.play_duration);
        self.playout = Some(tokio::spawn(async move {
            playout_sleep.await;
            if let Some(tx) = sender.lock().take() {
                let _ = tx.send(());
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if !self.started {
            return;
        }
        if let Some(playout) = self.playout.take() {
            playout.abort();
        }
        // Already-finished sources have no sender left; stop stays a no-op.
        if let Some(tx) = self.sender.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        if let Some(playout) = self.playout.take() {
            playout.abort();
        }
    }
}

// ============================================================================
// Mock SampleSource Implementation
// ============================================================================

/// Decoder producing silence of a fixed length at 8 kHz.
struct SilenceDecoder {
    samples: usize,
}

impl SilenceDecoder {
    /// Two seconds of audio at 8 kHz.
    fn two_seconds() -> Self {
        Self { samples: 16_000 }
    }
}

impl SampleSource for SilenceDecoder {
    fn decode(&self, _data: &[u8]) -> Result<SampleBuffer> {
        Ok(SampleBuffer::new(vec![0.0; self.samples], 8_000))
    }
}

struct FailingDecoder;

impl SampleSource for FailingDecoder {
    fn decode(&self, _data: &[u8]) -> Result<SampleBuffer> {
        Err(PlayerError::Decode("corrupt frame header".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn two_second_player(sink: &MockSink, options: PlayerOptions) -> AmrPlayer {
    AmrPlayer::new(
        sink.clone(),
        &SilenceDecoder::two_seconds(),
        Bytes::from_static(b"#!AMR\n"),
        options,
    )
    .expect("player construction failed")
}

/// Let spawned watcher/timer tasks run to quiescence on the paused clock.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn assert_secs(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}s, got {actual}s"
    );
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_state() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    assert_secs(player.duration(), 2.0);
    assert_secs(player.current_time(), 0.0);
    assert!(player.paused());
    assert!(!player.ended());
    assert!(player.error().is_none());
    // Constructed eagerly armed, but nothing started yet.
    assert_eq!(sink.created_views.lock().len(), 1);
    assert_eq!(*sink.started.lock(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_loadeddata_fires_once_after_construction() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    let fired = Arc::new(Mutex::new(0u32));
    let fired_clone = Arc::clone(&fired);
    player.add_listener(PlayerEventKind::LoadedData, move |_| {
        *fired_clone.lock() += 1;
    });

    tokio::time::advance(Duration::from_millis(150)).await;
    settle().await;
    assert_eq!(*fired.lock(), 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(*fired.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_then_pause_freezes_elapsed_time() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    player.play().await.unwrap();
    assert!(!player.paused());
    assert_eq!(*sink.started.lock(), 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    player.pause().await.unwrap();

    assert!(player.paused());
    assert_secs(player.current_time(), 0.5);
    assert!(!player.ended());
}

#[tokio::test(start_paused = true)]
async fn test_resume_continues_from_pause_offset() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(600)).await;
    player.pause().await.unwrap();

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(400)).await;
    assert_secs(player.current_time(), 1.0);
    assert!(!player.paused());
}

#[tokio::test(start_paused = true)]
async fn test_play_while_playing_is_noop() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    player.play().await.unwrap();
    player.play().await.unwrap();
    assert_eq!(*sink.started.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_pause_is_idempotent() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    let updates = Arc::new(Mutex::new(0u32));
    let updates_clone = Arc::clone(&updates);
    player.add_listener(PlayerEventKind::TimeUpdate, move |_| {
        *updates_clone.lock() += 1;
    });

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    player.pause().await.unwrap();
    let time_after_first = player.current_time();
    let sources_after_first = sink.created_views.lock().len();

    // Second pause: no state change beyond re-emitting a time update.
    let updates_before = *updates.lock();
    player.pause().await.unwrap();
    assert!(player.paused());
    assert_secs(player.current_time(), time_after_first);
    assert_eq!(sink.created_views.lock().len(), sources_after_first);
    assert_eq!(*updates.lock(), updates_before + 1);
}

#[tokio::test(start_paused = true)]
async fn test_seek_positions_are_exact_from_any_state() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    // From stopped.
    player.seek(Duration::from_millis(100)).await.unwrap();
    assert_secs(player.current_time(), 0.1);
    assert!(player.paused());

    // From paused.
    player.seek(Duration::from_millis(1_500)).await.unwrap();
    assert_secs(player.current_time(), 1.5);

    // While playing: playback continues from the new position.
    player.play().await.unwrap();
    player.seek(Duration::from_millis(300)).await.unwrap();
    assert!(!player.paused());
    assert_secs(player.current_time(), 0.3);
    tokio::time::advance(Duration::from_millis(100)).await;
    assert_secs(player.current_time(), 0.4);
}

#[tokio::test(start_paused = true)]
async fn test_set_current_time_is_seek_in_seconds() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    player.set_current_time(1.25).await.unwrap();
    assert_secs(player.current_time(), 1.25);
}

#[tokio::test(start_paused = true)]
async fn test_set_current_time_clamps_wild_inputs() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    // Past-infinity and astronomically large values land on the track end.
    player.set_current_time(f64::INFINITY).await.unwrap();
    assert_secs(player.current_time(), 2.0);
    player.set_current_time(1.0e18).await.unwrap();
    assert_secs(player.current_time(), 2.0);

    // NaN and anything below zero land on the start.
    player.set_current_time(f64::NAN).await.unwrap();
    assert_secs(player.current_time(), 0.0);
    player.set_current_time(f64::NEG_INFINITY).await.unwrap();
    assert_secs(player.current_time(), 0.0);
    player.set_current_time(-3.5).await.unwrap();
    assert_secs(player.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_overrange_seek_clamps_and_keeps_playable_tail() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    // 100 s on a 2 s track.
    player.seek(Duration::from_secs(100)).await.unwrap();
    assert_secs(player.current_time(), 2.0);
    // The sink was handed the one-second trailing window, never an empty
    // or negative-length buffer.
    assert_eq!(sink.last_view_len(), 8_000);

    // Playing from the end behaves as stop.
    player.play().await.unwrap();
    assert!(player.paused());
    assert_secs(player.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_resets_position() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(700)).await;
    player.stop().await.unwrap();

    assert_secs(player.current_time(), 0.0);
    assert!(player.paused());
    // An explicit mid-play stop is not a natural end.
    assert!(!player.ended());
}

#[tokio::test(start_paused = true)]
async fn test_natural_end_of_track() {
    let sink = MockSink::default();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let log_for_end = Arc::clone(&log);
    let player = two_second_player(
        &sink,
        PlayerOptions::new().with_on_end(move || log_for_end.lock().push("callback")),
    );
    let log_for_event = Arc::clone(&log);
    player.add_listener(PlayerEventKind::Ended, move |_| {
        log_for_event.lock().push("ended-event");
    });

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(2_100)).await;
    settle().await;

    // Exactly one ended notification, then the user callback.
    assert_eq!(*log.lock(), vec!["ended-event", "callback"]);
    assert!(player.ended());
    assert!(player.paused());
    assert_secs(player.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_engine_is_replayable_when_end_callback_runs() {
    let sink = MockSink::default();
    let observed: Arc<Mutex<Option<(bool, f64)>>> = Arc::new(Mutex::new(None));
    let slot: Arc<Mutex<Option<AmrPlayer>>> = Arc::new(Mutex::new(None));

    let observed_clone = Arc::clone(&observed);
    let slot_clone = Arc::clone(&slot);
    let player = two_second_player(
        &sink,
        PlayerOptions::new().with_on_end(move || {
            if let Some(player) = slot_clone.lock().as_ref() {
                *observed_clone.lock() = Some((player.paused(), player.current_time()));
            }
        }),
    );
    *slot.lock() = Some(player.clone());

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(2_100)).await;
    settle().await;

    // The callback saw a stopped, replayable engine.
    let (paused, current_time) = observed.lock().take().expect("end callback never ran");
    assert!(paused);
    assert_secs(current_time, 0.0);

    // And a replay actually works.
    player.play().await.unwrap();
    assert!(!player.paused());
    assert!(!player.ended());
    tokio::time::advance(Duration::from_millis(250)).await;
    assert_secs(player.current_time(), 0.25);
}

#[tokio::test(start_paused = true)]
async fn test_ended_lifecycle() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    // Never played.
    assert!(!player.ended());

    player.play().await.unwrap();
    assert!(!player.ended());

    tokio::time::advance(Duration::from_millis(2_100)).await;
    settle().await;
    assert!(player.ended());

    // Seeking away from zero leaves the ended state.
    player.seek(Duration::from_millis(500)).await.unwrap();
    assert!(!player.ended());
}

#[tokio::test(start_paused = true)]
async fn test_progress_ticks_only_while_playing() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());

    let positions: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let positions_clone = Arc::clone(&positions);
    player.add_listener(PlayerEventKind::TimeUpdate, move |event| {
        positions_clone.lock().push(event.position);
    });

    player.play().await.unwrap();
    // Step past three tick deadlines one at a time so each fires at its own
    // position on the paused clock.
    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(160)).await;
        settle().await;
    }

    let ticked = positions.lock().len();
    assert!(ticked >= 3, "expected at least 3 ticks, saw {ticked}");
    {
        let positions = positions.lock();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(*positions, sorted, "tick positions must not go backwards");
    }

    player.pause().await.unwrap();
    let after_pause = positions.lock().len();
    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    // Ticks stop the instant the state leaves Playing.
    assert_eq!(positions.lock().len(), after_pause);
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_yields_errored_player() {
    let sink = MockSink::default();
    let player = AmrPlayer::new(
        sink,
        &FailingDecoder,
        Bytes::from_static(b"not amr at all"),
        PlayerOptions::new(),
    )
    .unwrap();

    let error = player.error().expect("expected decode error");
    assert_eq!(error.code(), MediaErrorCode::Decode);
    assert_eq!(error.code().code(), 3);

    assert!(matches!(player.play().await, Err(PlayerError::Errored)));
    assert!(matches!(player.pause().await, Err(PlayerError::Errored)));
    assert!(matches!(
        player.seek(Duration::from_secs(1)).await,
        Err(PlayerError::Errored)
    ));
    // Non-finite positions must surface the error, not a conversion panic.
    assert!(matches!(
        player.set_current_time(f64::INFINITY).await,
        Err(PlayerError::Errored)
    ));

    // Known oddity of the contract: the errored player reports literal
    // false for both flags.
    assert!(!player.paused());
    assert!(!player.ended());
    assert_secs(player.duration(), 0.0);
    assert_secs(player.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_sink_fails_construction() {
    let result = AmrPlayer::new(
        MockSink::failing(),
        &SilenceDecoder::two_seconds(),
        Bytes::from_static(b"#!AMR\n"),
        PlayerOptions::new(),
    );
    assert!(matches!(result, Err(PlayerError::SinkUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_every_halt_arms_a_replacement_source() {
    let sink = MockSink::default();
    let player = two_second_player(&sink, PlayerOptions::new());
    assert_eq!(sink.created_views.lock().len(), 1);

    player.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(100)).await;
    player.pause().await.unwrap();
    assert_eq!(sink.created_views.lock().len(), 2);

    player.seek(Duration::from_millis(900)).await.unwrap();
    assert_eq!(sink.created_views.lock().len(), 3);

    player.stop().await.unwrap();
    assert_eq!(sink.created_views.lock().len(), 4);
    // The fresh source covers the whole track again.
    assert_eq!(sink.last_view_len(), 16_000);
}
