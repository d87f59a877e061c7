//! # amr-player
//!
//! A media-element-style playback engine for pre-decoded AMR audio.
//!
//! The host platform has no native AMR decoder, so decoding happens once,
//! up front, through a [`SampleSource`]; the engine's job is purely to
//! schedule and expose playback of the resulting sample buffer through the
//! platform's [`AudioSink`] primitive.
//!
//! ## Overview
//!
//! - [`detect_variant`] sniffs the AMR container magic to pick narrow-band
//!   or wide-band decoding.
//! - [`SampleSource`] maps raw encoded bytes to a [`SampleBuffer`] exactly
//!   once, at construction.
//! - [`AmrPlayer`] is the state machine: play, pause, seek, stop, progress
//!   ticks, and an end-of-stream notification, with the familiar
//!   media-element read surface (`current_time`, `duration`, `paused`,
//!   `ended`, `error`).
//! - [`AudioSink`] / [`BufferSource`] abstract the platform's schedulable
//!   audio output; the engine always keeps exactly one armed, unstarted
//!   source ready so `play()` has no setup latency.
//!
//! ## Example
//!
//! ```rust,no_run
//! use amr_player::{AmrPlayer, PlayerOptions};
//! use bytes::Bytes;
//!
//! # async fn example(
//! #     sink: impl amr_player::AudioSink + 'static,
//! #     decoder: &dyn amr_player::SampleSource,
//! #     data: Bytes,
//! # ) -> amr_player::Result<()> {
//! let player = AmrPlayer::new(sink, decoder, data, PlayerOptions::new())?;
//! if let Some(error) = player.error() {
//!     println!("cannot play: {error}");
//!     return Ok(());
//! }
//! player.play().await?;
//! println!("duration: {:.1}s", player.duration());
//! # Ok(())
//! # }
//! ```

pub mod buffer;
mod clock;
pub mod config;
mod cursor;
pub mod decoder;
pub mod detect;
pub mod error;
pub mod events;
pub mod player;
pub mod sink;

pub use buffer::{SampleBuffer, SampleView};
pub use config::{EndCallback, PlayerConfig, PlayerOptions};
pub use decoder::SampleSource;
pub use detect::{detect_variant, AmrVariant, AMR_NB_MAGIC, AMR_WB_MAGIC};
pub use error::{MediaError, MediaErrorCode, PlayerError, Result};
pub use events::{ListenerId, PlayerEvent, PlayerEventKind};
pub use player::{AmrPlayer, PlaybackState};
pub use sink::{AudioSink, BufferSource, SourceHandle};
