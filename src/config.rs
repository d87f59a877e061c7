//! # Player Configuration
//!
//! Tuning knobs for the engine's event timing, plus construction-time
//! options. Defaults: a 150 ms progress tick and a "data ready"
//! notification 100 ms after construction.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing configuration for a player instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Cadence of progress-tick notifications while playing.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Delay before the one-shot "data ready" notification fires.
    #[serde(default = "default_ready_delay")]
    pub ready_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            ready_delay: default_ready_delay(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(150)
}

fn default_ready_delay() -> Duration {
    Duration::from_millis(100)
}

/// Callback invoked after the track plays through to its natural end.
pub type EndCallback = Arc<dyn Fn() + Send + Sync>;

/// Construction-time options for [`crate::AmrPlayer`].
#[derive(Clone, Default)]
pub struct PlayerOptions {
    /// Timing configuration.
    pub config: PlayerConfig,
    /// Optional end-of-track callback. Runs after the ended notification,
    /// with the engine already back in a stopped, replayable state.
    pub on_end: Option<EndCallback>,
}

impl PlayerOptions {
    /// Options with default timing and no end callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an end-of-track callback.
    pub fn with_on_end(mut self, on_end: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_end = Some(Arc::new(on_end));
        self
    }

    /// Override the timing configuration.
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for PlayerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerOptions")
            .field("config", &self.config)
            .field("on_end", &self.on_end.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
