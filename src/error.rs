//! # Player Error Types
//!
//! Error types for the playback engine, plus the numeric media-error
//! descriptor exposed through [`crate::AmrPlayer::error`].

use thiserror::Error;

/// Errors that can occur while constructing or driving the player.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The input bytes could not be decoded into PCM samples.
    ///
    /// Surfaced once, at construction, as a permanently-errored player.
    /// Never retried, never recovered.
    #[error("could not decode AMR audio: {0}")]
    Decode(String),

    /// The host's audio output capability is unavailable.
    ///
    /// Fatal at construction; the engine cannot be built.
    #[error("audio output unavailable: {0}")]
    SinkUnavailable(String),

    /// A mutating call was made on a permanently-errored player.
    #[error("player has errored")]
    Errored,

    /// A playback transition failed inside the audio sink.
    #[error("playback operation failed: {0}")]
    PlaybackFailed(String),
}

impl PlayerError {
    /// Returns `true` if this error was resolved at the construction boundary.
    ///
    /// No failure occurring after successful construction is recoverable, so
    /// everything except [`PlayerError::PlaybackFailed`] is a construction
    /// failure.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            PlayerError::Decode(_) | PlayerError::SinkUnavailable(_)
        )
    }
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

// ============================================================================
// Media Error Descriptor
// ============================================================================

/// Numeric media-error taxonomy matching the conventional media-element codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MediaErrorCode {
    /// Fetching was aborted by the user agent.
    Aborted = 1,
    /// A network error prevented the media from loading.
    Network = 2,
    /// The media could not be decoded.
    Decode = 3,
    /// The media source format is not supported.
    SrcNotSupported = 4,
}

impl MediaErrorCode {
    /// The fixed numeric code for this error kind.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Error descriptor carried by a permanently-errored player.
///
/// Mirrors the media-element `MediaError` object: a numeric code from the
/// fixed taxonomy plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaError {
    code: MediaErrorCode,
    message: String,
}

impl MediaError {
    /// Construct a descriptor with the given code and message.
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Descriptor for a decode failure at construction.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(MediaErrorCode::Decode, message)
    }

    /// The error kind.
    pub fn code(&self) -> MediaErrorCode {
        self.code
    }

    /// The human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media error {}: {}", self.code.code(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_codes_match_taxonomy() {
        assert_eq!(MediaErrorCode::Aborted.code(), 1);
        assert_eq!(MediaErrorCode::Network.code(), 2);
        assert_eq!(MediaErrorCode::Decode.code(), 3);
        assert_eq!(MediaErrorCode::SrcNotSupported.code(), 4);
    }

    #[test]
    fn test_decode_descriptor() {
        let err = MediaError::decode("Could not decode AMR audio");
        assert_eq!(err.code(), MediaErrorCode::Decode);
        assert_eq!(err.code().code(), 3);
        assert!(err.to_string().contains("media error 3"));
    }

    #[test]
    fn test_construction_error_classification() {
        assert!(PlayerError::Decode("bad frame".into()).is_construction_error());
        assert!(PlayerError::SinkUnavailable("no device".into()).is_construction_error());
        assert!(!PlayerError::Errored.is_construction_error());
        assert!(!PlayerError::PlaybackFailed("device lost".into()).is_construction_error());
    }
}
