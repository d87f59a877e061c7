//! # AMR Container Detection
//!
//! Magic-prefix detection for AMR storage files. Only the leading bytes are
//! inspected; narrow-band and wide-band files are distinguished by their
//! fixed header strings.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Magic prefix of a narrow-band AMR storage file.
pub const AMR_NB_MAGIC: &[u8] = b"#!AMR\n";

/// Magic prefix of a wide-band AMR storage file.
pub const AMR_WB_MAGIC: &[u8] = b"#!AMR-WB\n";

/// AMR codec variant selected by container detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmrVariant {
    /// AMR narrow-band (8 kHz output).
    #[serde(rename = "amrnb")]
    NarrowBand,
    /// AMR wide-band (16 kHz output).
    #[serde(rename = "amrwb")]
    WideBand,
}

impl AmrVariant {
    /// Sample rate of the decoded PCM output for this variant.
    pub fn sample_rate(self) -> u32 {
        match self {
            AmrVariant::NarrowBand => 8_000,
            AmrVariant::WideBand => 16_000,
        }
    }

    /// The storage-file magic prefix for this variant.
    pub fn magic(self) -> &'static [u8] {
        match self {
            AmrVariant::NarrowBand => AMR_NB_MAGIC,
            AmrVariant::WideBand => AMR_WB_MAGIC,
        }
    }
}

/// Detect the AMR variant from the leading bytes of a file.
///
/// The wide-band magic extends the narrow-band one, so it is checked first.
/// Returns `None` when neither prefix matches (including input shorter than
/// the magic). No bytes past the prefix are inspected.
pub fn detect_variant(data: &[u8]) -> Option<AmrVariant> {
    let variant = [AmrVariant::WideBand, AmrVariant::NarrowBand]
        .into_iter()
        .find(|variant| data.starts_with(variant.magic()));
    debug!(?variant, "detected AMR container variant");
    variant
}
