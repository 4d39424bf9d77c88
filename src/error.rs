//! # Error Types
//!
//! This module defines all error types for the playback resolver.
//!
//! Only two kinds of failure ever reach a caller:
//! - Contract violations while resolving a part (unknown part, inverted track range).
//!   These mean the score model handed to the resolver is broken; callers are not
//!   expected to recover from them.
//! - Loading failures for score documents and resolver configuration.
//!
//! Malformed individual markings (a hairpin with no duration, a measure repeat that
//! points before the first measure) are skipped during resolution and never become
//! errors.
//!
//! ## Usage
//! ```rust
//! use gen_playback::{PlaybackContext, PlaybackError, Score};
//!
//! let score = Score::from_yaml("parts: []").unwrap();
//! let mut ctx = PlaybackContext::new();
//!
//! match ctx.update(7, &score) {
//!     Err(PlaybackError::UnknownPart { part }) => assert_eq!(part, 7),
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

use thiserror::Error;

use crate::score::{PartId, TrackIdx};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The requested part does not exist in the score.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::UnknownPart { part: 3 };
    /// assert_eq!(err.to_string(), "Unknown part 3");
    /// ```
    #[error("Unknown part {part}")]
    UnknownPart { part: PartId },

    /// The part's track range is inverted (`start > end`).
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::InvertedTrackRange { part: 1, start: 8, end: 4 };
    /// assert_eq!(err.to_string(), "Part 1 has an inverted track range [8, 4)");
    /// ```
    #[error("Part {part} has an inverted track range [{start}, {end})")]
    InvertedTrackRange {
        part: PartId,
        start: TrackIdx,
        end: TrackIdx,
    },

    /// The YAML score document could not be read.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::ScoreFormat("missing field `tick`".to_string());
    /// assert_eq!(err.to_string(), "Invalid score document: missing field `tick`");
    /// ```
    #[error("Invalid score document: {0}")]
    ScoreFormat(String),

    /// The YAML resolver configuration could not be read.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
