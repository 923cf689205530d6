//! Word timing: when each word of the script is audible.
//!
//! Two sources feed the same `WordTiming` sequence:
//!
//! ```text
//! audio ─► Transcriber (precise) ──┐
//!                                  ├─► TimestampResolver ─► TimedWords
//! text + duration ─► estimate() ───┘        (fallback)
//! ```

pub mod estimate;
pub mod resolve;

pub use estimate::estimate;
pub use resolve::{TimestampResolver, TranscriptionOutcome};

use serde::{Deserialize, Serialize};

/// One word and the window, in seconds of playback, during which it is spoken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// Which path produced a timing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingSource {
    /// Word-level timestamps reported by the transcription service.
    Precise,
    /// Character-weighted allocation across the audio duration.
    Estimated,
}

impl std::fmt::Display for TimingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingSource::Precise => f.write_str("precise"),
            TimingSource::Estimated => f.write_str("estimated"),
        }
    }
}

/// A chronological timing sequence tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWords {
    pub source: TimingSource,
    pub words: Vec<WordTiming>,
}

impl TimedWords {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}
