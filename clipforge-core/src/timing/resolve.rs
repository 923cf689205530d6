//! Timestamp resolution: precise transcription first, estimation otherwise.
//!
//! The precise service is called at most once per job. Its result is
//! classified into a [`TranscriptionOutcome`]; only `Words` is used as-is,
//! every other outcome dispatches to [`estimate`](super::estimate).

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ClipforgeError, Result};
use crate::timing::{estimate, TimedWords, TimingSource, WordTiming};
use crate::transcribe::Transcriber;

/// Classified result of the precise transcription attempt.
#[derive(Debug)]
pub enum TranscriptionOutcome {
    /// No transcription backend configured (missing credential).
    Unconfigured,
    /// The service answered but no usable words survived cleanup.
    Empty,
    /// The service call failed.
    Failed(ClipforgeError),
    /// Usable words, whitespace-stripped, empties removed.
    Words(Vec<WordTiming>),
}

impl TranscriptionOutcome {
    fn label(&self) -> &'static str {
        match self {
            TranscriptionOutcome::Unconfigured => "unconfigured",
            TranscriptionOutcome::Empty => "empty",
            TranscriptionOutcome::Failed(_) => "failed",
            TranscriptionOutcome::Words(_) => "words",
        }
    }
}

#[derive(Clone, Default)]
pub struct TimestampResolver {
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl TimestampResolver {
    pub fn new(transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        Self { transcriber }
    }

    /// A resolver that always estimates.
    pub fn estimate_only() -> Self {
        Self { transcriber: None }
    }

    pub fn has_transcriber(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Attempt the precise path and classify what came back.
    pub fn transcribe(&self, audio_path: &Path) -> TranscriptionOutcome {
        let Some(transcriber) = self.transcriber.as_ref() else {
            return TranscriptionOutcome::Unconfigured;
        };
        match transcriber.transcribe(audio_path) {
            Ok(raw) => {
                let words = clean_transcript(raw);
                if words.is_empty() {
                    TranscriptionOutcome::Empty
                } else {
                    TranscriptionOutcome::Words(words)
                }
            }
            Err(e) => TranscriptionOutcome::Failed(e),
        }
    }

    /// Produce the canonical timing sequence for one job.
    ///
    /// Blocking (may call the transcription service).
    ///
    /// # Errors
    /// Only estimation errors (non-positive `duration`) propagate; transcription
    /// failures always resolve to the estimated path.
    pub fn resolve(&self, text: &str, audio_path: &Path, duration: f64) -> Result<TimedWords> {
        match self.transcribe(audio_path) {
            TranscriptionOutcome::Words(words) => {
                info!(
                    source = %TimingSource::Precise,
                    words = words.len(),
                    "using transcribed word timestamps"
                );
                Ok(TimedWords {
                    source: TimingSource::Precise,
                    words,
                })
            }
            outcome => {
                match &outcome {
                    TranscriptionOutcome::Failed(e) => {
                        warn!(error = %e, "transcription failed, falling back to estimated timing")
                    }
                    other => info!(
                        outcome = other.label(),
                        "no transcribed timestamps, using estimated timing"
                    ),
                }
                Ok(TimedWords {
                    source: TimingSource::Estimated,
                    words: estimate(text, duration)?,
                })
            }
        }
    }
}

impl std::fmt::Debug for TimestampResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampResolver")
            .field("transcriber", &self.transcriber.as_ref().map(|t| t.name()))
            .finish()
    }
}

/// Strip surrounding whitespace and drop tokens that end up empty.
/// Times are kept verbatim: gaps and overlaps from the service are tolerated.
fn clean_transcript(raw: Vec<WordTiming>) -> Vec<WordTiming> {
    raw.into_iter()
        .filter_map(|w| {
            let word = w.word.trim();
            (!word.is_empty()).then(|| WordTiming::new(word, w.start, w.end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct ScriptedTranscriber {
        reply: Mutex<Option<Result<Vec<WordTiming>>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedTranscriber {
        fn new(reply: Result<Vec<WordTiming>>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    impl Transcriber for ScriptedTranscriber {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn transcribe(&self, _audio: &Path) -> Result<Vec<WordTiming>> {
            *self.calls.lock() += 1;
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Err(ClipforgeError::Transcription("called twice".into())))
        }
    }

    const TEXT: &str = "Stay curious, keep building.";
    const DURATION: f64 = 2.5;

    fn audio() -> &'static Path {
        Path::new("/tmp/job.mp3")
    }

    #[test]
    fn unconfigured_estimates() {
        let resolver = TimestampResolver::estimate_only();
        let timed = resolver.resolve(TEXT, audio(), DURATION).unwrap();
        assert_eq!(timed.source, TimingSource::Estimated);
        assert_eq!(timed.words, estimate(TEXT, DURATION).unwrap());
    }

    #[test]
    fn failure_falls_back_to_estimate_after_one_call() {
        let backend = ScriptedTranscriber::new(Err(ClipforgeError::Transcription(
            "503 Service Unavailable".into(),
        )));
        let resolver = TimestampResolver::new(Some(backend.clone()));

        let timed = resolver.resolve(TEXT, audio(), DURATION).unwrap();
        assert_eq!(timed.source, TimingSource::Estimated);
        assert_eq!(timed.words, estimate(TEXT, DURATION).unwrap());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn empty_result_falls_back_to_estimate() {
        let backend = ScriptedTranscriber::new(Ok(vec![]));
        let resolver = TimestampResolver::new(Some(backend));
        let timed = resolver.resolve(TEXT, audio(), DURATION).unwrap();
        assert_eq!(timed.source, TimingSource::Estimated);
        assert_eq!(timed.words, estimate(TEXT, DURATION).unwrap());
    }

    #[test]
    fn whitespace_only_words_count_as_empty() {
        let backend = ScriptedTranscriber::new(Ok(vec![
            WordTiming::new("  ", 0.0, 0.2),
            WordTiming::new("\n", 0.2, 0.4),
        ]));
        let resolver = TimestampResolver::new(Some(backend));
        assert!(matches!(
            resolver.transcribe(audio()),
            TranscriptionOutcome::Empty
        ));
    }

    #[test]
    fn precise_words_are_stripped_and_kept_verbatim() {
        let backend = ScriptedTranscriber::new(Ok(vec![
            WordTiming::new(" Stay", 0.10, 0.40),
            WordTiming::new(" ", 0.40, 0.45),
            WordTiming::new("curious, ", 0.38, 0.90),
            WordTiming::new("keep", 1.20, 1.40),
        ]));
        let resolver = TimestampResolver::new(Some(backend));

        let timed = resolver.resolve(TEXT, audio(), DURATION).unwrap();
        assert_eq!(timed.source, TimingSource::Precise);
        assert_eq!(
            timed.words,
            vec![
                WordTiming::new("Stay", 0.10, 0.40),
                WordTiming::new("curious,", 0.38, 0.90),
                WordTiming::new("keep", 1.20, 1.40),
            ]
        );
    }

    #[test]
    fn estimation_error_still_surfaces() {
        let resolver = TimestampResolver::estimate_only();
        assert!(matches!(
            resolver.resolve(TEXT, audio(), 0.0),
            Err(ClipforgeError::Estimation(_))
        ));
    }
}
