//! Speech synthesis backends.
//!
//! Primary: OpenAI TTS (`tts-1`), used only when a credential is configured.
//! Fallback: the `edge-tts` command-line tool, no credential required.

pub mod edge;
#[cfg(feature = "openai")]
pub mod openai;

pub use edge::EdgeTtsCommand;
#[cfg(feature = "openai")]
pub use openai::OpenAiSpeech;

use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

/// Contract for text-to-speech backends.
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Synthesize `text` and write the audio (MP3) to `out`.
    ///
    /// Blocking.
    fn synthesize(&self, text: &str, out: &Path) -> Result<()>;
}

/// Tries `primary` (when present), then `fallback` on any failure.
pub struct FallbackSynthesizer {
    primary: Option<Box<dyn SpeechSynthesizer>>,
    fallback: Box<dyn SpeechSynthesizer>,
}

impl FallbackSynthesizer {
    pub fn new(
        primary: Option<Box<dyn SpeechSynthesizer>>,
        fallback: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl SpeechSynthesizer for FallbackSynthesizer {
    fn name(&self) -> &'static str {
        "fallback-chain"
    }

    fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        if let Some(primary) = self.primary.as_ref() {
            match primary.synthesize(text, out) {
                Ok(()) => {
                    info!(backend = primary.name(), "voiceover synthesized");
                    return Ok(());
                }
                Err(e) => warn!(
                    backend = primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "primary TTS failed, falling back"
                ),
            }
        }
        self.fallback.synthesize(text, out)?;
        info!(backend = self.fallback.name(), "voiceover synthesized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipforgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fake {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl SpeechSynthesizer for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        fn synthesize(&self, _text: &str, out: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClipforgeError::Synthesis(format!("{} down", self.name)));
            }
            std::fs::write(out, self.name)?;
            Ok(())
        }
    }

    fn fake(name: &'static str, fail: bool) -> (Box<dyn SpeechSynthesizer>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Fake {
                name,
                fail,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[test]
    fn primary_success_skips_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.mp3");
        let (primary, primary_calls) = fake("primary", false);
        let (fallback, fallback_calls) = fake("fallback", false);

        FallbackSynthesizer::new(Some(primary), fallback)
            .synthesize("hi", &out)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "primary");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn primary_failure_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.mp3");
        let (primary, _) = fake("primary", true);
        let (fallback, _) = fake("fallback", false);

        FallbackSynthesizer::new(Some(primary), fallback)
            .synthesize("hi", &out)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "fallback");
    }

    #[test]
    fn no_primary_goes_straight_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.mp3");
        let (fallback, calls) = fake("fallback", false);

        FallbackSynthesizer::new(None, fallback)
            .synthesize("hi", &out)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallback_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (primary, _) = fake("primary", true);
        let (fallback, _) = fake("fallback", true);

        let err = FallbackSynthesizer::new(Some(primary), fallback)
            .synthesize("hi", &dir.path().join("a.mp3"))
            .unwrap_err();
        assert!(matches!(err, ClipforgeError::Synthesis(msg) if msg == "fallback down"));
    }
}
