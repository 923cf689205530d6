//! Transcription backend abstraction.
//!
//! The `Transcriber` trait decouples timestamp resolution from any specific
//! service. Backends return raw word-level timestamps; cleanup (whitespace
//! stripping, empty-token removal) is the resolver's job.

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAiTranscriber;

use std::path::Path;

use crate::error::Result;
use crate::timing::WordTiming;

/// Contract for word-level transcription backends.
pub trait Transcriber: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Transcribe the audio file at `audio` with word granularity.
    ///
    /// Blocking: callers run this off the async executor.
    ///
    /// # Returns
    /// Words in the order the service reported them. May be empty.
    fn transcribe(&self, audio: &Path) -> Result<Vec<WordTiming>>;
}
