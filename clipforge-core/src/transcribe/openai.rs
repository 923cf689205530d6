//! OpenAI Whisper backend (`whisper-1`, `verbose_json`, word granularity).

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClipforgeError, Result};
use crate::timing::WordTiming;
use crate::transcribe::Transcriber;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const MODEL: &str = "whisper-1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    words: Vec<TranscribedWord>,
}

#[derive(Debug, Deserialize)]
struct TranscribedWord {
    word: String,
    start: f64,
    end: f64,
}

pub struct OpenAiTranscriber {
    api_key: String,
    endpoint: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: TRANSCRIPTIONS_URL.into(),
        }
    }

    /// `None` when no credential is configured.
    pub fn from_key(api_key: Option<&str>) -> Option<Self> {
        api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Self::new)
    }

    /// Point at a compatible self-hosted endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &'static str {
        "openai-whisper"
    }

    fn transcribe(&self, audio: &Path) -> Result<Vec<WordTiming>> {
        let audio_bytes = std::fs::read(audio)?;

        let file_part = multipart::Part::bytes(audio_bytes)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(|e| ClipforgeError::Transcription(format!("multipart file part: {e}")))?;
        let form = multipart::Form::new()
            .text("model", MODEL)
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClipforgeError::Transcription(format!("client build: {e}")))?;

        let response = client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| ClipforgeError::Transcription(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClipforgeError::Transcription(format!(
                "service returned {status}: {}",
                body.trim()
            )));
        }

        let payload: VerboseTranscription = response
            .json()
            .map_err(|e| ClipforgeError::Transcription(format!("json parse failed: {e}")))?;
        debug!(words = payload.words.len(), "whisper response parsed");

        Ok(payload
            .words
            .into_iter()
            .map(|w| WordTiming::new(w.word, w.start, w.end))
            .collect())
    }
}
