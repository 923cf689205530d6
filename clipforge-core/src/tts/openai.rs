//! OpenAI TTS backend.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{ClipforgeError, Result};
use crate::tts::SpeechSynthesizer;

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const MODEL: &str = "tts-1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

pub struct OpenAiSpeech {
    api_key: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(api_key: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice: voice.into(),
        }
    }
}

impl SpeechSynthesizer for OpenAiSpeech {
    fn name(&self) -> &'static str {
        "openai-tts"
    }

    fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClipforgeError::Synthesis(format!("client build: {e}")))?;

        let response = client
            .post(SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model: MODEL,
                voice: &self.voice,
                input: text,
                response_format: "mp3",
            })
            .send()
            .map_err(|e| ClipforgeError::Synthesis(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClipforgeError::Synthesis(format!(
                "service returned {status}: {}",
                body.trim()
            )));
        }

        let audio = response
            .bytes()
            .map_err(|e| ClipforgeError::Synthesis(format!("reading audio body: {e}")))?;
        if audio.is_empty() {
            return Err(ClipforgeError::Synthesis("service returned no audio".into()));
        }
        std::fs::write(out, &audio)?;
        debug!(bytes = audio.len(), voice = %self.voice, "openai speech written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(SpeechRequest {
            model: MODEL,
            voice: "nova",
            input: "Hello there",
            response_format: "mp3",
        })
        .unwrap();
        assert_eq!(body["model"], "tts-1");
        assert_eq!(body["voice"], "nova");
        assert_eq!(body["input"], "Hello there");
        assert_eq!(body["response_format"], "mp3");
    }
}
